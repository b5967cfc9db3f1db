//! Deterministic synthetic messages for demos and tests.

use gridmon_core::GridDimensions;
use gridmon_wire::RecordLayout;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{Error, Result};

/// Parameters for generated messages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticConfig {
    /// Records per message.
    pub records: usize,
    /// RNG seed.
    pub seed: u64,
    /// Fraction of records given an index outside the grid.
    pub invalid_fraction: f64,
    /// Record layout to write.
    pub layout: RecordLayout,
    /// Grid the valid indices are drawn from.
    pub grid: GridDimensions,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            records: 80_000,
            seed: 0,
            invalid_fraction: 0.0,
            layout: RecordLayout::default(),
            grid: GridDimensions::default(),
        }
    }
}

impl SyntheticConfig {
    /// Sets the records per message.
    #[must_use]
    pub fn with_records(mut self, records: usize) -> Self {
        self.records = records;
        self
    }

    /// Sets the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the fraction of out-of-range records, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_invalid_fraction(mut self, fraction: f64) -> Self {
        self.invalid_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Sets the grid.
    #[must_use]
    pub fn with_grid(mut self, grid: GridDimensions) -> Self {
        self.grid = grid;
        self
    }

    /// Sets the record layout.
    #[must_use]
    pub fn with_layout(mut self, layout: RecordLayout) -> Self {
        self.layout = layout;
        self
    }

    /// RNG seeded from `seed`.
    #[must_use]
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed)
    }
}

/// Highest index a `u16` field can carry for this grid.
fn max_valid_index(grid: &GridDimensions) -> u16 {
    u16::try_from(grid.max_index().as_u32()).unwrap_or(u16::MAX)
}

/// Generates one message payload.
///
/// Valid indices are uniform over `1..=max_index` (capped at `u16::MAX`).
/// Invalid records carry index 0 or, when the grid leaves room, an index
/// above the grid. Bytes outside the pixel field are random.
///
/// # Errors
/// Returns an error if the layout is invalid or the payload would not fit
/// a capture frame.
pub fn synthetic_message<R: Rng>(config: &SyntheticConfig, rng: &mut R) -> Result<Vec<u8>> {
    config.layout.validate()?;
    let stride = config.layout.stride;
    let offset = config.layout.index_offset;
    let max = max_valid_index(&config.grid);

    let len = config
        .records
        .checked_mul(stride)
        .filter(|&len| u32::try_from(len).is_ok())
        .ok_or_else(|| {
            Error::InvalidFormat(format!(
                "{} records of {stride} bytes exceed the frame size limit",
                config.records
            ))
        })?;
    let mut payload = vec![0u8; len];
    rng.fill(payload.as_mut_slice());

    for record in payload.chunks_exact_mut(stride) {
        let index = if config.invalid_fraction > 0.0 && rng.gen_bool(config.invalid_fraction) {
            if max < u16::MAX && rng.gen_bool(0.5) {
                rng.gen_range(max + 1..=u16::MAX)
            } else {
                0
            }
        } else {
            rng.gen_range(1..=max)
        };
        record[offset..offset + 2].copy_from_slice(&index.to_le_bytes());
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridmon_wire::RecordDecoder;

    #[test]
    fn test_message_is_deterministic() {
        let config = SyntheticConfig::default().with_records(100).with_seed(42);
        let a = synthetic_message(&config, &mut config.rng()).unwrap();
        let b = synthetic_message(&config, &mut config.rng()).unwrap();
        assert_eq!(a.len(), 1200);
        assert_eq!(a, b);

        let other = config.with_seed(43);
        assert_ne!(a, synthetic_message(&other, &mut other.rng()).unwrap());
    }

    #[test]
    fn test_indices_are_valid() {
        let config = SyntheticConfig::default().with_records(2_000);
        let payload = synthetic_message(&config, &mut config.rng()).unwrap();
        let decoder = RecordDecoder::new(config.layout, Some(2_000)).unwrap();
        let decoded = decoder.decode(&payload);

        assert!(decoded.is_complete());
        assert!(decoded
            .indices()
            .all(|i| config.grid.coordinate(i).is_ok()));
    }

    #[test]
    fn test_invalid_fraction() {
        let config = SyntheticConfig::default()
            .with_records(1_000)
            .with_invalid_fraction(1.0);
        let payload = synthetic_message(&config, &mut config.rng()).unwrap();
        let decoded = RecordDecoder::new(config.layout, None)
            .unwrap()
            .decode(&payload);
        assert!(decoded
            .indices()
            .all(|i| config.grid.coordinate(i).is_err()));
    }

    #[test]
    fn test_small_grid_and_layout() {
        let config = SyntheticConfig::default()
            .with_grid(GridDimensions::new(2, 2, 2).unwrap())
            .with_layout(RecordLayout::new(4, 2).unwrap())
            .with_records(50);
        let payload = synthetic_message(&config, &mut config.rng()).unwrap();
        assert_eq!(payload.len(), 200);
        for record in payload.chunks_exact(4) {
            let index = u16::from_le_bytes([record[2], record[3]]);
            assert!((1..=8).contains(&index));
        }
    }

    #[test]
    fn test_oversized_message_rejected() {
        let config = SyntheticConfig::default().with_records(usize::MAX);
        assert!(matches!(
            synthetic_message(&config, &mut config.rng()),
            Err(Error::InvalidFormat(_))
        ));

        // Fits a usize but not a u32 frame length.
        let config = SyntheticConfig::default().with_records(u32::MAX as usize / 12 + 1);
        assert!(synthetic_message(&config, &mut config.rng()).is_err());
    }

    #[test]
    fn test_invalid_layout_rejected() {
        let mut config = SyntheticConfig::default().with_records(4);
        config.layout.stride = 0;
        assert!(matches!(
            synthetic_message(&config, &mut config.rng()),
            Err(Error::WireError(_))
        ));
    }
}
