//! Hit record decoder.

use std::iter::FusedIterator;
use std::slice::ChunksExact;

use crate::{Error, PayloadDefect, PixelIndex, Result};

use serde::{Deserialize, Serialize};

/// Size of the pixel index field in bytes.
const INDEX_FIELD_SIZE: usize = 2;

/// Geometry of one hit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordLayout {
    /// Record size in bytes.
    pub stride: usize,
    /// Offset of the little-endian `u16` pixel index within a record.
    pub index_offset: usize,
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self {
            stride: 12,
            index_offset: 4,
        }
    }
}

impl RecordLayout {
    /// Creates a layout.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLayout`] if the pixel field does not fit.
    pub fn new(stride: usize, index_offset: usize) -> Result<Self> {
        let layout = Self {
            stride,
            index_offset,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Checks that the pixel field lies inside the record.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLayout`] if the stride is zero or the
    /// field runs past the end of the record.
    pub fn validate(&self) -> Result<()> {
        if self.stride == 0 {
            return Err(Error::InvalidLayout("stride must be non-zero".into()));
        }
        match self.index_offset.checked_add(INDEX_FIELD_SIZE) {
            Some(end) if end <= self.stride => Ok(()),
            _ => Err(Error::InvalidLayout(format!(
                "pixel field at offset {} does not fit a {}-byte record",
                self.index_offset, self.stride
            ))),
        }
    }

    /// Reads the pixel index of one record.
    ///
    /// `record` must be at least `stride` bytes; guaranteed by the decoder.
    #[inline]
    fn read_index(&self, record: &[u8]) -> PixelIndex {
        let lo = record[self.index_offset];
        let hi = record[self.index_offset + 1];
        PixelIndex::from(u16::from_le_bytes([lo, hi]))
    }
}

/// Decodes message payloads into pixel indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordDecoder {
    layout: RecordLayout,
    expected_records: Option<usize>,
}

impl Default for RecordDecoder {
    fn default() -> Self {
        Self {
            layout: RecordLayout::default(),
            expected_records: Some(80_000),
        }
    }
}

impl RecordDecoder {
    /// Creates a decoder.
    ///
    /// `expected_records` is the record count each payload should carry;
    /// `None` decodes every whole record present.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLayout`] for a layout that fails validation.
    pub fn new(layout: RecordLayout, expected_records: Option<usize>) -> Result<Self> {
        layout.validate()?;
        Ok(Self {
            layout,
            expected_records,
        })
    }

    /// Record layout in use.
    #[must_use]
    pub fn layout(&self) -> RecordLayout {
        self.layout
    }

    /// Expected records per payload.
    #[must_use]
    pub fn expected_records(&self) -> Option<usize> {
        self.expected_records
    }

    /// Decodes a payload.
    ///
    /// Decodes `min(expected, len / stride)` records and reports any length
    /// mismatch through [`DecodedPayload::defect`]. Never reads past the
    /// end of `payload`.
    #[must_use]
    pub fn decode<'a>(&self, payload: &'a [u8]) -> DecodedPayload<'a> {
        let stride = self.layout.stride;
        let actual_bytes = payload.len();
        let whole = actual_bytes / stride;
        let ragged = actual_bytes % stride != 0;

        let (records, defect) = match self.expected_records {
            Some(expected) if whole < expected || ragged => {
                let records = whole.min(expected);
                let defect = PayloadDefect::Truncated {
                    expected_bytes: expected.saturating_mul(stride),
                    actual_bytes,
                    records,
                };
                (records, Some(defect))
            }
            Some(expected) if whole > expected => {
                let defect = PayloadDefect::Overlong {
                    expected_bytes: expected * stride,
                    actual_bytes,
                    ignored: whole - expected,
                };
                (expected, Some(defect))
            }
            Some(expected) => (expected, None),
            None if ragged => {
                let defect = PayloadDefect::Truncated {
                    expected_bytes: (whole + 1) * stride,
                    actual_bytes,
                    records: whole,
                };
                (whole, Some(defect))
            }
            None => (whole, None),
        };

        DecodedPayload {
            payload: &payload[..records * stride],
            layout: self.layout,
            records,
            defect,
        }
    }
}

/// Result of decoding one payload.
#[derive(Debug, Clone)]
pub struct DecodedPayload<'a> {
    payload: &'a [u8],
    layout: RecordLayout,
    records: usize,
    defect: Option<PayloadDefect>,
}

impl<'a> DecodedPayload<'a> {
    /// Number of indices [`Self::indices`] will yield.
    #[must_use]
    pub fn records(&self) -> usize {
        self.records
    }

    /// Length mismatch, if any.
    #[must_use]
    pub fn defect(&self) -> Option<&PayloadDefect> {
        self.defect.as_ref()
    }

    /// Returns true if the payload matched the expected size exactly.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.defect.is_none()
    }

    /// Lazily yields one pixel index per decoded record.
    #[must_use]
    pub fn indices(&self) -> PixelIndices<'a> {
        PixelIndices {
            records: self.payload.chunks_exact(self.layout.stride),
            layout: self.layout,
        }
    }

    /// Converts a length mismatch into an error.
    ///
    /// # Errors
    /// Returns [`Error::Payload`] if a defect was found.
    pub fn ensure_complete(&self) -> Result<()> {
        match &self.defect {
            Some(defect) => Err(defect.clone().into()),
            None => Ok(()),
        }
    }
}

/// Iterator over the pixel indices of a decoded payload.
#[derive(Debug, Clone)]
pub struct PixelIndices<'a> {
    records: ChunksExact<'a, u8>,
    layout: RecordLayout,
}

impl Iterator for PixelIndices<'_> {
    type Item = PixelIndex;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.records
            .next()
            .map(|record| self.layout.read_index(record))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl ExactSizeIterator for PixelIndices<'_> {}

impl FusedIterator for PixelIndices<'_> {}
