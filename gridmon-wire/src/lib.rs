//! gridmon-wire: Hit record decoding.
//!
//! Message payloads are a sequence of fixed-stride hit records. Only one
//! two-byte field of each record is interpreted: the little-endian pixel
//! index, at record offset 4 in the default 12-byte layout.
//!
//! ```text
//! offset  0    4      6            12
//!         +----+------+------------+
//!         | .. | px16 | ..         |
//!         +----+------+------------+
//! ```
//!
//! # Key Components
//!
//! - [`RecordLayout`] - Record stride and pixel field position
//! - [`RecordDecoder`] - Bounds-checked payload decoder
//! - [`PayloadDefect`] - Length conditions reported alongside decoding

mod decoder;
mod error;

pub use decoder::{DecodedPayload, PixelIndices, RecordDecoder, RecordLayout};
pub use error::{Error, PayloadDefect, Result};

// Re-export core types for convenience
pub use gridmon_core::PixelIndex;
