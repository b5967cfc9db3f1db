//! Monitor configuration files.
//!
//! Configuration is a JSON document with a single `monitor` section.
//! Any field left out keeps its default:
//!
//! ```json
//! {
//!   "monitor": {
//!     "grid": { "x": 8, "y": 48, "z": 16 },
//!     "layout": { "stride": 12, "index_offset": 4 },
//!     "records_per_message": 80000,
//!     "period": 5,
//!     "poll_timeout_ms": 50,
//!     "max_message_bytes": 52428800
//!   }
//! }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use gridmon_monitor::MonitorConfig;
use serde::Deserialize;

use crate::Result;

#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonConfig {
    monitor: MonitorConfig,
}

/// Loads and validates a configuration file.
///
/// # Errors
/// Returns an error if the file cannot be read, is not valid JSON, or
/// describes a configuration that fails validation.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MonitorConfig> {
    let file = File::open(path)?;
    let json: JsonConfig = serde_json::from_reader(BufReader::new(file))?;
    json.monitor.validate()?;
    Ok(json.monitor)
}

/// Parses and validates a configuration document.
///
/// # Errors
/// Returns an error if the document is not valid JSON or describes a
/// configuration that fails validation.
pub fn config_from_json(json: &str) -> Result<MonitorConfig> {
    let json: JsonConfig = serde_json::from_str(json)?;
    json.monitor.validate()?;
    Ok(json.monitor)
}
