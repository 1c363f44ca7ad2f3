//! Event log input.
//!
//! - [`EventReader`] streams raw events from a comma-separated log
//! - [`FingerprintReader`] streams pre-aggregated per-window counts

pub mod fingerprint;
pub mod reader;
pub mod types;

pub use fingerprint::FingerprintReader;
pub use reader::{check_input_file, EventReader};
pub use types::{parse_polarity, Event, EventColumns, DEFAULT_SENSOR_HEIGHT};
