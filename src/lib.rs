//! AEDAT Analyzer - windowing, activity and clustering for event-camera logs.
//!
//! This library turns the `(polarity, x, y, timestamp)` logs written by
//! event cameras into numeric arrays ready for plotting: per-window event
//! counts ("fingerprints"), polarity-signed activity of a pixel area
//! ("spikes"), pixel state transitions and spatial clusters.
//!
//! # Processing Model
//!
//! - **Single pass**: every stage pulls events lazily and stops reading as
//!   soon as its limits are reached
//! - **Fail fast**: the first malformed row ends the run with an error
//! - **No hidden state**: configuration is built once and passed in
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       AEDAT Analyzer                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Source    │──▶│  Windowing  │──▶│ Clustering  │       │
//! │  │ (csv reader)│   │ (µs bins)   │   │  (k-means)  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                 │                  │              │
//! │         ▼                 ▼                  ▼              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Activity / │   │  Metadata   │──▶│   Reports   │       │
//! │  │ Transitions │   │ (file name) │   │   (JSON)    │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use aedat_analyzer::{aggregate, AnalysisConfig, EventColumns, EventReader};
//!
//! let events = EventReader::open("sine_100mV_200Hz_45deg.csv", &EventColumns::default())?;
//! let fingerprint = aggregate(events, &AnalysisConfig::new(5000))?;
//! println!("{} windows, {} events", fingerprint.len(), fingerprint.total_events());
//! # Ok::<(), aedat_analyzer::AnalysisError>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod metadata;
pub mod report;
pub mod source;

// Re-export key types at crate root for convenience
pub use config::{
    max_windows_for_xlim, parse_reconstruction_window, AnalysisConfig, RecordingConfig,
};
pub use core::{
    aggregate, detect_transitions, extract_activity, find_clusters, get_activity_area,
    get_activity_global, ActivityPoint, ActivityQuery, Channel, ChunkStream, Clustering,
    EventChunk, Fingerprint, KMeansConfig, PixelArea, TimeWindow, WindowAggregator,
};
pub use error::{AnalysisError, ClusterError, Result};
pub use metadata::FileMetadata;
pub use report::ReportBuilder;
pub use source::{Event, EventColumns, EventReader, FingerprintReader};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
