//! Core analysis stages.
//!
//! This module contains:
//! - Fixed-width windowing of event streams into count fingerprints
//! - Activity (spike) extraction for a pixel neighbourhood
//! - Pixel state transitions (event density)
//! - k-means clustering of event chunks
//! - Curve transforms used to prepare distributions for plotting

pub mod activity;
pub mod clustering;
pub mod curves;
pub mod transitions;
pub mod windowing;

// Re-export commonly used types
pub use activity::{
    extract_activity, get_activity_area, get_activity_global, ActivityPoint, ActivityQuery,
    PixelArea,
};
pub use clustering::{find_clusters, Clustering, KMeansConfig, Point};
pub use curves::{gaussian_profile, Curve, NormalFit};
pub use transitions::{detect_transitions, PixelTransitions, TransitionSummary};
pub use windowing::{
    aggregate, Channel, ChunkStream, EventChunk, Fingerprint, TimeWindow, WindowAggregator,
    WindowStream,
};
