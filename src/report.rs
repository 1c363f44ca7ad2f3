//! Serialisable output artifacts.
//!
//! Each analysis produces one report: a header describing where the data
//! came from plus the numeric arrays a renderer needs. Reports are plain
//! data; drawing them is left to external tooling.

use crate::core::activity::{ActivityPoint, ActivityQuery, PixelArea};
use crate::core::clustering::{Clustering, KMeansConfig, Point};
use crate::core::curves::{
    gaussian_profile, Curve, DEFAULT_BINS, DEFAULT_PADDING, DEFAULT_TAIL_THRESHOLD,
};
use crate::core::transitions::{PixelTransitions, TransitionSummary};
use crate::core::windowing::{Channel, Fingerprint, TimeWindow};
use crate::metadata::FileMetadata;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Version of the report layout.
pub const REPORT_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "aedat-analyzer";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
}

/// Provenance shared by every report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportHeader {
    pub report_version: String,
    /// When the report was computed (RFC3339)
    pub generated_at_utc: String,
    pub producer: Producer,
    /// Input file the data was read from
    pub source: String,
    /// Attributes inferred from the input file name
    pub metadata: FileMetadata,
}

/// One count channel of a fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSeries {
    pub channel: Channel,
    pub title: String,
    pub counts: Vec<u64>,
    /// Normal profile fitted to the count distribution, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Curve>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintReport {
    pub header: ReportHeader,
    pub reconstruction_window: i64,
    pub index: Vec<u64>,
    pub time_secs: Vec<f64>,
    pub channels: Vec<ChannelSeries>,
    pub total_events: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpikeReport {
    pub header: ReportHeader,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<PixelArea>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit_secs: Option<f64>,
    pub on_events: usize,
    pub off_events: usize,
    pub points: Vec<ActivityPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityReport {
    pub header: ReportHeader,
    /// Stem for artifacts derived from this report
    pub stem: String,
    pub area: PixelArea,
    pub summary: TransitionSummary,
    pub transitions: PixelTransitions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterReport {
    pub header: ReportHeader,
    pub window: TimeWindow,
    pub k: usize,
    pub seed: u64,
    pub points: Vec<Point>,
    pub clustering: Clustering,
    pub cluster_sizes: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataReport {
    pub file_name: String,
    pub metadata: FileMetadata,
    pub ambiguous: bool,
    pub spike_title: String,
}

/// Builds reports for a single input file.
pub struct ReportBuilder {
    source: String,
    metadata: FileMetadata,
}

impl ReportBuilder {
    /// Create a builder for `source`, inferring metadata from its file stem.
    pub fn new(source: impl AsRef<Path>) -> Self {
        let path = source.as_ref();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            source: path.display().to_string(),
            metadata: FileMetadata::from_file_name(&stem),
        }
    }

    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    fn header(&self) -> ReportHeader {
        ReportHeader {
            report_version: REPORT_VERSION.to_string(),
            generated_at_utc: Utc::now().to_rfc3339(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            source: self.source.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Fingerprint report with one series per channel (OFF, ON, All).
    pub fn fingerprint(&self, fingerprint: &Fingerprint) -> FingerprintReport {
        let channels = Channel::ALL
            .iter()
            .map(|&channel| {
                let counts = fingerprint.channel(channel).to_vec();
                let samples: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
                let profile = match gaussian_profile(
                    &samples,
                    DEFAULT_BINS,
                    DEFAULT_PADDING,
                    DEFAULT_TAIL_THRESHOLD,
                ) {
                    Ok(curve) => Some(curve),
                    Err(e) => {
                        debug!(channel = channel.label(), error = %e, "no profile for channel");
                        None
                    }
                };
                ChannelSeries {
                    channel,
                    title: self
                        .metadata
                        .fingerprint_title(channel.label(), fingerprint.reconstruction_window),
                    counts,
                    profile,
                }
            })
            .collect();

        FingerprintReport {
            header: self.header(),
            reconstruction_window: fingerprint.reconstruction_window,
            index: fingerprint.index.clone(),
            time_secs: fingerprint.time_secs.clone(),
            channels,
            total_events: fingerprint.total_events(),
        }
    }

    /// Spike report; `title` overrides the title inferred from the file name.
    pub fn spike(
        &self,
        query: &ActivityQuery,
        points: Vec<ActivityPoint>,
        title: Option<String>,
    ) -> SpikeReport {
        let on_events = points.iter().filter(|p| p.polarity > 0).count();
        SpikeReport {
            header: self.header(),
            title: title.unwrap_or_else(|| self.metadata.spike_title()),
            area: query.area,
            time_limit_secs: query.time_limit_secs,
            on_events,
            off_events: points.len() - on_events,
            points,
        }
    }

    pub fn density(&self, area: PixelArea, transitions: PixelTransitions) -> DensityReport {
        DensityReport {
            header: self.header(),
            stem: self.metadata.density_stem(),
            area,
            summary: transitions.summary(),
            transitions,
        }
    }

    pub fn cluster(
        &self,
        window: TimeWindow,
        config: &KMeansConfig,
        points: Vec<Point>,
        clustering: Clustering,
    ) -> ClusterReport {
        ClusterReport {
            header: self.header(),
            window,
            k: config.k,
            seed: config.seed,
            cluster_sizes: clustering.sizes(),
            points,
            clustering,
        }
    }
}

/// Describe what a file name reveals about its recording.
pub fn metadata_report(file_name: &str) -> MetadataReport {
    let metadata = FileMetadata::from_file_name(file_name);
    MetadataReport {
        file_name: file_name.to_string(),
        ambiguous: metadata.is_ambiguous(),
        spike_title: metadata.spike_title(),
        metadata,
    }
}
