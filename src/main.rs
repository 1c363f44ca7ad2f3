//! AEDAT Analyzer CLI
//!
//! Turns event-camera logs into JSON reports for plotting.

use aedat_analyzer::{
    core::clustering::project_xy,
    detect_transitions, extract_activity, find_clusters, max_windows_for_xlim,
    parse_reconstruction_window,
    report::{metadata_report, ReportBuilder},
    ActivityQuery, AnalysisConfig, AnalysisError, ChunkStream, EventColumns, EventReader,
    Fingerprint, FingerprintReader, KMeansConfig, PixelArea, VERSION,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aedat-analyzer")]
#[command(version = VERSION)]
#[command(about = "Windowing, activity and clustering for event-camera logs", long_about = None)]
struct Cli {
    /// Write the JSON report to this file instead of stdout
    #[arg(long, short, global = true)]
    output: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-window ON/OFF/All event counts
    Fingerprint {
        /// Event log (or summary file with --summary)
        csv: PathBuf,

        /// Reconstruction window in µs, or a recording config .json
        reconstruction_window: String,

        /// Only cover the first S seconds of the recording
        #[arg(long)]
        plot_xlim: Option<f64>,

        /// Input holds pre-aggregated on,off,both rows
        #[arg(long)]
        summary: bool,
    },

    /// Polarity-signed activity of a pixel area
    #[command(allow_negative_numbers = true)]
    Spike {
        csv: PathBuf,

        /// Pixel column
        #[arg(short = 'x', long)]
        pixel_x: Option<i32>,

        /// Pixel row
        #[arg(short = 'y', long)]
        pixel_y: Option<i32>,

        /// Half-width of the square area around the pixel
        #[arg(short = 'a', long)]
        area_size: Option<i32>,

        /// Stop after this many seconds of recording
        #[arg(long)]
        time_limit: Option<f64>,

        /// Stop after this many points
        #[arg(long)]
        max_points: Option<usize>,

        /// Plot title (inferred from the file name otherwise)
        #[arg(long)]
        title: Option<String>,

        /// Use every pixel instead of an area
        #[arg(long)]
        global: bool,

        /// Flip y into screen orientation before the area test
        #[arg(long)]
        flip_y: bool,

        /// Sensor height used by --flip-y
        #[arg(long, default_value_t = aedat_analyzer::source::DEFAULT_SENSOR_HEIGHT)]
        sensor_height: i32,
    },

    /// State changes of a pixel area
    #[command(allow_negative_numbers = true)]
    Density {
        csv: PathBuf,

        #[arg(short = 'x', long)]
        pixel_x: i32,

        #[arg(short = 'y', long)]
        pixel_y: i32,

        #[arg(short = 'a', long)]
        area_size: i32,

        /// Stop after this many state changes
        #[arg(long)]
        max_plot_points: Option<usize>,
    },

    /// k-means clusters of the events in one window
    Cluster {
        csv: PathBuf,

        /// Reconstruction window in µs, or a recording config .json
        reconstruction_window: String,

        /// Number of clusters
        #[arg(short, long)]
        k: usize,

        /// Seed for initial centre selection
        #[arg(long, default_value_t = aedat_analyzer::core::clustering::DEFAULT_SEED)]
        seed: u64,

        /// Index of the window to cluster
        #[arg(long, default_value_t = 0)]
        window: u64,

        #[arg(long, default_value_t = aedat_analyzer::core::clustering::DEFAULT_MAX_ITERATIONS)]
        max_iterations: usize,
    },

    /// Show what a file name reveals about its recording
    Metadata {
        /// File name (or path) to inspect
        name: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = cli.output.as_deref();
    let result = match cli.command {
        Commands::Fingerprint {
            csv,
            reconstruction_window,
            plot_xlim,
            summary,
        } => cmd_fingerprint(&csv, &reconstruction_window, plot_xlim, summary, output),
        Commands::Spike {
            csv,
            pixel_x,
            pixel_y,
            area_size,
            time_limit,
            max_points,
            title,
            global,
            flip_y,
            sensor_height,
        } => {
            let flip_height = flip_y.then_some(sensor_height);
            spike_query(global, pixel_x, pixel_y, area_size)
                .map_err(anyhow::Error::from)
                .and_then(|query| {
                    let query = query
                        .with_max_points(max_points)
                        .with_time_limit(time_limit)
                        .with_flip(flip_height);
                    cmd_spike(&csv, &query, title, output)
                })
        }
        Commands::Density {
            csv,
            pixel_x,
            pixel_y,
            area_size,
            max_plot_points,
        } => cmd_density(&csv, pixel_x, pixel_y, area_size, max_plot_points, output),
        Commands::Cluster {
            csv,
            reconstruction_window,
            k,
            seed,
            window,
            max_iterations,
        } => {
            let config = KMeansConfig::new(k)
                .with_seed(seed)
                .with_max_iterations(max_iterations);
            cmd_cluster(&csv, &reconstruction_window, window, &config, output)
        }
        Commands::Metadata { name } => cmd_metadata(&name, output),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_fingerprint(
    csv: &Path,
    reconstruction_window: &str,
    plot_xlim: Option<f64>,
    summary: bool,
    output: Option<&Path>,
) -> Result<()> {
    let window = parse_reconstruction_window(reconstruction_window)?;
    let max_windows = plot_xlim
        .map(|xlim| max_windows_for_xlim(xlim, window))
        .transpose()?;
    let config = AnalysisConfig::new(window).with_max_windows(max_windows);
    config.validate()?;

    let builder = ReportBuilder::new(csv);
    warn_if_ambiguous(&builder, csv);

    let fingerprint = if summary {
        let reader = FingerprintReader::open(csv, window, max_windows)?;
        Fingerprint::collect(window, reader)?
    } else {
        let events = EventReader::open(csv, &EventColumns::default())?;
        aedat_analyzer::aggregate(events, &config)?
    };
    info!(
        windows = fingerprint.len(),
        events = fingerprint.total_events(),
        reconstruction_window = window,
        "fingerprint computed"
    );

    write_json(&builder.fingerprint(&fingerprint), output)
}

fn spike_query(
    global: bool,
    pixel_x: Option<i32>,
    pixel_y: Option<i32>,
    area_size: Option<i32>,
) -> std::result::Result<ActivityQuery, AnalysisError> {
    if global {
        return Ok(ActivityQuery::global());
    }
    match (pixel_x, pixel_y, area_size) {
        (Some(x), Some(y), Some(size)) => {
            let area = checked_area(x, y, size)?;
            Ok(ActivityQuery::area(area.x, area.y, area.size))
        }
        _ => Err(AnalysisError::Argument(
            "an area needs -x, -y and -a (or use --global)".to_string(),
        )),
    }
}

fn checked_area(x: i32, y: i32, size: i32) -> std::result::Result<PixelArea, AnalysisError> {
    if x < 0 || y < 0 {
        return Err(AnalysisError::Argument(
            "pixel coordinates were negative, they should be positive integers".to_string(),
        ));
    }
    if size < 0 {
        return Err(AnalysisError::Argument(
            "area size was negative, it should be a positive integer".to_string(),
        ));
    }
    Ok(PixelArea::new(x, y, size))
}

fn cmd_spike(
    csv: &Path,
    query: &ActivityQuery,
    title: Option<String>,
    output: Option<&Path>,
) -> Result<()> {
    let builder = ReportBuilder::new(csv);
    if title.is_none() {
        warn_if_ambiguous(&builder, csv);
    }

    let events = EventReader::open(csv, &EventColumns::default())?;
    let points = extract_activity(events, query)?;
    info!(points = points.len(), "activity extracted");

    write_json(&builder.spike(query, points, title), output)
}

fn cmd_density(
    csv: &Path,
    pixel_x: i32,
    pixel_y: i32,
    area_size: i32,
    max_changes: Option<usize>,
    output: Option<&Path>,
) -> Result<()> {
    let area = checked_area(pixel_x, pixel_y, area_size)?;
    let builder = ReportBuilder::new(csv);

    let events = EventReader::open(csv, &EventColumns::default())?;
    let transitions = detect_transitions(events, area, max_changes)?;
    let report = builder.density(area, transitions);
    info!(
        changes = report.summary.changes,
        redundancies = report.summary.redundancies,
        mean_interval_ms = ?report.summary.mean_interval_ms,
        "transitions detected"
    );

    write_json(&report, output)
}

fn cmd_cluster(
    csv: &Path,
    reconstruction_window: &str,
    window_index: u64,
    config: &KMeansConfig,
    output: Option<&Path>,
) -> Result<()> {
    let window = parse_reconstruction_window(reconstruction_window)?;
    let builder = ReportBuilder::new(csv);

    let events = EventReader::open(csv, &EventColumns::default())?;
    let limit = usize::try_from(window_index)
        .ok()
        .and_then(|i| i.checked_add(1))
        .context("window index is too large")?;
    let mut chunks = ChunkStream::new(events, window, Some(limit))?;

    let mut seen = 0u64;
    let chunk = loop {
        match chunks.next().transpose()? {
            Some(chunk) if chunk.window.index == window_index => break chunk,
            Some(_) => seen += 1,
            None => {
                return Err(AnalysisError::Argument(format!(
                    "window {window_index} does not exist, the recording has {seen} window(s)"
                ))
                .into())
            }
        }
    };

    let points = project_xy(&chunk.events);
    let clustering = find_clusters(&points, config)?;
    info!(
        window = window_index,
        points = points.len(),
        iterations = clustering.iterations,
        converged = clustering.converged,
        "clusters found"
    );

    write_json(&builder.cluster(chunk.window, config, points, clustering), output)
}

fn cmd_metadata(name: &str, output: Option<&Path>) -> Result<()> {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    write_json(&metadata_report(&stem), output)
}

fn warn_if_ambiguous(builder: &ReportBuilder, csv: &Path) {
    if builder.metadata().is_ambiguous() {
        warn!(
            file = %csv.display(),
            "no frequency or polarizer angle in the file name, titles may be uninformative"
        );
    }
}

fn write_json<T: Serialize>(report: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("could not serialize report")?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("could not write {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
