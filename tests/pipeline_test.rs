//! Integration tests running the analysis stages over log files on disk

use aedat_analyzer::core::clustering::project_xy;
use aedat_analyzer::{
    aggregate, detect_transitions, find_clusters, get_activity_area, get_activity_global,
    parse_reconstruction_window, AnalysisConfig, AnalysisError, Channel, ChunkStream,
    EventColumns, EventReader, Fingerprint, FingerprintReader, KMeansConfig, PixelArea,
    RecordingConfig, ReportBuilder,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_log(dir: &TempDir, name: &str, rows: &[(u8, i32, i32, i64)]) -> PathBuf {
    let mut content = String::from("On/Off,X,Y,Timestamp\n");
    for (polarity, x, y, t) in rows {
        content.push_str(&format!("{polarity},{x},{y},{t}\n"));
    }
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write log");
    path
}

fn open(path: &Path) -> EventReader<fs::File> {
    EventReader::open(path, &EventColumns::default()).expect("Failed to open log")
}

#[test]
fn test_fingerprint_from_file() {
    let dir = TempDir::new().unwrap();
    let rows: Vec<(u8, i32, i32, i64)> = (0..100)
        .map(|i| ((i % 2) as u8, 5, 5, 1_000_000 + i as i64 * 250))
        .collect();
    let path = write_log(&dir, "sine_100mV_200Hz_45deg.csv", &rows);

    let fingerprint = aggregate(open(&path), &AnalysisConfig::new(1000)).unwrap();

    // 100 events spaced 250µs apart span 25 windows of 1000µs.
    assert_eq!(fingerprint.len(), 25);
    assert_eq!(fingerprint.total_events(), 100);
    assert!(fingerprint.channel(Channel::All).iter().all(|&c| c == 4));
    assert!(fingerprint.channel(Channel::On).iter().all(|&c| c == 2));

    let report = ReportBuilder::new(&path).fingerprint(&fingerprint);
    assert_eq!(report.header.metadata.voltage, "0.1");
    assert!(report.channels[2]
        .title
        .starts_with("sine 0.1 200 45 Degrees Polarized All Events"));
}

#[test]
fn test_fingerprint_from_json_config_and_xlim() {
    let dir = TempDir::new().unwrap();
    let rows: Vec<(u8, i32, i32, i64)> = (0..50).map(|i| (1, 0, 0, i as i64 * 100)).collect();
    let path = write_log(&dir, "square_10hz.csv", &rows);

    let config_path = dir.path().join("recording.json");
    RecordingConfig {
        reconstruction_window: 500,
        sensor_height: None,
    }
    .save(&config_path)
    .unwrap();

    let window = parse_reconstruction_window(config_path.to_str().unwrap()).unwrap();
    assert_eq!(window, 500);

    let max_windows = aedat_analyzer::max_windows_for_xlim(0.002, window).unwrap();
    assert_eq!(max_windows, 4);

    let config = AnalysisConfig::new(window).with_max_windows(Some(max_windows));
    let fingerprint = aggregate(open(&path), &config).unwrap();
    assert_eq!(fingerprint.all, vec![5, 5, 5, 5]);
}

#[test]
fn test_summary_file_matches_raw_aggregation() {
    let dir = TempDir::new().unwrap();
    let rows = [(1, 0, 0, 0), (0, 0, 0, 10), (1, 0, 0, 150), (1, 0, 0, 420)];
    let path = write_log(&dir, "raw.csv", &rows);
    let raw = aggregate(open(&path), &AnalysisConfig::new(100)).unwrap();

    let summary_path = dir.path().join("summary.csv");
    let mut summary = String::from("on,off,both\n");
    for i in 0..raw.len() {
        summary.push_str(&format!("{},{},{}\n", raw.on[i], raw.off[i], raw.all[i]));
    }
    fs::write(&summary_path, summary).unwrap();

    let reader = FingerprintReader::open(&summary_path, 100, None).unwrap();
    let from_summary = Fingerprint::collect(100, reader).unwrap();

    assert_eq!(from_summary, raw);
}

#[test]
fn test_activity_worked_example() {
    let dir = TempDir::new().unwrap();
    let path = write_log(
        &dir,
        "example.csv",
        &[(1, 10, 10, 0), (0, 10, 10, 500), (1, 50, 50, 1000)],
    );

    let points = get_activity_area(open(&path), 10, 10, 5, None, None).unwrap();
    let pairs: Vec<(i8, f64)> = points.iter().map(|p| (p.polarity, p.elapsed)).collect();
    assert_eq!(pairs, vec![(1, 0.0), (-1, 500.0)]);

    let all = get_activity_global(open(&path), None, None).unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn test_activity_filters_are_monotone() {
    let dir = TempDir::new().unwrap();
    let rows: Vec<(u8, i32, i32, i64)> = (0..200)
        .map(|i| ((i % 3 == 0) as u8, i % 20, (i / 20) as i32, i as i64 * 10))
        .collect();
    let path = write_log(&dir, "grid.csv", &rows);

    let unbounded = get_activity_area(open(&path), 10, 5, 4, None, None).unwrap();
    let limited = get_activity_area(open(&path), 10, 5, 4, None, Some(0.001)).unwrap();
    let capped = get_activity_area(open(&path), 10, 5, 4, Some(3), None).unwrap();

    assert!(limited.len() <= unbounded.len());
    assert_eq!(limited[..], unbounded[..limited.len()]);
    assert_eq!(capped[..], unbounded[..3]);
    assert!(limited.iter().all(|p| p.elapsed <= 1000.0));
}

#[test]
fn test_density_over_file() {
    let dir = TempDir::new().unwrap();
    let path = write_log(
        &dir,
        "density.csv",
        &[(1, 3, 3, 0), (1, 3, 3, 100), (0, 3, 4, 2000), (1, 3, 3, 5000)],
    );

    let transitions = detect_transitions(open(&path), PixelArea::new(3, 3, 2), None).unwrap();
    assert_eq!(transitions.change_times_ms, vec![0.0, 2.0, 5.0]);
    assert_eq!(transitions.redundancies, 1);
    assert_eq!(transitions.summary().mean_interval_ms, Some(2.5));
}

#[test]
fn test_cluster_one_window() {
    let dir = TempDir::new().unwrap();
    let mut rows = Vec::new();
    for i in 0..10 {
        rows.push((1, 10 + i % 2, 10, i as i64));
        rows.push((0, 90, 90 + i % 2, i as i64));
    }
    rows.push((1, 0, 0, 5000));
    let path = write_log(&dir, "blobs.csv", &rows);

    let chunk = ChunkStream::new(open(&path), 1000, Some(1))
        .unwrap()
        .next()
        .unwrap()
        .unwrap();
    assert_eq!(chunk.events.len(), 20);

    let points = project_xy(&chunk.events);
    let clustering = find_clusters(&points, &KMeansConfig::new(2)).unwrap();
    assert!(clustering.converged);
    let mut sizes = clustering.sizes();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![10, 10]);
}

#[test]
fn test_missing_column_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(&path, "On/Off,X,Timestamp\n1,1,1\n").unwrap();

    match EventReader::open(&path, &EventColumns::default()) {
        Err(AnalysisError::Format(msg)) => assert!(msg.contains("Y")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("missing column should be rejected"),
    }
}

#[test]
fn test_bad_reconstruction_window_argument() {
    let dir = TempDir::new().unwrap();
    let not_json = dir.path().join("window.txt");
    fs::write(&not_json, "1000").unwrap();

    assert!(matches!(
        parse_reconstruction_window(not_json.to_str().unwrap()),
        Err(AnalysisError::Config(_))
    ));
    assert!(matches!(
        parse_reconstruction_window("-5"),
        Err(AnalysisError::Config(_))
    ));
}
