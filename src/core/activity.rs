//! Polarity-signed activity ("spike") series for a pixel neighbourhood.
//!
//! Consumption stops as soon as the time limit is passed or enough points
//! have been collected, so only the needed prefix of a large log is read.

use crate::core::windowing::MICROS_PER_SEC;
use crate::error::{AnalysisError, Result};
use crate::source::Event;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One ON (+1) or OFF (-1) event at a time relative to the first event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityPoint {
    pub polarity: i8,
    /// Microseconds since the first event of the stream
    pub elapsed: f64,
}

impl ActivityPoint {
    /// Project onto a 2-D point `(polarity, elapsed)` for clustering.
    pub fn as_point(&self) -> [f64; 2] {
        [self.polarity as f64, self.elapsed]
    }

    /// Elapsed time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed / MICROS_PER_SEC
    }
}

/// Square neighbourhood around a pixel. An event at `(x, y)` is inside when
/// both `|x - px|` and `|y - py|` are strictly less than `size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelArea {
    pub x: i32,
    pub y: i32,
    pub size: i32,
}

impl PixelArea {
    pub fn new(x: i32, y: i32, size: i32) -> Self {
        Self { x, y, size }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        (x as i64 - self.x as i64).abs() < self.size as i64
            && (y as i64 - self.y as i64).abs() < self.size as i64
    }
}

/// Filters applied while extracting activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityQuery {
    /// Spatial filter; `None` keeps every pixel
    pub area: Option<PixelArea>,
    /// Stop after this many points
    pub max_points: Option<usize>,
    /// Stop once an event is more than this many seconds after the first one
    pub time_limit_secs: Option<f64>,
    /// Flip y with this sensor height before the spatial test
    pub flip_height: Option<i32>,
}

impl ActivityQuery {
    /// Query for a single neighbourhood.
    pub fn area(x: i32, y: i32, size: i32) -> Self {
        Self {
            area: Some(PixelArea::new(x, y, size)),
            ..Self::default()
        }
    }

    /// Query over the whole sensor.
    pub fn global() -> Self {
        Self::default()
    }

    pub fn with_max_points(mut self, max_points: Option<usize>) -> Self {
        self.max_points = max_points;
        self
    }

    pub fn with_time_limit(mut self, time_limit_secs: Option<f64>) -> Self {
        self.time_limit_secs = time_limit_secs;
        self
    }

    pub fn with_flip(mut self, flip_height: Option<i32>) -> Self {
        self.flip_height = flip_height;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_points == Some(0) {
            return Err(AnalysisError::Argument(
                "max points must be greater than 0".to_string(),
            ));
        }
        if let Some(limit) = self.time_limit_secs {
            if !limit.is_finite() || limit < 0.0 {
                return Err(AnalysisError::Argument(format!(
                    "time limit must be a non-negative number of seconds, got {limit}"
                )));
            }
        }
        if let Some(area) = self.area {
            if area.size < 0 {
                return Err(AnalysisError::Argument(
                    "area size was negative, it should be a positive integer".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn time_limit_micros(&self) -> Option<f64> {
        self.time_limit_secs.map(|secs| secs * MICROS_PER_SEC)
    }
}

/// Collect the activity series described by `query`.
pub fn extract_activity<I>(events: I, query: &ActivityQuery) -> Result<Vec<ActivityPoint>>
where
    I: IntoIterator<Item = Result<Event>>,
{
    query.validate()?;
    let time_limit = query.time_limit_micros();

    let mut points = Vec::new();
    let mut first_timestamp = None;

    for event in events {
        let mut event = event?;
        let first = *first_timestamp.get_or_insert(event.timestamp);

        let elapsed = event.timestamp.saturating_sub(first) as f64;
        if time_limit.is_some_and(|limit| elapsed > limit) {
            debug!(elapsed, "time limit reached");
            break;
        }

        if let Some(height) = query.flip_height {
            event = event.flip_y(height);
        }
        if let Some(area) = query.area {
            if !area.contains(event.x, event.y) {
                continue;
            }
        }

        points.push(ActivityPoint {
            polarity: event.polarity_sign(),
            elapsed,
        });

        if query.max_points.is_some_and(|max| points.len() >= max) {
            debug!(points = points.len(), "point limit reached");
            break;
        }
    }

    Ok(points)
}

/// Activity of the neighbourhood around `(pixel_x, pixel_y)`.
pub fn get_activity_area<I>(
    events: I,
    pixel_x: i32,
    pixel_y: i32,
    area_size: i32,
    max_points: Option<usize>,
    time_limit_secs: Option<f64>,
) -> Result<Vec<ActivityPoint>>
where
    I: IntoIterator<Item = Result<Event>>,
{
    let query = ActivityQuery::area(pixel_x, pixel_y, area_size)
        .with_max_points(max_points)
        .with_time_limit(time_limit_secs);
    extract_activity(events, &query)
}

/// Activity of the whole sensor.
pub fn get_activity_global<I>(
    events: I,
    max_points: Option<usize>,
    time_limit_secs: Option<f64>,
) -> Result<Vec<ActivityPoint>>
where
    I: IntoIterator<Item = Result<Event>>,
{
    let query = ActivityQuery::global()
        .with_max_points(max_points)
        .with_time_limit(time_limit_secs);
    extract_activity(events, &query)
}
