//! Fixed-width time windowing of ordered event streams.
//!
//! Events are bucketed into contiguous, non-overlapping reconstruction
//! windows measured from the first event's timestamp. Windows that receive
//! no events are still emitted (with zero counts), so the output index range
//! is always gap-free.

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::source::Event;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Microseconds per second.
pub const MICROS_PER_SEC: f64 = 1_000_000.0;

/// A reconstruction window with per-polarity event counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Position of the window in the run, starting at 0
    pub index: u64,
    /// Start timestamp (inclusive, µs)
    pub start: i64,
    /// End timestamp (exclusive, µs)
    pub end: i64,
    /// ON events in this window
    pub count_on: u64,
    /// OFF events in this window
    pub count_off: u64,
    /// All events in this window (`count_on + count_off`)
    pub count_all: u64,
}

impl TimeWindow {
    /// Create an empty window covering `[start, end)`.
    pub fn new(index: u64, start: i64, end: i64) -> Self {
        Self {
            index,
            start,
            end,
            count_on: 0,
            count_off: 0,
            count_all: 0,
        }
    }

    /// Create a window from already aggregated counts.
    pub fn with_counts(index: u64, start: i64, end: i64, count_on: u64, count_off: u64) -> Self {
        Self {
            index,
            start,
            end,
            count_on,
            count_off,
            count_all: count_on + count_off,
        }
    }

    /// Check if a timestamp falls within this window.
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Count one event.
    pub fn record(&mut self, on: bool) {
        if on {
            self.count_on += 1;
        } else {
            self.count_off += 1;
        }
        self.count_all += 1;
    }

    /// Check if the window has any events.
    pub fn is_empty(&self) -> bool {
        self.count_all == 0
    }

    /// Get the duration of this window in seconds.
    pub fn duration_secs(&self) -> f64 {
        (self.end - self.start) as f64 / MICROS_PER_SEC
    }
}

/// A window together with the events that fell into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventChunk {
    pub window: TimeWindow,
    pub events: Vec<Event>,
}

/// Something that can be filled with the events of one window.
pub trait WindowBucket {
    /// Create an empty bucket for window `index` covering `[start, end)`.
    fn open(index: u64, start: i64, end: i64) -> Self;

    /// Fold one event into the bucket.
    fn add_event(&mut self, event: Event);

    /// Index of the window this bucket covers.
    fn index(&self) -> u64;
}

impl WindowBucket for TimeWindow {
    fn open(index: u64, start: i64, end: i64) -> Self {
        TimeWindow::new(index, start, end)
    }

    fn add_event(&mut self, event: Event) {
        self.record(event.on);
    }

    fn index(&self) -> u64 {
        self.index
    }
}

impl WindowBucket for EventChunk {
    fn open(index: u64, start: i64, end: i64) -> Self {
        Self {
            window: TimeWindow::new(index, start, end),
            events: Vec::new(),
        }
    }

    fn add_event(&mut self, event: Event) {
        self.window.record(event.on);
        self.events.push(event);
    }

    fn index(&self) -> u64 {
        self.window.index
    }
}

/// Buckets an ordered event stream into fixed-width windows.
///
/// The stream is pulled lazily. A window is emitted as soon as the first
/// event of a later window arrives (or the input ends); skipped windows are
/// emitted empty. With `max_windows` set, input consumption stops once that
/// many windows have been produced.
pub struct WindowStream<I, B> {
    /// Source of events, assumed time-ordered
    events: I,
    /// Width of each window in microseconds
    width: i64,
    /// Optional bound on emitted windows
    max_windows: Option<usize>,
    /// Timestamp of the first event
    origin: Option<i64>,
    /// Window currently being filled
    current: Option<B>,
    /// Event read ahead that belongs to a later window
    carry: Option<Event>,
    /// Index the next opened window receives
    next_index: u64,
    /// Number of windows emitted so far
    emitted: usize,
    finished: bool,
}

/// Produces [`TimeWindow`] counts.
pub type WindowAggregator<I> = WindowStream<I, TimeWindow>;

/// Produces [`EventChunk`]s holding each window's events.
pub type ChunkStream<I> = WindowStream<I, EventChunk>;

impl<I, B> WindowStream<I, B>
where
    I: Iterator<Item = Result<Event>>,
    B: WindowBucket,
{
    /// Create a new window stream.
    ///
    /// Fails with a config error when `reconstruction_window <= 0`; the event
    /// stream is not touched in that case.
    pub fn new(events: I, reconstruction_window: i64, max_windows: Option<usize>) -> Result<Self> {
        if reconstruction_window <= 0 {
            return Err(AnalysisError::Config(format!(
                "reconstruction window must be greater than 0, got {reconstruction_window}"
            )));
        }

        Ok(Self {
            events,
            width: reconstruction_window,
            max_windows,
            origin: None,
            current: None,
            carry: None,
            next_index: 0,
            emitted: 0,
            finished: false,
        })
    }

    /// Create a window stream from the run configuration.
    pub fn from_config(events: I, config: &AnalysisConfig) -> Result<Self> {
        Self::new(events, config.reconstruction_window, config.max_windows)
    }

    /// Get the number of windows emitted so far.
    pub fn windows_emitted(&self) -> usize {
        self.emitted
    }

    /// Timestamp all window boundaries are measured from, once known.
    pub fn origin(&self) -> Option<i64> {
        self.origin
    }

    fn window_index(&self, origin: i64, timestamp: i64) -> u64 {
        let offset = timestamp.saturating_sub(origin);
        if offset < 0 {
            0
        } else {
            (offset / self.width) as u64
        }
    }

    fn close_current(&mut self) -> Option<B> {
        let window = self.current.take()?;
        self.next_index = window.index() + 1;
        self.emitted += 1;
        Some(window)
    }
}

impl<I, B> Iterator for WindowStream<I, B>
where
    I: Iterator<Item = Result<Event>>,
    B: WindowBucket,
{
    type Item = Result<B>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.max_windows.is_some_and(|max| self.emitted >= max) {
            debug!(windows = self.emitted, "window limit reached");
            self.finished = true;
            return None;
        }

        loop {
            let event = match self.carry.take() {
                Some(event) => event,
                None => match self.events.next() {
                    Some(Ok(event)) => event,
                    Some(Err(e)) => {
                        self.finished = true;
                        return Some(Err(e));
                    }
                    None => {
                        self.finished = true;
                        return self.close_current().map(Ok);
                    }
                },
            };

            let origin = *self.origin.get_or_insert(event.timestamp);
            let index = self.window_index(origin, event.timestamp);

            let (width, next_index) = (self.width, self.next_index);
            let current = self.current.get_or_insert_with(|| {
                let (start, end) = window_bounds(origin, next_index, width);
                B::open(next_index, start, end)
            });

            let open_index = current.index();
            if index <= open_index {
                if index < open_index {
                    // Timestamp went backwards; keep the event so counts are conserved.
                    debug!(
                        timestamp = event.timestamp,
                        window = open_index,
                        "out-of-order event folded into open window"
                    );
                }
                current.add_event(event);
                continue;
            }

            self.carry = Some(event);
            return self.close_current().map(Ok);
        }
    }
}

/// Bounds of window `index`. Bounds past the `i64` range are clamped to it.
pub(crate) fn window_bounds(origin: i64, index: u64, width: i64) -> (i64, i64) {
    let offset = i64::try_from(index)
        .unwrap_or(i64::MAX)
        .saturating_mul(width);
    let start = origin.saturating_add(offset);
    (start, start.saturating_add(width))
}

/// Which count series of a fingerprint to look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    On,
    Off,
    All,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Off, Channel::On, Channel::All];

    /// Label used in plot titles.
    pub fn label(&self) -> &'static str {
        match self {
            Channel::On => "ON",
            Channel::Off => "OFF",
            Channel::All => "All",
        }
    }
}

/// Parallel arrays describing a windowed run, ready for plotting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Width of each window in microseconds
    pub reconstruction_window: i64,
    /// Window indices, `0..len`
    pub index: Vec<u64>,
    /// Window start relative to the first event, in seconds
    pub time_secs: Vec<f64>,
    pub on: Vec<u64>,
    pub off: Vec<u64>,
    pub all: Vec<u64>,
}

impl Fingerprint {
    pub fn new(reconstruction_window: i64) -> Self {
        Self {
            reconstruction_window,
            ..Self::default()
        }
    }

    /// Gather a window sequence into parallel arrays, stopping at the first error.
    pub fn collect<W>(reconstruction_window: i64, windows: W) -> Result<Self>
    where
        W: IntoIterator<Item = Result<TimeWindow>>,
    {
        let mut fingerprint = Self::new(reconstruction_window);
        for window in windows {
            fingerprint.push(&window?);
        }
        Ok(fingerprint)
    }

    /// Append one window.
    pub fn push(&mut self, window: &TimeWindow) {
        self.index.push(window.index);
        self.time_secs
            .push(window.index as f64 * self.reconstruction_window as f64 / MICROS_PER_SEC);
        self.on.push(window.count_on);
        self.off.push(window.count_off);
        self.all.push(window.count_all);
    }

    /// Get the count series for one channel.
    pub fn channel(&self, channel: Channel) -> &[u64] {
        match channel {
            Channel::On => &self.on,
            Channel::Off => &self.off,
            Channel::All => &self.all,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Total number of events counted across all windows.
    pub fn total_events(&self) -> u64 {
        self.all.iter().sum()
    }
}

/// Aggregate an event stream into a fingerprint in one call.
pub fn aggregate<I>(events: I, config: &AnalysisConfig) -> Result<Fingerprint>
where
    I: Iterator<Item = Result<Event>>,
{
    let aggregator = WindowAggregator::from_config(events, config)?;
    Fingerprint::collect(config.reconstruction_window, aggregator)
}
