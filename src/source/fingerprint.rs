//! Reader for pre-aggregated fingerprint files.
//!
//! These files hold one row per reconstruction window. The first three
//! columns are the ON, OFF and combined counts, in that order; the header
//! row is skipped and any further columns are ignored.

use crate::core::windowing::{window_bounds, TimeWindow};
use crate::error::{AnalysisError, Result};
use crate::source::reader::check_input_file;
use csv::{StringRecord, StringRecordsIntoIter, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// A single-pass iterator over the windows of a fingerprint file.
pub struct FingerprintReader<R> {
    records: StringRecordsIntoIter<R>,
    reconstruction_window: i64,
    max_windows: Option<usize>,
    next_index: u64,
    source: String,
    finished: bool,
}

impl FingerprintReader<File> {
    pub fn open(
        path: impl AsRef<Path>,
        reconstruction_window: i64,
        max_windows: Option<usize>,
    ) -> Result<Self> {
        let path = path.as_ref();
        check_input_file(path)?;

        let file = File::open(path)?;
        Self::with_source(
            file,
            reconstruction_window,
            max_windows,
            path.display().to_string(),
        )
    }
}

impl<R: Read> FingerprintReader<R> {
    pub fn from_reader(reader: R, reconstruction_window: i64, max_windows: Option<usize>) -> Result<Self> {
        Self::with_source(reader, reconstruction_window, max_windows, "<reader>".to_string())
    }

    fn with_source(
        reader: R,
        reconstruction_window: i64,
        max_windows: Option<usize>,
        source: String,
    ) -> Result<Self> {
        if reconstruction_window <= 0 {
            return Err(AnalysisError::Config(format!(
                "reconstruction window must be greater than 0, got {reconstruction_window}"
            )));
        }

        let records = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader)
            .into_records();

        Ok(Self {
            records,
            reconstruction_window,
            max_windows,
            next_index: 0,
            source,
            finished: false,
        })
    }

    fn parse_record(&self, record: &StringRecord) -> Result<TimeWindow> {
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.len() < 3 {
            return Err(AnalysisError::Format(format!(
                "{}: line {line} has {} column(s), expected on,off,both",
                self.source,
                record.len()
            )));
        }

        let count = |index: usize, name: &str| -> Result<u64> {
            let raw = record.get(index).unwrap_or_default();
            // Counts may be written as whole floats (`3.0`).
            raw.parse::<u64>()
                .ok()
                .or_else(|| {
                    raw.parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0)
                        .map(|v| v as u64)
                })
                .ok_or_else(|| {
                    AnalysisError::Format(format!(
                        "{}: line {line}: {name} count {raw:?} is not a non-negative integer",
                        self.source
                    ))
                })
        };

        let on = count(0, "on")?;
        let off = count(1, "off")?;
        let both = count(2, "both")?;
        if both != on + off {
            warn!(
                line,
                on, off, both, "combined count differs from on + off; using on + off"
            );
        }

        let (start, end) = window_bounds(0, self.next_index, self.reconstruction_window);
        Ok(TimeWindow::with_counts(self.next_index, start, end, on, off))
    }
}

impl<R: Read> Iterator for FingerprintReader<R> {
    type Item = Result<TimeWindow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self
            .max_windows
            .is_some_and(|max| self.next_index as usize >= max)
        {
            debug!(windows = self.next_index, "window limit reached");
            self.finished = true;
            return None;
        }

        let item = match self.records.next()? {
            Ok(record) => self.parse_record(&record),
            Err(e) => Err(AnalysisError::from(e)),
        };
        match item {
            Ok(window) => {
                self.next_index += 1;
                Some(Ok(window))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
