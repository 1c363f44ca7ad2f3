//! Streaming reader for comma-separated event logs.
//!
//! The header is validated up front; rows are parsed lazily, one per
//! `next()` call, so callers that only need a prefix of a large log never
//! read the rest of it.

use crate::error::{AnalysisError, Result};
use crate::source::types::{parse_polarity, Event, EventColumns};
use csv::{StringRecord, StringRecordsIntoIter, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Resolved positions of the required columns within a row.
#[derive(Debug, Clone, Copy)]
struct ColumnLayout {
    polarity: usize,
    x: usize,
    y: usize,
    timestamp: usize,
}

/// A single-pass iterator over the events of a log.
pub struct EventReader<R> {
    records: StringRecordsIntoIter<R>,
    layout: ColumnLayout,
    source: String,
    finished: bool,
}

impl EventReader<File> {
    /// Open an event log on disk.
    pub fn open(path: impl AsRef<Path>, columns: &EventColumns) -> Result<Self> {
        let path = path.as_ref();
        check_input_file(path)?;

        let file = File::open(path)?;
        Self::with_source(file, columns, path.display().to_string())
    }
}

impl<R: Read> EventReader<R> {
    /// Read events from any byte source, e.g. an in-memory buffer.
    pub fn from_reader(reader: R, columns: &EventColumns) -> Result<Self> {
        Self::with_source(reader, columns, "<reader>".to_string())
    }

    fn with_source(reader: R, columns: &EventColumns, source: String) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::Headers)
            .from_reader(reader);

        let header = csv_reader.headers()?.clone();
        let layout = resolve_layout(&header, columns, &source)?;
        debug!(source = %source, ?layout, "event log header validated");

        Ok(Self {
            records: csv_reader.into_records(),
            layout,
            source,
            finished: false,
        })
    }

    /// Name of the underlying source, used in error messages.
    pub fn source(&self) -> &str {
        &self.source
    }

    fn parse_record(&self, record: &StringRecord) -> Result<Event> {
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let on = parse_polarity(self.cell(record, self.layout.polarity, "polarity", line)?);
        let x = self.coordinate(record, self.layout.x, "x", line)?;
        let y = self.coordinate(record, self.layout.y, "y", line)?;
        let timestamp = self.integer(record, self.layout.timestamp, "timestamp", line)?;

        Ok(Event { on, x, y, timestamp })
    }

    fn cell<'r>(&self, record: &'r StringRecord, index: usize, name: &str, line: u64) -> Result<&'r str> {
        record.get(index).ok_or_else(|| {
            AnalysisError::Format(format!("{}: line {line} has no {name} cell", self.source))
        })
    }

    fn integer(&self, record: &StringRecord, index: usize, name: &str, line: u64) -> Result<i64> {
        let raw = self.cell(record, index, name, line)?.trim();
        raw.parse::<i64>().map_err(|_| {
            AnalysisError::Format(format!(
                "{}: line {line}: {name} value {raw:?} is not an integer",
                self.source
            ))
        })
    }

    fn coordinate(&self, record: &StringRecord, index: usize, name: &str, line: u64) -> Result<i32> {
        let value = self.integer(record, index, name, line)?;
        i32::try_from(value).map_err(|_| {
            AnalysisError::Format(format!(
                "{}: line {line}: {name} value {value} is out of range",
                self.source
            ))
        })
    }
}

impl<R: Read> Iterator for EventReader<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let item = match self.records.next()? {
            Ok(record) => self.parse_record(&record),
            Err(e) => Err(AnalysisError::from(e)),
        };

        // Fail fast: nothing is yielded after the first bad row.
        if item.is_err() {
            self.finished = true;
        }
        Some(item)
    }
}

/// Reject paths that do not exist or point at a directory.
pub fn check_input_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(AnalysisError::Format(format!(
            "file does not exist: {}",
            path.display()
        )));
    }
    if path.is_dir() {
        return Err(AnalysisError::Format(format!(
            "'{}' is a directory, it should be a csv file",
            path.display()
        )));
    }
    Ok(())
}

fn resolve_layout(header: &StringRecord, columns: &EventColumns, source: &str) -> Result<ColumnLayout> {
    let position = |name: &str| header.iter().position(|cell| cell.trim() == name);

    let names = columns.names();
    let missing: Vec<&str> = names
        .iter()
        .copied()
        .filter(|name| position(*name).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(AnalysisError::missing_columns(source, &missing));
    }

    let index = |name: &str| position(name).unwrap_or_default();
    Ok(ColumnLayout {
        polarity: index(columns.polarity.as_str()),
        x: index(columns.x.as_str()),
        y: index(columns.y.as_str()),
        timestamp: index(columns.timestamp.as_str()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(data: &str) -> Result<Vec<Event>> {
        EventReader::from_reader(data.as_bytes(), &EventColumns::default())?.collect()
    }

    #[test]
    fn test_reads_events_in_order() {
        let events = read_all("On/Off,X,Y,Timestamp\n1,10,10,0\n0,10,12,500\nTrue,50,50,1000\n")
            .unwrap();

        assert_eq!(
            events,
            vec![
                Event::new(true, 10, 10, 0),
                Event::new(false, 10, 12, 500),
                Event::new(true, 50, 50, 1000),
            ]
        );
    }

    #[test]
    fn test_header_whitespace_and_column_order() {
        let events = read_all("Timestamp , X,  Y ,On/Off\n7,1,2,1\n").unwrap();
        assert_eq!(events, vec![Event::new(true, 1, 2, 7)]);
    }

    #[test]
    fn test_missing_columns_fail_before_iteration() {
        let err = EventReader::from_reader(
            "On/Off,X,Time\n1,1,1\n".as_bytes(),
            &EventColumns::default(),
        )
        .err()
        .expect("header should be rejected");

        match err {
            AnalysisError::Format(msg) => {
                assert!(msg.contains("Y"));
                assert!(msg.contains("Timestamp"));
                assert!(!msg.contains("On/Off,"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_header_is_case_sensitive() {
        let result = EventReader::from_reader(
            "on/off,x,y,timestamp\n1,1,1,1\n".as_bytes(),
            &EventColumns::default(),
        );
        assert!(matches!(result, Err(AnalysisError::Format(_))));
    }

    #[test]
    fn test_empty_file_is_format_error() {
        let result = EventReader::from_reader("".as_bytes(), &EventColumns::default());
        assert!(matches!(result, Err(AnalysisError::Format(_))));
    }

    #[test]
    fn test_bad_cell_stops_iteration() {
        let mut reader = EventReader::from_reader(
            "On/Off,X,Y,Timestamp\n1,1,1,0\n1,abc,1,5\n1,2,2,10\n".as_bytes(),
            &EventColumns::default(),
        )
        .unwrap();

        assert!(reader.next().unwrap().is_ok());
        let err = reader.next().unwrap().unwrap_err();
        assert!(err.to_string().contains("line 3"));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_polarity_cell_is_not_trimmed() {
        let events = read_all("On/Off,X,Y,Timestamp\n True, 3 ,4,10\nTrue ,3,4, 20\nTrue,3,4,30\n")
            .unwrap();

        let polarities: Vec<bool> = events.iter().map(|e| e.on).collect();
        assert_eq!(polarities, vec![false, false, true]);
        assert_eq!(events[0].x, 3);
        assert_eq!(events[1].timestamp, 20);
    }

    #[test]
    fn test_short_row_is_format_error() {
        let mut reader = EventReader::from_reader(
            "On/Off,X,Y,Timestamp\n1,1,1,0\n1,1,1\n".as_bytes(),
            &EventColumns::default(),
        )
        .unwrap();

        assert!(reader.next().unwrap().is_ok());
        match reader.next() {
            Some(Err(AnalysisError::Format(msg))) => {
                assert!(msg.contains("line 3"));
                assert!(msg.contains("timestamp"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_custom_columns() {
        let columns = EventColumns {
            polarity: "p".into(),
            x: "col".into(),
            y: "row".into(),
            timestamp: "t".into(),
        };
        let events: Vec<Event> = EventReader::from_reader("t,col,row,p\n3,4,5,0\n".as_bytes(), &columns)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(events, vec![Event::new(false, 4, 5, 3)]);
    }

    #[test]
    fn test_open_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = EventReader::open(dir.path(), &EventColumns::default());
        match result {
            Err(AnalysisError::Format(msg)) => assert!(msg.contains("is a directory")),
            _ => panic!("directory input should be a format error"),
        }
    }

    #[test]
    fn test_open_rejects_missing_file() {
        let result = EventReader::open("/definitely/not/here.csv", &EventColumns::default());
        assert!(matches!(result, Err(AnalysisError::Format(_))));
    }
}
