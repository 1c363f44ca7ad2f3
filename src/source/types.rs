//! Event records as read from an AEDAT-style log.

use serde::{Deserialize, Serialize};

/// Default sensor height used when flipping the y axis (DVS128).
pub const DEFAULT_SENSOR_HEIGHT: i32 = 128;

/// A single change-detection event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Whether the pixel brightness increased (ON) or decreased (OFF)
    pub on: bool,
    /// Column of the pixel
    pub x: i32,
    /// Row of the pixel, in sensor orientation
    pub y: i32,
    /// Timestamp in microseconds
    pub timestamp: i64,
}

impl Event {
    pub fn new(on: bool, x: i32, y: i32, timestamp: i64) -> Self {
        Self { on, x, y, timestamp }
    }

    /// Return a copy with the y axis flipped into screen orientation:
    /// `y' = sensor_height - y`.
    pub fn flip_y(self, sensor_height: i32) -> Self {
        Self {
            y: sensor_height - self.y,
            ..self
        }
    }

    /// +1 for ON events, -1 for OFF events.
    pub fn polarity_sign(&self) -> i8 {
        if self.on {
            1
        } else {
            -1
        }
    }
}

/// Interpret a polarity cell. Only the literal tokens `1` and `True` are ON.
pub fn parse_polarity(token: &str) -> bool {
    matches!(token, "1" | "True")
}

/// Names of the four columns an event log must carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventColumns {
    pub polarity: String,
    pub x: String,
    pub y: String,
    pub timestamp: String,
}

impl Default for EventColumns {
    fn default() -> Self {
        Self {
            polarity: "On/Off".to_string(),
            x: "X".to_string(),
            y: "Y".to_string(),
            timestamp: "Timestamp".to_string(),
        }
    }
}

impl EventColumns {
    /// Column names in canonical order: polarity, x, y, timestamp.
    pub fn names(&self) -> [&str; 4] {
        [
            self.polarity.as_str(),
            self.x.as_str(),
            self.y.as_str(),
            self.timestamp.as_str(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_tokens() {
        assert!(parse_polarity("1"));
        assert!(parse_polarity("True"));
        assert!(!parse_polarity("0"));
        assert!(!parse_polarity("False"));
        assert!(!parse_polarity("true"));
        assert!(!parse_polarity("-1"));
        assert!(!parse_polarity(""));
    }

    #[test]
    fn test_flip_y() {
        let event = Event::new(true, 3, 10, 42);
        let flipped = event.flip_y(DEFAULT_SENSOR_HEIGHT);
        assert_eq!(flipped.y, 118);
        assert_eq!(flipped.x, 3);
        assert_eq!(flipped.timestamp, 42);
        assert_eq!(flipped.flip_y(DEFAULT_SENSOR_HEIGHT), event);
    }

    #[test]
    fn test_polarity_sign() {
        assert_eq!(Event::new(true, 0, 0, 0).polarity_sign(), 1);
        assert_eq!(Event::new(false, 0, 0, 0).polarity_sign(), -1);
    }

    #[test]
    fn test_default_columns() {
        let columns = EventColumns::default();
        assert_eq!(columns.names(), ["On/Off", "X", "Y", "Timestamp"]);
    }
}
