//! Recording attributes inferred from file names.
//!
//! Recordings are named after the stimulus that produced them, e.g.
//! `sine_100mV_200Hz_45deg.csv`. Each parser returns the matched value
//! followed by `append_if_found`, or an empty string when the name carries
//! no such attribute. Matching is case-insensitive and the leftmost match
//! wins.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn pattern(cell: &'static OnceLock<Regex>, source: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(source).unwrap_or_else(|e| panic!("bad pattern {source}: {e}")))
}

fn digits() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, r"[0-9]+")
}

/// Frequency in Hz (`200Hz`, `200 hz`).
pub fn parse_frequency(input: &str, append_if_found: &str) -> String {
    static CELL: OnceLock<Regex> = OnceLock::new();
    let re = pattern(&CELL, r"(?i)[0-9]+ ?hz");
    leading_number(re, input, append_if_found)
}

/// Voltage in volts. Millivolt values are scaled by 0.001 and rendered as
/// a decimal (`100mV` -> `0.1`); volt values stay integral (`5v` -> `5`).
pub fn parse_voltage(input: &str, append_if_found: &str) -> String {
    static CELL: OnceLock<Regex> = OnceLock::new();
    let re = pattern(&CELL, r"(?i)[0-9]+ ?m?v");

    let Some(found) = re.find(input) else {
        return String::new();
    };
    let text = found.as_str().to_lowercase();
    let Some(number) = digits().find(&text).map(|m| m.as_str()) else {
        return String::new();
    };

    let voltage = if text.contains("mv") {
        match number.parse::<f64>() {
            Ok(millivolts) => format_decimal(millivolts * 0.001),
            Err(_) => return String::new(),
        }
    } else {
        // Integral volts keep every digit, without leading zeros.
        match number.trim_start_matches('0') {
            "" => "0".to_string(),
            trimmed => trimmed.to_string(),
        }
    };
    voltage + append_if_found
}

/// Stimulus waveform, returned as written in the name.
pub fn parse_waveform(input: &str, append_if_found: &str) -> String {
    static CELL: OnceLock<Regex> = OnceLock::new();
    let re = pattern(&CELL, r"(?i)(burst|sine|square|triangle|noise)");
    match re.find(input) {
        Some(m) => m.as_str().to_string() + append_if_found,
        None => String::new(),
    }
}

/// Polarizer angle in degrees (`45deg`, `45 DEG`).
pub fn parse_degrees(input: &str, append_if_found: &str) -> String {
    static CELL: OnceLock<Regex> = OnceLock::new();
    let re = pattern(&CELL, r"(?i)[0-9]+ ?deg");
    leading_number(re, input, append_if_found)
}

/// Number of slots in the chopper wheel (`12sl`).
pub fn parse_slots(input: &str, append_if_found: &str) -> String {
    static CELL: OnceLock<Regex> = OnceLock::new();
    let re = pattern(&CELL, r"(?i)[0-9]+sl");
    leading_number(re, input, append_if_found)
}

/// Contrast threshold (`30t`, `m20threshold`); a leading `m` marks a
/// negative value.
pub fn parse_threshold(input: &str, append_if_found: &str) -> String {
    static CELL: OnceLock<Regex> = OnceLock::new();
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = pattern(&CELL, r"(?i)m?[0-9]+t(hreshold)?");
    let number = pattern(&NUMBER, r"(?i)m?[0-9]+");

    let Some(value) = re
        .find(input)
        .and_then(|found| number.find(found.as_str()))
        .map(|m| m.as_str().to_string())
    else {
        return String::new();
    };

    let value = match value.strip_prefix(&['m', 'M'][..]) {
        Some(rest) => format!("-{rest}"),
        None => value,
    };
    value + append_if_found
}

/// Whether the recording was made without a polarizer (`nopol`, `no pol`).
pub fn is_unpolarized(input: &str) -> bool {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, r"(?i)no ?pol").is_match(input)
}

fn leading_number(re: &Regex, input: &str, append_if_found: &str) -> String {
    re.find(input)
        .and_then(|found| digits().find(found.as_str()))
        .map(|m| m.as_str().to_string() + append_if_found)
        .unwrap_or_default()
}

/// Render a float the way plot labels expect: always with a fractional part.
fn format_decimal(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') || text.contains('e') || !value.is_finite() {
        text
    } else {
        format!("{text}.0")
    }
}

/// Everything that can be inferred from one file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub frequency: String,
    pub voltage: String,
    pub waveform: String,
    pub degrees: String,
    pub slots: String,
    pub threshold: String,
    pub unpolarized: bool,
}

impl FileMetadata {
    pub fn from_file_name(name: &str) -> Self {
        Self {
            frequency: parse_frequency(name, ""),
            voltage: parse_voltage(name, ""),
            waveform: parse_waveform(name, ""),
            degrees: parse_degrees(name, ""),
            slots: parse_slots(name, ""),
            threshold: parse_threshold(name, ""),
            unpolarized: is_unpolarized(name),
        }
    }

    /// Neither the stimulus frequency nor the polarizer angle is known.
    pub fn is_ambiguous(&self) -> bool {
        self.frequency.is_empty() && self.degrees.is_empty()
    }

    fn stimulus(&self) -> Vec<&str> {
        [&self.waveform, &self.voltage, &self.frequency]
            .into_iter()
            .map(String::as_str)
            .filter(|p| !p.is_empty())
            .collect()
    }

    fn polarization(&self) -> Option<String> {
        if self.degrees.is_empty() {
            None
        } else {
            Some(format!("{} Degrees Polarized", self.degrees))
        }
    }

    /// Title for a spike plot: unpolarized recordings say so, others carry
    /// their polarizer angle.
    pub fn spike_title(&self) -> String {
        let mut parts: Vec<String> = self.stimulus().into_iter().map(str::to_string).collect();
        if self.unpolarized {
            parts.push("Unpolarized".to_string());
        } else if let Some(polarization) = self.polarization() {
            parts.push(polarization);
        }
        parts.join(" ")
    }

    /// Title for one fingerprint channel.
    pub fn fingerprint_title(&self, channel_label: &str, reconstruction_window: i64) -> String {
        let mut parts: Vec<String> = self.stimulus().into_iter().map(str::to_string).collect();
        parts.extend(self.polarization());
        parts.push(format!(
            "{channel_label} Events Fingerprint ({reconstruction_window}μs Reconstruction Window)"
        ));
        parts.join(" ")
    }

    /// Stem for event density artifacts, e.g. `sine_5_200Hz_45DegreesPolarized_event_density`.
    pub fn density_stem(&self) -> String {
        let mut parts: Vec<String> = [&self.waveform, &self.voltage]
            .into_iter()
            .filter(|p| !p.is_empty())
            .cloned()
            .collect();
        if !self.frequency.is_empty() {
            parts.push(format!("{}Hz", self.frequency));
        }
        if !self.degrees.is_empty() {
            parts.push(format!("{}DegreesPolarized", self.degrees));
        }
        parts.push("event_density".to_string());
        parts.join("_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frequency() {
        assert_eq!(parse_frequency("200Hz_test.csv", ""), "200");
        assert_eq!(parse_frequency("sine 50 HZ.csv", " "), "50 ");
        assert_eq!(parse_frequency("no_frequency.csv", " "), "");
    }

    #[test]
    fn test_parse_voltage() {
        assert_eq!(parse_voltage("100mV", ""), "0.1");
        assert_eq!(parse_voltage("sine_300 mv", ""), "0.3");
        assert_eq!(parse_voltage("square_1000mV", ""), "1.0");
        assert_eq!(parse_voltage("square_5V_10hz", " "), "5 ");
        assert_eq!(parse_voltage("nothing here", " "), "");
    }

    #[test]
    fn test_parse_voltage_long_digit_runs() {
        let digits = "123456789012345678901234567890";
        assert_eq!(parse_voltage(&format!("sine_{digits}v"), ""), digits);
        assert_eq!(parse_voltage("sine_007v", ""), "7");
        assert_eq!(parse_voltage("sine_0v", ""), "0");
        assert_eq!(
            parse_voltage(&format!("sine_{digits}mv"), ""),
            format_decimal(123456789012345678901234567890.0 * 0.001)
        );
    }

    #[test]
    fn test_density_stem_uses_parsed_voltage() {
        let meta = FileMetadata::from_file_name("sine_5v_200Hz_45deg");
        assert_eq!(meta.density_stem(), "sine_5_200Hz_45DegreesPolarized_event_density");
    }

    #[test]
    fn test_parse_waveform_leftmost_match() {
        assert_eq!(parse_waveform("sine_burst.csv", ""), "sine");
        assert_eq!(parse_waveform("Burst_sine.csv", "_"), "Burst_");
        assert_eq!(parse_waveform("sawtooth.csv", "_"), "");
    }

    #[test]
    fn test_parse_degrees() {
        assert_eq!(parse_degrees("45deg_200hz", " Degrees Polarized"), "45 Degrees Polarized");
        assert_eq!(parse_degrees("90 DEG", ""), "90");
        assert_eq!(parse_degrees("degrees", ""), "");
    }

    #[test]
    fn test_parse_slots_and_threshold() {
        assert_eq!(parse_slots("wheel_12sl_run", ""), "12");
        assert_eq!(parse_slots("wheel", ""), "");
        assert_eq!(parse_threshold("run_30t", ""), "30");
        assert_eq!(parse_threshold("run_m20threshold", ""), "-20");
        assert_eq!(parse_threshold("run", ""), "");
    }

    #[test]
    fn test_unpolarized() {
        assert!(is_unpolarized("sine_200hz_no pol"));
        assert!(is_unpolarized("sine_200hz_NoPol"));
        assert!(!is_unpolarized("sine_200hz_45deg"));
    }

    #[test]
    fn test_metadata_titles() {
        let meta = FileMetadata::from_file_name("sine_100mV_200Hz_45deg");
        assert_eq!(meta.waveform, "sine");
        assert_eq!(meta.voltage, "0.1");
        assert_eq!(meta.frequency, "200");
        assert_eq!(meta.degrees, "45");
        assert!(!meta.is_ambiguous());

        assert_eq!(meta.spike_title(), "sine 0.1 200 45 Degrees Polarized");
        assert_eq!(
            meta.fingerprint_title("ON", 5000),
            "sine 0.1 200 45 Degrees Polarized ON Events Fingerprint (5000μs Reconstruction Window)"
        );
        assert_eq!(meta.density_stem(), "sine_0.1_200Hz_45DegreesPolarized_event_density");
    }

    #[test]
    fn test_unpolarized_title() {
        let meta = FileMetadata::from_file_name("square_10Hz_nopol");
        assert_eq!(meta.spike_title(), "square 10 Unpolarized");
    }

    #[test]
    fn test_ambiguous_metadata() {
        let meta = FileMetadata::from_file_name("recording");
        assert!(meta.is_ambiguous());
        assert_eq!(meta.spike_title(), "");
        assert_eq!(
            meta.fingerprint_title("All", 100),
            "All Events Fingerprint (100μs Reconstruction Window)"
        );
        assert_eq!(meta.density_stem(), "event_density");
    }
}
