//! Vision response parsing
//!
//! The vision model is prompted for one badge per line, but real output
//! drifts between three layouts. Each line is tried against them in order:
//!
//! 1. Pipe-delimited: `name | count | confidence`
//! 2. Colon format:   `name: count (confidence)`
//! 3. Natural prose:  `3 OAS Bushcraft badges` / `2x Milestone 1`
//!
//! Malformed lines are skipped with a debug log rather than failing the
//! whole response; partial extraction beats none.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{ConfidenceLabel, RawDetection};

fn colon_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.+?):\s*(\d+)\s*\((\w+)\)").expect("static regex")
    })
}

fn natural_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // "<count> [x] <name phrase> [badge|badges]"
        Regex::new(r"(?i)^\s*(\d+)\s*x?\s+(.+?)(?:\s+badges?)?\s*$").expect("static regex")
    })
}

/// Parse a full vision-model response into raw detections.
///
/// Never fails: unparseable lines are dropped individually.
pub fn parse_response(response: &str) -> Vec<RawDetection> {
    let mut detections = Vec::new();

    for line in response.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parsed = if line.contains('|') {
            parse_pipe_line(line)
        } else if line.contains(':') {
            parse_colon_line(line)
        } else {
            parse_natural_line(line)
        };

        match parsed {
            Some(detection) if detection.count > 0 => detections.push(detection),
            Some(_) => {
                tracing::debug!(line = %line, "Skipping zero-count detection");
            }
            None => {
                tracing::debug!(line = %line, "Skipping unparseable line");
            }
        }
    }

    detections
}

/// `name | count | confidence`; anything short of the full triple is
/// not this layout
fn parse_pipe_line(line: &str) -> Option<RawDetection> {
    let parts: Vec<&str> = line.split('|').collect();
    if parts.len() < 3 {
        return None;
    }

    let name = parts[0].trim();
    if name.is_empty() {
        return None;
    }
    let count: u32 = parts[1].trim().parse().ok()?;
    let label = ConfidenceLabel::parse(parts[2].trim());

    Some(detection(name, count, label))
}

/// `name: count (confidence)`
fn parse_colon_line(line: &str) -> Option<RawDetection> {
    let caps = colon_line_re().captures(line)?;

    let name = caps.get(1)?.as_str().trim();
    if name.is_empty() {
        return None;
    }
    let count: u32 = caps.get(2)?.as_str().parse().ok()?;
    let label = ConfidenceLabel::parse(caps.get(3)?.as_str());

    Some(detection(name, count, label))
}

/// `<count> [x] <name> [badge(s)]`; no confidence marker, assumed medium
fn parse_natural_line(line: &str) -> Option<RawDetection> {
    let caps = natural_line_re().captures(line)?;

    let count: u32 = caps.get(1)?.as_str().parse().ok()?;
    let name = caps.get(2)?.as_str().trim();
    if name.is_empty() {
        return None;
    }

    Some(detection(name, count, ConfidenceLabel::Medium))
}

fn detection(name: &str, count: u32, label: ConfidenceLabel) -> RawDetection {
    RawDetection {
        detected_name: name.to_string(),
        count,
        confidence_label: label,
        confidence_score: label.score(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_format() {
        let detections = parse_response("OAS Bushcraft | 3 | high");
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].detected_name, "OAS Bushcraft");
        assert_eq!(detections[0].count, 3);
        assert_eq!(detections[0].confidence_label, ConfidenceLabel::High);
        assert_eq!(detections[0].confidence_score, 0.9);
    }

    #[test]
    fn test_two_field_pipe_line_skipped() {
        // A pipe line without the confidence field is not the pipe layout
        assert!(parse_response("Grey Wolf Award | 2").is_empty());
    }

    #[test]
    fn test_colon_format() {
        let detections = parse_response("Milestone 1: 2 (low)");
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].detected_name, "Milestone 1");
        assert_eq!(detections[0].count, 2);
        assert_eq!(detections[0].confidence_score, 0.5);
    }

    #[test]
    fn test_colon_line_without_count_is_skipped() {
        // A colon makes the line claim the colon layout; there is no
        // fallthrough to the natural-language parse
        assert!(parse_response("Note: these were hard to see").is_empty());
    }

    #[test]
    fn test_natural_format_keeps_full_name_phrase() {
        let detections = parse_response("3 OAS Bushcraft badges");
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].detected_name, "OAS Bushcraft");
        assert_eq!(detections[0].count, 3);
        assert_eq!(detections[0].confidence_label, ConfidenceLabel::Medium);
    }

    #[test]
    fn test_natural_format_with_x_and_singular_badge() {
        let detections = parse_response("2x Milestone 1 badge");
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].detected_name, "Milestone 1");
        assert_eq!(detections[0].count, 2);
    }

    #[test]
    fn test_unknown_confidence_label() {
        let detections = parse_response("Campcraft | 4 | certain");
        assert_eq!(detections[0].confidence_label, ConfidenceLabel::Other);
        assert_eq!(detections[0].confidence_score, 0.6);
    }

    #[test]
    fn test_blank_and_comment_lines_skipped() {
        let response = "\n# detected badges\n\nOAS Bushcraft | 2 | high\n  \n";
        let detections = parse_response(response);
        assert_eq!(detections.len(), 1);
    }

    #[test]
    fn test_zero_count_dropped() {
        assert!(parse_response("OAS Bushcraft | 0 | high").is_empty());
    }

    #[test]
    fn test_malformed_lines_skipped_individually() {
        let response = "garbage without numbers\nOAS Bushcraft | 2 | high\n| | |\nalso not a detection";
        let detections = parse_response(response);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].detected_name, "OAS Bushcraft");
    }

    #[test]
    fn test_mixed_formats_in_one_response() {
        let response = "OAS Bushcraft | 3 | high\nMilestone 1: 2 (medium)\n1 Grey Wolf Award";
        let detections = parse_response(response);
        assert_eq!(detections.len(), 3);
        assert_eq!(detections[0].detected_name, "OAS Bushcraft");
        assert_eq!(detections[1].detected_name, "Milestone 1");
        assert_eq!(detections[2].detected_name, "Grey Wolf Award");
        assert_eq!(detections[2].count, 1);
    }
}
