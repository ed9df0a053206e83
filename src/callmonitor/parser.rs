//! Call monitor record parser
//!
//! Records are `;`-delimited with a trailing delimiter:
//!
//! ```text
//! timestamp;CALL;connectionId;extension;usedNumber;dialedNumber;
//! timestamp;RING;connectionId;callerNumber;calleeNumber;
//! timestamp;CONNECT;connectionId;extension;number;
//! timestamp;DISCONNECT;connectionId;durationSeconds;
//! ```
//!
//! Lines that do not match one of these shapes yield no event.

use serde::{Deserialize, Serialize};
use std::fmt;

const FIELD_DELIMITER: char = ';';

/// Lines shorter than this are treated as noise
const MIN_LINE_LEN: usize = 2;

/// Every record carries at least timestamp, command, id and one value
const MIN_FIELDS: usize = 4;

/// Telephony event reported by the call monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CallEvent {
    /// Outgoing call
    Call {
        connection_id: String,
        source_number: String,
        dest_number: String,
    },
    /// Incoming call
    Ring {
        connection_id: String,
        caller_number: String,
        callee_number: String,
    },
    /// Call established
    Connect {
        connection_id: String,
        number: String,
    },
    /// Call ended
    Disconnect {
        connection_id: String,
        duration_seconds: String,
    },
}

impl CallEvent {
    /// Command keyword on the wire
    pub fn command(&self) -> &'static str {
        match self {
            CallEvent::Call { .. } => "CALL",
            CallEvent::Ring { .. } => "RING",
            CallEvent::Connect { .. } => "CONNECT",
            CallEvent::Disconnect { .. } => "DISCONNECT",
        }
    }

    /// Router-assigned connection identifier
    pub fn connection_id(&self) -> &str {
        match self {
            CallEvent::Call { connection_id, .. }
            | CallEvent::Ring { connection_id, .. }
            | CallEvent::Connect { connection_id, .. }
            | CallEvent::Disconnect { connection_id, .. } => connection_id,
        }
    }
}

impl fmt::Display for CallEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallEvent::Call {
                source_number,
                dest_number,
                ..
            } => write!(f, "Call From: {source_number} to: {dest_number}"),
            CallEvent::Ring {
                caller_number,
                callee_number,
                ..
            } => write!(f, "Received From: {caller_number} to: {callee_number}"),
            CallEvent::Connect {
                connection_id,
                number,
            } => write!(f, "Connected ID: {connection_id} Number: {number}"),
            CallEvent::Disconnect {
                connection_id,
                duration_seconds,
            } => write!(
                f,
                "Disconnect ID: {connection_id} Duration: {duration_seconds} seconds"
            ),
        }
    }
}

/// Split a record into fields
///
/// Interior empty fields are kept. A single trailing empty field, produced
/// by the delimiter that terminates every record, is not.
pub fn split_fields(line: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if fields.last().is_some_and(|last| last.is_empty()) {
        fields.pop();
    }
    fields
}

/// Parse one call monitor line
pub fn parse_line(line: &str) -> Option<CallEvent> {
    if line.len() < MIN_LINE_LEN {
        return None;
    }

    let fields = split_fields(line);
    if fields.len() < MIN_FIELDS {
        return None;
    }

    match fields[1] {
        "CALL" if fields.len() >= 6 => Some(CallEvent::Call {
            connection_id: fields[2].to_string(),
            source_number: fields[4].to_string(),
            dest_number: fields[5].to_string(),
        }),
        "RING" if fields.len() >= 5 => Some(CallEvent::Ring {
            connection_id: fields[2].to_string(),
            caller_number: fields[3].to_string(),
            callee_number: fields[4].to_string(),
        }),
        "CONNECT" if fields.len() >= 5 => Some(CallEvent::Connect {
            connection_id: fields[2].to_string(),
            number: fields[4].to_string(),
        }),
        // Durations are rendered verbatim, but a non-numeric one marks a
        // corrupted record
        "DISCONNECT" if fields[3].parse::<u64>().is_ok() => Some(CallEvent::Disconnect {
            connection_id: fields[2].to_string(),
            duration_seconds: fields[3].to_string(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_parse_call() {
        let event = parse_line("2024-01-01 09:59:00;CALL;3;10;015551111111;015552222222;");
        assert_eq!(
            event,
            Some(CallEvent::Call {
                connection_id: "3".to_string(),
                source_number: "015551111111".to_string(),
                dest_number: "015552222222".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_ring() {
        let event = parse_line("2024-01-01 10:00:00;RING;7;015551234567;015559876543;").unwrap();
        assert_eq!(event.command(), "RING");
        assert_eq!(event.connection_id(), "7");
        assert_eq!(
            event.to_string(),
            "Received From: 015551234567 to: 015559876543"
        );
    }

    #[test]
    fn test_parse_connect_and_disconnect() {
        let connect = parse_line("2024-01-01 10:00:05;CONNECT;7;0;015559876543;").unwrap();
        assert_eq!(connect.to_string(), "Connected ID: 7 Number: 015559876543");

        let disconnect = parse_line("2024-01-01 10:00:40;DISCONNECT;7;35;").unwrap();
        assert_eq!(disconnect.to_string(), "Disconnect ID: 7 Duration: 35 seconds");
    }

    #[rstest]
    #[case("ts;CALL;1;2;from;to;", true)]
    #[case("ts;CALL;1;2;from;", false)]
    #[case("ts;RING;1;from;to;", true)]
    #[case("ts;RING;1;from;", false)]
    #[case("ts;CONNECT;1;2;number;", true)]
    #[case("ts;CONNECT;1;2;", false)]
    #[case("ts;DISCONNECT;1;35;", true)]
    #[case("ts;DISCONNECT;1;", false)]
    fn test_field_count_gating(#[case] line: &str, #[case] parses: bool) {
        assert_eq!(parse_line(line).is_some(), parses, "{line}");
    }

    #[test]
    fn test_records_without_trailing_delimiter() {
        assert!(parse_line("ts;RING;1;from;to").is_some());
        assert!(parse_line("ts;DISCONNECT;1;35").is_some());
    }

    #[test]
    fn test_empty_interior_fields_are_kept() {
        let event = parse_line("ts;RING;1;;015559876543;").unwrap();
        assert_eq!(event.to_string(), "Received From:  to: 015559876543");
    }

    #[rstest]
    #[case("ts;HANGUP;1;2;3;4;")]
    #[case("ts;ring;1;from;to;")]
    #[case("ts;Connect;1;2;number;")]
    fn test_unknown_commands_are_dropped(#[case] line: &str) {
        assert_eq!(parse_line(line), None);
    }

    #[rstest]
    #[case("")]
    #[case("x")]
    #[case(";;")]
    #[case("garbage without delimiters")]
    fn test_noise_is_dropped(#[case] line: &str) {
        assert_eq!(parse_line(line), None);
    }

    #[test]
    fn test_non_numeric_duration_is_dropped() {
        assert_eq!(parse_line("ts;DISCONNECT;7;abc;"), None);
    }

    #[test]
    fn test_split_fields() {
        assert_eq!(split_fields("a;b;;c;"), vec!["a", "b", "", "c"]);
        assert_eq!(split_fields(""), Vec::<&str>::new());
        assert_eq!(split_fields("a;;"), vec!["a", ""]);
    }

    #[test]
    fn test_event_serializes_with_kind_tag() {
        let event = parse_line("ts;DISCONNECT;7;35;").unwrap();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "disconnect");
        assert_eq!(json["duration_seconds"], "35");
    }
}
