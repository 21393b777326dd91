//! RFC 5424 message encoder.
//!
//! Produces exactly one line per event:
//! `<PRI>1 TIMESTAMP HOSTNAME APP-NAME PROCID MSGID STRUCTURED-DATA MSG<EOL>`.
//! Message content is not escaped.

pub mod structured_data;

pub use structured_data::render_structured_data;

use crate::domain::LogEvent;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write;

/// RFC 5424 protocol version tag.
pub const SYSLOG_VERSION: u8 = 1;

/// An encoded wire-format record.
///
/// Immutable once built; cloning shares the underlying buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRecord(Bytes);

impl EncodedRecord {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

/// Wraps pre-encoded bytes, e.g. a record read back from elsewhere.
impl From<Bytes> for EncodedRecord {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for EncodedRecord {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// ISO-8601 with millisecond precision and a `Z` designator.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn encode(event: &LogEvent) -> EncodedRecord {
    let structured_data = render_structured_data(&event.structured_data);
    let mut line = String::with_capacity(
        64 + event.hostname.len()
            + event.app_name.len()
            + structured_data.len()
            + event.message.len(),
    );

    // Writing into a String cannot fail.
    let _ = write!(
        line,
        "<{}>{} {} {} {} {} {} {} {}{}",
        event.priority(),
        SYSLOG_VERSION,
        format_timestamp(&event.timestamp),
        event.hostname,
        event.app_name,
        event.proc_id,
        event.msg_id,
        structured_data,
        event.message,
        event.eol,
    );

    EncodedRecord(Bytes::from(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Facility, Severity, StructuredData};
    use chrono::TimeZone;

    fn event(message: &str) -> LogEvent {
        LogEvent {
            message: message.to_string(),
            facility: Facility::Local4,
            severity: Severity::Notice,
            app_name: "billing".to_string(),
            proc_id: "4242".to_string(),
            msg_id: "ID47".to_string(),
            structured_data: StructuredData::nil(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 9, 17, 4, 5).unwrap(),
            eol: "\n".to_string(),
            hostname: "web-01".to_string(),
        }
    }

    #[test]
    fn test_encode_line_layout() {
        let record = encode(&event("payment accepted"));
        assert_eq!(
            record.as_bytes(),
            b"<165>1 2024-03-09T17:04:05.000Z web-01 billing 4242 ID47 - payment accepted\n"
        );
    }

    #[test]
    fn test_custom_eol_terminates_record() {
        let mut event = event("x");
        event.eol = "\r\n".to_string();
        assert!(encode(&event).as_bytes().ends_with(b" x\r\n"));
    }

    #[test]
    fn test_message_is_not_escaped() {
        let record = encode(&event("a \"quoted\" ] value"));
        let text = std::str::from_utf8(record.as_bytes()).unwrap();
        assert!(text.contains("- a \"quoted\" ] value\n"));
    }

    #[test]
    fn test_timestamp_keeps_milliseconds() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(format_timestamp(&ts), "2023-11-14T22:13:20.123Z");
    }
}
