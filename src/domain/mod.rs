//! Domain layer for syslog-appender.
//!
//! Contains the canonical types shared across all modules:
//! - `LogEvent`: one log call, fully resolved and ready for encoding
//! - `Facility` / `Severity` / `Priority`: the syslog classification tables
//! - `StructuredData`: RFC 5424 structured-data annotations
//! - `AppenderError`: Top-level error type

pub mod error;
pub mod facility;
pub mod log_event;
pub mod severity;

pub use error::AppenderError;
pub use facility::Facility;
pub use log_event::{LogEvent, StructuredData};
pub use severity::{Priority, Severity};
