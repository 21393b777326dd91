// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Latency millis fit in u64
    clippy::cast_precision_loss,      // Acceptable for metrics/display
    clippy::missing_errors_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. DeliveryMetrics in sender::metrics
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod appender;
pub mod domain;
pub mod encoder;
pub mod reliability;
pub mod sender;

// Re-export main types for easy access
pub use app::config::AppenderConfig;
pub use appender::{Appender, SendParams};
pub use domain::{AppenderError, Facility, LogEvent, Severity, StructuredData};
pub use encoder::EncodedRecord;
pub use sender::{DeliverySnapshot, IdentityCheck, TlsMaterial, Transport};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
