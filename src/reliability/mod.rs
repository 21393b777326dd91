pub mod connection;
pub mod disk;

pub use connection::ConnectionState;
pub use disk::{DiskError, DrainOutcome, RetryBuffer};
