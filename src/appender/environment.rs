use chrono::{DateTime, Utc};

/// Source of record timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant. Handy for reproducible records.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// OS hostname, or the RFC 5424 NILVALUE when it cannot be determined.
pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "-".to_string())
}

pub fn process_id() -> String {
    std::process::id().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 9, 17, 4, 5).unwrap();
        assert_eq!(FixedClock(instant).now(), instant);
    }

    #[test]
    fn test_host_identity_is_never_empty() {
        assert!(!local_hostname().is_empty());
        assert_eq!(process_id(), std::process::id().to_string());
    }
}
