use super::facility::Facility;
use std::fmt;

/// Syslog severity, RFC 5424 §6.2.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Severity {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Informational = 6,
    Debug = 7,
}

// Canonical names first (indexed by code), short aliases after.
const SEVERITIES: [(&str, Severity); 13] = [
    ("EMERGENCY", Severity::Emergency),
    ("ALERT", Severity::Alert),
    ("CRITICAL", Severity::Critical),
    ("ERROR", Severity::Error),
    ("WARNING", Severity::Warning),
    ("NOTICE", Severity::Notice),
    ("INFORMATIONAL", Severity::Informational),
    ("DEBUG", Severity::Debug),
    ("EMERG", Severity::Emergency),
    ("CRIT", Severity::Critical),
    ("ERR", Severity::Error),
    ("WARN", Severity::Warning),
    ("INFO", Severity::Informational),
];

impl Severity {
    /// Used whenever a severity name cannot be resolved.
    pub const FALLBACK: Severity = Severity::Debug;

    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Case-insensitive lookup, accepting canonical names and short aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        SEVERITIES
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, severity)| *severity)
    }

    /// Lenient lookup: unknown names resolve to [`Severity::FALLBACK`].
    pub fn resolve(name: &str) -> Self {
        Self::from_name(name).unwrap_or(Self::FALLBACK)
    }

    pub fn name(self) -> &'static str {
        SEVERITIES[self.code() as usize].0
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The `<PRI>` value: `facility * 8 + severity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Priority(u8);

impl Priority {
    pub const fn new(facility: Facility, severity: Severity) -> Self {
        Self(facility.code() * 8 + severity.code())
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
