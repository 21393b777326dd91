use std::fmt;

/// Syslog facility, RFC 5424 §6.2.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Facility {
    Kern = 0,
    User = 1,
    Mail = 2,
    Daemon = 3,
    Auth = 4,
    Syslog = 5,
    Lpr = 6,
    News = 7,
    Uucp = 8,
    Cron = 9,
    AuthPriv = 10,
    Ftp = 11,
    Ntp = 12,
    Security = 13,
    Console = 14,
    Clock = 15,
    Local0 = 16,
    Local1 = 17,
    Local2 = 18,
    Local3 = 19,
    Local4 = 20,
    Local5 = 21,
    Local6 = 22,
    Local7 = 23,
}

const FACILITIES: [(&str, Facility); 24] = [
    ("KERN", Facility::Kern),
    ("USER", Facility::User),
    ("MAIL", Facility::Mail),
    ("DAEMON", Facility::Daemon),
    ("AUTH", Facility::Auth),
    ("SYSLOG", Facility::Syslog),
    ("LPR", Facility::Lpr),
    ("NEWS", Facility::News),
    ("UUCP", Facility::Uucp),
    ("CRON", Facility::Cron),
    ("AUTHPRIV", Facility::AuthPriv),
    ("FTP", Facility::Ftp),
    ("NTP", Facility::Ntp),
    ("SECURITY", Facility::Security),
    ("CONSOLE", Facility::Console),
    ("CLOCK", Facility::Clock),
    ("LOCAL0", Facility::Local0),
    ("LOCAL1", Facility::Local1),
    ("LOCAL2", Facility::Local2),
    ("LOCAL3", Facility::Local3),
    ("LOCAL4", Facility::Local4),
    ("LOCAL5", Facility::Local5),
    ("LOCAL6", Facility::Local6),
    ("LOCAL7", Facility::Local7),
];

impl Facility {
    /// Used whenever a facility name cannot be resolved.
    pub const FALLBACK: Facility = Facility::Local0;

    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Case-insensitive lookup against the facility table.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        FACILITIES
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, facility)| *facility)
    }

    /// Lenient lookup: unknown names resolve to [`Facility::FALLBACK`].
    pub fn resolve(name: &str) -> Self {
        Self::from_name(name).unwrap_or(Self::FALLBACK)
    }

    pub fn name(self) -> &'static str {
        FACILITIES[self.code() as usize].0
    }
}

impl Default for Facility {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_indexed_by_code() {
        for (index, (name, facility)) in FACILITIES.iter().enumerate() {
            assert_eq!(facility.code() as usize, index);
            assert_eq!(facility.name(), *name);
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(Facility::from_name("local3"), Some(Facility::Local3));
        assert_eq!(Facility::from_name("Daemon"), Some(Facility::Daemon));
        assert_eq!(Facility::from_name(" LOCAL7 "), Some(Facility::Local7));
    }

    #[test]
    fn test_unknown_name_falls_back_to_local0() {
        assert_eq!(Facility::from_name("LOCAL8"), None);
        assert_eq!(Facility::resolve("LOCAL8"), Facility::Local0);
        assert_eq!(Facility::resolve(""), Facility::Local0);
    }

    #[test]
    fn test_kern_resolves_to_code_zero() {
        assert_eq!(Facility::resolve("kern").code(), 0);
    }
}
