use super::ConfigError;
use std::path::PathBuf;

/// Parses an environment variable into `target`; a missing variable keeps the default.
pub fn load_env_var<T>(name: &str, target: &mut T) -> Result<(), ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(value) = std::env::var(name) {
        *target = value
            .parse()
            .map_err(|e| ConfigError::EnvError(format!("Invalid {name}: {e}")))?;
    }
    Ok(())
}

pub fn load_env_string(name: &str, target: &mut String) {
    if let Ok(value) = std::env::var(name) {
        *target = value;
    }
}

pub fn load_env_string_opt(name: &str, target: &mut Option<String>) {
    if let Ok(value) = std::env::var(name) {
        *target = Some(value);
    }
}

pub fn load_env_path(name: &str, target: &mut PathBuf) {
    if let Ok(value) = std::env::var(name) {
        *target = PathBuf::from(value);
    }
}

pub fn load_env_path_opt(name: &str, target: &mut Option<PathBuf>) {
    if let Ok(value) = std::env::var(name) {
        *target = Some(PathBuf::from(value));
    }
}

/// Expands `\n`, `\r` and `\t` escapes so line terminators can be set from
/// a shell or an env var.
pub fn unescape_eol(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_eol() {
        assert_eq!(unescape_eol("\\n"), "\n");
        assert_eq!(unescape_eol("\\r\\n"), "\r\n");
        assert_eq!(unescape_eol("\n"), "\n");
        assert_eq!(unescape_eol("\\x"), "\\x");
        assert_eq!(unescape_eol(""), "");
    }
}
