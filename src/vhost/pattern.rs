use regex::{Regex, RegexBuilder};
use tracing::warn;

/// A condition a request's hostname is tested against.
///
/// Strings convert to [`Pattern::Exact`], compiled regexes to
/// [`Pattern::Regex`]. [`Pattern::Never`] stands in for any condition that
/// could not be built; it matches nothing, so the router passes the request on.
#[derive(Clone, Debug)]
pub enum Pattern {
    /// Byte-for-byte equality with the hostname.
    Exact(String),
    /// Unanchored search: `localhost` matches `sub.localhost.com`.
    Regex(Regex),
    Never,
}

impl Pattern {
    pub fn exact(hostname: impl Into<String>) -> Self {
        Self::Exact(hostname.into())
    }

    /// Compiles `source`. A source that does not compile logs a warning and
    /// yields [`Pattern::Never`].
    pub fn regex(source: &str) -> Self {
        Self::regex_with(source, false)
    }

    pub(crate) fn regex_with(source: &str, case_insensitive: bool) -> Self {
        match RegexBuilder::new(source).case_insensitive(case_insensitive).build() {
            Ok(re) => Self::Regex(re),
            Err(e) => {
                warn!(pattern = source, error = %e, "invalid host pattern, it will never match");
                Self::Never
            }
        }
    }

    pub fn is_match(&self, hostname: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == hostname,
            Self::Regex(re) => re.is_match(hostname),
            Self::Never => false,
        }
    }
}

impl From<&str> for Pattern {
    fn from(hostname: &str) -> Self { Self::exact(hostname) }
}

impl From<String> for Pattern {
    fn from(hostname: String) -> Self { Self::Exact(hostname) }
}

impl From<Regex> for Pattern {
    fn from(re: Regex) -> Self { Self::Regex(re) }
}
