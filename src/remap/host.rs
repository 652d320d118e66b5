//! Per-hostname routing units.

use std::sync::Arc;

use rustls::ServerConfig;

use crate::remap::path::RemapPath;

/// Minimum TLS protocol version accepted for a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TlsVersion {
    #[default]
    Tls1_0,
    Tls1_1,
    Tls1_2,
    Tls1_3,
}

impl TlsVersion {
    /// Parse an annotation value like `"1.2"`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "1.0" => Some(Self::Tls1_0),
            "1.1" => Some(Self::Tls1_1),
            "1.2" => Some(Self::Tls1_2),
            "1.3" => Some(Self::Tls1_3),
            _ => None,
        }
    }
}

/// Everything the engine knows about one hostname: TLS settings for the
/// handshake, HSTS policy, and the ordered path list with its optional
/// default.
#[derive(Debug, Default)]
pub struct RemapHost {
    hostname: String,

    pub tls: Option<Arc<ServerConfig>>,
    pub tls_min_version: TlsVersion,
    pub http2: bool,
    pub hsts_max_age: Option<u32>,
    pub hsts_include_subdomains: bool,

    paths: Vec<RemapPath>,
    default_path: Option<RemapPath>,
}

impl RemapHost {
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_ascii_lowercase(),
            http2: true,
            ..Default::default()
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn paths(&self) -> &[RemapPath] {
        &self.paths
    }

    pub fn default_path(&self) -> Option<&RemapPath> {
        self.default_path.as_ref()
    }

    /// Append an explicit path; declaration order is match priority.
    pub(crate) fn add_path(&mut self, path: RemapPath) {
        self.paths.push(path);
    }

    /// Install the default path, replacing any earlier one.
    pub(crate) fn set_default_path(&mut self, path: RemapPath) {
        if self.default_path.is_some() {
            tracing::debug!(hostname = %self.hostname, "default path replaced");
        }
        self.default_path = Some(path);
    }

    /// Find the path entry for a request path.
    ///
    /// Literal prefixes are tried first in declaration order, then
    /// patterns in declaration order, then the default path. The second
    /// element is the matched prefix length (zero for the default path).
    pub fn find_path(&self, path: &str) -> Option<(&RemapPath, usize)> {
        for rp in self.paths.iter().filter(|rp| !rp.match_spec().is_some_and(|m| m.is_pattern())) {
            if let Some(len) = rp.matches(path) {
                return Some((rp, len));
            }
        }
        for rp in self.paths.iter().filter(|rp| rp.match_spec().is_some_and(|m| m.is_pattern())) {
            if let Some(len) = rp.matches(path) {
                return Some((rp, len));
            }
        }
        self.default_path.as_ref().map(|rp| (rp, 0))
    }

    /// Whether a negotiated protocol version satisfies the host minimum.
    pub fn permits_tls_version(&self, version: TlsVersion) -> bool {
        version >= self.tls_min_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_with_paths(paths: &[&str]) -> RemapHost {
        let mut host = RemapHost::new("example.com");
        for declared in paths {
            host.add_path(RemapPath::new(declared).unwrap());
        }
        host.set_default_path(RemapPath::new_default());
        host
    }

    #[test]
    fn test_literal_wins_over_pattern() {
        // A pattern declared first must not shadow a literal match.
        let host = host_with_paths(&["/f.*", "/foo"]);
        let (rp, len) = host.find_path("foo").unwrap();
        assert!(!rp.match_spec().unwrap().is_pattern());
        assert_eq!(len, 3);
    }

    #[test]
    fn test_fallback_to_default() {
        let host = host_with_paths(&["/foo", "/bar/.*/baz"]);
        let (rp, len) = host.find_path("quux").unwrap();
        assert!(rp.is_default());
        assert_eq!(len, 0);
    }

    #[test]
    fn test_no_default_no_match() {
        let mut host = RemapHost::new("example.com");
        host.add_path(RemapPath::new("/foo").unwrap());
        assert!(host.find_path("bar").is_none());
    }

    #[test]
    fn test_hostname_lowercased() {
        let host = RemapHost::new("Example.COM");
        assert_eq!(host.hostname(), "example.com");
    }

    #[test]
    fn test_tls_version_ordering() {
        let mut host = RemapHost::new("example.com");
        host.tls_min_version = TlsVersion::Tls1_2;
        assert!(host.permits_tls_version(TlsVersion::Tls1_3));
        assert!(host.permits_tls_version(TlsVersion::Tls1_2));
        assert!(!host.permits_tls_version(TlsVersion::Tls1_1));
    }

    #[test]
    fn test_tls_version_parse() {
        assert_eq!(TlsVersion::parse("1.2"), Some(TlsVersion::Tls1_2));
        assert_eq!(TlsVersion::parse("ssl3"), None);
    }
}
