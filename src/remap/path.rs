//! Per-path routing and policy units.

use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use regex::Regex;

use crate::remap::auth::{AddressList, Credentials};

/// Characters that promote a declared path from a literal prefix to a
/// compiled pattern.
const PATTERN_METACHARS: &[char] = &['.', '*', '+', '?', '(', ')', '[', ']', '{', '}', '|', '^', '$', '\\'];

/// Compiled match specification for one declared Ingress path.
///
/// Request paths carry no leading slash, so the declared path is stripped
/// of one before compilation. Plain strings match as path prefixes;
/// anything containing pattern metacharacters becomes a start-anchored
/// regular expression.
#[derive(Debug, Clone)]
pub enum PathMatch {
    Prefix(String),
    Pattern(Regex),
}

impl PathMatch {
    pub fn compile(declared: &str) -> Result<Self, regex::Error> {
        let stripped = declared.strip_prefix('/').unwrap_or(declared);
        if stripped.contains(PATTERN_METACHARS) {
            let re = Regex::new(&format!("^{stripped}"))?;
            Ok(Self::Pattern(re))
        } else {
            Ok(Self::Prefix(stripped.to_string()))
        }
    }

    /// Match against a request path, returning the matched prefix length.
    pub fn matches(&self, path: &str) -> Option<usize> {
        match self {
            Self::Prefix(prefix) => path.starts_with(prefix.as_str()).then(|| prefix.len()),
            Self::Pattern(re) => re.find(path).map(|m| m.end()),
        }
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, Self::Pattern(_))
    }
}

/// One resolved backend address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapTarget {
    pub host: String,
    pub port: u16,
}

impl RemapTarget {
    /// The target address if it is a literal IP; DNS-named targets
    /// (ExternalName services) return None and need async resolution.
    pub fn ip(&self) -> Option<IpAddr> {
        self.host.parse().ok()
    }
}

impl fmt::Display for RemapTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One path entry in the compiled table: its match specification, the
/// resolved backend targets, and the policy bundle from annotations.
#[derive(Debug, Default)]
pub struct RemapPath {
    match_spec: Option<PathMatch>,
    pub targets: Vec<RemapTarget>,
    cursor: AtomicUsize,

    pub secure_backends: bool,
    pub preserve_host: bool,
    pub force_tls: bool,
    pub app_root: Option<String>,
    pub rewrite_target: Option<String>,

    pub address_list: AddressList,
    pub credentials: Option<Credentials>,
    pub auth_realm: Option<String>,

    pub ignore_params: Vec<glob::Pattern>,
    pub whitelist_params: HashSet<String>,
    pub ignore_cookies: Vec<glob::Pattern>,

    pub cache: bool,
    pub cache_generation: i64,
    pub compress: bool,
    pub server_push: bool,
    pub follow_redirects: bool,
    pub read_timeout: Option<Duration>,
}

impl RemapPath {
    /// A path with a compiled match specification. `declared` is the path
    /// string from the Ingress rule.
    pub fn new(declared: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            match_spec: Some(PathMatch::compile(declared)?),
            preserve_host: true,
            ..Default::default()
        })
    }

    /// The host's default path, used when nothing else matches.
    pub fn new_default() -> Self {
        Self {
            match_spec: None,
            preserve_host: true,
            ..Default::default()
        }
    }

    pub fn match_spec(&self) -> Option<&PathMatch> {
        self.match_spec.as_ref()
    }

    pub fn is_default(&self) -> bool {
        self.match_spec.is_none()
    }

    /// Match a request path, returning the matched prefix length.
    /// The default path matches nothing explicitly.
    pub fn matches(&self, path: &str) -> Option<usize> {
        self.match_spec.as_ref()?.matches(path)
    }

    /// Select the next backend target, rotating across calls.
    ///
    /// Selection is not sticky; concurrent callers may observe the same
    /// target under contention, which is acceptable for load spreading.
    pub fn pick_target(&self) -> Option<&RemapTarget> {
        if self.targets.is_empty() {
            return None;
        }
        let n = self.cursor.fetch_add(1, Ordering::Relaxed);
        Some(&self.targets[n % self.targets.len()])
    }

    /// Outbound protocol for this path's backends.
    pub fn backend_protocol(&self) -> &'static str {
        if self.secure_backends {
            "https"
        } else {
            "http"
        }
    }
}
