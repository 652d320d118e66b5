//! The per-request decision pipeline.

use std::net::IpAddr;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::{HeaderMap, HeaderValue, AUTHORIZATION, LOCATION};
use http::StatusCode;
use thiserror::Error;

use crate::dispatch::cache_key::make_cache_key;
use crate::dispatch::query::filter_query;
use crate::remap::auth::Credentials;
use crate::remap::{RemapDatabase, RemapTarget};

/// One incoming request, as the proxy runtime hands it to the engine.
///
/// The host has its port already stripped; the path carries no leading
/// slash and may be absent entirely.
#[derive(Debug, Default)]
pub struct Request {
    pub protocol: String,
    pub host: String,
    pub path: Option<String>,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub client_addr: Option<IpAddr>,
}

/// Terminal and deferred dispatch outcomes that are not proxy decisions.
///
/// `NoHost` and `NoPath` are *deferred*: the request is not ours, and the
/// caller may hand it to another handler. Every other variant is
/// *terminal* and maps to a fixed response status.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("invalid or missing host")]
    InvalidHost,

    #[error("invalid or missing protocol")]
    InvalidProtocol,

    #[error("hostname not in the routing table")]
    NoHost,

    #[error("no path matched and no default registered")]
    NoPath,

    #[error("client address not permitted")]
    Forbidden,

    #[error("authentication required")]
    Unauthorized { realm: String },

    #[error("no backend available")]
    NoBackend,
}

impl DispatchError {
    /// The fixed response status, or None for deferred outcomes.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::InvalidHost | Self::InvalidProtocol => Some(StatusCode::BAD_REQUEST),
            Self::Forbidden => Some(StatusCode::FORBIDDEN),
            Self::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            Self::NoBackend => Some(StatusCode::SERVICE_UNAVAILABLE),
            Self::NoHost | Self::NoPath => None,
        }
    }

    /// True when the engine declines the request rather than failing it.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::NoHost | Self::NoPath)
    }
}

/// A response the caller should emit directly, without contacting any
/// backend. Used for redirects.
#[derive(Debug)]
pub struct Synthetic {
    pub status: StatusCode,
    pub reason: &'static str,
    pub headers: HeaderMap,
    pub body: String,
}

impl Synthetic {
    fn redirect(location: &str) -> Self {
        let mut headers = HeaderMap::new();
        match HeaderValue::from_str(location) {
            Ok(value) => {
                headers.insert(LOCATION, value);
            }
            Err(err) => {
                tracing::warn!(location, %err, "redirect location not header-safe");
            }
        }
        Self {
            status: StatusCode::MOVED_PERMANENTLY,
            reason: "Moved",
            headers,
            body: "This document has moved.\r\n".to_string(),
        }
    }

    /// The Location header, if one was set.
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }
}

/// Response caching directive for a proxied request.
#[derive(Debug, PartialEq, Eq)]
pub struct CachePolicy {
    pub generation: i64,
    pub key: Vec<u8>,
}

/// Everything the proxy runtime needs to forward one request upstream.
#[derive(Debug)]
pub struct ProxyAction {
    pub target: RemapTarget,
    pub protocol: &'static str,
    /// Rewritten outbound path, without a leading slash.
    pub path: Option<String>,
    /// Filtered outbound query string.
    pub query: Option<String>,
    /// Extra response headers to attach.
    pub headers: HeaderMap,

    pub preserve_host: bool,
    pub follow_redirects: bool,
    pub compress: bool,
    pub server_push: bool,
    pub x_forwarded_proto: bool,
    pub read_timeout: Option<Duration>,

    pub hsts_max_age: Option<u32>,
    pub hsts_include_subdomains: bool,

    pub cache: Option<CachePolicy>,

    /// Pending cookie-name globs for request cookie scrubbing.
    pub ignore_cookies: Vec<glob::Pattern>,
}

impl ProxyAction {
    /// Whether a request cookie should be dropped before caching. The
    /// caller strips matching cookies and may cache the request if none
    /// remain.
    pub fn should_ignore_cookie(&self, name: &str) -> bool {
        self.ignore_cookies.iter().any(|glob| glob.matches(name))
    }
}

/// A dispatch decision: proxy upstream, or answer directly.
#[derive(Debug)]
pub enum Dispatch {
    Proxy(ProxyAction),
    Synthetic(Synthetic),
}

/// Run the matching and policy pipeline for one request against one
/// routing-table snapshot.
///
/// Read-only against the snapshot; callers on any number of tasks may
/// dispatch against the same database concurrently.
pub fn dispatch(db: &RemapDatabase, request: &Request) -> Result<Dispatch, DispatchError> {
    let protocol = request.protocol.to_ascii_lowercase();
    if protocol != "http" && protocol != "https" {
        return Err(DispatchError::InvalidProtocol);
    }
    if request.host.is_empty()
        || request
            .host
            .contains(|c: char| c.is_whitespace() || c == '/' || c == ':')
    {
        return Err(DispatchError::InvalidHost);
    }

    let host = db.host(&request.host).ok_or(DispatchError::NoHost)?;

    let path_str = request.path.as_deref().unwrap_or("");
    let (path, prefix_len) = host.find_path(path_str).ok_or(DispatchError::NoPath)?;

    // An empty request at the default path goes to the app root, if set.
    if path.is_default() && path_str.is_empty() {
        if let Some(root) = &path.app_root {
            tracing::debug!(host = %request.host, root = %root, "redirecting to app root");
            return Ok(Dispatch::Synthetic(Synthetic::redirect(root)));
        }
    }

    if path.force_tls && protocol != "https" {
        let location = format!("https://{}/{}", request.host, path_str);
        tracing::debug!(host = %request.host, "redirecting to TLS");
        return Ok(Dispatch::Synthetic(Synthetic::redirect(&location)));
    }

    // The address check runs before any credential check, always.
    if !path.address_list.is_empty() {
        let permitted = request
            .client_addr
            .is_some_and(|ip| path.address_list.contains(ip));
        if !permitted {
            tracing::debug!(host = %request.host, addr = ?request.client_addr, "client address refused");
            return Err(DispatchError::Forbidden);
        }
    }

    if let Some(credentials) = &path.credentials {
        check_basic_auth(request, credentials, path.auth_realm.as_deref())?;
    }

    let target = path.pick_target().ok_or(DispatchError::NoBackend)?.clone();

    let out_path = rewrite_path(path_str, prefix_len, path.rewrite_target.as_deref());
    let out_query = request
        .query
        .as_deref()
        .map(|raw| filter_query(path, raw))
        .filter(|q| !q.is_empty());

    let cache = path.cache.then(|| CachePolicy {
        generation: path.cache_generation,
        key: make_cache_key(
            &protocol,
            &request.host,
            out_path.as_deref(),
            out_query.as_deref(),
        ),
    });

    Ok(Dispatch::Proxy(ProxyAction {
        target,
        protocol: path.backend_protocol(),
        path: out_path,
        query: out_query,
        headers: HeaderMap::new(),
        preserve_host: path.preserve_host,
        follow_redirects: path.follow_redirects,
        compress: path.compress,
        server_push: path.server_push,
        x_forwarded_proto: db.x_forwarded_proto(),
        read_timeout: path.read_timeout,
        hsts_max_age: host.hsts_max_age,
        hsts_include_subdomains: host.hsts_include_subdomains,
        cache,
        ignore_cookies: path.ignore_cookies.clone(),
    }))
}

fn unauthorized(realm: Option<&str>) -> DispatchError {
    DispatchError::Unauthorized {
        realm: realm.unwrap_or("Authentication Required").to_string(),
    }
}

fn check_basic_auth(
    request: &Request,
    credentials: &Credentials,
    realm: Option<&str>,
) -> Result<(), DispatchError> {
    let value = request
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| unauthorized(realm))?;

    let encoded = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("basic") => rest.trim(),
        _ => return Err(unauthorized(realm)),
    };

    let decoded = STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| unauthorized(realm))?;

    let (user, password) = decoded.split_once(':').ok_or_else(|| unauthorized(realm))?;

    if credentials.verify(user, password) {
        Ok(())
    } else {
        Err(unauthorized(realm))
    }
}

/// Replace the matched prefix with the rewrite target, keeping the
/// remainder: prefix `foo`, rewrite `app`, path `foo/bar` → `app/bar`.
fn rewrite_path(path: &str, prefix_len: usize, rewrite: Option<&str>) -> Option<String> {
    let Some(rewrite) = rewrite else {
        return (!path.is_empty()).then(|| path.to_string());
    };

    let remainder = path[prefix_len..].trim_start_matches('/');
    let rewritten = if remainder.is_empty() {
        rewrite.to_string()
    } else if rewrite.is_empty() {
        remainder.to_string()
    } else {
        format!("{}/{}", rewrite.trim_end_matches('/'), remainder)
    };

    (!rewritten.is_empty()).then_some(rewritten)
}
