//! Ingress annotation handling.
//!
//! Annotations are the policy configuration surface: everything from TLS
//! enforcement to cache tuning arrives as `ingress.kubernetes.io/<suffix>`
//! string pairs. Unknown annotations are ignored; recognized ones with
//! unparseable values are logged and skipped.

use std::collections::HashMap;
use std::time::Duration;

use crate::cluster::Namespace;
use crate::config::EngineConfig;
use crate::remap::auth::{AddressList, Credentials};
use crate::remap::host::{RemapHost, TlsVersion};
use crate::remap::path::RemapPath;

/// The class annotation lives outside the policy prefix.
pub const INGRESS_CLASS: &str = "kubernetes.io/ingress.class";

const PREFIX: &str = "ingress.kubernetes.io/";

fn get<'a>(annotations: &'a HashMap<String, String>, suffix: &str) -> Option<&'a str> {
    annotations.get(&format!("{PREFIX}{suffix}")).map(String::as_str)
}

fn get_bool(annotations: &HashMap<String, String>, suffix: &str) -> Option<bool> {
    match get(annotations, suffix)? {
        "true" => Some(true),
        "false" => Some(false),
        other => {
            tracing::debug!(suffix, value = other, "boolean annotation is neither true nor false, ignored");
            None
        }
    }
}

fn get_parsed<T: std::str::FromStr>(annotations: &HashMap<String, String>, suffix: &str) -> Option<T> {
    let raw = get(annotations, suffix)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::debug!(suffix, value = raw, "unparseable annotation value, ignored");
            None
        }
    }
}

fn get_globs(annotations: &HashMap<String, String>, suffix: &str) -> Vec<glob::Pattern> {
    let Some(raw) = get(annotations, suffix) else {
        return Vec::new();
    };
    raw.split_whitespace()
        .filter_map(|pat| match glob::Pattern::new(pat) {
            Ok(p) => Some(p),
            Err(err) => {
                tracing::warn!(suffix, pattern = pat, %err, "bad glob pattern, ignored");
                None
            }
        })
        .collect()
}

/// Fold an Ingress's annotations into one path's policy bundle.
pub(crate) fn apply_path_annotations(
    path: &mut RemapPath,
    annotations: &HashMap<String, String>,
    namespace: &Namespace,
    config: &EngineConfig,
) {
    if let Some("basic") = get(annotations, "auth-type") {
        path.credentials = Some(load_credentials(annotations, namespace));
        path.auth_realm = Some(
            get(annotations, "auth-realm")
                .unwrap_or(&config.auth_realm)
                .to_string(),
        );
    }

    if let Some(ranges) = get(annotations, "whitelist-source-range") {
        path.address_list = AddressList::parse(ranges);
    }

    if let Some(target) = get(annotations, "rewrite-target") {
        path.rewrite_target = Some(target.trim_start_matches('/').to_string());
    }

    if let Some(root) = get(annotations, "app-root") {
        path.app_root = Some(root.to_string());
    }

    let force = get_bool(annotations, "force-ssl-redirect").unwrap_or(false);
    let redirect = get_bool(annotations, "ssl-redirect").unwrap_or(false);
    path.force_tls = force || redirect;

    if let Some(v) = get_bool(annotations, "secure-backends") {
        path.secure_backends = v;
    }
    if let Some(v) = get_bool(annotations, "preserve-host") {
        path.preserve_host = v;
    }
    if let Some(v) = get_bool(annotations, "follow-redirects") {
        path.follow_redirects = v;
    }
    if let Some(v) = get_bool(annotations, "server-push") {
        path.server_push = v;
    }
    if let Some(v) = get_bool(annotations, "enable-compression") {
        path.compress = v;
    }

    if let Some(secs) = get_parsed::<u64>(annotations, "proxy-read-timeout") {
        path.read_timeout = Some(Duration::from_secs(secs));
    }

    if let Some(v) = get_bool(annotations, "cache-enabled") {
        path.cache = v;
    }
    if let Some(generation) = get_parsed::<i64>(annotations, "cache-generation") {
        path.cache_generation = generation;
    }

    path.ignore_params = get_globs(annotations, "cache-ignore-query-params");
    if let Some(names) = get(annotations, "cache-whitelist-query-params") {
        path.whitelist_params = names.split_whitespace().map(str::to_string).collect();
    }
    path.ignore_cookies = get_globs(annotations, "cache-ignore-cookies");
}

/// Host-level settings: HSTS, HTTP/2, TLS floor.
pub(crate) fn apply_host_annotations(host: &mut RemapHost, annotations: &HashMap<String, String>) {
    if let Some(age) = get_parsed::<u32>(annotations, "hsts-max-age") {
        host.hsts_max_age = Some(age);
    }
    if let Some(v) = get_bool(annotations, "hsts-include-subdomains") {
        host.hsts_include_subdomains = v;
    }
    if let Some(v) = get_bool(annotations, "http2") {
        host.http2 = v;
    }
    if let Some(raw) = get(annotations, "tls-minimum-version") {
        match TlsVersion::parse(raw) {
            Some(v) => host.tls_min_version = v,
            None => tracing::debug!(value = raw, "unknown TLS version annotation, ignored"),
        }
    }
}

fn load_credentials(annotations: &HashMap<String, String>, namespace: &Namespace) -> Credentials {
    let Some(secret_name) = get(annotations, "auth-secret") else {
        tracing::warn!("auth-type basic without auth-secret; all requests will be refused");
        return Credentials::default();
    };
    let Some(secret) = namespace.secret(secret_name) else {
        tracing::warn!(
            namespace = namespace.name(),
            secret = secret_name,
            "auth secret not found; all requests will be refused"
        );
        return Credentials::default();
    };
    match secret.data_decoded("auth") {
        Some(data) => Credentials::parse(&data),
        None => {
            tracing::warn!(
                namespace = namespace.name(),
                secret = secret_name,
                "auth secret has no usable auth entry; all requests will be refused"
            );
            Credentials::default()
        }
    }
}
