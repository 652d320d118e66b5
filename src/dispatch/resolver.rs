//! Asynchronous resolution of DNS-named backend targets.
//!
//! ClusterIP backends carry literal addresses and never get here. Targets
//! backed by ExternalName services hold a DNS name; the dispatching task
//! awaits the lookup instead of blocking a thread, and dropping the
//! future — the natural effect of a client disconnect — abandons the
//! lookup without leaking any pending state.

use std::io;
use std::net::SocketAddr;

use tokio::net::lookup_host;

use crate::remap::RemapTarget;

/// Resolve a target to a socket address. Literal IPs complete
/// immediately; names go through the resolver.
pub async fn resolve_target(target: &RemapTarget) -> io::Result<SocketAddr> {
    if let Some(ip) = target.ip() {
        return Ok(SocketAddr::new(ip, target.port));
    }

    tracing::debug!(target = %target, "resolving external backend");
    lookup_host((target.host.as_str(), target.port))
        .await?
        .next()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: name resolved to no addresses", target.host),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_literal_ip_is_immediate() {
        let target = RemapTarget {
            host: "172.28.35.130".to_string(),
            port: 8080,
        };
        let addr = resolve_target(&target).await.unwrap();
        assert_eq!(addr.to_string(), "172.28.35.130:8080");
    }

    #[tokio::test]
    async fn test_v6_literal() {
        let target = RemapTarget {
            host: "::1".to_string(),
            port: 9000,
        };
        let addr = resolve_target(&target).await.unwrap();
        assert!(addr.is_ipv6());
        assert_eq!(addr.port(), 9000);
    }
}
