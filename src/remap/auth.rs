//! Compiled authorization material: CIDR allow-lists and basic-auth
//! credentials, both built once per table and checked per request.

use std::collections::HashMap;
use std::net::IpAddr;

use sha2::{Digest, Sha256};

/// One CIDR network, IPv4 or IPv6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cidr {
    addr: IpAddr,
    prefix_len: u8,
}

impl Cidr {
    /// Parse `a.b.c.d/len` or `addr6/len`; a bare address gets a full-length
    /// prefix.
    pub fn parse(s: &str) -> Option<Self> {
        let (addr_part, len_part) = match s.split_once('/') {
            Some((a, l)) => (a, Some(l)),
            None => (s, None),
        };
        let addr: IpAddr = addr_part.parse().ok()?;
        let max = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        let prefix_len = match len_part {
            Some(l) => l.parse().ok().filter(|n| *n <= max)?,
            None => max,
        };
        Some(Self { addr, prefix_len })
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.addr, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let shift = 32 - self.prefix_len as u32;
                if shift == 32 {
                    return true;
                }
                (u32::from(net) >> shift) == (u32::from(ip) >> shift)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let shift = 128 - self.prefix_len as u32;
                if shift == 128 {
                    return true;
                }
                (u128::from(net) >> shift) == (u128::from(ip) >> shift)
            }
            _ => false,
        }
    }
}

/// An ordered set of permitted client networks. Empty means "no address
/// restriction".
#[derive(Debug, Clone, Default)]
pub struct AddressList {
    networks: Vec<Cidr>,
}

impl AddressList {
    /// Parse a comma- or whitespace-separated CIDR list. Entries that do
    /// not parse are dropped with a log line.
    pub fn parse(s: &str) -> Self {
        let mut networks = Vec::new();
        for entry in s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|e| !e.is_empty())
        {
            match Cidr::parse(entry) {
                Some(net) => networks.push(net),
                None => tracing::warn!(entry, "unparseable CIDR in source range, ignored"),
            }
        }
        Self { networks }
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        self.networks.iter().any(|net| net.contains(ip))
    }
}

/// Basic-auth credential set, loaded from an htpasswd-style secret.
///
/// Supported entry forms: `user:password` (plain) and
/// `user:{SHA256}<base64 digest>`. The crypt(3) and MD5 schemes some
/// htpasswd files carry are not recognized; such entries never verify.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    users: HashMap<String, PasswordEntry>,
}

#[derive(Debug, Clone)]
enum PasswordEntry {
    Plain(String),
    Sha256(Vec<u8>),
}

impl Credentials {
    /// Parse htpasswd-format bytes: one `user:secret` pair per line,
    /// `#` comments and blank lines skipped.
    pub fn parse(data: &[u8]) -> Self {
        let mut users = HashMap::new();
        for line in String::from_utf8_lossy(data).lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((user, secret)) = line.split_once(':') else {
                tracing::warn!("credential line without ':' separator, ignored");
                continue;
            };
            let entry = match secret.strip_prefix("{SHA256}") {
                Some(b64) => {
                    use base64::engine::general_purpose::STANDARD;
                    use base64::Engine;
                    match STANDARD.decode(b64.trim()) {
                        Ok(digest) => PasswordEntry::Sha256(digest),
                        Err(_) => {
                            tracing::warn!(user, "bad SHA256 digest encoding, entry ignored");
                            continue;
                        }
                    }
                }
                None => PasswordEntry::Plain(secret.to_string()),
            };
            users.insert(user.to_string(), entry);
        }
        Self { users }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Check one username/password pair.
    pub fn verify(&self, user: &str, password: &str) -> bool {
        match self.users.get(user) {
            Some(PasswordEntry::Plain(expected)) => expected == password,
            Some(PasswordEntry::Sha256(digest)) => {
                Sha256::digest(password.as_bytes()).as_slice() == digest.as_slice()
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    #[test]
    fn test_cidr_v4() {
        let net = Cidr::parse("10.0.0.0/8").unwrap();
        assert!(net.contains("10.255.1.2".parse().unwrap()));
        assert!(!net.contains("11.0.0.1".parse().unwrap()));
        assert!(!net.contains("::1".parse().unwrap()));
    }

    #[test]
    fn test_cidr_host_and_zero_prefix() {
        let host = Cidr::parse("127.0.0.1").unwrap();
        assert!(host.contains("127.0.0.1".parse().unwrap()));
        assert!(!host.contains("127.0.0.2".parse().unwrap()));

        let all = Cidr::parse("0.0.0.0/0").unwrap();
        assert!(all.contains("203.0.113.9".parse().unwrap()));
    }

    #[test]
    fn test_cidr_v6() {
        let net = Cidr::parse("2001:db8::/32").unwrap();
        assert!(net.contains("2001:db8::1".parse().unwrap()));
        assert!(!net.contains("2001:db9::1".parse().unwrap()));
    }

    #[test]
    fn test_address_list_mixed_separators() {
        let list = AddressList::parse("127.0.0.1/32, 10.0.0.0/8 junk 192.168.0.0/16");
        assert!(list.contains("10.1.2.3".parse().unwrap()));
        assert!(list.contains("192.168.4.5".parse().unwrap()));
        assert!(!list.contains("172.16.0.1".parse().unwrap()));
    }

    #[test]
    fn test_plain_credentials() {
        let creds = Credentials::parse(b"plaintest:plaintest\n");
        assert!(creds.verify("plaintest", "plaintest"));
        assert!(!creds.verify("plaintest", "plainxtest"));
        assert!(!creds.verify("nobody", "plaintest"));
    }

    #[test]
    fn test_sha256_credentials() {
        let digest = sha2::Sha256::digest(b"s3cret");
        let line = format!("alice:{{SHA256}}{}\n", STANDARD.encode(digest));
        let creds = Credentials::parse(line.as_bytes());
        assert!(creds.verify("alice", "s3cret"));
        assert!(!creds.verify("alice", "wrong"));
    }

    #[test]
    fn test_comments_and_junk_skipped() {
        let creds = Credentials::parse(b"# staff\nbob:pw\nnot-a-pair\n");
        assert!(creds.verify("bob", "pw"));
        assert!(!creds.verify("not-a-pair", ""));
    }
}
