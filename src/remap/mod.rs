//! The compiled routing table.
//!
//! # Data Flow
//! ```text
//! ClusterState snapshot + EngineConfig
//!     → db.rs (RemapDatabase::from_cluster)
//!     → host.rs / path.rs (per-host, per-path units)
//!     → annotations.rs (policy bundle from Ingress annotations)
//!     → tls.rs (rustls contexts from TLS Secrets)
//!     → Frozen RemapDatabase, published via the snapshot slot
//! ```
//!
//! # Design Decisions
//! - Tables compiled in one pass, immutable afterwards
//! - The database owns every host and path exclusively; dropping a
//!   snapshot frees the whole tree
//! - Literal paths match before patterns; declaration order is preserved
//! - Malformed objects are skipped with a log line, never fatal

pub mod annotations;
pub mod auth;
pub mod db;
pub mod host;
pub mod path;
pub mod tls;

pub use auth::{AddressList, Credentials};
pub use db::RemapDatabase;
pub use host::{RemapHost, TlsVersion};
pub use path::{PathMatch, RemapPath, RemapTarget};
