//! Request dispatch.
//!
//! # Data Flow
//! ```text
//! Request (host, path, query, headers, client address)
//!     → engine.rs (validate → host → path → policy pipeline)
//!     → query.rs (outbound query filtering)
//!     → cache_key.rs (cache partitioning token)
//!     → Dispatch::Proxy / Dispatch::Synthetic, or a DispatchError
//! ```
//!
//! # Design Decisions
//! - Stateless against the snapshot: any number of concurrent dispatches
//! - Redirects and refusals are ordinary return values, not panics
//! - Deferred outcomes (no host, no path) are distinct from terminal
//!   errors so the caller can hand the request to another handler

pub mod cache_key;
pub mod engine;
pub mod query;
pub mod resolver;

pub use cache_key::make_cache_key;
pub use engine::{dispatch, CachePolicy, Dispatch, DispatchError, ProxyAction, Request, Synthetic};
pub use query::filter_query;
pub use resolver::resolve_target;
