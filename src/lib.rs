//! SPARQL Resource Resolver
//!
//! Serves Linked-Data resources straight out of a triple store. A request for
//! a resource IRI is answered in two steps against a SPARQL endpoint:
//!
//! - an ASK query checks that the resource (or, for trailing-slash IRIs, a
//!   container of resources) exists,
//! - a DESCRIBE/CONSTRUCT query fetches its graph, which is streamed back to
//!   the client in whatever serialization the `Accept` header asked for.
//!
//! Requests the resolver has no answer for are passed on to the next handler.
//!
//! ## Example Usage
//!
//! ```rust
//! use sparql_resolver::{ResolverConfig, ResourceResolver, HttpSparqlClient, Target};
//! use std::time::Duration;
//!
//! let endpoint = "http://localhost:3030/ds/query".parse().unwrap();
//! let client = HttpSparqlClient::new(endpoint, Duration::from_secs(30)).unwrap();
//! let resolver = ResourceResolver::new(ResolverConfig::default(), client);
//!
//! assert_eq!(resolver.classify("http://example.org/people/"), Target::Container);
//! assert_eq!(
//!     resolver.exists_query(Target::Resource, "http://example.org/alice"),
//!     "ASK { <http://example.org/alice> ?p ?o }"
//! );
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod http;
pub mod resolver;
pub mod sparql;

// Re-export main types for convenience
pub use config::{AppConfig, Authentication, ConfigError, ConfigResult, ResolverConfig, ServerConfig};

pub use http::{resolve_resource, HttpServer, ResolverState, ResourceIri};

pub use resolver::{encode_iri, Resolution, ResolveError, ResourceResolver, Target};

pub use sparql::{
    ClientError, ClientResult, GraphResponse, HttpSparqlClient, QueryOptions, QueryTemplate,
    SparqlClient,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
