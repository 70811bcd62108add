//! HTTP integration
//!
//! `resolve_resource` is an axum middleware that can be put in front of any
//! router; `HttpServer` is a ready-made server built around it.
//!
//! ```rust,ignore
//! let resolver = Arc::new(ResourceResolver::new(config, client));
//! let state = ResolverState::new(resolver, None);
//! let app = Router::new()
//!     .route("/", get(index))
//!     .layer(middleware::from_fn_with_state(state, resolve_resource::<HttpSparqlClient>));
//! ```

pub mod handler;
pub mod server;

pub use handler::{decode_path, request_iri, resolve_resource, ResolverState, ResourceIri};
pub use server::HttpServer;
