//! SPARQL query support
//!
//! Query templates and the protocol client used to talk to the triple store.
//!
//! # Example
//!
//! ```rust
//! use sparql_resolver::sparql::{QueryTemplate, basic_auth_header};
//!
//! let template = QueryTemplate::new("ASK { <${iri}> ?p ?o }");
//! assert_eq!(template.instantiate("http://ex/a"), "ASK { <http://ex/a> ?p ?o }");
//! assert_eq!(basic_auth_header("user", "password"), "Basic dXNlcjpwYXNzd29yZA==");
//! ```

mod client;
mod template;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{
    basic_auth_header, BodyStream, ClientError, ClientResult, GraphResponse, HttpSparqlClient,
    QueryOptions, SparqlClient, ASK_ACCEPT, DEFAULT_GRAPH_ACCEPT,
};
pub use template::{QueryTemplate, IRI_PLACEHOLDER};
