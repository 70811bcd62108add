//! Resource resolver
//!
//! Turns `(method, IRI, Accept)` into a response by asking the triple store
//! whether the resource exists and, if it does, streaming its graph back.
//!
//! Two queries are issued sequentially per request:
//!
//! 1. an ASK query built from the resource or container "exists" template,
//! 2. a DESCRIBE/CONSTRUCT query built from the matching "graph" template.
//!
//! The second query is never sent unless the first one answered `true`.
//! A trailing-slash IRI is a container when `resourceNoSlash` is set.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{HeaderMap, CONTENT_ENCODING};
use reqwest::{Method, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::sparql::{ClientError, GraphResponse, QueryOptions, QueryTemplate, SparqlClient};

/// Characters kept verbatim when embedding an IRI in a query: alphanumerics
/// plus the reserved and unreserved URI punctuation.
const IRI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

/// Percent-encode an IRI for safe embedding in a query string
///
/// Existing `%XX` escapes are kept as they are; a `%` that does not start an
/// escape is encoded as `%25`.
pub fn encode_iri(iri: &str) -> String {
    let bytes = iri.as_bytes();
    let mut encoded = String::with_capacity(iri.len());
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if is_escape(&bytes[i..]) {
            encoded.extend(utf8_percent_encode(&iri[start..i], IRI_ENCODE_SET));
            encoded.push_str(&iri[i..i + 3]);
            i += 3;
            start = i;
        } else {
            i += 1;
        }
    }
    encoded.extend(utf8_percent_encode(&iri[start..], IRI_ENCODE_SET));

    encoded
}

fn is_escape(bytes: &[u8]) -> bool {
    bytes.len() >= 3 && bytes[0] == b'%' && bytes[1].is_ascii_hexdigit() && bytes[2].is_ascii_hexdigit()
}

/// What an IRI names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A single resource
    Resource,
    /// Every resource sharing the IRI as prefix
    Container,
}

/// Why a request produced no graph
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Existence query failed with an upstream status
    #[error("SPARQL endpoint returned {0}")]
    UpstreamStatus(StatusCode),

    /// Existence query answered false
    #[error("Resource not found")]
    NotFound,

    /// Graph query succeeded without a body
    #[error("Graph query returned no body")]
    NoStream,

    /// Any other client failure
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Outcome of resolving one request
#[derive(Debug)]
pub enum Resolution {
    /// The resolver answers the request
    Found(GraphResponse),
    /// No opinion; the next handler should respond
    NotApplicable,
    /// The existence query failed with this status
    Upstream(StatusCode),
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

impl From<ResolveError> for Resolution {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::UpstreamStatus(status) => Resolution::Upstream(status),
            ResolveError::NotFound | ResolveError::NoStream | ResolveError::Client(_) => {
                Resolution::NotApplicable
            }
        }
    }
}

/// Resolves resource IRIs against a SPARQL endpoint
pub struct ResourceResolver<C> {
    client: C,
    config: ResolverConfig,
    options: QueryOptions,
    resource_exists: QueryTemplate,
    resource_graph: QueryTemplate,
    container_exists: QueryTemplate,
    container_graph: QueryTemplate,
}

impl<C: SparqlClient> ResourceResolver<C> {
    /// Create a resolver; the configuration is fixed from here on
    pub fn new(config: ResolverConfig, client: C) -> Self {
        Self {
            client,
            options: QueryOptions::from_config(&config),
            resource_exists: QueryTemplate::new(config.resource_exists_query.as_str()),
            resource_graph: QueryTemplate::new(config.resource_graph_query.as_str()),
            container_exists: QueryTemplate::new(config.container_exists_query.as_str()),
            container_graph: QueryTemplate::new(config.container_graph_query.as_str()),
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Classify an (already encoded) IRI
    pub fn classify(&self, iri: &str) -> Target {
        if self.config.resource_no_slash && iri.ends_with('/') {
            Target::Container
        } else {
            Target::Resource
        }
    }

    pub fn exists_query(&self, target: Target, iri: &str) -> String {
        match target {
            Target::Resource => self.resource_exists.instantiate(iri),
            Target::Container => self.container_exists.instantiate(iri),
        }
    }

    pub fn graph_query(&self, target: Target, iri: &str) -> String {
        match target {
            Target::Resource => self.resource_graph.instantiate(iri),
            Target::Container => self.container_graph.instantiate(iri),
        }
    }

    /// Resolve a request for `iri`
    pub async fn resolve(&self, method: &Method, iri: &str, accept: Option<&str>) -> Resolution {
        let head = match *method {
            Method::GET => false,
            Method::HEAD if self.config.handle_head => true,
            _ => return Resolution::NotApplicable,
        };

        match self.try_resolve(head, iri, accept).await {
            Ok(response) => Resolution::Found(response),
            Err(ResolveError::Client(e)) => {
                warn!("SPARQL request for <{}> failed: {}", iri, e);
                Resolution::NotApplicable
            }
            Err(e) => {
                debug!("No graph for <{}>: {}", iri, e);
                e.into()
            }
        }
    }

    async fn try_resolve(
        &self,
        head: bool,
        iri: &str,
        accept: Option<&str>,
    ) -> Result<GraphResponse, ResolveError> {
        let iri = encode_iri(iri);
        let target = self.classify(&iri);
        debug!("handle {} request for IRI <{}> as {:?}", if head { "HEAD" } else { "GET" }, iri, target);

        self.exists(target, &iri).await?;

        if head {
            return Ok(GraphResponse {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: None,
            });
        }

        self.graph(target, &iri, accept).await
    }

    async fn exists(&self, target: Target, iri: &str) -> Result<(), ResolveError> {
        let query = self.exists_query(target, iri);
        debug!("SPARQL exists query for IRI <{}>: {}", iri, query);

        match self.client.ask(&query, &self.options).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ResolveError::NotFound),
            Err(ClientError::Status(status)) => Err(ResolveError::UpstreamStatus(status)),
            Err(e) => Err(e.into()),
        }
    }

    async fn graph(
        &self,
        target: Target,
        iri: &str,
        accept: Option<&str>,
    ) -> Result<GraphResponse, ResolveError> {
        let query = self.graph_query(target, iri);
        debug!("SPARQL graph query for IRI <{}>: {}", iri, query);

        let options = self.options.clone().with_accept(accept.map(str::to_string));
        let mut response = self.client.construct(&query, &options).await?;

        if response.status != StatusCode::OK {
            return Err(ClientError::Status(response.status).into());
        }
        let body = response.body.take().ok_or(ResolveError::NoStream)?;

        // reqwest has already decoded the content encoding
        response.headers.remove(CONTENT_ENCODING);

        Ok(GraphResponse {
            status: StatusCode::OK,
            headers: response.headers,
            body: Some(body),
        })
    }
}
