//! SPARQL protocol client
//!
//! The resolver only needs two query forms: ASK for existence checks and
//! CONSTRUCT/DESCRIBE for graph retrieval. `SparqlClient` abstracts over the
//! transport; `HttpSparqlClient` speaks the SPARQL 1.1 protocol over reqwest.

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::ResolverConfig;

/// Accept header sent with ASK queries
pub const ASK_ACCEPT: &str = "application/sparql-results+json";
/// Accept header sent with graph queries when the caller has no preference
pub const DEFAULT_GRAPH_ACCEPT: &str = "application/n-triples";

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Endpoint answered with a non-200 status
    #[error("SPARQL endpoint returned {0}")]
    Status(StatusCode),

    /// Connection, timeout or body transfer failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be interpreted
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Request could not be built from the given options
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Status reported by the endpoint, if the failure carries one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status(status) => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => ClientError::Status(status),
            None if e.is_decode() => ClientError::Decode(e.to_string()),
            None => ClientError::Transport(e.to_string()),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Streamed response body
pub type BodyStream = BoxStream<'static, ClientResult<Bytes>>;

/// Build an HTTP Basic `Authorization` value
pub fn basic_auth_header(user: &str, password: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", user, password));
    format!("Basic {}", encoded)
}

/// Per-request options passed to the client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Value of the `Authorization` header
    pub authorization: Option<String>,
    /// Value of the `Accept` header for graph queries
    pub accept: Option<String>,
}

impl QueryOptions {
    /// Options derived from configuration (authentication only)
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            authorization: config
                .credentials()
                .map(|auth| basic_auth_header(&auth.user, &auth.password)),
            accept: None,
        }
    }

    /// Set the accept header
    pub fn with_accept(mut self, accept: Option<String>) -> Self {
        self.accept = accept;
        self
    }
}

/// Result of a graph query
pub struct GraphResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<BodyStream>,
}

impl fmt::Debug for GraphResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|_| "<stream>"))
            .finish()
    }
}

/// Interface to a SPARQL query endpoint
#[async_trait]
pub trait SparqlClient: Send + Sync {
    /// Run an ASK query
    async fn ask(&self, query: &str, options: &QueryOptions) -> ClientResult<bool>;

    /// Run a CONSTRUCT or DESCRIBE query, streaming the serialized graph
    async fn construct(&self, query: &str, options: &QueryOptions) -> ClientResult<GraphResponse>;
}

/// SPARQL 1.1 protocol client using HTTP GET
pub struct HttpSparqlClient {
    endpoint: Url,
    client: Client,
}

impl HttpSparqlClient {
    /// Create a client for `endpoint` with the given request timeout
    pub fn new(endpoint: Url, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self::with_client(endpoint, client))
    }

    /// Create a client reusing an existing reqwest client
    pub fn with_client(endpoint: Url, client: Client) -> Self {
        Self { endpoint, client }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request(&self, query: &str, options: &QueryOptions, accept: &str) -> ClientResult<RequestBuilder> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("query", query);

        let accept = HeaderValue::from_str(accept)
            .map_err(|e| ClientError::InvalidRequest(format!("accept header: {}", e)))?;
        let mut request = self.client.get(url).header(ACCEPT, accept);

        if let Some(authorization) = &options.authorization {
            let value = HeaderValue::from_str(authorization)
                .map_err(|e| ClientError::InvalidRequest(format!("authorization header: {}", e)))?;
            request = request.header(AUTHORIZATION, value);
        }

        Ok(request)
    }
}

#[derive(Deserialize)]
struct AskResponse {
    boolean: bool,
}

#[async_trait]
impl SparqlClient for HttpSparqlClient {
    async fn ask(&self, query: &str, options: &QueryOptions) -> ClientResult<bool> {
        let resp = self.request(query, options, ASK_ACCEPT)?.send().await?;

        if resp.status() != StatusCode::OK {
            return Err(ClientError::Status(resp.status()));
        }

        let result: AskResponse = resp
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        debug!("ASK answered {}", result.boolean);

        Ok(result.boolean)
    }

    async fn construct(&self, query: &str, options: &QueryOptions) -> ClientResult<GraphResponse> {
        let accept = options.accept.as_deref().unwrap_or(DEFAULT_GRAPH_ACCEPT);
        let resp = self.request(query, options, accept)?.send().await?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(ClientError::Status(status));
        }

        let headers = resp.headers().clone();
        let body = resp.bytes_stream().map_err(ClientError::from).boxed();

        Ok(GraphResponse {
            status,
            headers,
            body: Some(body),
        })
    }
}
