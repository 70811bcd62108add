//! Configuration for the resolver and the HTTP server
//!
//! Configuration is read once at startup, usually from a YAML file, and is
//! immutable afterwards. Keys use camelCase in YAML; every key that is left
//! out keeps its default, so a file only needs to name what it overrides:
//!
//! ```yaml
//! server:
//!   port: 8080
//!   baseIri: http://example.org/
//! sparql:
//!   endpointUrl: http://localhost:3030/dataset/query
//!   authentication:
//!     user: admin
//!     password: secret
//! ```

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default existence check for a single resource
pub const DEFAULT_RESOURCE_EXISTS_QUERY: &str = "ASK { <${iri}> ?p ?o }";
/// Default graph query for a single resource
pub const DEFAULT_RESOURCE_GRAPH_QUERY: &str = "DESCRIBE <${iri}>";
/// Default existence check for a container (any subject under the IRI prefix)
pub const DEFAULT_CONTAINER_EXISTS_QUERY: &str =
    "ASK { ?s a ?o. FILTER REGEX(STR(?s), \"^${iri}\") }";
/// Default graph query for a container
pub const DEFAULT_CONTAINER_GRAPH_QUERY: &str =
    "CONSTRUCT { ?s a ?o. } WHERE { ?s a ?o. FILTER REGEX(STR(?s), \"^${iri}\") }";
/// Default SPARQL endpoint, relative to the server's public base
pub const DEFAULT_ENDPOINT_URL: &str = "/query";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid YAML for this schema
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Endpoint or base IRI cannot be turned into a URL
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Credentials sent to the SPARQL endpoint as HTTP Basic authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    pub user: String,
    pub password: String,
}

impl Authentication {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Credentials are only used when both user and password are non-empty
    pub fn is_complete(&self) -> bool {
        !self.user.is_empty() && !self.password.is_empty()
    }
}

/// Resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolverConfig {
    /// Optional Basic auth credentials for the endpoint
    pub authentication: Option<Authentication>,
    /// Treat trailing-slash IRIs as containers, never as direct resources
    pub resource_no_slash: bool,
    /// Answer HEAD requests with an existence check only
    pub handle_head: bool,
    pub resource_exists_query: String,
    pub resource_graph_query: String,
    pub container_exists_query: String,
    pub container_graph_query: String,
    /// SPARQL endpoint; relative values are resolved against the server base
    pub endpoint_url: String,
    /// Timeout applied by the HTTP client to each SPARQL request
    pub timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            authentication: None,
            resource_no_slash: true,
            handle_head: true,
            resource_exists_query: DEFAULT_RESOURCE_EXISTS_QUERY.to_string(),
            resource_graph_query: DEFAULT_RESOURCE_GRAPH_QUERY.to_string(),
            container_exists_query: DEFAULT_CONTAINER_EXISTS_QUERY.to_string(),
            container_graph_query: DEFAULT_CONTAINER_GRAPH_QUERY.to_string(),
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl ResolverConfig {
    /// Resolve `endpoint_url` against `base`. Absolute endpoints are kept as-is.
    pub fn endpoint(&self, base: &Url) -> ConfigResult<Url> {
        base.join(&self.endpoint_url).map_err(|e| ConfigError::InvalidUrl {
            url: self.endpoint_url.clone(),
            reason: e.to_string(),
        })
    }

    /// Credentials that should actually be sent, if any
    pub fn credentials(&self) -> Option<&Authentication> {
        self.authentication.as_ref().filter(|auth| auth.is_complete())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Bind address
    pub address: String,
    /// Port
    pub port: u16,
    /// Public base IRI; request paths are appended to it to form resource IRIs
    pub base_iri: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8080,
            base_iri: None,
        }
    }
}

impl ServerConfig {
    /// Base URL the server is reachable under
    pub fn public_base(&self) -> ConfigResult<Url> {
        let base = self
            .base_iri
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}/", self.address, self.port));
        Url::parse(&base).map_err(|e| ConfigError::InvalidUrl {
            url: base.clone(),
            reason: e.to_string(),
        })
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub sparql: ResolverConfig,
}

impl AppConfig {
    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Absolute SPARQL endpoint for this deployment
    pub fn endpoint(&self) -> ConfigResult<Url> {
        self.sparql.endpoint(&self.server.public_base()?)
    }
}
