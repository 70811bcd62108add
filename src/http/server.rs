//! HTTP server exposing resources from the triple store

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::handler::{not_found_handler, resolve_resource, status_handler, ResolverState};
use crate::config::ServerConfig;
use crate::resolver::ResourceResolver;
use crate::sparql::SparqlClient;

/// HTTP server serving `/api/status` and resolving every other path
pub struct HttpServer<C> {
    config: ServerConfig,
    resolver: Arc<ResourceResolver<C>>,
}

impl<C: SparqlClient + 'static> HttpServer<C> {
    /// Create a new HTTP server
    pub fn new(config: ServerConfig, resolver: ResourceResolver<C>) -> Self {
        Self {
            config,
            resolver: Arc::new(resolver),
        }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        let state = ResolverState::new(Arc::clone(&self.resolver), self.config.base_iri.clone());

        let resources: Router = Router::new()
            .fallback(not_found_handler)
            .layer(middleware::from_fn_with_state(state.clone(), resolve_resource::<C>));

        Router::new()
            .route("/api/status", get(status_handler::<C>))
            .with_state(state)
            .fallback_service(resources)
            .layer(CorsLayer::permissive())
    }

    /// Start the HTTP server
    pub async fn start(&self) -> std::io::Result<()> {
        let addr = format!("{}:{}", self.config.address, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!("Resolving resources at http://{}", addr);

        axum::serve(listener, self.router()).await
    }
}
