//! HTTP handlers wiring the resolver into an axum router

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::resolver::{Resolution, ResourceResolver};
use crate::sparql::{GraphResponse, SparqlClient};

/// Resource IRI set by an outer layer; takes precedence over the request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIri(pub String);

/// Shared state of the resolver middleware
pub struct ResolverState<C> {
    resolver: Arc<ResourceResolver<C>>,
    base_iri: Option<String>,
}

impl<C> ResolverState<C> {
    pub fn new(resolver: Arc<ResourceResolver<C>>, base_iri: Option<String>) -> Self {
        Self { resolver, base_iri }
    }
}

impl<C> Clone for ResolverState<C> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            base_iri: self.base_iri.clone(),
        }
    }
}

/// Escapes of URI delimiters (and of `%` itself) that stay encoded when a
/// path is decoded, so the IRI keeps naming the same resource.
const KEPT_ESCAPES: &[u8] = b";,/?:@&=+$#%";

/// Decode the escapes of a request path that `encode_iri` would produce again
///
/// Returns `None` when the decoded path is not valid UTF-8.
pub fn decode_path(path: &str) -> Option<String> {
    let bytes = path.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = (
                (bytes[i + 1] as char).to_digit(16),
                (bytes[i + 2] as char).to_digit(16),
            );
            if let (Some(high), Some(low)) = hex {
                let byte = (high * 16 + low) as u8;
                if KEPT_ESCAPES.contains(&byte) {
                    decoded.extend_from_slice(&bytes[i..i + 3]);
                } else {
                    decoded.push(byte);
                }
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(decoded).ok()
}

/// Derive the resource IRI of a request
///
/// Order: `ResourceIri` extension, then `base_iri` + path, then
/// `http://{Host}{path}`. The query string is never part of the IRI. Path
/// escapes are decoded except for those of URI delimiters; a path that does
/// not decode to UTF-8 has no IRI.
pub fn request_iri(request: &Request, base_iri: Option<&str>) -> Option<String> {
    if let Some(ResourceIri(iri)) = request.extensions().get::<ResourceIri>() {
        return Some(iri.clone());
    }

    let path = decode_path(request.uri().path())?;

    if let Some(base) = base_iri {
        return Some(format!("{}{}", base.trim_end_matches('/'), path));
    }

    let host = request
        .uri()
        .authority()
        .map(|authority| authority.as_str())
        .or_else(|| request.headers().get(header::HOST)?.to_str().ok())?;

    Some(format!("http://{}{}", host, path))
}

/// Middleware answering GET/HEAD requests from the triple store
///
/// When the resolver has no opinion the request continues down the chain. If
/// the existence query failed upstream and nothing further down answers
/// either, the upstream status is returned.
pub async fn resolve_resource<C: SparqlClient + 'static>(
    State(state): State<ResolverState<C>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(iri) = request_iri(&request, state.base_iri.as_deref()) else {
        debug!("No resource IRI for {}", request.uri());
        return next.run(request).await;
    };

    let method = request.method().clone();
    let accept = request
        .headers()
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    match state.resolver.resolve(&method, &iri, accept.as_deref()).await {
        Resolution::Found(graph) => graph_response(graph),
        Resolution::NotApplicable => next.run(request).await,
        Resolution::Upstream(status) => {
            let response = next.run(request).await;
            if response.status() == StatusCode::NOT_FOUND {
                status.into_response()
            } else {
                response
            }
        }
    }
}

fn graph_response(graph: GraphResponse) -> Response {
    let body = match graph.body {
        Some(stream) => Body::from_stream(stream),
        None => Body::empty(),
    };

    let mut response = Response::new(body);
    *response.status_mut() = graph.status;
    *response.headers_mut() = graph.headers;
    response
}

/// Fallback when nothing answered the request
pub async fn not_found_handler() -> impl IntoResponse {
    StatusCode::NOT_FOUND
}

/// Handler for system status
pub async fn status_handler<C: SparqlClient + 'static>(
    State(state): State<ResolverState<C>>,
) -> impl IntoResponse {
    let config = state.resolver.config();
    Json(json!({
        "status": "healthy",
        "version": crate::VERSION,
        "sparql": {
            "endpointUrl": config.endpoint_url,
            "resourceNoSlash": config.resource_no_slash,
            "handleHead": config.handle_head,
        }
    }))
}
