//! Integration tests against a local SPARQL endpoint
//!
//! Spawns a small axum app speaking the SPARQL protocol on an ephemeral port
//! and runs the HTTP client and the full server stack against it.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use sparql_resolver::sparql::basic_auth_header;
use sparql_resolver::{
    Authentication, ClientError, HttpServer, HttpSparqlClient, QueryOptions, ResolverConfig,
    ResourceResolver, ServerConfig, SparqlClient,
};
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

const KNOWN: &str = "http://ld.test/known";
const TRIPLES: &str = "<http://ld.test/known> <http://ld.test/p> \"o\" .\n";

#[derive(Clone, Default)]
struct Endpoint {
    queries: Arc<Mutex<Vec<String>>>,
    accept_encodings: Arc<Mutex<Vec<Option<String>>>>,
    required_auth: Option<String>,
    gzip: bool,
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

async fn sparql(
    State(endpoint): State<Endpoint>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let query = params.get("query").cloned().unwrap_or_default();
    endpoint.queries.lock().unwrap().push(query.clone());
    endpoint.accept_encodings.lock().unwrap().push(
        headers
            .get(header::ACCEPT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );

    if let Some(expected) = &endpoint.required_auth {
        let given = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
        if given != Some(expected.as_str()) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    if query.starts_with("ASK") {
        return Json(json!({ "head": {}, "boolean": query.contains(KNOWN) })).into_response();
    }

    let content_type = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/n-triples")
        .to_string();

    if endpoint.gzip {
        return (
            [
                (header::CONTENT_TYPE, content_type),
                (header::CONTENT_ENCODING, "gzip".to_string()),
            ],
            gzip(TRIPLES.as_bytes()),
        )
            .into_response();
    }

    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_ENCODING, "identity".to_string()),
            (header::HeaderName::from_static("x-store"), "mock".to_string()),
        ],
        TRIPLES,
    )
        .into_response()
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn start_endpoint(required_auth: Option<String>) -> (String, Endpoint) {
    start_endpoint_with(Endpoint {
        required_auth,
        ..Endpoint::default()
    })
    .await
}

async fn start_endpoint_with(endpoint: Endpoint) -> (String, Endpoint) {
    let app = Router::new()
        .route("/ds/query", get(sparql))
        .with_state(endpoint.clone());
    let base = serve(app).await;
    (format!("{}/ds/query", base), endpoint)
}

fn client(url: &str) -> HttpSparqlClient {
    HttpSparqlClient::new(url.parse().unwrap(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_ask() {
    let (url, endpoint) = start_endpoint(None).await;
    let client = client(&url);
    let options = QueryOptions::default();

    let query = format!("ASK {{ <{}> ?p ?o }}", KNOWN);
    assert!(client.ask(&query, &options).await.unwrap());
    assert!(!client.ask("ASK { <http://ld.test/other> ?p ?o }", &options).await.unwrap());

    assert_eq!(endpoint.queries.lock().unwrap()[0], query);
}

#[tokio::test]
async fn test_construct_streams_body() {
    let (url, _) = start_endpoint(None).await;
    let client = client(&url);
    let options = QueryOptions::default().with_accept(Some("text/turtle".to_string()));

    let response = client.construct("DESCRIBE <http://ld.test/known>", &options).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::CONTENT_TYPE], "text/turtle");

    let body = response.body.unwrap();
    let chunks: Vec<bytes::Bytes> = futures::TryStreamExt::try_collect(body).await.unwrap();
    assert_eq!(chunks.concat(), TRIPLES.as_bytes());
}

#[tokio::test]
async fn test_status_error() {
    let (url, _) = start_endpoint(Some(basic_auth_header("user", "password"))).await;
    let client = client(&url);

    let result = client.ask("ASK { ?s ?p ?o }", &QueryOptions::default()).await;
    match result {
        Err(ClientError::Status(status)) => assert_eq!(status, StatusCode::UNAUTHORIZED),
        other => panic!("Expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{}/query", addr));
    let result = client.ask("ASK { ?s ?p ?o }", &QueryOptions::default()).await;
    assert!(matches!(result, Err(ClientError::Transport(_))));
}

async fn start_resolver(endpoint_url: &str, config: ResolverConfig) -> String {
    let config = ResolverConfig {
        endpoint_url: endpoint_url.to_string(),
        ..config
    };
    let server_config = ServerConfig {
        base_iri: Some("http://ld.test/".to_string()),
        ..ServerConfig::default()
    };
    let resolver = ResourceResolver::new(config, client(endpoint_url));
    serve(HttpServer::new(server_config, resolver).router()).await
}

#[tokio::test]
async fn test_full_stack_with_authentication() {
    let (url, endpoint) = start_endpoint(Some(basic_auth_header("user", "password"))).await;
    let config = ResolverConfig {
        authentication: Some(Authentication::new("user", "password")),
        ..ResolverConfig::default()
    };
    let base = start_resolver(&url, config).await;

    let response = reqwest::Client::new()
        .get(format!("{}/known", base))
        .header(header::ACCEPT, "text/turtle")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/turtle");
    assert_eq!(response.headers()["x-store"], "mock");
    assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    assert_eq!(response.text().await.unwrap(), TRIPLES);

    let queries = endpoint.queries.lock().unwrap().clone();
    assert_eq!(
        queries,
        vec![
            "ASK { <http://ld.test/known> ?p ?o }".to_string(),
            "DESCRIBE <http://ld.test/known>".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_full_stack_unknown_resource() {
    let (url, endpoint) = start_endpoint(None).await;
    let base = start_resolver(&url, ResolverConfig::default()).await;

    let response = reqwest::get(format!("{}/unknown", base)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(endpoint.queries.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_full_stack_upstream_status() {
    let (url, endpoint) = start_endpoint(Some(basic_auth_header("user", "password"))).await;
    let base = start_resolver(&url, ResolverConfig::default()).await;

    let response = reqwest::get(format!("{}/known", base)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(endpoint.queries.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_full_stack_compressed_graph() {
    let (url, endpoint) = start_endpoint_with(Endpoint {
        gzip: true,
        ..Endpoint::default()
    })
    .await;
    let base = start_resolver(&url, ResolverConfig::default()).await;

    let response = reqwest::get(format!("{}/known", base)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    assert_eq!(response.text().await.unwrap(), TRIPLES);

    let accept_encodings = endpoint.accept_encodings.lock().unwrap().clone();
    let graph_request = accept_encodings[1].as_deref().unwrap_or_default();
    assert!(graph_request.contains("gzip"), "accept-encoding was {:?}", graph_request);
}
