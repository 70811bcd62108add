//! Scripted `SparqlClient` used by unit tests

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::client::{ClientError, ClientResult, GraphResponse, QueryOptions, SparqlClient};

#[derive(Debug, Clone)]
enum Answer<T> {
    Ok(T),
    Status(StatusCode),
    Transport,
}

impl<T: Clone> Answer<T> {
    fn get(&self) -> ClientResult<T> {
        match self {
            Answer::Ok(value) => Ok(value.clone()),
            Answer::Status(status) => Err(ClientError::Status(*status)),
            Answer::Transport => Err(ClientError::Transport("connection refused".to_string())),
        }
    }
}

/// Client returning canned answers and recording every call
pub(crate) struct MockSparqlClient {
    exists: Answer<bool>,
    graph: Answer<bool>,
    headers: HeaderMap,
    chunks: Vec<Bytes>,
    ask_calls: AtomicUsize,
    construct_calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
    options: Mutex<Vec<QueryOptions>>,
}

impl MockSparqlClient {
    /// Client whose ASK answers `exists` and whose graph query returns a body
    pub fn new(exists: bool) -> Self {
        Self {
            exists: Answer::Ok(exists),
            graph: Answer::Ok(true),
            headers: HeaderMap::new(),
            chunks: Vec::new(),
            ask_calls: AtomicUsize::new(0),
            construct_calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
        }
    }

    pub fn ask_status(mut self, status: StatusCode) -> Self {
        self.exists = Answer::Status(status);
        self
    }

    pub fn ask_transport_error(mut self) -> Self {
        self.exists = Answer::Transport;
        self
    }

    pub fn graph_status(mut self, status: StatusCode) -> Self {
        self.graph = Answer::Status(status);
        self
    }

    /// Graph query succeeds but yields no body
    pub fn graph_without_body(mut self) -> Self {
        self.graph = Answer::Ok(false);
        self
    }

    pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers
            .insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        self
    }

    pub fn chunk(mut self, data: &'static str) -> Self {
        self.chunks.push(Bytes::from_static(data.as_bytes()));
        self
    }

    pub fn ask_calls(&self) -> usize {
        self.ask_calls.load(Ordering::SeqCst)
    }

    pub fn construct_calls(&self) -> usize {
        self.construct_calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn options(&self) -> Vec<QueryOptions> {
        self.options.lock().unwrap().clone()
    }

    fn record(&self, query: &str, options: &QueryOptions) {
        self.queries.lock().unwrap().push(query.to_string());
        self.options.lock().unwrap().push(options.clone());
    }
}

#[async_trait]
impl SparqlClient for MockSparqlClient {
    async fn ask(&self, query: &str, options: &QueryOptions) -> ClientResult<bool> {
        self.ask_calls.fetch_add(1, Ordering::SeqCst);
        self.record(query, options);
        self.exists.get()
    }

    async fn construct(&self, query: &str, options: &QueryOptions) -> ClientResult<GraphResponse> {
        self.construct_calls.fetch_add(1, Ordering::SeqCst);
        self.record(query, options);

        let with_body = self.graph.get()?;
        let chunks: Vec<ClientResult<Bytes>> = self.chunks.iter().cloned().map(Ok).collect();

        Ok(GraphResponse {
            status: StatusCode::OK,
            headers: self.headers.clone(),
            body: with_body.then(|| stream::iter(chunks).boxed()),
        })
    }
}
