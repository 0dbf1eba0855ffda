use std::fmt;
use std::marker::PhantomData;

use reqwest::Method;

/// A request against the cloud API together with the types its success and
/// error bodies decode into.
pub struct HttpResource<T, E> {
    pub method: Method,
    /// Path relative to the server URL, e.g. `/api/cache`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
    marker: PhantomData<fn() -> (T, E)>,
}

impl<T, E> HttpResource<T, E> {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        HttpResource {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            marker: PhantomData,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn json_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

impl<T, E> fmt::Debug for HttpResource<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResource")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}
