// Request pipeline
//
// Wraps `reqwest::Client` with base-URL joining, the middleware chain,
// and status classification. This is the only module that looks at HTTP
// status codes; everything it returns is either a success payload or an
// already-classified `Error`.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::middleware::{MiddlewareChain, RawResponse};
use crate::models::ErrorBody;
use crate::session::SessionStore;
use crate::transport::TransportConfig;

/// The transport every API call goes through.
///
/// Reads a session snapshot before each request (for the bearer header)
/// and hands each outcome to the post-response hooks (which log out on
/// 401). Never retries and never swallows an error.
pub struct RequestPipeline {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<SessionStore>,
    middleware: MiddlewareChain,
}

impl RequestPipeline {
    /// Create a pipeline with a client built from `transport` and the
    /// default middleware chain.
    pub fn new(
        base_url: Url,
        session: Arc<SessionStore>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        debug!(%base_url, timeout_ms = transport.timeout_ms(), "request pipeline ready");
        Ok(Self::with_client(http, base_url, session))
    }

    /// Create a pipeline around a pre-built `reqwest::Client`.
    ///
    /// The client is used as-is: callers that want the JSON default headers
    /// or the request timeout must have configured it themselves.
    pub fn with_client(http: reqwest::Client, base_url: Url, session: Arc<SessionStore>) -> Self {
        Self {
            http,
            base_url,
            session,
            middleware: MiddlewareChain::default(),
        }
    }

    /// Replace the middleware chain.
    pub fn with_middleware(mut self, middleware: MiddlewareChain) -> Self {
        self.middleware = middleware;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn middleware(&self) -> &MiddlewareChain {
        &self.middleware
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Join a resource path onto the base URL, keeping any base path prefix.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}")).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// `GET {path}?{query}` and decode the body.
    pub async fn get_json<T, Q>(&self, path: &str, query: &Q) -> Result<T, Error>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let request = self
            .http
            .get(self.url(path)?)
            .query(query)
            .build()
            .map_err(|e| Error::InvalidRequest(e.to_string()))?;
        self.send(request).await?.json()
    }

    /// `POST {path}` with a JSON body. `Ok(None)` for a no-content reply.
    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.post(path, body).await?.json_optional()
    }

    /// `PUT {path}` with a JSON body. `Ok(None)` for a no-content reply.
    pub async fn put_json<T, B>(&self, path: &str, body: &B) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.put(path, body).await?.json_optional()
    }

    /// `POST {path}` with a JSON body, returning the raw success response.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RawResponse, Error> {
        let request = self
            .http
            .post(self.url(path)?)
            .json(body)
            .build()
            .map_err(|e| Error::InvalidRequest(e.to_string()))?;
        self.send(request).await
    }

    /// `PUT {path}` with a JSON body, returning the raw success response.
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RawResponse, Error> {
        let request = self
            .http
            .put(self.url(path)?)
            .json(body)
            .build()
            .map_err(|e| Error::InvalidRequest(e.to_string()))?;
        self.send(request).await
    }

    /// `DELETE {path}`. Any success status counts; the body is ignored.
    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        let request = self
            .http
            .delete(self.url(path)?)
            .build()
            .map_err(|e| Error::InvalidRequest(e.to_string()))?;
        self.send(request).await.map(|_| ())
    }

    /// Run a request through the full chain: pre-hooks, transport,
    /// classification, post-hooks.
    pub async fn send(&self, request: reqwest::Request) -> Result<RawResponse, Error> {
        let session = self.session.snapshot();
        let request = self.middleware.apply_request(request, &session)?;

        debug!("{} {}", request.method(), request.url());

        let outcome = self.execute(request).await;
        self.middleware.apply_response(outcome, &self.session)
    }

    async fn execute(&self, request: reqwest::Request) -> Result<RawResponse, Error> {
        let resp = self
            .http
            .execute(request)
            .await
            .map_err(|e| Error::from_transport(&e))?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(|e| Error::from_transport(&e))?;
        trace!(status = status.as_u16(), bytes = body.len(), "response received");

        if status.is_success() {
            return Ok(RawResponse {
                status: status.as_u16(),
                headers,
                body,
            });
        }

        let message = serde_json::from_slice::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message);
        Err(Error::from_status(status.as_u16(), message))
    }
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("base_url", &self.base_url.as_str())
            .field("middleware", &self.middleware)
            .finish_non_exhaustive()
    }
}
