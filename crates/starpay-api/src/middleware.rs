// ── Request/response middleware ──
//
// An explicit, ordered chain of hooks wrapped around every request the
// pipeline sends. Pre-request hooks see the outgoing request and a session
// snapshot; post-response hooks see the classified outcome and the store.
// Hooks run in registration order and the first error short-circuits.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::Error;
use crate::session::{Session, SessionStore};

/// A fully-read response with a success status.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    /// `true` for 204 and for any success response with a blank body.
    pub fn is_empty(&self) -> bool {
        self.status == 204 || self.body.iter().all(u8::is_ascii_whitespace)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: String::from_utf8_lossy(&self.body).into_owned(),
        })
    }

    /// Decode the body as JSON, or `None` for a no-content reply.
    pub fn json_optional<T: DeserializeOwned>(&self) -> Result<Option<T>, Error> {
        if self.is_empty() {
            return Ok(None);
        }
        self.json().map(Some)
    }
}

/// Runs before a request leaves the process.
pub trait RequestHook: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_request(
        &self,
        request: reqwest::Request,
        session: &Session,
    ) -> Result<reqwest::Request, Error>;
}

/// Runs after the response has been read and classified.
///
/// Receives errors as well as successes; returning the input unchanged is
/// the expected default.
pub trait ResponseHook: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_response(
        &self,
        outcome: Result<RawResponse, Error>,
        session: &SessionStore,
    ) -> Result<RawResponse, Error>;
}

// ── Built-in hooks ───────────────────────────────────────────────────

/// Attaches `Authorization: Bearer <token>` when the session has a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerAuth;

impl RequestHook for BearerAuth {
    fn name(&self) -> &'static str {
        "bearer-auth"
    }

    fn on_request(
        &self,
        mut request: reqwest::Request,
        session: &Session,
    ) -> Result<reqwest::Request, Error> {
        let Some(token) = session.token() else {
            return Ok(request);
        };

        match HeaderValue::from_str(&format!("Bearer {}", token.expose_secret())) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
            }
            // The server answers 401 and the session is cleared the usual way.
            Err(_) => warn!("session token is not a valid header value, sending unauthenticated"),
        }
        Ok(request)
    }
}

/// Forces a logout whenever the server answers 401, then passes the
/// error through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogoutOnUnauthorized;

impl ResponseHook for LogoutOnUnauthorized {
    fn name(&self) -> &'static str {
        "logout-on-unauthorized"
    }

    fn on_response(
        &self,
        outcome: Result<RawResponse, Error>,
        session: &SessionStore,
    ) -> Result<RawResponse, Error> {
        if let Err(Error::Unauthorized { .. }) = &outcome {
            warn!("server rejected the session, logging out");
            session.logout();
        }
        outcome
    }
}

// ── Chain ────────────────────────────────────────────────────────────

/// Ordered pre- and post-hooks.
#[derive(Clone)]
pub struct MiddlewareChain {
    request_hooks: Vec<Arc<dyn RequestHook>>,
    response_hooks: Vec<Arc<dyn ResponseHook>>,
}

impl MiddlewareChain {
    /// A chain with no hooks at all: no auth header, no forced logout.
    pub fn empty() -> Self {
        Self {
            request_hooks: Vec::new(),
            response_hooks: Vec::new(),
        }
    }

    /// Append a pre-request hook; it runs after the ones already registered.
    pub fn with_request_hook(mut self, hook: impl RequestHook + 'static) -> Self {
        self.request_hooks.push(Arc::new(hook));
        self
    }

    /// Append a post-response hook; it runs after the ones already registered.
    pub fn with_response_hook(mut self, hook: impl ResponseHook + 'static) -> Self {
        self.response_hooks.push(Arc::new(hook));
        self
    }

    pub(crate) fn apply_request(
        &self,
        request: reqwest::Request,
        session: &Session,
    ) -> Result<reqwest::Request, Error> {
        self.request_hooks
            .iter()
            .try_fold(request, |req, hook| hook.on_request(req, session))
    }

    pub(crate) fn apply_response(
        &self,
        outcome: Result<RawResponse, Error>,
        session: &SessionStore,
    ) -> Result<RawResponse, Error> {
        self.response_hooks
            .iter()
            .fold(outcome, |out, hook| hook.on_response(out, session))
    }
}

impl Default for MiddlewareChain {
    /// `BearerAuth` before every request, `LogoutOnUnauthorized` after.
    fn default() -> Self {
        Self::empty()
            .with_request_hook(BearerAuth)
            .with_response_hook(LogoutOnUnauthorized)
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pre: Vec<_> = self.request_hooks.iter().map(|h| h.name()).collect();
        let post: Vec<_> = self.response_hooks.iter().map(|h| h.name()).collect();
        f.debug_struct("MiddlewareChain")
            .field("request_hooks", &pre)
            .field("response_hooks", &post)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn request() -> reqwest::Request {
        reqwest::Request::new(
            reqwest::Method::GET,
            "http://localhost/api".parse().unwrap(),
        )
    }

    #[test]
    fn bearer_auth_attaches_token() {
        let session = Session::authenticated("abc", None, None);
        let req = BearerAuth.on_request(request(), &session).unwrap();
        assert_eq!(req.headers()[AUTHORIZATION], "Bearer abc");
        assert!(req.headers()[AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn bearer_auth_skips_anonymous() {
        let req = BearerAuth
            .on_request(request(), &Session::anonymous())
            .unwrap();
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn bearer_auth_skips_unencodable_token() {
        let session = Session::authenticated("bad\ntoken", None, None);
        let req = BearerAuth.on_request(request(), &session).unwrap();
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn unauthorized_forces_logout_and_passes_error_through() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        store.login("tok", None, None);

        let out = LogoutOnUnauthorized.on_response(
            Err(Error::Unauthorized {
                message: Some("expired".into()),
            }),
            &store,
        );

        assert!(!store.is_authenticated());
        assert!(matches!(
            out,
            Err(Error::Unauthorized { message: Some(ref m) }) if m == "expired"
        ));
    }

    #[test]
    fn other_errors_leave_session_alone() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        store.login("tok", None, None);

        let out = LogoutOnUnauthorized.on_response(
            Err(Error::Client {
                status: 403,
                message: None,
            }),
            &store,
        );

        assert!(store.is_authenticated());
        assert!(matches!(out, Err(Error::Client { status: 403, .. })));
    }

    #[test]
    fn chain_runs_hooks_in_order() {
        struct Tag(&'static str);
        impl RequestHook for Tag {
            fn name(&self) -> &'static str {
                self.0
            }
            fn on_request(
                &self,
                mut request: reqwest::Request,
                _session: &Session,
            ) -> Result<reqwest::Request, Error> {
                request
                    .headers_mut()
                    .append("x-trace", HeaderValue::from_static(self.0));
                Ok(request)
            }
        }

        let chain = MiddlewareChain::empty()
            .with_request_hook(Tag("first"))
            .with_request_hook(Tag("second"));
        let req = chain
            .apply_request(request(), &Session::anonymous())
            .unwrap();
        let tags: Vec<_> = req.headers().get_all("x-trace").iter().collect();
        assert_eq!(tags, ["first", "second"]);
    }

    #[test]
    fn empty_body_detection() {
        let resp = RawResponse {
            status: 200,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"  \n"),
        };
        assert!(resp.is_empty());
        let no_content = RawResponse {
            status: 204,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        };
        assert!(no_content.is_empty());
    }
}
