// Login endpoint
//
// Exchanges username/password for a bearer token. The pipeline does not
// touch the session here -- the caller decides whether to store the grant.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::Error;
use crate::pipeline::RequestPipeline;

pub const LOGIN_PATH: &str = "api/v1/starpay-alert/login";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    data: Option<LoginData>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    access_token: Option<String>,
    role: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    username: Option<String>,
}

/// What a successful login hands back.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub token: SecretString,
    pub role: Option<String>,
    pub username: Option<String>,
}

impl RequestPipeline {
    /// Authenticate with username/password.
    ///
    /// The role is `role`, else the first of `roles`. The username is the
    /// one the server echoes, else the `username` claim inside the token,
    /// else the one that was submitted.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<LoginGrant, Error> {
        debug!(username, "logging in");

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let resp: Option<LoginResponse> = self.post_json(LOGIN_PATH, &body).await?;
        let data = resp.and_then(|r| r.data).ok_or(Error::MissingToken)?;
        let token = data
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(Error::MissingToken)?;

        let role = data.role.or_else(|| data.roles.into_iter().next());
        let username = data
            .username
            .or_else(|| jwt_claim(&token, "username"))
            .unwrap_or_else(|| username.to_owned());

        debug!("login successful");
        Ok(LoginGrant {
            token: SecretString::from(token),
            role,
            username: Some(username),
        })
    }
}

/// Read a string claim from a JWT payload without verifying the signature.
fn jwt_claim(token: &str, claim: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    value.get(claim)?.as_str().map(str::to_owned)
}
