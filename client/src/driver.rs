//! The client protocol driver (C4): acquire a token, call an endpoint
//! under it, and retry exactly once if the call comes back 401 (the
//! window where the server's session secret rotated between token
//! acquisition and use).

use dead_drop_common::crypto;
use dead_drop_common::error::DeadDropError;
use dead_drop_common::wire::{AddKeyPayload, TokenRequestPayload};
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use rsa::RsaPrivateKey;
use tracing::warn;

fn http_err(e: reqwest::Error) -> DeadDropError {
    DeadDropError::internal(format!("request failed: {e}"))
}

pub struct Driver {
    client: reqwest::Client,
    remote: String,
    key_name: String,
    private_key: RsaPrivateKey,
}

impl Driver {
    pub fn new(remote: String, key_name: String, private_key: RsaPrivateKey) -> Self {
        Driver {
            client: reqwest::Client::new(),
            remote,
            key_name,
            private_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.remote.trim_end_matches('/'), path)
    }

    /// Step 1-2 of the protocol: request a fresh token and decrypt it
    /// under the caller's private key.
    async fn acquire_token(&self) -> Result<String, DeadDropError> {
        let response = self
            .client
            .post(self.url("/token"))
            .json(&TokenRequestPayload { key_name: self.key_name.clone() })
            .send()
            .await
            .map_err(http_err)?;

        if !response.status().is_success() {
            return Err(DeadDropError::Unauthorized);
        }

        let ciphertext = response.bytes().await.map_err(http_err)?;
        let plaintext = crypto::decrypt_oaep(&self.private_key, &ciphertext)?;
        String::from_utf8(plaintext)
            .map_err(|e| DeadDropError::internal(format!("token was not valid utf-8: {e}")))
    }

    /// Builds and sends an authenticated request, retrying exactly once
    /// on a 401. `build` is called once per attempt so it can attach a
    /// fresh `Authorization` header each time.
    async fn call_authenticated<F>(&self, build: F) -> Result<reqwest::Response, DeadDropError>
    where
        F: Fn(&str) -> reqwest::RequestBuilder,
    {
        let token = self.acquire_token().await?;
        let response = build(&token).send().await.map_err(http_err)?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!("first attempt was rejected as unauthorized, retrying once after re-acquiring a token");
        let token = self.acquire_token().await?;
        build(&token).send().await.map_err(http_err)
    }

    /// `POST /d` — uploads `bytes` and returns the assigned OID.
    pub async fn drop(&self, bytes: Vec<u8>) -> Result<String, DeadDropError> {
        let url = self.url("/d");
        let response = self
            .call_authenticated(|token| {
                self.client
                    .post(&url)
                    .header(AUTHORIZATION, token)
                    .body(bytes.clone())
            })
            .await?;

        if !response.status().is_success() {
            return Err(status_to_error(response.status()));
        }
        response.text().await.map_err(http_err)
    }

    /// `GET /d/{oid}` — downloads the object's bytes.
    pub async fn pull(&self, oid: &str) -> Result<Vec<u8>, DeadDropError> {
        let url = self.url(&format!("/d/{oid}"));
        let response = self
            .call_authenticated(|token| self.client.get(&url).header(AUTHORIZATION, token))
            .await?;

        if !response.status().is_success() {
            return Err(status_to_error(response.status()));
        }
        response.bytes().await.map(|b| b.to_vec()).map_err(http_err)
    }

    /// `POST /add-key` — registers `pem_bytes` under `name`.
    pub async fn add_key(&self, name: &str, pem_bytes: Vec<u8>) -> Result<(), DeadDropError> {
        let url = self.url("/add-key");
        let payload = AddKeyPayload { key: pem_bytes, key_name: name.to_string() };
        let response = self
            .call_authenticated(|token| {
                self.client.post(&url).header(AUTHORIZATION, token).json(&payload)
            })
            .await?;

        if !response.status().is_success() {
            return Err(status_to_error(response.status()));
        }
        Ok(())
    }
}

fn status_to_error(status: StatusCode) -> DeadDropError {
    match status {
        StatusCode::NOT_FOUND => DeadDropError::NotFound,
        StatusCode::UNAUTHORIZED => DeadDropError::Unauthorized,
        StatusCode::BAD_REQUEST => DeadDropError::bad_request("server rejected the request"),
        _ => DeadDropError::internal(format!("server returned {status}")),
    }
}
