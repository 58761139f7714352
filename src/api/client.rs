//! Authenticated request pipeline.
//!
//! `SessionClient` wraps a transport and drives one logical request through
//! attach -> send -> rotation inspection -> (maybe) refresh -> replay,
//! strictly in that order. The attempt counter is local to `send`, so the
//! "at most one refresh-and-replay per request" rule is structural rather
//! than convention.
//!
//! Concurrent unauthorized responses each run their own refresh; the server
//! side refresh exchange is idempotent-safe, so redundant rotations are
//! accepted instead of a cross-request mutex.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::api::transport::{ApiRequest, ApiResponse, Transport};
use crate::config::AuthConfig;
use crate::token::store::TokenStore;
use crate::token::waiter;

pub struct SessionClient<T: Transport> {
    transport: T,
    store: Arc<TokenStore>,
    config: AuthConfig,
}

impl<T: Transport> SessionClient<T> {
    pub fn new(transport: T, store: Arc<TokenStore>, config: AuthConfig) -> Self {
        Self {
            transport,
            store,
            config,
        }
    }

    /// Send a request with the full token lifecycle applied.
    ///
    /// Transport-level errors pass through unchanged. HTTP failures come
    /// back as responses; after a failed refresh the original unauthorized
    /// response is returned verbatim so per-call error handling keeps
    /// working.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        self.attach_credential(&mut request).await?;

        let mut attempt: u8 = 0;
        loop {
            let response = self.transport.execute(&request).await?;
            self.observe_rotation(&response);

            if !response.is_unauthorized() || self.config.is_auth_endpoint(&request.url) {
                return Ok(response);
            }

            if attempt > 0 {
                // The replay itself came back unauthorized: terminal.
                warn!(url = %request.url, "replay rejected, clearing durable token");
                self.store.clear(false);
                return Ok(response);
            }
            attempt += 1;

            if self.refresh().await {
                // Re-read rather than reusing the refresh result: another
                // context may have rotated again while we were suspended.
                match self.store.read() {
                    Some(token) => {
                        request.set_header(&self.config.token_header, &token)?;
                        debug!(url = %request.url, "replaying request after refresh");
                    }
                    None => {
                        return Ok(response);
                    }
                }
            } else {
                self.store.clear(false);
                return Ok(response);
            }
        }
    }

    /// Attach the credential header unless the caller already set one.
    ///
    /// A stored token is attached to every request, auth endpoints included.
    /// Only the bounded wait is skipped for those: login and registration
    /// are the flows the waiter waits *for*, so stalling them behind it
    /// would deadlock the first sign-in.
    async fn attach_credential(&self, request: &mut ApiRequest) -> Result<()> {
        if request.has_header(&self.config.token_header) {
            return Ok(());
        }

        let token = match self.store.read() {
            Some(token) => Some(token),
            None if self.config.is_auth_endpoint(&request.url) => None,
            None => waiter::wait_for_token(&self.store, self.config.acquire_timeout())
                .await
                .ok(),
        };

        match token {
            Some(token) => request.set_header(&self.config.token_header, &token)?,
            None => {
                // Intentionally unauthenticated endpoints exist; let the
                // server decide.
                debug!(url = %request.url, "no credential available, sending unauthenticated");
            }
        }
        Ok(())
    }

    /// Rotation listener: the server may hand out a fresh credential on any
    /// response. The store's idempotent write absorbs plain echoes.
    fn observe_rotation(&self, response: &ApiResponse) {
        if let Some(rotated) = response.credential_header(&self.config.token_header) {
            self.store.write(&rotated);
        }
    }

    /// One refresh exchange. True means a rotated credential was installed.
    async fn refresh(&self) -> bool {
        let mut request = ApiRequest::post(self.config.refresh_url.clone(), serde_json::json!({}));
        if let Some(token) = self.store.read() {
            if let Err(e) = request.set_header(&self.config.token_header, &token) {
                warn!(error = %e, "could not attach token to refresh call");
                return false;
            }
        }

        match self.transport.execute(&request).await {
            Ok(response) if response.status.is_success() => {
                match response.credential_header(&self.config.token_header) {
                    Some(rotated) => {
                        self.store.write(&rotated);
                        debug!("session token refreshed");
                        true
                    }
                    None => {
                        warn!("refresh response carried no credential");
                        false
                    }
                }
            }
            Ok(response) => {
                warn!(status = %response.status, "refresh exchange rejected");
                false
            }
            Err(e) => {
                warn!(error = %e, "refresh exchange failed");
                false
            }
        }
    }
}
