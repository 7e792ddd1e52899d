//! Process-wide logged-in flag and the account actions that change it.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::Endpoint;
use crate::core::error::ApiError;
use crate::core::http::ApiClient;

/// Shared logged-in flag. Clones observe the same state.
///
/// Starts logged out; only a successful probe or login flips it on.
#[derive(Clone)]
pub struct SessionState {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_logged_in(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn mark_logged_in(&self) {
        if !self.tx.send_replace(true) {
            debug!("Session logged in");
        }
    }

    pub fn mark_logged_out(&self) {
        if self.tx.send_replace(false) {
            debug!("Session logged out");
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn session(&self) -> &SessionState {
        self.client.session()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session().is_logged_in()
    }

    pub fn login_url(&self) -> String {
        self.client.login_url()
    }

    /// Asks the server whether the current credentials are valid.
    pub async fn probe(&self) -> bool {
        match self
            .client
            .post_empty::<Option<serde_json::Value>>(&Endpoint::OAuth2Check.path())
            .await
        {
            Ok(_) => {
                self.session().mark_logged_in();
                true
            }
            Err(err) => {
                debug!(error = %err, "Auth probe failed");
                self.session().mark_logged_out();
                false
            }
        }
    }

    /// Runs the probe in the background; the session reads as logged out
    /// until it answers.
    pub fn spawn_probe(&self) -> JoinHandle<bool> {
        let service = self.clone();
        tokio::spawn(async move { service.probe().await })
    }

    /// Finishes the OAuth callback: verifies the new credentials and returns
    /// the path remembered before the login redirect, if any.
    pub async fn complete_login(&self) -> Result<Option<String>, ApiError> {
        self.client
            .post_empty::<Option<serde_json::Value>>(&Endpoint::OAuth2Check.path())
            .await?;
        self.session().mark_logged_in();
        info!("Login completed");
        Ok(self.client.take_redirect_path())
    }

    /// Logs out on the server. Local state is cleared even when the call fails.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self
            .client
            .post_empty::<Option<serde_json::Value>>(&Endpoint::Logout.path())
            .await
            .map(|_| ());
        self.clear_local_session();
        result
    }

    /// Deletes the account. Local state is cleared even when the call fails.
    pub async fn withdraw(&self) -> Result<(), ApiError> {
        let result = self
            .client
            .delete::<Option<serde_json::Value>>(&Endpoint::Withdraw.path())
            .await
            .map(|_| ());
        self.clear_local_session();
        result
    }

    fn clear_local_session(&self) {
        self.session().mark_logged_out();
        self.client.clear_redirect_path();
    }
}
