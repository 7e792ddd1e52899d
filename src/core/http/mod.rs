//! JSON-over-HTTP client with credential inclusion and a single-flight
//! token refresh.
//!
//! Every non-2xx response is decoded into an [`ApiError`]. A response carrying
//! the expired-access-token code is replayed once after a token reissue;
//! concurrent expiries share one reissue through [`RefreshGate`]. When the
//! reissue fails, every waiting request fails with its original error, the
//! session flips to logged out and the login redirect hook fires once with
//! the path to restore after login.

pub mod refresh;
pub mod transport;


use std::sync::{Arc, Mutex};

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::Endpoint;
use crate::core::error::ApiError;
use crate::core::session::SessionState;
use crate::utils::url::construct_api_url;

pub use refresh::RefreshGate;
pub use transport::{
    EventByteStream, EventStreamResponse, HttpRequest, HttpResponse, ReqwestTransport, Transport,
    TransportError,
};

/// Where to send the user when the session cannot be recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub login_url: String,
    /// Path to restore after a successful login; `None` from the home route.
    pub return_to: Option<String>,
}

pub type LoginHook = Arc<dyn Fn(&LoginRedirect) + Send + Sync>;

struct Navigation {
    current_path: String,
    redirect_path: Option<String>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    base_url: String,
    refresh: RefreshGate,
    session: SessionState,
    navigation: Mutex<Navigation>,
    login_hook: Option<LoginHook>,
}

#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

pub struct ApiClientBuilder {
    transport: Arc<dyn Transport>,
    base_url: String,
    session: SessionState,
    login_hook: Option<LoginHook>,
}

impl ApiClientBuilder {
    pub fn session(mut self, session: SessionState) -> Self {
        self.session = session;
        self
    }

    pub fn login_hook(mut self, hook: LoginHook) -> Self {
        self.login_hook = Some(hook);
        self
    }

    pub fn build(self) -> ApiClient {
        ApiClient {
            inner: Arc::new(ClientInner {
                transport: self.transport,
                base_url: self.base_url,
                refresh: RefreshGate::default(),
                session: self.session,
                navigation: Mutex::new(Navigation {
                    current_path: "/".to_string(),
                    redirect_path: None,
                }),
                login_hook: self.login_hook,
            }),
        }
    }
}

fn encode_body<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|err| {
        ApiError::client(
            crate::core::error::codes::INVALID_REQUEST,
            format!("Request body could not be encoded: {err}"),
        )
    })
}

fn decode_success<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    if response.status == 204 || response.body.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_value(Value::Null).map_err(ApiError::decode);
    }
    serde_json::from_slice(&response.body).map_err(ApiError::decode)
}

impl ApiClient {
    pub fn builder(transport: Arc<dyn Transport>, base_url: &str) -> ApiClientBuilder {
        ApiClientBuilder {
            transport,
            base_url: base_url.to_string(),
            session: SessionState::new(),
            login_hook: None,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.inner.session
    }

    pub fn login_url(&self) -> String {
        construct_api_url(&self.inner.base_url, &Endpoint::OAuth2Login.path())
    }

    /// Records the route the user is on, for post-login restoration.
    pub fn set_current_path(&self, path: &str) {
        if let Ok(mut navigation) = self.inner.navigation.lock() {
            navigation.current_path = path.to_string();
        }
    }

    pub fn take_redirect_path(&self) -> Option<String> {
        self.inner
            .navigation
            .lock()
            .ok()
            .and_then(|mut navigation| navigation.redirect_path.take())
    }

    pub fn clear_redirect_path(&self) {
        if let Ok(mut navigation) = self.inner.navigation.lock() {
            navigation.redirect_path = None;
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(HttpRequest::new(Method::GET, path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = encode_body(body)?;
        self.request(HttpRequest::new(Method::POST, path).body(body))
            .await
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(HttpRequest::new(Method::POST, path)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = encode_body(body)?;
        self.request(HttpRequest::new(Method::PUT, path).body(body))
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = encode_body(body)?;
        self.request(HttpRequest::new(Method::PATCH, path).body(body))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(HttpRequest::new(Method::DELETE, path)).await
    }

    /// Sends `request`, replaying it once after a token reissue when the
    /// access token has expired. A 204 resolves to the JSON `null` value of
    /// `T`, so `()` and `Option<_>` both accept it.
    pub async fn request<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, ApiError> {
        let mut retried = false;
        loop {
            let observed = self.inner.refresh.generation();
            let response = self
                .inner
                .transport
                .send(request.clone())
                .await
                .map_err(ApiError::transport)?;

            if response.is_success() {
                return decode_success(&response);
            }

            let error = ApiError::from_response(response.status, &response.body);
            if error.is_refreshable() && !retried {
                retried = true;
                debug!(path = %request.path, "Access token expired; joining refresh");
                if self
                    .inner
                    .refresh
                    .refresh(observed, || self.reissue())
                    .await
                    .is_ok()
                {
                    continue;
                }
                return Err(error);
            }

            if error.is_unauthorized() {
                self.inner.session.mark_logged_out();
            }
            return Err(error);
        }
    }

    /// Opens the shared task event stream. Not subject to token refresh.
    pub async fn open_event_stream(&self, path: &str) -> Result<EventByteStream, ApiError> {
        match self
            .inner
            .transport
            .open_event_stream(path)
            .await
            .map_err(ApiError::transport)?
        {
            EventStreamResponse::Stream(stream) => Ok(stream),
            EventStreamResponse::Rejected(response) => Err(ApiError::from_response(
                response.status,
                &response.body,
            )),
        }
    }

    async fn reissue(&self) -> Result<(), ApiError> {
        info!("Reissuing access token");
        let outcome = match self
            .inner
            .transport
            .send(HttpRequest::new(Method::POST, Endpoint::TokenReissue.path()))
            .await
        {
            Ok(response) if response.is_success() => Ok(()),
            Ok(response) => Err(ApiError::from_response(response.status, &response.body)),
            Err(err) => Err(ApiError::transport(err)),
        };

        if let Err(err) = &outcome {
            warn!(error = %err, "Token reissue failed; login required");
            self.require_login();
        }
        outcome
    }

    fn require_login(&self) {
        self.inner.session.mark_logged_out();

        let return_to = match self.inner.navigation.lock() {
            Ok(mut navigation) => {
                if navigation.current_path != "/" {
                    navigation.redirect_path = Some(navigation.current_path.clone());
                    Some(navigation.current_path.clone())
                } else {
                    None
                }
            }
            Err(_) => None,
        };

        if let Some(hook) = &self.inner.login_hook {
            hook(&LoginRedirect {
                login_url: self.login_url(),
                return_to,
            });
        }
    }
}
