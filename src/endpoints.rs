//! Typed access to the location backend and the identity provider.
//!
//! `EndpointClient` holds no retry policy. It classifies every response into
//! data or an [`ApiFailure`] and leaves the decision to the caller.

use std::cell::Cell;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::ViewerConfig;
use crate::error::{ApiFailure, ViewerError};
use crate::model::{
    AccessToken, DayRequest, HistoryDay, HistoryResponse, LatestResponse, LocationRecord,
    UserProfile,
};

pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

const OAUTH_API: &str = "oauth2";
const OAUTH_VERSION: &str = "v2";

/// The remote surface the client talks through: API discovery, authorization
/// and method execution. Responses come back as raw JSON.
#[allow(async_fn_in_trait)]
pub trait Backend {
    async fn load_api(&self, name: &str, version: &str, root: Option<&str>)
        -> Result<(), ViewerError>;

    async fn authorize(
        &self,
        client_id: &str,
        scopes: &[&str],
        immediate: bool,
    ) -> Result<AccessToken, ViewerError>;

    /// Execute a dotted method path (e.g. `mylatitude.locations.history`).
    async fn execute(&self, method: &str, payload: Value) -> Result<Value, ViewerError>;
}

/// Connection settings taken from the page configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub client_id: String,
    pub api_root: String,
    pub api_name: String,
    pub api_version: String,
}

impl From<&ViewerConfig> for ApiSettings {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            api_root: config.api_root.clone(),
            api_name: config.api_name.clone(),
            api_version: config.api_version.clone(),
        }
    }
}

/// Whether the signed-in user may use the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessState {
    Granted(UserProfile),
    /// The user has never consented; an interactive sign-in is needed.
    ConsentRequired,
    Denied(String),
}

pub struct EndpointClient<B: Backend> {
    backend: B,
    settings: ApiSettings,
    ready: Cell<bool>,
}

impl<B: Backend> EndpointClient<B> {
    pub fn new(backend: B, settings: ApiSettings) -> Self {
        Self {
            backend,
            settings,
            ready: Cell::new(false),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_ready(&self) -> bool {
        self.ready.get()
    }

    /// Load the backend API and the OAuth2 API. Ready only once both are loaded.
    pub async fn initialize(&self) -> Result<(), ViewerError> {
        let root = (!self.settings.api_root.is_empty()).then_some(self.settings.api_root.as_str());
        self.backend
            .load_api(&self.settings.api_name, &self.settings.api_version, root)
            .await?;
        self.backend
            .load_api(OAUTH_API, OAUTH_VERSION, None)
            .await?;

        self.ready.set(true);
        info!(
            "Loaded {} {} and {} {}",
            self.settings.api_name, self.settings.api_version, OAUTH_API, OAUTH_VERSION
        );
        Ok(())
    }

    /// Request authorization. A silent attempt never shows UI and fails
    /// when there is no cached consent.
    pub async fn sign_in(&self, silent: bool) -> Result<AccessToken, ViewerError> {
        let token = self
            .backend
            .authorize(&self.settings.client_id, &SCOPES, silent)
            .await?;

        if let Some(error) = token.error.as_deref() {
            return Err(ViewerError::SignIn(error.to_string()));
        }
        if token.access_token.is_none() {
            return Err(ViewerError::SignIn("No access token returned".to_string()));
        }
        debug!("Signed in (silent: {})", silent);
        Ok(token)
    }

    pub async fn fetch_history(&self, date: NaiveDate) -> Result<HistoryDay, ApiFailure> {
        let request = DayRequest::from(date);
        let payload = serde_json::to_value(request)
            .map_err(|e| ApiFailure::Network(format!("Failed to encode request: {}", e)))?;

        let response: HistoryResponse = self.call("locations.history", payload).await?;
        Ok(HistoryDay::from_response(date, response))
    }

    pub async fn fetch_latest(&self) -> Result<LocationRecord, ApiFailure> {
        let response: LatestResponse = self.call("locations.latest", json!({})).await?;
        response.location.ok_or(ApiFailure::NoData)
    }

    pub async fn user_info(&self) -> Result<UserProfile, ApiFailure> {
        self.call_method(&format!("{}.userinfo.get", OAUTH_API), json!({}))
            .await
    }

    /// Initialize, sign in silently, then check the user can reach the backend.
    pub async fn connect(&self) -> Result<AccessState, ViewerError> {
        self.initialize().await?;
        if let Err(e) = self.sign_in(true).await {
            // The access check below decides what the user sees.
            warn!("Silent sign-in failed: {}", e);
        }
        Ok(self.check_access().await)
    }

    /// Interactive sign-in followed by an access check.
    pub async fn grant_access(&self) -> AccessState {
        if let Err(e) = self.sign_in(false).await {
            warn!("Interactive sign-in failed: {}", e);
        }
        self.check_access().await
    }

    pub async fn check_access(&self) -> AccessState {
        match self.user_info().await {
            Ok(profile) => {
                info!("Access granted for {}", profile.display_name());
                AccessState::Granted(profile)
            }
            Err(ApiFailure::AuthExpired) => AccessState::ConsentRequired,
            Err(e) => {
                warn!("Access check failed: {}", e);
                AccessState::Denied(e.to_string())
            }
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, payload: Value) -> Result<T, ApiFailure> {
        let path = format!("{}.{}", self.settings.api_name, method);
        self.call_method(&path, payload).await
    }

    async fn call_method<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: Value,
    ) -> Result<T, ApiFailure> {
        if !self.ready.get() {
            return Err(ApiFailure::Network("API client not initialized".to_string()));
        }

        let response = self.backend.execute(path, payload).await?;
        if let Some(code) = error_code(&response) {
            debug!("{} returned code {}", path, code);
            return Err(ApiFailure::from_code(code));
        }

        serde_json::from_value(response)
            .map_err(|e| ApiFailure::Network(format!("Failed to decode {} response: {}", path, e)))
    }
}

/// Responses carry a numeric `code` only on failure.
fn error_code(response: &Value) -> Option<i64> {
    match response.get("code")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    #[derive(Default)]
    struct FakeBackend {
        loaded: RefCell<Vec<(String, String, Option<String>)>>,
        authorizations: RefCell<Vec<bool>>,
        tokens: RefCell<VecDeque<AccessToken>>,
        calls: RefCell<Vec<(String, Value)>>,
        responses: RefCell<VecDeque<Value>>,
        fail_load: bool,
    }

    impl Backend for FakeBackend {
        async fn load_api(
            &self,
            name: &str,
            version: &str,
            root: Option<&str>,
        ) -> Result<(), ViewerError> {
            if self.fail_load {
                return Err(ViewerError::ApiLoad(name.to_string()));
            }
            self.loaded
                .borrow_mut()
                .push((name.to_string(), version.to_string(), root.map(str::to_string)));
            Ok(())
        }

        async fn authorize(
            &self,
            _client_id: &str,
            scopes: &[&str],
            immediate: bool,
        ) -> Result<AccessToken, ViewerError> {
            assert_eq!(scopes, &SCOPES[..]);
            self.authorizations.borrow_mut().push(immediate);
            Ok(self.tokens.borrow_mut().pop_front().unwrap_or(AccessToken {
                access_token: Some("token".to_string()),
                ..Default::default()
            }))
        }

        async fn execute(&self, method: &str, payload: Value) -> Result<Value, ViewerError> {
            self.calls.borrow_mut().push((method.to_string(), payload));
            self.responses
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| ViewerError::Transport("no response".to_string()))
        }
    }

    fn settings() -> ApiSettings {
        ApiSettings {
            client_id: "client".to_string(),
            api_root: "https://example.appspot.com/_ah/api".to_string(),
            api_name: "mylatitude".to_string(),
            api_version: "v1".to_string(),
        }
    }

    fn client_with(responses: Vec<Value>) -> EndpointClient<FakeBackend> {
        let backend = FakeBackend {
            responses: RefCell::new(responses.into()),
            ..Default::default()
        };
        EndpointClient::new(backend, settings())
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2013, 9, 24).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_loads_both_apis() {
        let client = client_with(vec![]);
        assert!(!client.is_ready());

        client.initialize().await.unwrap();

        assert!(client.is_ready());
        let loaded = client.backend().loaded.borrow();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].0, "mylatitude");
        assert_eq!(
            loaded[0].2.as_deref(),
            Some("https://example.appspot.com/_ah/api")
        );
        assert_eq!(loaded[1], ("oauth2".to_string(), "v2".to_string(), None));
    }

    #[tokio::test]
    async fn test_failed_load_leaves_client_not_ready() {
        let client = EndpointClient::new(
            FakeBackend {
                fail_load: true,
                ..Default::default()
            },
            settings(),
        );
        assert!(client.initialize().await.is_err());
        assert!(!client.is_ready());
        assert!(matches!(
            client.fetch_history(date()).await,
            Err(ApiFailure::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_history_sends_day_payload() {
        let client = client_with(vec![json!({
            "locations": [{"latitude": 1.5, "longitude": 2.5, "accuracy": 10, "timestampMs": "1000"}],
            "totalLocations": 1
        })]);
        client.initialize().await.unwrap();

        let day = client.fetch_history(date()).await.unwrap();

        assert_eq!(day.date, date());
        assert_eq!(day.locations.len(), 1);
        let calls = client.backend().calls.borrow();
        assert_eq!(calls[0].0, "mylatitude.locations.history");
        assert_eq!(calls[0].1, json!({"year": 2013, "month": 9, "day": 24}));
    }

    #[tokio::test]
    async fn test_error_codes_are_classified() {
        let client = client_with(vec![
            json!({"code": 404, "message": "No locations"}),
            json!({"code": 401}),
            json!({"code": 500}),
        ]);
        client.initialize().await.unwrap();

        assert_eq!(client.fetch_history(date()).await, Err(ApiFailure::NoData));
        assert_eq!(
            client.fetch_history(date()).await,
            Err(ApiFailure::AuthExpired)
        );
        assert_eq!(client.fetch_history(date()).await, Err(ApiFailure::Api(500)));
    }

    #[tokio::test]
    async fn test_transport_error_is_network_failure() {
        let client = client_with(vec![]);
        client.initialize().await.unwrap();
        assert!(matches!(
            client.fetch_latest().await,
            Err(ApiFailure::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_latest_without_location_is_no_data() {
        let client = client_with(vec![
            json!({}),
            json!({"location": {"latitude": 3.0, "longitude": 4.0, "accuracy": 5, "timestampMs": "7"}}),
        ]);
        client.initialize().await.unwrap();

        assert_eq!(client.fetch_latest().await, Err(ApiFailure::NoData));
        let latest = client.fetch_latest().await.unwrap();
        assert_eq!(latest.timestamp_ms, 7);
        assert_eq!(
            client.backend().calls.borrow()[1].0,
            "mylatitude.locations.latest"
        );
    }

    #[tokio::test]
    async fn test_sign_in_rejects_error_tokens() {
        let client = client_with(vec![]);
        client.backend().tokens.borrow_mut().push_back(AccessToken {
            error: Some("immediate_failed".to_string()),
            ..Default::default()
        });
        client
            .backend()
            .tokens
            .borrow_mut()
            .push_back(AccessToken::default());

        assert_eq!(
            client.sign_in(true).await,
            Err(ViewerError::SignIn("immediate_failed".to_string()))
        );
        assert!(client.sign_in(false).await.is_err());
        assert!(client.sign_in(true).await.is_ok());
        assert_eq!(*client.backend().authorizations.borrow(), vec![true, false, true]);
    }

    #[tokio::test]
    async fn test_connect_maps_userinfo_outcome() {
        let client = client_with(vec![json!({"name": "Neil", "email": "n@example.com"})]);
        let state = client.connect().await.unwrap();
        assert!(matches!(state, AccessState::Granted(ref p) if p.display_name() == "Neil"));
        assert_eq!(*client.backend().authorizations.borrow(), vec![true]);
        assert_eq!(client.backend().calls.borrow()[0].0, "oauth2.userinfo.get");

        let client = client_with(vec![json!({"code": 401})]);
        assert_eq!(client.connect().await.unwrap(), AccessState::ConsentRequired);

        let client = client_with(vec![json!({"code": 403})]);
        assert!(matches!(
            client.connect().await.unwrap(),
            AccessState::Denied(_)
        ));
    }

    #[tokio::test]
    async fn test_grant_access_signs_in_interactively() {
        let client = client_with(vec![json!({"code": 401}), json!({"name": "Neil"})]);
        assert_eq!(client.connect().await.unwrap(), AccessState::ConsentRequired);

        let state = client.grant_access().await;

        assert!(matches!(state, AccessState::Granted(_)));
        assert_eq!(*client.backend().authorizations.borrow(), vec![true, false]);
    }

    #[test]
    fn test_error_code_accepts_string_codes() {
        assert_eq!(error_code(&json!({"code": "404"})), Some(404));
        assert_eq!(error_code(&json!({"locations": []})), None);
        assert_eq!(error_code(&json!({"code": null})), None);
    }
}
