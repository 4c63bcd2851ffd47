use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewerError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("API load error: {0}")]
    ApiLoad(String),

    #[error("Sign-in error: {0}")]
    SignIn(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Map error: {0}")]
    Map(String),
}

impl From<ViewerError> for String {
    fn from(err: ViewerError) -> Self {
        err.to_string()
    }
}

/// Outcome classes of a backend call that did not return data.
///
/// The backend signals failure by including a `code` in the response body;
/// anything that never produced a response body is a `Network` failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiFailure {
    #[error("No location data for date")]
    NoData,

    #[error("Access token expired")]
    AuthExpired,

    #[error("API returned code {0}")]
    Api(i64),

    #[error("Network failure: {0}")]
    Network(String),
}

impl ApiFailure {
    pub fn from_code(code: i64) -> Self {
        match code {
            404 => ApiFailure::NoData,
            401 => ApiFailure::AuthExpired,
            other => ApiFailure::Api(other),
        }
    }
}

impl From<ViewerError> for ApiFailure {
    fn from(err: ViewerError) -> Self {
        ApiFailure::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_map_to_failure_classes() {
        assert_eq!(ApiFailure::from_code(404), ApiFailure::NoData);
        assert_eq!(ApiFailure::from_code(401), ApiFailure::AuthExpired);
        assert_eq!(ApiFailure::from_code(500), ApiFailure::Api(500));
        assert_eq!(ApiFailure::from_code(403), ApiFailure::Api(403));
    }

    #[test]
    fn test_viewer_error_becomes_network_failure() {
        let failure: ApiFailure = ViewerError::Transport("offline".to_string()).into();
        assert_eq!(
            failure,
            ApiFailure::Network("Transport error: offline".to_string())
        );
    }
}
