use thiserror::Error;

/// Failure reported by an external collaborator.
///
/// Callers branch on the variant: `AuthInvalid` cannot be fixed without new
/// credentials, `Unreachable` may clear up by the next scheduled run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{service}: authentication failed: {message}")]
    AuthInvalid { service: &'static str, message: String },

    #[error("{service}: service unreachable: {message}")]
    Unreachable { service: &'static str, message: String },

    #[error("{service}: {message}")]
    Api { service: &'static str, message: String },
}

impl SourceError {
    pub fn auth(service: &'static str, message: impl Into<String>) -> Self {
        SourceError::AuthInvalid { service, message: message.into() }
    }

    pub fn unreachable(service: &'static str, message: impl Into<String>) -> Self {
        SourceError::Unreachable { service, message: message.into() }
    }

    pub fn api(service: &'static str, message: impl Into<String>) -> Self {
        SourceError::Api { service, message: message.into() }
    }

    /// Classify a transport-level reqwest failure
    pub fn from_transport(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            SourceError::unreachable(service, err.to_string())
        } else if err.status().map(is_auth_status).unwrap_or(false) {
            SourceError::auth(service, err.to_string())
        } else {
            SourceError::api(service, err.to_string())
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(service: &'static str, status: reqwest::StatusCode, body: &str) -> Self {
        let message = format!("{} - {}", status, body);
        if is_auth_status(status) {
            SourceError::auth(service, message)
        } else if status.is_server_error() {
            SourceError::unreachable(service, message)
        } else {
            SourceError::api(service, message)
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, SourceError::AuthInvalid { .. })
    }
}

fn is_auth_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_classification() {
        assert!(SourceError::from_status("plex", StatusCode::UNAUTHORIZED, "").is_auth());
        assert!(SourceError::from_status("plex", StatusCode::FORBIDDEN, "").is_auth());
        assert!(matches!(
            SourceError::from_status("plex", StatusCode::BAD_GATEWAY, ""),
            SourceError::Unreachable { .. }
        ));
        assert!(matches!(
            SourceError::from_status("plex", StatusCode::NOT_FOUND, "missing"),
            SourceError::Api { .. }
        ));
    }

    #[test]
    fn test_display_names_service() {
        let err = SourceError::auth("anilist", "Invalid token");
        assert_eq!(err.to_string(), "anilist: authentication failed: Invalid token");
    }
}
