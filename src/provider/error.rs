//! # PagerDuty Errors

/// Errors returned by every PagerDuty client implementation
#[derive(Debug, thiserror::Error)]
pub enum PagerdutyError {
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("PagerDuty API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("PagerDuty request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode PagerDuty response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("PagerDuty returned no {0} in the response body")]
    EmptyResponse(&'static str),
}

impl PagerdutyError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Remote object does not exist; deletes treat this as success
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Api { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        assert!(PagerdutyError::not_found("service", "S1").is_not_found());
        assert!(PagerdutyError::Api {
            status: 404,
            message: "Not Found".to_string()
        }
        .is_not_found());
        assert!(!PagerdutyError::Api {
            status: 500,
            message: "boom".to_string()
        }
        .is_not_found());
        assert!(!PagerdutyError::EmptyResponse("ruleset").is_not_found());
    }

    #[test]
    fn test_not_found_message() {
        let err = PagerdutyError::not_found("rule", "R1");
        assert_eq!(err.to_string(), "rule R1 not found");
    }
}
