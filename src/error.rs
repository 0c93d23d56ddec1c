use thiserror::Error;

/// Failure of a single remote provider call.
///
/// Everything except `NotFound` means the provider could not answer; callers must keep that
/// apart from "the team does not exist".
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider returned not found")]
    NotFound,

    #[error("provider rate limit hit")]
    RateLimited,

    #[error("provider request timed out")]
    Timeout,

    #[error("http {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid provider payload: {0}")]
    Decode(String),
}

impl ProviderError {
    pub fn is_rate_limit_or_timeout(&self) -> bool {
        matches!(self, ProviderError::RateLimited | ProviderError::Timeout)
    }

    pub fn is_unavailable(&self) -> bool {
        !matches!(self, ProviderError::NotFound)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::Http {
                status: status.as_u16(),
                body: String::new(),
            }
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Decode(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no team found for \"{input}\"")]
pub struct TeamNotFound {
    pub input: String,
}

/// A provider record that cannot be turned into a stored event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fixture {fixture_id}: {reason}")]
pub struct DataInconsistency {
    pub fixture_id: u64,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::ProviderError;

    #[test]
    fn not_found_is_not_unavailable() {
        assert!(!ProviderError::NotFound.is_unavailable());
        assert!(ProviderError::Timeout.is_unavailable());
        assert!(ProviderError::RateLimited.is_rate_limit_or_timeout());
        assert!(
            !ProviderError::Http {
                status: 500,
                body: String::new()
            }
            .is_rate_limit_or_timeout()
        );
    }
}
