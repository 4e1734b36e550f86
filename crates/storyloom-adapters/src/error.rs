//! Adapter errors and their mapping onto `DomainError`.

use storyloom_core::error::DomainError;

/// Failures talking to an external service.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The HTTP client could not be built.
    #[error("http client setup failed: {0}")]
    ClientSetup(#[source] reqwest::Error),

    /// The request failed in transit.
    #[error("{service} request failed: {source}")]
    Transport {
        /// Which service was called.
        service: &'static str,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{service} returned {status}: {body}")]
    Status {
        /// Which service was called.
        service: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The service answered successfully but without usable content.
    #[error("{service} response carried no {what}")]
    EmptyResponse {
        /// Which service was called.
        service: &'static str,
        /// What was missing.
        what: &'static str,
    },
}

impl AdapterError {
    pub(crate) fn transport(service: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { service, source }
    }
}

impl From<AdapterError> for DomainError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Transport { service, ref source } if source.is_timeout() => {
                DomainError::Timeout(service)
            }
            AdapterError::ClientSetup(_) => DomainError::Infrastructure(err.to_string()),
            other => DomainError::Upstream(other.to_string()),
        }
    }
}

/// Keeps error bodies short enough to log.
pub(crate) fn truncate_body(mut body: String) -> String {
    const LIMIT: usize = 512;
    if body.len() > LIMIT {
        let mut cut = LIMIT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_maps_to_upstream() {
        let err = AdapterError::Status {
            service: "completion",
            status: 429,
            body: "rate limited".into(),
        };

        let domain: DomainError = err.into();

        match domain {
            DomainError::Upstream(msg) => assert_eq!(msg, "completion returned 429: rate limited"),
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_response_is_retryable() {
        let domain: DomainError = AdapterError::EmptyResponse {
            service: "embedding",
            what: "vector",
        }
        .into();

        assert!(domain.is_retryable());
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "é".repeat(400);

        let truncated = truncate_body(body);

        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 515);
    }

    #[test]
    fn test_short_body_is_untouched() {
        assert_eq!(truncate_body("oops".into()), "oops");
    }
}
