//! Error types for metadata polling

/// Error from a single metadata request.
///
/// A 404 is not an error: it is the steady-state answer of the metadata
/// service for an instance that is not being reclaimed, and is handed to
/// the detector as a normal response.
#[derive(Debug)]
pub enum FetchError {
    /// Request did not complete within the client timeout
    Timeout,
    /// Connection refused, DNS failure, reset, body read failure
    Transport { message: String },
    /// Unexpected HTTP status (anything but success or 404)
    Status { status: u16, body: String },
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::Transport { message } => write!(f, "transport error: {message}"),
            Self::Status { status, body } if body.is_empty() => write!(f, "HTTP {status}"),
            Self::Status { status, body } => write!(f, "HTTP {status}: {}", body.trim()),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Create transport error from reqwest error
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Timeout;
        }
        Self::Transport {
            message: e.to_string(),
        }
    }
}

/// Error from one detector check.
#[derive(Debug)]
pub enum DetectError {
    Fetch(FetchError),
    /// Malformed instance-action JSON
    Decode { message: String },
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "{e}"),
            Self::Decode { message } => write!(f, "decode error: {message}"),
        }
    }
}

impl std::error::Error for DetectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch(e) => Some(e),
            Self::Decode { .. } => None,
        }
    }
}

impl From<FetchError> for DetectError {
    fn from(e: FetchError) -> Self {
        Self::Fetch(e)
    }
}

impl From<serde_json::Error> for DetectError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode {
            message: e.to_string(),
        }
    }
}

/// Error starting the watcher
#[derive(Debug)]
pub enum WatchError {
    Client(FetchError),
    Spawn(std::io::Error),
}

impl std::fmt::Display for WatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client(e) => write!(f, "cannot build metadata client: {e}"),
            Self::Spawn(e) => write!(f, "cannot start poller thread: {e}"),
        }
    }
}

impl std::error::Error for WatchError {}

impl From<FetchError> for WatchError {
    fn from(e: FetchError) -> Self {
        Self::Client(e)
    }
}

impl From<std::io::Error> for WatchError {
    fn from(e: std::io::Error) -> Self {
        Self::Spawn(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_status_with_body() {
        let err = FetchError::Status {
            status: 500,
            body: "internal error\n".to_string(),
        };
        assert_eq!(format!("{err}"), "HTTP 500: internal error");
    }

    #[test]
    fn display_status_without_body() {
        let err = FetchError::Status {
            status: 503,
            body: String::new(),
        };
        assert_eq!(format!("{err}"), "HTTP 503");
    }

    #[test]
    fn display_timeout() {
        assert_eq!(format!("{}", FetchError::Timeout), "request timed out");
    }

    #[test]
    fn detect_error_wraps_fetch() {
        let err: DetectError = FetchError::Transport {
            message: "connection refused".to_string(),
        }
        .into();
        assert!(matches!(err, DetectError::Fetch(FetchError::Transport { .. })));
        assert_eq!(format!("{err}"), "transport error: connection refused");
    }

    #[test]
    fn detect_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = DetectError::from(json_err);
        assert!(format!("{err}").starts_with("decode error:"));
    }
}
