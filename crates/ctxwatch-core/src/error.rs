use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerError {
    ContextNotFound(String),
    Stopped,
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContextNotFound(name) => write!(f, "context '{name}' not found"),
            Self::Stopped => write!(f, "contexts manager has stopped"),
        }
    }
}

impl std::error::Error for ManagerError {}

/// Coarse classification of a stream failure, used for log output only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ConnectionRefused,
    TimedOut,
    Other,
}

impl FailureKind {
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("econnrefused") || lower.contains("connection refused") {
            Self::ConnectionRefused
        } else if lower.contains("timed out") || lower.contains("timeout") {
            Self::TimedOut
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionRefused => write!(f, "connection refused"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Other => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_failures() {
        assert_eq!(
            FailureKind::classify("client error (Connect): tcp connect error: Connection refused (os error 111)"),
            FailureKind::ConnectionRefused
        );
        assert_eq!(FailureKind::classify("connect ECONNREFUSED 127.0.0.1:6443"), FailureKind::ConnectionRefused);
        assert_eq!(FailureKind::classify("operation timed out"), FailureKind::TimedOut);
        assert_eq!(FailureKind::classify("403 Forbidden"), FailureKind::Other);
    }

    #[test]
    fn not_found_names_the_context() {
        let err = ManagerError::ContextNotFound("prod".into());
        assert_eq!(err.to_string(), "context 'prod' not found");
    }
}
