use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReactError {
    /// The term produced no usable stems (pure punctuation, stopwords, empty).
    #[error("Trivial term: {term:?}")]
    TrivialTerm { term: String },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Config error: {key}, {message}")]
    Config { key: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ReactError {
    pub fn store(message: impl Into<String>) -> Self {
        ReactError::StoreUnavailable(message.into())
    }

    pub fn is_trivial_term(&self) -> bool {
        matches!(self, ReactError::TrivialTerm { .. })
    }
}

pub type ReactResult<T> = Result<T, ReactError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats() {
        let err = ReactError::TrivialTerm {
            term: "the".into(),
        };
        assert_eq!(err.to_string(), "Trivial term: \"the\"");

        let err = ReactError::store("connection reset");
        assert_eq!(err.to_string(), "Store unavailable: connection reset");

        let err = ReactError::Config {
            key: "REACT_STORE_SIZE".into(),
            message: "not a number".into(),
        };
        assert_eq!(
            err.to_string(),
            "Config error: REACT_STORE_SIZE, not a number"
        );
    }

    #[test]
    fn trivial_term_predicate() {
        assert!(ReactError::TrivialTerm { term: "!".into() }.is_trivial_term());
        assert!(!ReactError::store("down").is_trivial_term());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReactError>();
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "snapshot missing");
        let err: ReactError = io_err.into();
        assert!(matches!(err, ReactError::Io(_)));
    }

    #[test]
    fn json_error_converts() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: ReactError = json_err.into();
        assert!(matches!(err, ReactError::Serialization(_)));
    }
}
