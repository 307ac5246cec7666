use thiserror::Error;

#[derive(Debug, Error)]
pub enum EchoError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("provider overloaded: {0}")]
    Overloaded(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, EchoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_variant_prefix() {
        let err = EchoError::Validation("content must not be empty".to_string());
        assert!(format!("{err}").contains("validation error"));
        let err = EchoError::Overloaded("503".to_string());
        assert!(format!("{err}").contains("provider overloaded"));
    }
}
