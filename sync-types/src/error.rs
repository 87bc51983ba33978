//! Error types for zwave-sync wire types.

use thiserror::Error;

/// Errors raised while parsing or validating wire types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// A node key string was not of the form `home:node`.
    #[error("invalid node key: {0:?} (expected \"<home_id>:<node_id>\")")]
    InvalidNodeKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TypesError::InvalidNodeKey("nope".into());
        assert_eq!(
            err.to_string(),
            "invalid node key: \"nope\" (expected \"<home_id>:<node_id>\")"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypesError>();
    }
}
