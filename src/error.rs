//! Error type shared by the fallible map operations.

use thiserror::Error;

/// Failure of a [`ChainedHashMap`](crate::ChainedHashMap) operation.
///
/// Every operation that returns one of these leaves the map exactly as it
/// was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: &'static str },
    #[error("key is not in the map")]
    NotFound,
}

pub type Result<T> = core::result::Result<T, MapError>;

#[cfg(test)]
mod tests {
    use super::MapError;

    #[test]
    fn display_messages() {
        let e = MapError::InvalidArgument {
            reason: "table length is smaller than the number of entries",
        };
        assert_eq!(
            e.to_string(),
            "invalid argument: table length is smaller than the number of entries"
        );
        assert_eq!(MapError::NotFound.to_string(), "key is not in the map");
    }
}
