use crate::db::StoreError;

/// Failure of a single request. Nothing is retried and nothing is partially
/// applied.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request payload could not be parsed into the expected shape.
    #[error("{0}")]
    Client(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
