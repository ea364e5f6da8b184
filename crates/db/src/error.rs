use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures raised by a document store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("datastore request failed: {0}")]
    Mongo(#[source] mongodb::error::Error),

    /// A write would break a unique index.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("failed to encode document: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("failed to decode document: {0}")]
    Decode(#[from] bson::de::Error),

    #[error("collection '{0}' has no text index")]
    MissingTextIndex(&'static str),

    #[error("document in '{0}' has no _id")]
    MissingId(&'static str),
}

/// Server code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) => write.code == DUPLICATE_KEY_CODE,
        ErrorKind::BulkWrite(failure) => failure
            .write_errors
            .iter()
            .flatten()
            .any(|write| write.code == DUPLICATE_KEY_CODE),
        ErrorKind::Command(command) => command.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            Self::DuplicateKey(err.to_string())
        } else {
            Self::Mongo(err)
        }
    }
}
