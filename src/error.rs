use thiserror::Error;

/// Errors from the blob store backend.
///
/// All variants are `Clone` so that cache waiters sharing a failed
/// computation can each receive the error.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Object does not exist in the store
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Errors produced while parsing request parameters into a transform request.
#[derive(Debug, Clone, Error)]
pub enum ParamError {
    /// A recognized parameter has an invalid value
    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// The request path carries no source identifier
    #[error("Missing source identifier")]
    MissingSource,
}

/// Errors from the image processing pipeline.
#[derive(Debug, Clone, Error)]
pub enum ProcessError {
    /// Byte signature does not match any supported input format
    /// (should map to HTTP 415)
    #[error("Unsupported format: {reason}")]
    UnsupportedFormat { reason: String },

    /// Source bytes could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Processed raster could not be encoded
    #[error("Encode error: {0}")]
    Encode(String),
}

/// Errors surfaced by the delivery path (parse, fetch, process).
#[derive(Debug, Clone, Error)]
pub enum DeliverError {
    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Errors surfaced by the upload ingest path.
#[derive(Debug, Clone, Error)]
pub enum UploadError {
    /// Payload exceeds the configured maximum upload size
    #[error("Payload too large: {size} bytes (maximum {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Detected content type is outside the supported decode set
    #[error("Unsupported upload type: {reason}")]
    UnsupportedFormat { reason: String },

    /// Malformed multipart body or missing upload field
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// Normalization pipeline failure
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Storage failure (any partial write has been cleaned up)
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors surfaced by the delete path.
///
/// `ConfirmationTimeout` is deliberately distinct from `Store`: the
/// former means the delete call succeeded but the object was still
/// retrievable after the confirmation window, the latter that the delete
/// call itself failed.
#[derive(Debug, Clone, Error)]
pub enum DeleteError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The object was still retrievable after the confirmation window
    #[error("Delete of {id} not confirmed after {waited_ms}ms")]
    ConfirmationTimeout { id: String, waited_ms: u64 },
}
