//! Error taxonomy for the expense approval workflow
//!
//! Every state-changing operation either fully applies or fails with one of
//! these variants and commits nothing.

use crate::report::ReportStatus;

#[derive(thiserror::Error, Debug)]
pub enum WorkflowError {
    /// Bad input shape or values, rejected before any write.
    #[error("validation failed: {0}")]
    Validation(String),
    /// The operation is not legal for the entity's current status.
    #[error("operation not allowed while the report is {status:?}")]
    InvalidState { status: ReportStatus },
    /// The report changed between read and write. Callers must re-fetch and
    /// retry deliberately; nothing is retried automatically.
    #[error("report status changed since the operation was computed")]
    StaleState,
    #[error("account {actor} is not authorized for this operation")]
    Unauthorized { actor: String },
    #[error("a report needs at least one line item before submission")]
    EmptyReport,
    #[error("a report cannot be marked paid before its invoice is received")]
    InvoiceRequired,
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("identifier error: {0}")]
    Identifier(String),
    #[error("receipt store error: {0}")]
    ReceiptStore(String),
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("encode error: {0}")]
    Encode(#[from] minicbor::encode::Error<std::convert::Infallible>),
    #[error("decode error: {0}")]
    Decode(#[from] minicbor::decode::Error),
}
