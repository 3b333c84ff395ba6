//! Expense report approval workflow engine
//!
//! Reports collect line items while in draft, travel through a role- and
//! department-aware approval chain once submitted, and hand over to an
//! independent invoice/payment tracker after final approval. Records are
//! CBOR-encoded into an embedded sled store; decision writes are guarded by
//! a compare-and-swap so concurrent approvers cannot both win.

pub mod account;
pub mod approval;
pub mod customer;
pub mod error;
pub mod expense;
pub mod ledger;
pub mod report;
pub mod service;
pub mod storage;
pub mod types;
pub mod utils;
