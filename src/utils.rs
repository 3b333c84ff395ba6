//! Identifier minting and storage key layout helpers

use bech32::{Bech32m, Hrp};
use uuid7::uuid7;

use crate::error::WorkflowError;

// The hrp doubles as the key namespace in the store: every record's key
// starts with its entity prefix.
pub(crate) const ACCOUNT_HRP: &str = "acct_";
pub(crate) const CUSTOMER_HRP: &str = "cust_";
pub(crate) const REPORT_HRP: &str = "report_";
pub(crate) const LINE_ITEM_HRP: &str = "exp_";
pub(crate) const APPROVAL_HRP: &str = "appr_";

/// Mint a time-ordered uuid7 and encode it using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> Result<String, WorkflowError> {
    let hrp = Hrp::parse(hrp).map_err(|e| WorkflowError::Identifier(e.to_string()))?;
    let encoded = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())
        .map_err(|e| WorkflowError::Identifier(e.to_string()))?;
    Ok(encoded)
}

pub(crate) fn new_account_id() -> Result<String, WorkflowError> {
    new_uuid_to_bech32(ACCOUNT_HRP)
}

pub(crate) fn new_customer_id() -> Result<String, WorkflowError> {
    new_uuid_to_bech32(CUSTOMER_HRP)
}

pub(crate) fn new_report_id() -> Result<String, WorkflowError> {
    new_uuid_to_bech32(REPORT_HRP)
}

pub(crate) fn new_line_item_id() -> Result<String, WorkflowError> {
    new_uuid_to_bech32(LINE_ITEM_HRP)
}

pub(crate) fn new_approval_id() -> Result<String, WorkflowError> {
    new_uuid_to_bech32(APPROVAL_HRP)
}

// Line items and approval records live under their report's key so a single
// prefix scan collects everything belonging to one report. '/' never occurs
// in a bech32 string, so the separator is unambiguous.
pub(crate) fn line_item_key(report_id: &str, item_id: &str) -> String {
    format!("{report_id}/{item_id}")
}

pub(crate) fn line_item_prefix(report_id: &str) -> String {
    format!("{report_id}/{LINE_ITEM_HRP}")
}

pub(crate) fn approval_key(report_id: &str, approval_id: &str) -> String {
    format!("{report_id}/{approval_id}")
}

pub(crate) fn approval_prefix(report_id: &str) -> String {
    format!("{report_id}/{APPROVAL_HRP}")
}
