//! Collaborator contracts: receipt object storage and optical recognition
//!
//! The workflow core only ever holds opaque public references to receipt
//! files; upload protocol and bucket layout belong to the implementations
//! behind these traits.

use std::sync::Mutex;

use crate::error::WorkflowError;
use crate::expense::Category;
use crate::types::ExpenseDate;
use crate::utils;

/// Handle pair for a client-side upload: the caller pushes bytes at
/// `upload_handle` and stores `public_reference` on the line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub upload_handle: String,
    pub public_reference: String,
}

pub trait ReceiptStore: Send + Sync {
    /// Issue an upload handle and the public reference it will be served
    /// under.
    fn issue_upload_target(&self, content_type: &str) -> Result<UploadTarget, WorkflowError>;

    /// Remove stored receipt files. Callers treat a failure as non-fatal:
    /// the database row is the source of truth and orphaned files are
    /// accepted over blocked deletions.
    fn delete(&self, references: &[String]) -> Result<(), WorkflowError>;
}

/// In-process receipt store for embedding and tests. Upload targets are
/// minted identifiers; deletions are recorded for inspection.
#[derive(Debug, Default)]
pub struct MemoryReceiptStore {
    deleted: Mutex<Vec<String>>,
}

impl MemoryReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every reference handed to `delete` so far, in call order.
    pub fn deleted_references(&self) -> Vec<String> {
        self.deleted.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl ReceiptStore for MemoryReceiptStore {
    fn issue_upload_target(&self, content_type: &str) -> Result<UploadTarget, WorkflowError> {
        let extension = content_type.rsplit('/').next().unwrap_or("bin");
        let reference = utils::new_uuid_to_bech32("receipt_")?;
        Ok(UploadTarget {
            upload_handle: format!("mem://{reference}"),
            public_reference: format!("{reference}.{extension}"),
        })
    }

    fn delete(&self, references: &[String]) -> Result<(), WorkflowError> {
        if let Ok(mut deleted) = self.deleted.lock() {
            deleted.extend(references.iter().cloned());
        }
        Ok(())
    }
}

/// Best-effort structured guess produced by receipt recognition. Every field
/// is optional; a guess only ever pre-fills a draft line item and the normal
/// draft validation still applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognizedReceipt {
    /// Gross amount in minor units.
    pub amount: Option<u64>,
    pub expense_date: Option<ExpenseDate>,
    pub category: Option<Category>,
    pub invoice_number: Option<String>,
    /// Whether the document title marked it as a dedicated VAT invoice.
    pub is_vat_invoice: Option<bool>,
    pub tax_rate_bps: Option<u32>,
}

pub trait ReceiptAnalyzer: Send + Sync {
    fn analyze(&self, image: &[u8]) -> Result<RecognizedReceipt, WorkflowError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_mints_distinct_targets() {
        let store = MemoryReceiptStore::new();

        let a = store.issue_upload_target("image/jpeg").unwrap();
        let b = store.issue_upload_target("image/jpeg").unwrap();

        assert_ne!(a.public_reference, b.public_reference);
        assert!(a.public_reference.ends_with(".jpeg"));
        assert!(a.upload_handle.starts_with("mem://"));
    }

    #[test]
    fn memory_store_records_deletions() {
        let store = MemoryReceiptStore::new();

        store
            .delete(&["receipt_one.jpg".into(), "receipt_two.pdf".into()])
            .unwrap();

        assert_eq!(
            store.deleted_references(),
            vec!["receipt_one.jpg".to_string(), "receipt_two.pdf".to_string()]
        );
    }
}
