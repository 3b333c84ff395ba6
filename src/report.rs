//! Expense reports and the approval status machine

use chrono::Utc;

use crate::types::TimeStamp;

/// Lifecycle of a report through the approval chain.
///
/// `Draft → Submitted → {PendingPartnerApproval ⇄ Approved}`, with send-back
/// and withdrawal returning to `Draft` from either in-flight status.
/// `Approved` is terminal for the approval machine; the financial settlement
/// flags keep moving independently afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum ReportStatus {
    #[n(0)]
    Draft,
    #[n(1)]
    Submitted,
    #[n(2)]
    PendingPartnerApproval,
    #[n(3)]
    Approved,
}

impl ReportStatus {
    /// True while an approver's decision is still outstanding.
    pub fn awaiting_decision(self) -> bool {
        matches!(
            self,
            ReportStatus::Submitted | ReportStatus::PendingPartnerApproval
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Report {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub owner_id: String,
    #[n(2)]
    pub title: String,
    #[n(3)]
    pub status: ReportStatus,
    /// Free-text customer this report bills to, if any.
    #[n(4)]
    pub customer_name: Option<String>,
    #[n(5)]
    pub bill_to_customer: bool,
    /// Sum of line-item amounts in minor units, frozen at submission.
    #[n(6)]
    pub total_amount: u64,
    #[n(7)]
    pub created_at: TimeStamp<Utc>,
    #[n(8)]
    pub submitted_at: Option<TimeStamp<Utc>>,
    #[n(9)]
    pub primary_approver_id: Option<String>,
    #[n(10)]
    pub primary_approved_at: Option<TimeStamp<Utc>>,
    #[n(11)]
    pub final_approver_id: Option<String>,
    #[n(12)]
    pub final_approved_at: Option<TimeStamp<Utc>>,
    #[n(13)]
    pub invoice_received: bool,
    #[n(14)]
    pub paid: bool,
}

impl Report {
    pub fn new(id: String, owner_id: String, title: &str) -> Self {
        Self {
            id,
            owner_id,
            title: title.to_string(),
            status: ReportStatus::Draft,
            customer_name: None,
            bill_to_customer: false,
            total_amount: 0,
            created_at: TimeStamp::new(),
            submitted_at: None,
            primary_approver_id: None,
            primary_approved_at: None,
            final_approver_id: None,
            final_approved_at: None,
            invoice_received: false,
            paid: false,
        }
    }

    /// Full rollback shared by withdrawal and send-back: back to draft with
    /// no approval progress left behind, so stale approver metadata cannot
    /// reappear on resubmission.
    pub fn clear_approval_progress(&mut self) {
        self.status = ReportStatus::Draft;
        self.submitted_at = None;
        self.primary_approver_id = None;
        self.primary_approved_at = None;
        self.final_approver_id = None;
        self.final_approved_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_report_starts_as_empty_draft() {
        let report = Report::new("report_test".into(), "acct_test".into(), "June travel");

        assert_eq!(report.status, ReportStatus::Draft);
        assert_eq!(report.total_amount, 0);
        assert!(report.submitted_at.is_none());
    }

    #[test]
    fn rollback_clears_every_approval_field() {
        let mut report = Report::new("report_test".into(), "acct_test".into(), "June travel");
        report.status = ReportStatus::PendingPartnerApproval;
        report.submitted_at = Some(TimeStamp::new());
        report.primary_approver_id = Some("acct_mgr".into());
        report.primary_approved_at = Some(TimeStamp::new());

        report.clear_approval_progress();

        assert_eq!(report.status, ReportStatus::Draft);
        assert!(report.submitted_at.is_none());
        assert!(report.primary_approver_id.is_none());
        assert!(report.primary_approved_at.is_none());
        assert!(report.final_approver_id.is_none());
        assert!(report.final_approved_at.is_none());
    }

    #[test]
    fn report_cbor_roundtrip() {
        let report = Report::new("report_test".into(), "acct_test".into(), "June travel");

        let encoded = minicbor::to_vec(&report).unwrap();
        let decoded: Report = minicbor::decode(&encoded).unwrap();

        assert_eq!(report, decoded);
    }
}
