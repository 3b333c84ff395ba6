//! Service layer API for the expense approval workflow
//!
//! Every operation is a single read-check-write unit. Status-bearing report
//! mutations commit through a compare-and-swap on the stored bytes, so a
//! decision racing another writer loses with `StaleState` instead of
//! clobbering it.

use std::sync::Arc;

use sled::{Batch, Db};
use tracing::{info, warn};

use crate::account::{Account, AccountPatch, Role};
use crate::approval::{self, ApprovalRecord, DecisionKind};
use crate::customer::Customer;
use crate::error::WorkflowError;
use crate::expense::{LineItem, LineItemDraft};
use crate::ledger::{self, CategoryTotal};
use crate::report::{Report, ReportStatus};
use crate::storage::ReceiptStore;
use crate::types::TimeStamp;
use crate::utils;

/// Field-wise report metadata update. `None` leaves a field untouched;
/// an empty customer name clears the attribution.
#[derive(Debug, Default, Clone)]
pub struct ReportDetails {
    pub title: Option<String>,
    pub customer_name: Option<String>,
    pub bill_to_customer: Option<bool>,
}

/// A report together with its line items, audit history and category
/// summary, for read-only consumers (billing documents, vouchers).
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub report: Report,
    pub line_items: Vec<LineItem>,
    pub approvals: Vec<ApprovalRecord>,
    pub breakdown: Vec<CategoryTotal>,
}

pub struct ExpenseService {
    db: Arc<Db>,
    receipts: Arc<dyn ReceiptStore>,
}

impl ExpenseService {
    pub fn new(db: Arc<Db>, receipts: Arc<dyn ReceiptStore>) -> Self {
        Self { db, receipts }
    }

    // ------------------------------------------------------------------
    // store plumbing

    fn load_raw(&self, key: &str, kind: &'static str) -> Result<sled::IVec, WorkflowError> {
        self.db.get(key)?.ok_or_else(|| WorkflowError::NotFound {
            kind,
            id: key.to_string(),
        })
    }

    fn load_account(&self, id: &str) -> Result<Account, WorkflowError> {
        let bytes = self.load_raw(id, "account")?;
        Ok(minicbor::decode(&bytes)?)
    }

    /// Load a report along with the exact stored bytes it was decoded from;
    /// the bytes are the version witness for `swap_report`.
    fn load_report_versioned(&self, id: &str) -> Result<(Report, sled::IVec), WorkflowError> {
        let bytes = self.load_raw(id, "report")?;
        let report = minicbor::decode(&bytes)?;
        Ok((report, bytes))
    }

    /// Commit a report mutation only if the stored record is unchanged since
    /// it was read. A lost race surfaces as `StaleState` and writes nothing.
    fn swap_report(
        &self,
        report_id: &str,
        old: &sled::IVec,
        new: &Report,
    ) -> Result<(), WorkflowError> {
        let encoded = minicbor::to_vec(new)?;
        self.db
            .compare_and_swap(report_id, Some(old.as_ref()), Some(encoded))?
            .map_err(|_| WorkflowError::StaleState)?;
        Ok(())
    }

    fn ensure_owned_draft(&self, report: &Report, actor_id: &str) -> Result<(), WorkflowError> {
        if report.owner_id != actor_id {
            warn!(actor = %actor_id, report = %report.id, "draft mutation rejected: not the owner");
            return Err(WorkflowError::Unauthorized {
                actor: actor_id.to_string(),
            });
        }
        if report.status != ReportStatus::Draft {
            return Err(WorkflowError::InvalidState {
                status: report.status,
            });
        }
        Ok(())
    }

    fn ensure_admin(&self, actor_id: &str) -> Result<Account, WorkflowError> {
        let actor = self.load_account(actor_id)?;
        if actor.role != Role::Admin {
            warn!(actor = %actor.id, "admin operation rejected");
            return Err(WorkflowError::Unauthorized { actor: actor.id });
        }
        Ok(actor)
    }

    /// Object storage cleanup is best-effort and strictly after the fact:
    /// the committed row removal stands even if this fails.
    fn cleanup_receipts(&self, references: &[String]) {
        if references.is_empty() {
            return;
        }
        if let Err(err) = self.receipts.delete(references) {
            warn!(count = references.len(), error = %err, "receipt cleanup failed; orphaned files remain");
        }
    }

    // ------------------------------------------------------------------
    // accounts

    pub fn create_account(
        &self,
        display_name: &str,
        role: Role,
        department: &str,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Account, WorkflowError> {
        if display_name.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "display name must not be empty".into(),
            ));
        }
        let account = Account {
            id: utils::new_account_id()?,
            display_name: display_name.trim().to_string(),
            role,
            department: department.trim().to_string(),
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
            is_active: true,
            created_at: TimeStamp::new(),
        };
        self.db
            .insert(account.id.as_bytes(), minicbor::to_vec(&account)?)?;
        Ok(account)
    }

    pub fn get_account(&self, id: &str) -> Result<Account, WorkflowError> {
        self.load_account(id)
    }

    /// Profile updates are allowed for the account itself and for admins;
    /// role and presence changes are admin-only.
    pub fn update_account(
        &self,
        actor_id: &str,
        target_id: &str,
        patch: AccountPatch,
    ) -> Result<Account, WorkflowError> {
        let actor = self.load_account(actor_id)?;
        let is_admin = actor.role == Role::Admin;
        if actor.id != target_id && !is_admin {
            warn!(actor = %actor.id, target = %target_id, "profile update rejected");
            return Err(WorkflowError::Unauthorized { actor: actor.id });
        }
        if patch.requires_admin() && !is_admin {
            warn!(actor = %actor.id, target = %target_id, "role/presence change rejected");
            return Err(WorkflowError::Unauthorized { actor: actor.id });
        }

        let mut target = self.load_account(target_id)?;
        if let Some(name) = patch.display_name {
            if name.trim().is_empty() {
                return Err(WorkflowError::Validation(
                    "display name must not be empty".into(),
                ));
            }
            target.display_name = name.trim().to_string();
        }
        if let Some(department) = patch.department {
            target.department = department.trim().to_string();
        }
        if let Some(role) = patch.role {
            target.role = role;
        }
        if let Some(email) = patch.email {
            target.email = Some(email);
        }
        if let Some(phone) = patch.phone {
            target.phone = Some(phone);
        }
        if let Some(is_active) = patch.is_active {
            target.is_active = is_active;
        }

        self.db
            .insert(target.id.as_bytes(), minicbor::to_vec(&target)?)?;
        Ok(target)
    }

    // ------------------------------------------------------------------
    // customers

    pub fn create_customer(&self, actor_id: &str, name: &str) -> Result<Customer, WorkflowError> {
        self.ensure_admin(actor_id)?;
        if name.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "customer name must not be empty".into(),
            ));
        }
        let customer = Customer {
            id: utils::new_customer_id()?,
            name: name.trim().to_string(),
            created_at: TimeStamp::new(),
        };
        self.db
            .insert(customer.id.as_bytes(), minicbor::to_vec(&customer)?)?;
        Ok(customer)
    }

    pub fn list_customers(&self) -> Result<Vec<Customer>, WorkflowError> {
        let mut customers = Vec::new();
        for entry in self.db.scan_prefix(utils::CUSTOMER_HRP) {
            let (_, value) = entry?;
            customers.push(minicbor::decode::<Customer>(&value)?);
        }
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(customers)
    }

    // ------------------------------------------------------------------
    // report lifecycle

    pub fn create_report(&self, owner_id: &str, title: &str) -> Result<Report, WorkflowError> {
        let owner = self.load_account(owner_id)?;
        if title.trim().is_empty() {
            return Err(WorkflowError::Validation("title must not be empty".into()));
        }
        let report = Report::new(utils::new_report_id()?, owner.id, title.trim());
        self.db
            .insert(report.id.as_bytes(), minicbor::to_vec(&report)?)?;
        info!(report = %report.id, owner = %report.owner_id, "report created");
        Ok(report)
    }

    pub fn get_report(&self, id: &str) -> Result<Report, WorkflowError> {
        Ok(self.load_report_versioned(id)?.0)
    }

    /// Title and billing metadata are owner-editable while the report is a
    /// draft.
    pub fn update_report_details(
        &self,
        actor_id: &str,
        report_id: &str,
        details: ReportDetails,
    ) -> Result<Report, WorkflowError> {
        let (mut report, old) = self.load_report_versioned(report_id)?;
        self.ensure_owned_draft(&report, actor_id)?;

        if let Some(title) = details.title {
            if title.trim().is_empty() {
                return Err(WorkflowError::Validation("title must not be empty".into()));
            }
            report.title = title.trim().to_string();
        }
        if let Some(name) = details.customer_name {
            let trimmed = name.trim();
            report.customer_name = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        if let Some(flag) = details.bill_to_customer {
            report.bill_to_customer = flag;
        }

        self.swap_report(report_id, &old, &report)?;
        Ok(report)
    }

    /// Submission freezes the total from the current line items and hands
    /// the report to the approval chain.
    pub fn submit_report(&self, actor_id: &str, report_id: &str) -> Result<Report, WorkflowError> {
        let (mut report, old) = self.load_report_versioned(report_id)?;
        self.ensure_owned_draft(&report, actor_id)?;

        let items = self.list_line_items(report_id)?;
        if items.is_empty() {
            return Err(WorkflowError::EmptyReport);
        }

        report.total_amount = ledger::compute_total(&items);
        report.submitted_at = Some(TimeStamp::new());
        report.status = ReportStatus::Submitted;
        self.swap_report(report_id, &old, &report)?;

        info!(report = %report.id, total = report.total_amount, "report submitted");
        Ok(report)
    }

    /// The owner may pull a report back from the approval chain at any point
    /// before final approval. Rolls back all approval progress, not just the
    /// status.
    pub fn withdraw_report(&self, actor_id: &str, report_id: &str) -> Result<Report, WorkflowError> {
        let (mut report, old) = self.load_report_versioned(report_id)?;
        if report.owner_id != actor_id {
            warn!(actor = %actor_id, report = %report.id, "withdrawal rejected: not the owner");
            return Err(WorkflowError::Unauthorized {
                actor: actor_id.to_string(),
            });
        }
        if !report.status.awaiting_decision() {
            return Err(WorkflowError::InvalidState {
                status: report.status,
            });
        }

        report.clear_approval_progress();
        self.swap_report(report_id, &old, &report)?;

        info!(report = %report.id, "report withdrawn");
        Ok(report)
    }

    /// Deleting a draft removes the report row and its line items in one
    /// atomic batch, then cleans up their receipt files best-effort.
    /// Approval records from earlier send-back rounds stay behind as audit.
    pub fn delete_report(&self, actor_id: &str, report_id: &str) -> Result<(), WorkflowError> {
        let (report, _) = self.load_report_versioned(report_id)?;
        self.ensure_owned_draft(&report, actor_id)?;

        let items = self.list_line_items(report_id)?;
        let mut orphaned = Vec::new();
        let mut batch = Batch::default();
        batch.remove(report_id.as_bytes());
        for item in &items {
            batch.remove(utils::line_item_key(report_id, &item.id).as_bytes());
            orphaned.extend(item.receipt_refs.iter().cloned());
        }
        self.db.apply_batch(batch)?;

        info!(report = %report.id, items = items.len(), "report deleted");
        self.cleanup_receipts(&orphaned);
        Ok(())
    }

    pub fn list_reports_for_owner(&self, owner_id: &str) -> Result<Vec<Report>, WorkflowError> {
        let mut reports = Vec::new();
        for entry in self.db.scan_prefix(utils::REPORT_HRP) {
            let (key, value) = entry?;
            // children (line items, approvals) share the report prefix
            if key.contains(&b'/') {
                continue;
            }
            let report: Report = minicbor::decode(&value)?;
            if report.owner_id == owner_id {
                reports.push(report);
            }
        }
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }

    /// Everything a read-only consumer needs to render one report.
    pub fn load_report_context(&self, report_id: &str) -> Result<ReportContext, WorkflowError> {
        let report = self.get_report(report_id)?;
        let line_items = self.list_line_items(report_id)?;
        let approvals = self.approval_history(report_id)?;
        let breakdown = ledger::category_breakdown(&line_items);
        Ok(ReportContext {
            report,
            line_items,
            approvals,
            breakdown,
        })
    }

    // ------------------------------------------------------------------
    // expense ledger

    pub fn add_line_item(
        &self,
        actor_id: &str,
        report_id: &str,
        draft: LineItemDraft,
    ) -> Result<LineItem, WorkflowError> {
        let (report, _) = self.load_report_versioned(report_id)?;
        self.ensure_owned_draft(&report, actor_id)?;

        let item = draft.build(utils::new_line_item_id()?, report_id, actor_id)?;
        let key = utils::line_item_key(report_id, &item.id);
        self.db.insert(key.as_bytes(), minicbor::to_vec(&item)?)?;
        Ok(item)
    }

    /// Replace a line item's fields from a fresh draft. Receipt references
    /// dropped by the edit are cleaned up like a deletion.
    pub fn update_line_item(
        &self,
        actor_id: &str,
        report_id: &str,
        item_id: &str,
        draft: LineItemDraft,
    ) -> Result<LineItem, WorkflowError> {
        let (report, _) = self.load_report_versioned(report_id)?;
        self.ensure_owned_draft(&report, actor_id)?;

        let key = utils::line_item_key(report_id, item_id);
        let bytes = self.load_raw(&key, "line item")?;
        let existing: LineItem = minicbor::decode(&bytes)?;

        let mut replacement = draft.build(existing.id.clone(), report_id, &existing.account_id)?;
        replacement.created_at = existing.created_at.clone();
        self.db
            .insert(key.as_bytes(), minicbor::to_vec(&replacement)?)?;

        let dropped: Vec<String> = existing
            .receipt_refs
            .iter()
            .filter(|reference| !replacement.receipt_refs.contains(reference))
            .cloned()
            .collect();
        self.cleanup_receipts(&dropped);
        Ok(replacement)
    }

    pub fn remove_line_item(
        &self,
        actor_id: &str,
        report_id: &str,
        item_id: &str,
    ) -> Result<(), WorkflowError> {
        let (report, _) = self.load_report_versioned(report_id)?;
        self.ensure_owned_draft(&report, actor_id)?;

        let key = utils::line_item_key(report_id, item_id);
        let Some(bytes) = self.db.remove(key.as_bytes())? else {
            return Err(WorkflowError::NotFound {
                kind: "line item",
                id: item_id.to_string(),
            });
        };
        let item: LineItem = minicbor::decode(&bytes)?;
        self.cleanup_receipts(&item.receipt_refs);
        Ok(())
    }

    pub fn list_line_items(&self, report_id: &str) -> Result<Vec<LineItem>, WorkflowError> {
        let prefix = utils::line_item_prefix(report_id);
        let mut items = Vec::new();
        for entry in self.db.scan_prefix(prefix.as_bytes()) {
            let (_, value) = entry?;
            items.push(minicbor::decode::<LineItem>(&value)?);
        }
        items.sort_by(|a, b| a.expense_date.cmp(&b.expense_date));
        Ok(items)
    }

    // ------------------------------------------------------------------
    // approval decisions

    /// Apply one approval decision. `seen_status` is the status the caller
    /// computed the decision against; if the report has moved on since, the
    /// call fails with `StaleState` and commits nothing. Exactly one audit
    /// record is appended per committed mutation; a loser of a concurrent
    /// race appends nothing.
    pub fn apply_decision(
        &self,
        actor_id: &str,
        report_id: &str,
        decision: DecisionKind,
        comment: Option<&str>,
        seen_status: ReportStatus,
    ) -> Result<Report, WorkflowError> {
        let actor = self.load_account(actor_id)?;
        let (mut report, old) = self.load_report_versioned(report_id)?;
        let submitter = self.load_account(&report.owner_id)?;

        if report.status != seen_status {
            return Err(WorkflowError::StaleState);
        }
        if !approval::eligible_decisions(&report, &actor, &submitter).contains(&decision) {
            warn!(actor = %actor.id, report = %report.id, ?decision, "decision rejected by authorization rules");
            return Err(WorkflowError::Unauthorized { actor: actor.id });
        }

        let now = TimeStamp::new();
        match decision {
            DecisionKind::SendBack => report.clear_approval_progress(),
            DecisionKind::Approved | DecisionKind::ForwardToPartner => match actor.role {
                Role::Manager => {
                    report.primary_approver_id = Some(actor.id.clone());
                    report.primary_approved_at = Some(now.clone());
                    report.status = ReportStatus::PendingPartnerApproval;
                }
                Role::Partner => {
                    report.final_approver_id = Some(actor.id.clone());
                    report.final_approved_at = Some(now.clone());
                    if report.primary_approver_id.is_none() {
                        // A partner acting as the sole approver also fills
                        // the primary slot so the trail always shows a
                        // first hop.
                        report.primary_approver_id = Some(actor.id.clone());
                        report.primary_approved_at = Some(now.clone());
                    }
                    report.status = ReportStatus::Approved;
                }
                _ => return Err(WorkflowError::Unauthorized { actor: actor.id }),
            },
        }

        self.swap_report(report_id, &old, &report)?;

        let record = ApprovalRecord {
            id: utils::new_approval_id()?,
            report_id: report.id.clone(),
            actor_id: actor.id.clone(),
            decision,
            comment: comment.map(str::to_string),
            decided_at: now,
        };
        let key = utils::approval_key(report_id, &record.id);
        self.db.insert(key.as_bytes(), minicbor::to_vec(&record)?)?;

        info!(
            report = %report.id,
            actor = %actor.id,
            ?decision,
            status = ?report.status,
            "decision applied"
        );
        Ok(report)
    }

    /// Chronological audit trail of committed decisions for one report.
    pub fn approval_history(&self, report_id: &str) -> Result<Vec<ApprovalRecord>, WorkflowError> {
        let prefix = utils::approval_prefix(report_id);
        let mut records = Vec::new();
        for entry in self.db.scan_prefix(prefix.as_bytes()) {
            let (_, value) = entry?;
            records.push(minicbor::decode::<ApprovalRecord>(&value)?);
        }
        records.sort_by(|a, b| a.decided_at.cmp(&b.decided_at));
        Ok(records)
    }

    /// All reports the actor can currently decide, oldest submission first.
    pub fn reports_pending_decision(&self, actor_id: &str) -> Result<Vec<Report>, WorkflowError> {
        let actor = self.load_account(actor_id)?;
        let mut pending = Vec::new();
        for entry in self.db.scan_prefix(utils::REPORT_HRP) {
            let (key, value) = entry?;
            if key.contains(&b'/') {
                continue;
            }
            let report: Report = minicbor::decode(&value)?;
            if !report.status.awaiting_decision() {
                continue;
            }
            let submitter = self.load_account(&report.owner_id)?;
            if approval::can_decide(&report, &actor, &submitter) {
                pending.push(report);
            }
        }
        pending.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(pending)
    }

    // ------------------------------------------------------------------
    // financial settlement

    /// Record whether the reimbursement invoice is on file. Clearing the
    /// flag also clears `paid`: a report cannot stay paid without an
    /// invoice.
    pub fn set_invoice_received(
        &self,
        actor_id: &str,
        report_id: &str,
        value: bool,
    ) -> Result<Report, WorkflowError> {
        self.ensure_admin(actor_id)?;
        let (mut report, old) = self.load_report_versioned(report_id)?;
        if report.status != ReportStatus::Approved {
            return Err(WorkflowError::InvalidState {
                status: report.status,
            });
        }

        report.invoice_received = value;
        if !value {
            report.paid = false;
        }
        self.swap_report(report_id, &old, &report)?;

        info!(report = %report.id, invoice_received = value, paid = report.paid, "settlement updated");
        Ok(report)
    }

    pub fn set_paid(
        &self,
        actor_id: &str,
        report_id: &str,
        value: bool,
    ) -> Result<Report, WorkflowError> {
        self.ensure_admin(actor_id)?;
        let (mut report, old) = self.load_report_versioned(report_id)?;
        if report.status != ReportStatus::Approved {
            return Err(WorkflowError::InvalidState {
                status: report.status,
            });
        }
        if value && !report.invoice_received {
            return Err(WorkflowError::InvoiceRequired);
        }

        report.paid = value;
        self.swap_report(report_id, &old, &report)?;

        info!(report = %report.id, paid = value, "settlement updated");
        Ok(report)
    }

    /// Approved reports awaiting settlement work, oldest final approval
    /// first.
    pub fn settlement_queue(&self, actor_id: &str) -> Result<Vec<Report>, WorkflowError> {
        self.ensure_admin(actor_id)?;
        let mut queue = Vec::new();
        for entry in self.db.scan_prefix(utils::REPORT_HRP) {
            let (key, value) = entry?;
            if key.contains(&b'/') {
                continue;
            }
            let report: Report = minicbor::decode(&value)?;
            if report.status == ReportStatus::Approved {
                queue.push(report);
            }
        }
        queue.sort_by(|a, b| a.final_approved_at.cmp(&b.final_approved_at));
        Ok(queue)
    }
}
