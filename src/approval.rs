//! Decision kinds, the append-only audit record and the authorization engine

use chrono::Utc;

use crate::account::{Account, Role};
use crate::report::{Report, ReportStatus};
use crate::types::TimeStamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum DecisionKind {
    #[n(0)]
    Approved,
    #[n(1)]
    SendBack,
    /// A manager's approve-and-escalate. Same effect as `Approved` from a
    /// manager, kept distinct so the audit trail shows the escalation.
    #[n(2)]
    ForwardToPartner,
}

/// One committed decision. Records are append-only: never updated, never
/// deleted, and they outlive the report they describe.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct ApprovalRecord {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub report_id: String,
    #[n(2)]
    pub actor_id: String,
    #[n(3)]
    pub decision: DecisionKind,
    #[n(4)]
    pub comment: Option<String>,
    #[n(5)]
    pub decided_at: TimeStamp<Utc>,
}

/// Whether `actor` may decide on `submitter`'s report in its current status.
///
/// Stateless and side-effect free; the decision applier re-evaluates this
/// immediately before committing. Rules in precedence order, first match
/// wins:
///
/// 1. a manager acts on reports from employees of their own department:
///    the full decision set on the first hop, send-back only while the
///    report sits with the partner
/// 2. a partner clears their own department's employees and managers, at
///    either hop
/// 3. a partner peer-reviews partners from other departments, first hop only
///
/// Which decisions are open to an authorized actor is the business of
/// [`eligible_decisions`]. Deciding on one's own report is never allowed,
/// whatever the role.
pub fn can_decide(report: &Report, actor: &Account, submitter: &Account) -> bool {
    if actor.id == submitter.id || actor.id == report.owner_id {
        return false;
    }
    if !actor.is_active {
        return false;
    }
    match actor.role {
        Role::Manager => {
            report.status.awaiting_decision()
                && submitter.role == Role::Employee
                && submitter.department == actor.department
        }
        Role::Partner => {
            let own_department_staff = submitter.department == actor.department
                && matches!(submitter.role, Role::Employee | Role::Manager)
                && report.status.awaiting_decision();
            let peer_review = submitter.role == Role::Partner
                && submitter.department != actor.department
                && report.status == ReportStatus::Submitted;
            own_department_staff || peer_review
        }
        _ => false,
    }
}

/// The decisions `actor` could legally apply to the report right now.
/// Empty whenever `can_decide` is false.
pub fn eligible_decisions(
    report: &Report,
    actor: &Account,
    submitter: &Account,
) -> Vec<DecisionKind> {
    if !can_decide(report, actor, submitter) {
        return Vec::new();
    }
    match actor.role {
        // Approving and escalating are first-hop moves; once the report sits
        // with the partner a manager can only pull it back.
        Role::Manager if report.status == ReportStatus::Submitted => vec![
            DecisionKind::Approved,
            DecisionKind::ForwardToPartner,
            DecisionKind::SendBack,
        ],
        Role::Manager => vec![DecisionKind::SendBack],
        Role::Partner => vec![DecisionKind::Approved, DecisionKind::SendBack],
        _ => Vec::new(),
    }
}
