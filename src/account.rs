//! Accounts, roles and profile updates

use chrono::Utc;

use crate::types::TimeStamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum Role {
    #[n(0)]
    Employee,
    #[n(1)]
    Manager,
    #[n(2)]
    Partner,
    #[n(3)]
    Admin,
}

// Accounts are never deleted; `is_active` carries soft presence instead.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Account {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub display_name: String,
    #[n(2)]
    pub role: Role,
    /// Free-text department tag. Authorization compares it by exact match.
    #[n(3)]
    pub department: String,
    #[n(4)]
    pub email: Option<String>,
    #[n(5)]
    pub phone: Option<String>,
    #[n(6)]
    pub is_active: bool,
    #[n(7)]
    pub created_at: TimeStamp<Utc>,
}

/// Field-wise profile update. `None` leaves a field untouched.
#[derive(Debug, Default, Clone)]
pub struct AccountPatch {
    pub display_name: Option<String>,
    pub department: Option<String>,
    pub role: Option<Role>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

impl AccountPatch {
    /// Role, department and presence changes are reserved for
    /// administrators: all three feed the approval authorization rules.
    pub fn requires_admin(&self) -> bool {
        self.role.is_some() || self.department.is_some() || self.is_active.is_some()
    }
}
