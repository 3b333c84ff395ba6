//! Customer lookup entities
//!
//! Customers are a pure reference list. Reports and line items attach
//! customers by free-text name only, so nothing here couples to the
//! report lifecycle.

use chrono::Utc;

use crate::types::TimeStamp;

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Customer {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub created_at: TimeStamp<Utc>,
}
