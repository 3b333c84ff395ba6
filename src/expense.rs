//! Expense categories, line items and the draft builder

use chrono::Utc;

use crate::error::WorkflowError;
use crate::storage::RecognizedReceipt;
use crate::types::{ExpenseDate, TimeStamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, minicbor::Encode, minicbor::Decode)]
pub enum Category {
    #[n(0)]
    Flight,
    #[n(1)]
    Train,
    #[n(2)]
    Coach,
    #[n(3)]
    Taxi,
    #[n(4)]
    Toll,
    #[n(5)]
    Meals,
    #[n(6)]
    Lodging,
    #[n(7)]
    Courier,
    #[n(8)]
    Telecom,
    #[n(9)]
    OfficeSupplies,
    #[n(10)]
    ClientEntertainment,
    #[n(11)]
    StaffWelfare,
    #[n(12)]
    Other,
}

/// Default VAT posture a category pre-selects on a fresh draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryDefaults {
    pub vat_invoice: bool,
    /// Tax rate in basis points (900 = 9%).
    pub tax_rate_bps: Option<u32>,
}

impl Category {
    pub const ALL: [Category; 13] = [
        Category::Flight,
        Category::Train,
        Category::Coach,
        Category::Taxi,
        Category::Toll,
        Category::Meals,
        Category::Lodging,
        Category::Courier,
        Category::Telecom,
        Category::OfficeSupplies,
        Category::ClientEntertainment,
        Category::StaffWelfare,
        Category::Other,
    ];

    /// Category → VAT defaults, kept as one declarative table instead of
    /// branching at the call sites. Flight and train tickets carry a 9%
    /// VAT invoice by default.
    pub fn defaults(self) -> CategoryDefaults {
        match self {
            Category::Flight | Category::Train => CategoryDefaults {
                vat_invoice: true,
                tax_rate_bps: Some(900),
            },
            _ => CategoryDefaults {
                vat_invoice: false,
                tax_rate_bps: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct LineItem {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub report_id: String,
    #[n(2)]
    pub account_id: String,
    #[n(3)]
    pub category: Category,
    /// Amount in minor units (cents).
    #[n(4)]
    pub amount: u64,
    #[n(5)]
    pub expense_date: ExpenseDate,
    #[n(6)]
    pub description: Option<String>,
    /// Free-text customer attribution for this single expense.
    #[n(7)]
    pub customer_name: Option<String>,
    #[n(8)]
    pub invoice_number: Option<String>,
    /// Public references of externally stored receipt files.
    #[n(9)]
    pub receipt_refs: Vec<String>,
    #[n(10)]
    pub is_vat_invoice: bool,
    /// Tax rate in basis points. Present iff `is_vat_invoice`.
    #[n(11)]
    pub tax_rate_bps: Option<u32>,
    #[n(12)]
    pub created_at: TimeStamp<Utc>,
}

// Used for constructing drafts before a report accepts them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineItemDraft {
    category: Option<Category>,
    amount: u64,
    expense_date: Option<ExpenseDate>,
    description: Option<String>,
    customer_name: Option<String>,
    invoice_number: Option<String>,
    receipt_refs: Vec<String>,
    is_vat_invoice: bool,
    tax_rate_bps: Option<u32>,
}

impl LineItemDraft {
    /// Construct a new builder object, this becomes the basis for a draft
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a draft with the category's default VAT posture applied.
    pub fn for_category(category: Category) -> Self {
        let defaults = category.defaults();
        Self {
            category: Some(category),
            is_vat_invoice: defaults.vat_invoice,
            tax_rate_bps: defaults.tax_rate_bps,
            ..Self::default()
        }
    }

    pub fn set_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }
    pub fn set_amount(mut self, amount: u64) -> Self {
        self.amount = amount;
        self
    }
    pub fn set_expense_date(mut self, date: ExpenseDate) -> Self {
        self.expense_date = Some(date);
        self
    }
    pub fn set_description(mut self, description: &str) -> Self {
        let trimmed = description.trim();
        self.description = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }
    pub fn set_customer_name(mut self, name: &str) -> Self {
        let trimmed = name.trim();
        self.customer_name = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }
    pub fn set_invoice_number(mut self, number: &str) -> Self {
        let trimmed = number.trim();
        self.invoice_number = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }
    pub fn add_receipt_ref(mut self, reference: &str) -> Self {
        self.receipt_refs.push(reference.to_string());
        self
    }
    pub fn set_vat_invoice(mut self, is_vat_invoice: bool) -> Self {
        self.is_vat_invoice = is_vat_invoice;
        self
    }
    pub fn set_tax_rate_bps(mut self, bps: u32) -> Self {
        self.tax_rate_bps = Some(bps);
        self
    }

    /// Overlay a recognition guess onto the draft. Only fields the guess
    /// produced are taken; the result still goes through `build` validation.
    pub fn apply_recognized(mut self, guess: &RecognizedReceipt) -> Self {
        if let Some(category) = guess.category {
            let defaults = category.defaults();
            self.category = Some(category);
            if guess.is_vat_invoice.is_none() {
                self.is_vat_invoice = defaults.vat_invoice;
                if self.tax_rate_bps.is_none() {
                    self.tax_rate_bps = defaults.tax_rate_bps;
                }
            }
        }
        if let Some(amount) = guess.amount {
            self.amount = amount;
        }
        if let Some(date) = guess.expense_date {
            self.expense_date = Some(date);
        }
        if let Some(number) = &guess.invoice_number {
            self.invoice_number = Some(number.clone());
        }
        if let Some(vat) = guess.is_vat_invoice {
            self.is_vat_invoice = vat;
        }
        if let Some(bps) = guess.tax_rate_bps {
            self.tax_rate_bps = Some(bps);
        }
        self
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }
    pub fn amount(&self) -> u64 {
        self.amount
    }
    pub fn is_vat_invoice(&self) -> bool {
        self.is_vat_invoice
    }
    pub fn tax_rate_bps(&self) -> Option<u32> {
        self.tax_rate_bps
    }

    // Checks fields, performs validation and produces the persistable item.
    pub fn build(
        self,
        id: String,
        report_id: &str,
        account_id: &str,
    ) -> Result<LineItem, WorkflowError> {
        let Some(category) = self.category else {
            return Err(WorkflowError::Validation("expense category is not set".into()));
        };
        if self.amount == 0 {
            return Err(WorkflowError::Validation(
                "amount must be greater than zero".into(),
            ));
        }
        let Some(expense_date) = self.expense_date else {
            return Err(WorkflowError::Validation("expense date is not set".into()));
        };
        if self.is_vat_invoice && self.tax_rate_bps.is_none() {
            return Err(WorkflowError::Validation(
                "a vat invoice requires a tax rate".into(),
            ));
        }

        Ok(LineItem {
            id,
            report_id: report_id.to_string(),
            account_id: account_id.to_string(),
            category,
            amount: self.amount,
            expense_date,
            description: self.description,
            customer_name: self.customer_name,
            invoice_number: self.invoice_number,
            receipt_refs: self.receipt_refs,
            is_vat_invoice: self.is_vat_invoice,
            tax_rate_bps: if self.is_vat_invoice {
                self.tax_rate_bps
            } else {
                None
            },
            created_at: TimeStamp::new(),
        })
    }
}
