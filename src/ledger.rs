//! Pure aggregation over a report's line items
//!
//! Totals computed here feed the report total frozen at submission and the
//! per-category summary shown to the submitter. Workflow decisions never
//! read the breakdown.

use crate::expense::{Category, LineItem};

/// Sum of the line-item amounts, in minor units.
pub fn compute_total(items: &[LineItem]) -> u64 {
    items.iter().map(|item| item.amount).sum()
}

/// Estimated VAT component of a single item, in minor units.
///
/// `amount − amount / (1 + rate)` with the rate in basis points; zero for
/// anything that is not a VAT invoice.
pub fn vat_estimate(item: &LineItem) -> u64 {
    match (item.is_vat_invoice, item.tax_rate_bps) {
        (true, Some(bps)) => {
            let net = item.amount as u128 * 10_000 / (10_000 + bps as u128);
            item.amount - net as u64
        }
        _ => 0,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category: Category,
    pub total: u64,
    pub vat_estimate: u64,
}

/// Per-category totals in the fixed category order; empty categories are
/// skipped.
pub fn category_breakdown(items: &[LineItem]) -> Vec<CategoryTotal> {
    Category::ALL
        .iter()
        .filter_map(|&category| {
            let mut total = 0u64;
            let mut vat = 0u64;
            let mut seen = false;
            for item in items.iter().filter(|item| item.category == category) {
                seen = true;
                total += item.amount;
                vat += vat_estimate(item);
            }
            seen.then_some(CategoryTotal {
                category,
                total,
                vat_estimate: vat,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expense::LineItemDraft;
    use crate::types::ExpenseDate;

    fn item(category: Category, amount: u64, vat_bps: Option<u32>) -> LineItem {
        let mut draft = LineItemDraft::new()
            .set_category(category)
            .set_amount(amount)
            .set_expense_date(ExpenseDate::new(2025, 5, 20).unwrap());
        if let Some(bps) = vat_bps {
            draft = draft.set_vat_invoice(true).set_tax_rate_bps(bps);
        }
        draft
            .build("exp_test".into(), "report_test", "acct_test")
            .unwrap()
    }

    #[test]
    fn total_sums_all_items() {
        let items = vec![
            item(Category::Meals, 8_000, None),
            item(Category::Taxi, 3_550, None),
        ];
        assert_eq!(compute_total(&items), 11_550);
    }

    #[test]
    fn vat_estimate_backs_tax_out_of_gross() {
        // ¥500.00 at 9%: 50000 − 50000 / 1.09 ≈ 4129 cents of tax
        let ticket = item(Category::Train, 50_000, Some(900));
        assert_eq!(vat_estimate(&ticket), 4_129);
    }

    #[test]
    fn vat_estimate_is_zero_for_plain_receipts() {
        let meal = item(Category::Meals, 50_000, None);
        assert_eq!(vat_estimate(&meal), 0);
    }

    #[test]
    fn breakdown_groups_by_category_in_fixed_order() {
        let items = vec![
            item(Category::Meals, 8_000, None),
            item(Category::Train, 50_000, Some(900)),
            item(Category::Meals, 4_000, None),
        ];

        let breakdown = category_breakdown(&items);

        assert_eq!(breakdown.len(), 2);
        // Train precedes Meals in the category order
        assert_eq!(breakdown[0].category, Category::Train);
        assert_eq!(breakdown[0].total, 50_000);
        assert_eq!(breakdown[0].vat_estimate, 4_129);
        assert_eq!(breakdown[1].category, Category::Meals);
        assert_eq!(breakdown[1].total, 12_000);
        assert_eq!(breakdown[1].vat_estimate, 0);
    }
}
