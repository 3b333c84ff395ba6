//! Property-based tests for line-item validation and ledger aggregation
//!
//! This module uses the proptest crate to verify that draft validation and
//! the pure aggregation functions are correct across a wide range of
//! randomly generated inputs. Property tests are particularly valuable for
//! the VAT estimate arithmetic, where rounding edge cases are easy to miss
//! with hand-picked examples.

use proptest::prelude::*;

use expense_approval::expense::{Category, LineItem, LineItemDraft};
use expense_approval::ledger::{category_breakdown, compute_total, vat_estimate};
use expense_approval::types::ExpenseDate;

// PROPERTY TEST STRATEGIES

/// Strategy to generate random Category values
fn category_strategy() -> impl Strategy<Value = Category> {
    (0usize..Category::ALL.len()).prop_map(|i| Category::ALL[i])
}

/// Strategy to generate positive amounts in minor units (1 cent to ¥1M)
fn amount_strategy() -> impl Strategy<Value = u64> {
    1u64..=100_000_000u64
}

/// Strategy to generate plausible tax rates in basis points (0.01% to 30%)
fn tax_rate_strategy() -> impl Strategy<Value = u32> {
    1u32..=3_000u32
}

/// Strategy to generate valid expense dates
fn date_strategy() -> impl Strategy<Value = ExpenseDate> {
    (2020i32..=2030, 1u32..=12, 1u32..=28)
        .prop_map(|(year, month, day)| ExpenseDate::new(year, month, day).unwrap())
}

/// Strategy to generate a built line item, VAT or plain
fn line_item_strategy() -> impl Strategy<Value = LineItem> {
    (
        category_strategy(),
        amount_strategy(),
        date_strategy(),
        proptest::option::of(tax_rate_strategy()),
    )
        .prop_map(|(category, amount, date, vat)| {
            let mut draft = LineItemDraft::new()
                .set_category(category)
                .set_amount(amount)
                .set_expense_date(date)
                .set_vat_invoice(false);
            if let Some(bps) = vat {
                draft = draft.set_vat_invoice(true).set_tax_rate_bps(bps);
            }
            draft
                .build("exp_prop".into(), "report_prop", "acct_prop")
                .unwrap()
        })
}

// PROPERTY TESTS
proptest! {
    /// Property: a draft with a category, a positive amount, a date and a
    /// consistent VAT posture always builds.
    #[test]
    fn prop_valid_drafts_always_build(
        category in category_strategy(),
        amount in amount_strategy(),
        date in date_strategy(),
    ) {
        let draft = LineItemDraft::new()
            .set_category(category)
            .set_amount(amount)
            .set_expense_date(date)
            .set_vat_invoice(false);

        prop_assert!(draft.build("exp_prop".into(), "report_prop", "acct_prop").is_ok());
    }

    /// Property: a zero amount never builds, whatever else is set.
    #[test]
    fn prop_zero_amount_never_builds(
        category in category_strategy(),
        date in date_strategy(),
    ) {
        let draft = LineItemDraft::new()
            .set_category(category)
            .set_amount(0)
            .set_expense_date(date);

        prop_assert!(draft.build("exp_prop".into(), "report_prop", "acct_prop").is_err());
    }

    /// Property: a VAT invoice without a tax rate never builds.
    #[test]
    fn prop_vat_invoice_requires_rate(
        category in category_strategy(),
        amount in amount_strategy(),
        date in date_strategy(),
    ) {
        let draft = LineItemDraft::new()
            .set_category(category)
            .set_amount(amount)
            .set_expense_date(date)
            .set_vat_invoice(true);

        prop_assert!(draft.build("exp_prop".into(), "report_prop", "acct_prop").is_err());
    }

    /// Property: the estimated VAT component never exceeds the gross amount
    /// and is zero exactly for plain receipts.
    #[test]
    fn prop_vat_estimate_is_bounded(item in line_item_strategy()) {
        let estimate = vat_estimate(&item);

        prop_assert!(estimate <= item.amount);
        if !item.is_vat_invoice {
            prop_assert_eq!(estimate, 0);
        }
    }

    /// Property: the category breakdown is a partition - its totals sum to
    /// the ledger total and every item's category appears exactly once.
    #[test]
    fn prop_breakdown_partitions_the_total(
        items in prop::collection::vec(line_item_strategy(), 0..=12)
    ) {
        let breakdown = category_breakdown(&items);

        let breakdown_sum: u64 = breakdown.iter().map(|c| c.total).sum();
        prop_assert_eq!(breakdown_sum, compute_total(&items));

        for entry in &breakdown {
            let count = breakdown
                .iter()
                .filter(|other| other.category == entry.category)
                .count();
            prop_assert_eq!(count, 1);
            prop_assert!(items.iter().any(|item| item.category == entry.category));
        }

        let item_vat: u64 = items.iter().map(vat_estimate).sum();
        let breakdown_vat: u64 = breakdown.iter().map(|c| c.vat_estimate).sum();
        prop_assert_eq!(item_vat, breakdown_vat);
    }
}
