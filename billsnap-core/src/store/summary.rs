use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Bill;

/// Spend against a budget, as shown on the bills overview card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendSummary {
    pub bill_count: usize,

    /// Sum of bill totals
    pub total_spent: Decimal,

    /// Sum of tax paid
    pub tax_paid: Decimal,

    pub budget: Decimal,

    /// Budget minus spend; negative once over budget
    pub remaining: Decimal,

    /// Share of the budget used, clamped to `[0, 1]`
    pub percent_used: Decimal,
}

impl SpendSummary {
    pub fn from_bills(bills: &[Bill], budget: Decimal) -> Self {
        let total_spent: Decimal = bills.iter().map(|bill| bill.total).sum();
        let tax_paid: Decimal = bills.iter().map(|bill| bill.tax_paid).sum();

        // A zero budget counts as fully used as soon as anything is spent.
        let percent_used = if budget <= Decimal::ZERO {
            if total_spent > Decimal::ZERO {
                Decimal::ONE
            } else {
                Decimal::ZERO
            }
        } else {
            (total_spent / budget).clamp(Decimal::ZERO, Decimal::ONE)
        };

        Self {
            bill_count: bills.len(),
            total_spent,
            tax_paid,
            budget,
            remaining: budget - total_spent,
            percent_used,
        }
    }

    pub fn is_over_budget(&self) -> bool {
        self.total_spent > self.budget
    }
}

/// Spend for one category label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub bill_count: usize,
    pub total: Decimal,
}

/// Groups bills by category label, in order of first appearance.
pub fn totals_by_category(bills: &[Bill]) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();
    for bill in bills {
        let label = bill.category.label();
        match totals.iter_mut().find(|entry| entry.category == label) {
            Some(entry) => {
                entry.bill_count += 1;
                entry.total += bill.total;
            }
            None => totals.push(CategoryTotal {
                category: label.to_string(),
                bill_count: 1,
                total: bill.total,
            }),
        }
    }
    totals
}
