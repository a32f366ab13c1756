pub mod summary;

pub use summary::{CategoryTotal, SpendSummary};

use rust_decimal::Decimal;
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::Bill;

/// The authoritative set of committed bills for the current session.
///
/// The collection is an ordinary owned value: views receive it by reference
/// (or, for the HTTP bridge, behind a lock) instead of reaching for a global.
/// Insertion order is preserved; sorting is a presentation concern, see
/// [`BillCollection::sorted_by_date_desc`].
///
/// Equality compares the bills only.
#[derive(Debug, Clone, Default)]
pub struct BillCollection {
    bills: Vec<Bill>,
    /// Ids deleted in this session; a remote merge never brings them back
    removed: HashSet<Uuid>,
}

impl PartialEq for BillCollection {
    fn eq(&self, other: &Self) -> bool {
        self.bills == other.bills
    }
}

impl BillCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection pre-filled with `bills`, kept in the given order.
    pub fn from_bills(bills: Vec<Bill>) -> Self {
        Self {
            bills,
            removed: HashSet::new(),
        }
    }

    /// Appends a bill.
    ///
    /// The caller is responsible for a fresh id; drafts generate one with
    /// `Uuid::new_v4` at commit time.
    pub fn add(&mut self, bill: Bill) {
        info!("Adding bill {} ({})", bill.id, bill.store_name);
        self.bills.push(bill);
    }

    /// Replaces the bill with the same id.
    ///
    /// # Returns
    ///
    /// Returns `true` if a bill was replaced. An unknown id leaves the
    /// collection untouched and returns `false`.
    pub fn update(&mut self, bill: Bill) -> bool {
        match self.bills.iter_mut().find(|existing| existing.id == bill.id) {
            Some(existing) => {
                info!("Updating bill {}", bill.id);
                *existing = bill;
                true
            }
            None => {
                debug!("Update ignored, no bill with id {}", bill.id);
                false
            }
        }
    }

    /// Deletes the bill with `id`. Returns `false` if it was not present.
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.bills.len();
        self.bills.retain(|bill| bill.id != id);
        let removed = self.bills.len() != before;
        if removed {
            self.removed.insert(id);
            info!("Removed bill {}", id);
        } else {
            debug!("Remove ignored, no bill with id {}", id);
        }
        removed
    }

    pub fn get(&self, id: Uuid) -> Option<&Bill> {
        self.bills.iter().find(|bill| bill.id == id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.get(id).is_some()
    }

    /// All bills in insertion order.
    pub fn list(&self) -> &[Bill] {
        &self.bills
    }

    pub fn len(&self) -> usize {
        self.bills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bills.is_empty()
    }

    /// Bills ordered newest date first, ties kept in insertion order.
    pub fn sorted_by_date_desc(&self) -> Vec<Bill> {
        let mut bills = self.bills.clone();
        bills.sort_by(|a, b| b.date.cmp(&a.date));
        bills
    }

    /// Adds every bill whose id is not already known.
    ///
    /// Local edits win over remote copies, and bills removed locally stay
    /// removed even if the remote still has them.
    ///
    /// # Returns
    ///
    /// Returns the number of bills added.
    pub fn merge_remote(&mut self, remote: Vec<Bill>) -> usize {
        let mut added = 0;
        for bill in remote {
            if self.removed.contains(&bill.id) {
                debug!("Skipping remote bill {}, removed locally", bill.id);
            } else if !self.contains(bill.id) {
                self.bills.push(bill);
                added += 1;
            }
        }
        added
    }

    /// Aggregate spend against `budget`.
    pub fn summary(&self, budget: Decimal) -> SpendSummary {
        SpendSummary::from_bills(&self.bills, budget)
    }

    pub fn totals_by_category(&self) -> Vec<CategoryTotal> {
        summary::totals_by_category(&self.bills)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, ImageUri};
    use chrono::NaiveDate;

    fn bill(store: &str, day: u32) -> Bill {
        Bill {
            id: Uuid::new_v4(),
            image_uri: ImageUri::new(format!("file:///bills/{store}.jpg")),
            store_name: store.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            category: Category::Gas,
            tax_paid: Decimal::new(100, 2),
            total: Decimal::new(1000, 2),
        }
    }

    #[test]
    fn test_add_then_remove_restores_prior_contents() {
        let mut bills = BillCollection::from_bills(vec![bill("Walmart", 1), bill("Target", 2)]);
        let before = bills.clone();

        let extra = bill("Shell", 3);
        let id = extra.id;
        bills.add(extra);
        assert_eq!(bills.len(), 3);

        assert!(bills.remove(id));
        assert_eq!(bills, before);
    }

    #[test]
    fn test_update_replaces_whole_record() {
        let original = bill("Walmart", 1);
        let id = original.id;
        let mut bills = BillCollection::from_bills(vec![original]);

        let mut edited = bill("Costco", 9);
        edited.id = id;
        assert!(bills.update(edited.clone()));
        assert_eq!(bills.get(id), Some(&edited));
        assert_eq!(bills.len(), 1);
    }

    #[test]
    fn test_update_unknown_id_leaves_collection_unchanged() {
        let mut bills = BillCollection::from_bills(vec![bill("Walmart", 1), bill("Target", 2)]);
        let before = bills.clone();

        assert!(!bills.update(bill("Nowhere", 4)));
        assert_eq!(bills, before);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut bills = BillCollection::from_bills(vec![bill("Walmart", 1)]);
        let before = bills.clone();

        assert!(!bills.remove(Uuid::new_v4()));
        assert_eq!(bills, before);
    }

    #[test]
    fn test_list_keeps_insertion_order_and_sort_is_separate() {
        let first = bill("Old", 1);
        let second = bill("New", 20);
        let third = bill("Mid", 10);
        let mut bills = BillCollection::new();
        bills.add(first.clone());
        bills.add(second.clone());
        bills.add(third.clone());

        let names: Vec<_> = bills.list().iter().map(|b| b.store_name.as_str()).collect();
        assert_eq!(names, ["Old", "New", "Mid"]);

        let sorted: Vec<_> = bills
            .sorted_by_date_desc()
            .into_iter()
            .map(|b| b.store_name)
            .collect();
        assert_eq!(sorted, ["New", "Mid", "Old"]);
    }

    #[test]
    fn test_merge_remote_skips_known_ids() {
        let local = bill("Local", 1);
        let mut remote_copy = local.clone();
        remote_copy.store_name = "Remote rename".to_string();
        let remote_only = bill("Remote", 2);

        let mut bills = BillCollection::from_bills(vec![local.clone()]);
        let added = bills.merge_remote(vec![remote_copy, remote_only.clone()]);

        assert_eq!(added, 1);
        assert_eq!(bills.get(local.id), Some(&local));
        assert_eq!(bills.get(remote_only.id), Some(&remote_only));
    }

    #[test]
    fn test_merge_remote_does_not_restore_removed_bill() {
        let deleted = bill("Deleted", 1);
        let mut bills = BillCollection::from_bills(vec![deleted.clone()]);

        assert!(bills.remove(deleted.id));
        let added = bills.merge_remote(vec![deleted.clone(), bill("Remote", 2)]);

        assert_eq!(added, 1);
        assert!(!bills.contains(deleted.id));
        assert_eq!(bills.len(), 1);
    }
}
