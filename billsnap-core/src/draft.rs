//! Uncommitted bill fields and the validation gate in front of the collection.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dates::{parse_bill_date, to_canonical};
use crate::models::{Bill, Category, CategoryKind, ImageUri};
use crate::store::BillCollection;

/// Editable fields of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    StoreName,
    Date,
    Category,
    OtherCategory,
    TaxPaid,
    Total,
    Image,
}

impl DraftField {
    /// Whether input for this field goes through [`filter_numeric`].
    pub fn is_numeric(self) -> bool {
        matches!(self, DraftField::TaxPaid | DraftField::Total)
    }
}

/// A single failed check from [`BillDraft::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldError {
    MissingStoreName,
    MissingDate,
    InvalidDate,
    MissingCategory,
    MissingCustomCategory,
    MissingImage,
    InvalidTaxPaid,
    InvalidTotal,
}

impl FieldError {
    pub fn field(self) -> DraftField {
        match self {
            FieldError::MissingStoreName => DraftField::StoreName,
            FieldError::MissingDate | FieldError::InvalidDate => DraftField::Date,
            FieldError::MissingCategory => DraftField::Category,
            FieldError::MissingCustomCategory => DraftField::OtherCategory,
            FieldError::MissingImage => DraftField::Image,
            FieldError::InvalidTaxPaid => DraftField::TaxPaid,
            FieldError::InvalidTotal => DraftField::Total,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            FieldError::MissingStoreName => "Store is required.",
            FieldError::MissingDate => "Date is required.",
            FieldError::InvalidDate => "Date must be YYYY-MM-DD or MM/DD/YYYY.",
            FieldError::MissingCategory => "Category is required.",
            FieldError::MissingCustomCategory => "Please specify category.",
            FieldError::MissingImage => "A bill image is required.",
            FieldError::InvalidTaxPaid => "Tax paid must be a number.",
            FieldError::InvalidTotal => "Total must be a number.",
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Keeps ASCII digits and decimal points, drops everything else.
///
/// Applied on the input channel, so `"12.3abc"` is stored as `"12.3"` before
/// the draft ever sees it.
pub fn filter_numeric(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}

/// What a successful submit did to the collection.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// A new bill was appended.
    Added(Bill),
    /// The edited bill replaced its previous version.
    Updated(Bill),
    /// The edited bill no longer exists; the collection was left unchanged.
    Stale(Bill),
}

impl SubmitOutcome {
    pub fn bill(&self) -> &Bill {
        match self {
            SubmitOutcome::Added(bill)
            | SubmitOutcome::Updated(bill)
            | SubmitOutcome::Stale(bill) => bill,
        }
    }

    pub fn into_bill(self) -> Bill {
        match self {
            SubmitOutcome::Added(bill)
            | SubmitOutcome::Updated(bill)
            | SubmitOutcome::Stale(bill) => bill,
        }
    }
}

/// Working state of a bill before it is committed.
///
/// Fields hold raw user input; nothing is validated until [`BillDraft::submit`].
/// Error indicators stay hidden until the first submit attempt and remain
/// visible for the rest of the draft's life.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillDraft {
    /// Id of the bill being edited, `None` for a new bill
    editing: Option<Uuid>,
    image_uri: Option<ImageUri>,
    store_name: String,
    date: String,
    category: Option<CategoryKind>,
    other_category: String,
    tax_paid: String,
    total: String,
    attempted: bool,
    errors: Vec<FieldError>,
}

impl BillDraft {
    /// Empty draft for a new bill.
    pub fn new() -> Self {
        Self::default()
    }

    /// New-bill draft around an image that is already in durable storage.
    pub fn with_image(image_uri: ImageUri) -> Self {
        Self {
            image_uri: Some(image_uri),
            ..Self::default()
        }
    }

    /// Draft pre-filled from an existing bill; submitting it replaces that bill.
    pub fn from_bill(bill: &Bill) -> Self {
        let other_category = match &bill.category {
            Category::Other(label) => label.clone(),
            _ => String::new(),
        };

        Self {
            editing: Some(bill.id),
            image_uri: Some(bill.image_uri.clone()),
            store_name: bill.store_name.clone(),
            date: to_canonical(bill.date),
            category: Some(bill.category.kind()),
            other_category,
            tax_paid: bill.tax_paid.to_string(),
            total: bill.total.to_string(),
            attempted: false,
            errors: Vec::new(),
        }
    }

    /// Stores raw input for `field`. Numeric fields are filtered first.
    ///
    /// For [`DraftField::Category`] the value is a category label; a label
    /// outside the fixed set selects "Other" with that label as custom text.
    pub fn set_field(&mut self, field: DraftField, value: &str) {
        match field {
            DraftField::StoreName => self.store_name = value.to_string(),
            DraftField::Date => self.date = value.to_string(),
            DraftField::Category => match CategoryKind::from_label(value) {
                Some(kind) => self.category = Some(kind),
                None if value.trim().is_empty() => self.category = None,
                None => {
                    self.category = Some(CategoryKind::Other);
                    self.other_category = value.to_string();
                }
            },
            DraftField::OtherCategory => self.other_category = value.to_string(),
            DraftField::TaxPaid => self.tax_paid = filter_numeric(value),
            DraftField::Total => self.total = filter_numeric(value),
            DraftField::Image => {
                self.image_uri = Some(ImageUri::new(value)).filter(|uri| !uri.is_empty());
            }
        }
    }

    /// Date picker result; stored in canonical form.
    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = to_canonical(date);
    }

    pub fn select_category(&mut self, kind: CategoryKind) {
        self.category = Some(kind);
    }

    pub fn set_image(&mut self, image_uri: ImageUri) {
        self.image_uri = Some(image_uri);
    }

    /// Current raw value of `field`.
    pub fn value(&self, field: DraftField) -> &str {
        match field {
            DraftField::StoreName => &self.store_name,
            DraftField::Date => &self.date,
            DraftField::Category => self.category.map(CategoryKind::label).unwrap_or(""),
            DraftField::OtherCategory => &self.other_category,
            DraftField::TaxPaid => &self.tax_paid,
            DraftField::Total => &self.total,
            DraftField::Image => self.image_uri.as_ref().map(ImageUri::as_str).unwrap_or(""),
        }
    }

    pub fn image_uri(&self) -> Option<&ImageUri> {
        self.image_uri.as_ref()
    }

    pub fn editing(&self) -> Option<Uuid> {
        self.editing
    }

    pub fn attempted(&self) -> bool {
        self.attempted
    }

    /// Errors from the last submit; empty until a submit has been attempted.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Error to show next to `field`, if any.
    pub fn field_error(&self, field: DraftField) -> Option<FieldError> {
        if !self.attempted {
            return None;
        }
        self.errors.iter().copied().find(|error| error.field() == field)
    }

    /// Runs every check without touching the attempted flag.
    ///
    /// # Returns
    ///
    /// Returns the bill that would be committed, or every failing check.
    pub fn validate(&self) -> Result<Bill, Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.store_name.trim().is_empty() {
            errors.push(FieldError::MissingStoreName);
        }

        let date = if self.date.trim().is_empty() {
            errors.push(FieldError::MissingDate);
            None
        } else {
            let parsed = parse_bill_date(&self.date);
            if parsed.is_none() {
                errors.push(FieldError::InvalidDate);
            }
            parsed
        };

        let category = match self.category {
            None => {
                errors.push(FieldError::MissingCategory);
                None
            }
            Some(CategoryKind::Other) => {
                let label = self.other_category.trim();
                if label.is_empty() {
                    errors.push(FieldError::MissingCustomCategory);
                    None
                } else {
                    Some(Category::from(label.to_string()))
                }
            }
            Some(kind) => Some(Category::from(kind.label().to_string())),
        };

        let image_uri = match &self.image_uri {
            Some(uri) if !uri.is_empty() => Some(uri.clone()),
            _ => {
                errors.push(FieldError::MissingImage);
                None
            }
        };

        let tax_paid = parse_amount(&self.tax_paid);
        if tax_paid.is_none() {
            errors.push(FieldError::InvalidTaxPaid);
        }
        let total = parse_amount(&self.total);
        if total.is_none() {
            errors.push(FieldError::InvalidTotal);
        }

        match (date, category, image_uri, tax_paid, total) {
            (Some(date), Some(category), Some(image_uri), Some(tax_paid), Some(total))
                if errors.is_empty() =>
            {
                Ok(Bill {
                    id: self.editing.unwrap_or_else(Uuid::new_v4),
                    image_uri,
                    store_name: self.store_name.clone(),
                    date,
                    category,
                    tax_paid,
                    total,
                })
            }
            _ => Err(errors),
        }
    }

    /// Validates and, on success, commits into `bills`.
    ///
    /// New drafts are added with a fresh id; edit drafts replace the bill
    /// they were created from. On failure the collection and the entered
    /// values are left exactly as they were.
    pub fn submit(&mut self, bills: &mut BillCollection) -> Result<SubmitOutcome, Vec<FieldError>> {
        self.attempted = true;

        let bill = match self.validate() {
            Ok(bill) => bill,
            Err(errors) => {
                warn!("Bill draft rejected: {:?}", errors);
                self.errors = errors.clone();
                return Err(errors);
            }
        };
        self.errors.clear();

        let outcome = match self.editing {
            None => {
                bills.add(bill.clone());
                SubmitOutcome::Added(bill)
            }
            Some(_) if bills.update(bill.clone()) => SubmitOutcome::Updated(bill),
            Some(id) => {
                warn!("Edited bill {} no longer exists, nothing committed", id);
                SubmitOutcome::Stale(bill)
            }
        };

        info!("Bill draft committed: {}", outcome.bill().id);
        Ok(outcome)
    }
}

/// Empty input counts as zero; anything else must parse as a decimal.
fn parse_amount(input: &str) -> Option<Decimal> {
    let input = input.trim();
    if input.is_empty() {
        return Some(Decimal::ZERO);
    }
    Decimal::from_str(input).ok().filter(|amount| !amount.is_sign_negative())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_draft() -> BillDraft {
        let mut draft = BillDraft::with_image(ImageUri::new("file:///bills/receipt.jpg"));
        draft.set_field(DraftField::StoreName, "Home Depot");
        draft.set_field(DraftField::Date, "2024-05-20");
        draft.select_category(CategoryKind::ElectricalAndHardware);
        draft.set_field(DraftField::TaxPaid, "16.00");
        draft.set_field(DraftField::Total, "200.50");
        draft
    }

    #[test]
    fn test_numeric_input_is_filtered_at_entry() {
        let mut draft = BillDraft::new();
        draft.set_field(DraftField::Total, "12.3abc");
        assert_eq!(draft.value(DraftField::Total), "12.3");

        draft.set_field(DraftField::TaxPaid, "$ 4,20");
        assert_eq!(draft.value(DraftField::TaxPaid), "420");
    }

    #[test]
    fn test_submit_with_missing_fields_reports_all_and_keeps_collection() {
        let mut bills = BillCollection::new();
        let mut draft = BillDraft::new();
        draft.set_field(DraftField::TaxPaid, "3");

        let errors = draft.submit(&mut bills).expect_err("should fail");
        assert!(errors.contains(&FieldError::MissingStoreName));
        assert!(errors.contains(&FieldError::MissingDate));
        assert!(errors.contains(&FieldError::MissingCategory));
        assert!(errors.contains(&FieldError::MissingImage));
        assert!(bills.is_empty());
        assert_eq!(draft.value(DraftField::TaxPaid), "3");
    }

    #[test]
    fn test_errors_hidden_until_first_attempt_then_stay_visible() {
        let mut bills = BillCollection::new();
        let mut draft = BillDraft::new();
        assert!(draft.field_error(DraftField::StoreName).is_none());

        let _ = draft.submit(&mut bills);
        assert!(draft.attempted());
        assert_eq!(draft.field_error(DraftField::StoreName), Some(FieldError::MissingStoreName));

        draft.set_field(DraftField::StoreName, "Target");
        let _ = draft.submit(&mut bills);
        assert!(draft.attempted());
        assert!(draft.field_error(DraftField::StoreName).is_none());
        assert_eq!(draft.field_error(DraftField::Date), Some(FieldError::MissingDate));
    }

    #[test]
    fn test_other_category_needs_custom_label() {
        let mut bills = BillCollection::new();
        let mut draft = filled_draft();
        draft.select_category(CategoryKind::Other);

        let errors = draft.submit(&mut bills).expect_err("label missing");
        assert_eq!(errors, vec![FieldError::MissingCustomCategory]);

        draft.set_field(DraftField::OtherCategory, "Cleaning");
        let outcome = draft.submit(&mut bills).expect("label given");
        assert_eq!(outcome.bill().category, Category::Other("Cleaning".to_string()));
    }

    #[test]
    fn test_successful_submit_adds_exactly_one_bill_with_values_preserved() {
        let mut bills = BillCollection::new();
        let mut draft = filled_draft();

        let outcome = draft.submit(&mut bills).expect("valid draft");
        assert!(matches!(outcome, SubmitOutcome::Added(_)));
        assert_eq!(bills.len(), 1);

        let bill = &bills.list()[0];
        assert_eq!(bill.store_name, "Home Depot");
        assert_eq!(bill.date, NaiveDate::from_ymd_opt(2024, 5, 20).unwrap());
        assert_eq!(bill.category, Category::ElectricalAndHardware);
        assert_eq!(bill.tax_paid.to_string(), "16.00");
        assert_eq!(bill.total.to_string(), "200.50");
        assert_eq!(bill.image_uri.as_str(), "file:///bills/receipt.jpg");
    }

    #[test]
    fn test_each_submit_assigns_a_fresh_id() {
        let mut bills = BillCollection::new();
        let first = filled_draft().submit(&mut bills).expect("first").into_bill();
        let second = filled_draft().submit(&mut bills).expect("second").into_bill();
        assert_ne!(first.id, second.id);
        assert_eq!(bills.len(), 2);
    }

    #[test]
    fn test_edit_draft_replaces_existing_bill() {
        let mut bills = BillCollection::new();
        let original = filled_draft().submit(&mut bills).expect("create").into_bill();

        let mut edit = BillDraft::from_bill(&original);
        assert_eq!(edit.value(DraftField::Total), "200.50");
        edit.set_field(DraftField::StoreName, "Lowe's");
        let outcome = edit.submit(&mut bills).expect("edit");

        assert!(matches!(outcome, SubmitOutcome::Updated(_)));
        assert_eq!(bills.len(), 1);
        assert_eq!(bills.get(original.id).unwrap().store_name, "Lowe's");
    }

    #[test]
    fn test_edit_of_removed_bill_is_stale_and_changes_nothing() {
        let mut bills = BillCollection::new();
        let original = filled_draft().submit(&mut bills).expect("create").into_bill();
        let mut edit = BillDraft::from_bill(&original);
        bills.remove(original.id);

        let outcome = edit.submit(&mut bills).expect("valid");
        assert!(matches!(outcome, SubmitOutcome::Stale(_)));
        assert!(bills.is_empty());
    }

    #[test]
    fn test_us_date_input_is_accepted_and_garbage_rejected() {
        let mut bills = BillCollection::new();
        let mut draft = filled_draft();
        draft.set_field(DraftField::Date, "06/01/2024");
        let bill = draft.submit(&mut bills).expect("us date").into_bill();
        assert_eq!(bill.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());

        let mut bad = filled_draft();
        bad.set_field(DraftField::Date, "soon");
        assert_eq!(bad.submit(&mut bills).unwrap_err(), vec![FieldError::InvalidDate]);
    }

    #[test]
    fn test_malformed_amount_is_rejected_and_empty_amount_is_zero() {
        let mut bills = BillCollection::new();
        let mut draft = filled_draft();
        draft.set_field(DraftField::Total, "1.2.3");
        assert_eq!(draft.submit(&mut bills).unwrap_err(), vec![FieldError::InvalidTotal]);

        draft.set_field(DraftField::Total, "");
        let bill = draft.submit(&mut bills).expect("empty total").into_bill();
        assert_eq!(bill.total, Decimal::ZERO);
    }

    #[test]
    fn test_unknown_category_label_selects_other() {
        let mut draft = BillDraft::new();
        draft.set_field(DraftField::Category, "Gas");
        assert_eq!(draft.value(DraftField::Category), "Gas");

        draft.set_field(DraftField::Category, "Packaging");
        assert_eq!(draft.value(DraftField::Category), "Other");
        assert_eq!(draft.value(DraftField::OtherCategory), "Packaging");
    }

    #[test]
    fn test_custom_label_matching_fixed_category_commits_fixed_category() {
        let mut draft = filled_draft();
        draft.select_category(CategoryKind::Other);
        draft.set_field(DraftField::OtherCategory, "Gas");

        let mut bills = BillCollection::new();
        let bill = draft.submit(&mut bills).expect("custom label").into_bill();
        assert_eq!(bill.category, Category::Gas);

        let reopened = BillDraft::from_bill(&bill);
        assert_eq!(reopened.value(DraftField::Category), "Gas");
        assert_eq!(reopened.value(DraftField::OtherCategory), "");
    }
}
