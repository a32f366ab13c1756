use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::image::ImageUri;

/// The fixed category choices offered when tagging a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryKind {
    CookingSuppliesAndMaterial,
    ElectricalAndHardware,
    Gas,
    Other,
}

impl CategoryKind {
    pub const ALL: [CategoryKind; 4] = [
        CategoryKind::CookingSuppliesAndMaterial,
        CategoryKind::ElectricalAndHardware,
        CategoryKind::Gas,
        CategoryKind::Other,
    ];

    /// Label shown next to the radio button.
    pub fn label(self) -> &'static str {
        match self {
            CategoryKind::CookingSuppliesAndMaterial => "Cooking Supplies and Material",
            CategoryKind::ElectricalAndHardware => "Electrical and Hardware",
            CategoryKind::Gas => "Gas",
            CategoryKind::Other => "Other",
        }
    }

    /// Looks up a kind by its label (exact match).
    pub fn from_label(label: &str) -> Option<CategoryKind> {
        CategoryKind::ALL.into_iter().find(|kind| kind.label() == label)
    }
}

/// Category of a committed bill.
///
/// Serialized as its label; a custom label chosen under "Other" is stored
/// as-is, so any unknown string reads back as `Other(label)`.
///
/// Only the label is stored. A custom label equal to a fixed label (say
/// "Other" + "Gas") therefore becomes that fixed category, and an edit draft
/// reopens on it rather than on "Other".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    CookingSuppliesAndMaterial,
    ElectricalAndHardware,
    Gas,
    Other(String),
}

impl Category {
    pub fn kind(&self) -> CategoryKind {
        match self {
            Category::CookingSuppliesAndMaterial => CategoryKind::CookingSuppliesAndMaterial,
            Category::ElectricalAndHardware => CategoryKind::ElectricalAndHardware,
            Category::Gas => CategoryKind::Gas,
            Category::Other(_) => CategoryKind::Other,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Category::Other(label) => label,
            fixed => fixed.kind().label(),
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match CategoryKind::from_label(&value) {
            Some(CategoryKind::CookingSuppliesAndMaterial) => Category::CookingSuppliesAndMaterial,
            Some(CategoryKind::ElectricalAndHardware) => Category::ElectricalAndHardware,
            Some(CategoryKind::Gas) => Category::Gas,
            Some(CategoryKind::Other) | None => Category::Other(value),
        }
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        match value {
            Category::Other(label) => label,
            fixed => fixed.label().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A finalized bill record.
///
/// Bills are only ever replaced wholesale through
/// [`BillCollection::update`](crate::store::BillCollection::update).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    /// Unique identifier, assigned when the draft is committed
    pub id: Uuid,

    /// Durable image owned by this bill
    pub image_uri: ImageUri,

    /// Name of the store the receipt came from (never empty)
    pub store_name: String,

    /// Purchase date, serialized as `YYYY-MM-DD`
    pub date: NaiveDate,

    pub category: Category,

    /// Tax portion of the bill
    pub tax_paid: Decimal,

    /// Bill total including tax
    pub total: Decimal,
}
