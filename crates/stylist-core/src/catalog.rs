//! Recommendation item shapes.
//!
//! `RawItem` mirrors what the backend sends: every field optional and any
//! field possibly of the wrong JSON type. `NormalizedItem` is the complete
//! display model the rendering layer consumes.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Raw (untrusted) shape
// =============================================================================

/// A recommendation record as received from the backend.
///
/// Built with [`RawItem::from_value`], which never fails: a field with an
/// unexpected type is treated as missing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawItem {
    pub id: Option<String>,
    pub product_display_name: Option<String>,
    pub article_type: Option<String>,
    pub base_colour: Option<String>,
    pub season: Option<String>,
    pub usage: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub similarity_score: Option<f64>,
    pub store_location: Option<RawStoreLocation>,
    pub stock: Option<RawStock>,
    pub retail_context: Option<RawRetailContext>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawStoreLocation {
    pub aisle: Option<String>,
    pub rack: Option<String>,
    pub display: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawStock {
    pub status: Option<String>,
    pub label: Option<String>,
    pub quantity: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawRetailContext {
    pub perfect_for: Option<Vec<String>>,
    pub pairs_well_with: Option<Vec<String>>,
}

impl RawItem {
    /// Extract whatever is usable from an arbitrary JSON value.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        Self {
            id: obj.get("id").and_then(lenient_string),
            product_display_name: obj.get("productDisplayName").and_then(lenient_string),
            article_type: obj.get("articleType").and_then(lenient_string),
            base_colour: obj.get("baseColour").and_then(lenient_string),
            season: obj.get("season").and_then(lenient_string),
            usage: obj.get("usage").and_then(lenient_string),
            price: obj.get("price").and_then(lenient_number),
            image_url: obj.get("imageUrl").and_then(lenient_string),
            similarity_score: obj.get("similarity_score").and_then(lenient_number),
            store_location: obj
                .get("storeLocation")
                .and_then(Value::as_object)
                .map(RawStoreLocation::from_object),
            stock: obj
                .get("stock")
                .and_then(Value::as_object)
                .map(RawStock::from_object),
            retail_context: obj
                .get("retailContext")
                .and_then(Value::as_object)
                .map(RawRetailContext::from_object),
        }
    }
}

impl<'de> Deserialize<'de> for RawItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

impl RawStoreLocation {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            aisle: obj.get("aisle").and_then(lenient_string),
            rack: obj.get("rack").and_then(lenient_string),
            display: obj.get("display").and_then(lenient_string),
        }
    }
}

impl RawStock {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            status: obj.get("status").and_then(lenient_string),
            label: obj.get("label").and_then(lenient_string),
            quantity: obj
                .get("quantity")
                .and_then(Value::as_u64)
                .and_then(|q| u32::try_from(q).ok()),
        }
    }
}

impl RawRetailContext {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            perfect_for: obj.get("perfectFor").and_then(lenient_string_list),
            pairs_well_with: obj.get("pairsWellWith").and_then(lenient_string_list),
        }
    }
}

/// Strings pass through unless blank; numbers and booleans are stringified.
fn lenient_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Finite numbers, or strings that parse as one.
fn lenient_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn lenient_string_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect(),
    )
}

// =============================================================================
// Normalized (display) shape
// =============================================================================

/// Availability bucket of an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }

    /// Parse a wire status. Unrecognized values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "in_stock" => Some(StockStatus::InStock),
            "low_stock" => Some(StockStatus::LowStock),
            "out_of_stock" => Some(StockStatus::OutOfStock),
            _ => None,
        }
    }

    pub fn default_label(&self) -> &'static str {
        match self {
            StockStatus::InStock => "In Stock",
            StockStatus::LowStock => "Low Stock",
            StockStatus::OutOfStock => "Out of Stock",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockInfo {
    pub status: StockStatus,
    pub label: String,
    pub quantity: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreLocation {
    pub aisle: String,
    pub rack: String,
    pub display: String,
}

/// A recommendation with every display field populated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub id: String,
    pub name: String,
    pub article_type: String,
    pub base_colour: String,
    pub season: String,
    pub usage: String,
    pub price: f64,
    pub image_url: String,
    pub location: StoreLocation,
    pub stock: StockInfo,
    /// Similarity as an integer percentage. Omitted when the backend sent none.
    pub match_score: Option<u8>,
    pub perfect_for: Vec<String>,
    pub pairs_with: Vec<String>,
}

impl NormalizedItem {
    /// `$65`, or `$64.50` when the price has cents.
    pub fn price_label(&self) -> String {
        if self.price.fract() == 0.0 {
            format!("${:.0}", self.price)
        } else {
            format!("${:.2}", self.price)
        }
    }

    pub fn match_label(&self) -> Option<String> {
        self.match_score.map(|score| format!("{}% match", score))
    }

    pub fn is_available(&self) -> bool {
        self.stock.status != StockStatus::OutOfStock
    }

    /// Project back onto the wire shape. Normalizing the result reproduces `self`.
    pub fn to_raw(&self) -> RawItem {
        RawItem {
            id: Some(self.id.clone()),
            product_display_name: Some(self.name.clone()),
            article_type: Some(self.article_type.clone()),
            base_colour: Some(self.base_colour.clone()),
            season: Some(self.season.clone()),
            usage: Some(self.usage.clone()),
            price: Some(self.price),
            image_url: Some(self.image_url.clone()),
            similarity_score: self.match_score.map(|score| f64::from(score) / 100.0),
            store_location: Some(RawStoreLocation {
                aisle: Some(self.location.aisle.clone()),
                rack: Some(self.location.rack.clone()),
                display: Some(self.location.display.clone()),
            }),
            stock: Some(RawStock {
                status: Some(self.stock.status.as_str().to_string()),
                label: Some(self.stock.label.clone()),
                quantity: self.stock.quantity,
            }),
            retail_context: Some(RawRetailContext {
                perfect_for: Some(self.perfect_for.clone()),
                pairs_well_with: Some(self.pairs_with.clone()),
            }),
        }
    }
}

/// Totals shown under the recommendation grid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutfitSummary {
    pub total_items: usize,
    pub total_price: f64,
    pub in_stock_count: usize,
}

impl OutfitSummary {
    pub fn from_items(items: &[NormalizedItem]) -> Self {
        Self {
            total_items: items.len(),
            total_price: items.iter().map(|item| item.price).sum(),
            in_stock_count: items.iter().filter(|item| item.is_available()).count(),
        }
    }
}
