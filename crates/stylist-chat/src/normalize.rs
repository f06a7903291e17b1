//! Recommendation normalizer: the single place display defaults come from.
//!
//! `normalize` is pure and total. Every display field of the output is
//! filled from the source when usable and from a fixed default otherwise,
//! and normalizing the raw projection of an output reproduces it.

use stylist_core::catalog::{NormalizedItem, RawItem, StockInfo, StockStatus, StoreLocation};

/// Price shown when the backend sends none, or a non-positive one.
pub const FALLBACK_PRICE: f64 = 65.0;

/// Sample catalog image, keyed by item id.
pub const IMAGE_URL_TEMPLATE: &str = "https://raw.githubusercontent.com/openai/openai-cookbook/main/examples/data/sample_clothes/sample_images/{id}.jpg";

const FALLBACK_ID: &str = "unknown";
const FALLBACK_NAME: &str = "Unnamed item";
const FALLBACK_ARTICLE_TYPE: &str = "Item";
const FALLBACK_COLOUR: &str = "Assorted";
const FALLBACK_SEASON: &str = "All seasons";
const FALLBACK_USAGE: &str = "Casual";
const FALLBACK_AISLE: &str = "Aisle A";
const FALLBACK_RACK: &str = "Rack 1";
const FALLBACK_LOCATION: &str = "Aisle A, Rack 1";
const FALLBACK_PERFECT_FOR: &str = "Various occasions";
const FALLBACK_PAIRS_WITH: &str = "Accessories";

/// Turns untrusted [`RawItem`]s into complete [`NormalizedItem`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationNormalizer;

impl RecommendationNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, raw: &RawItem) -> NormalizedItem {
        let id = text_or(raw.id.as_deref(), FALLBACK_ID);
        let image_url = match clean(raw.image_url.as_deref()) {
            Some(url) => url.to_string(),
            None => IMAGE_URL_TEMPLATE.replace("{id}", &id),
        };

        NormalizedItem {
            name: text_or(raw.product_display_name.as_deref(), FALLBACK_NAME),
            article_type: text_or(raw.article_type.as_deref(), FALLBACK_ARTICLE_TYPE),
            base_colour: text_or(raw.base_colour.as_deref(), FALLBACK_COLOUR),
            season: text_or(raw.season.as_deref(), FALLBACK_SEASON),
            usage: text_or(raw.usage.as_deref(), FALLBACK_USAGE),
            price: raw
                .price
                .filter(|p| p.is_finite() && *p > 0.0)
                .unwrap_or(FALLBACK_PRICE),
            image_url,
            location: self.location(raw),
            stock: self.stock(raw),
            match_score: match_score(raw.similarity_score),
            perfect_for: list_or(
                raw.retail_context
                    .as_ref()
                    .and_then(|ctx| ctx.perfect_for.as_deref()),
                FALLBACK_PERFECT_FOR,
            ),
            pairs_with: list_or(
                raw.retail_context
                    .as_ref()
                    .and_then(|ctx| ctx.pairs_well_with.as_deref()),
                FALLBACK_PAIRS_WITH,
            ),
            id,
        }
    }

    /// Normalize a whole list, preserving order.
    pub fn normalize_all(&self, raw: &[RawItem]) -> Vec<NormalizedItem> {
        raw.iter().map(|item| self.normalize(item)).collect()
    }

    fn location(&self, raw: &RawItem) -> StoreLocation {
        let loc = raw.store_location.as_ref();
        StoreLocation {
            aisle: text_or(loc.and_then(|l| l.aisle.as_deref()), FALLBACK_AISLE),
            rack: text_or(loc.and_then(|l| l.rack.as_deref()), FALLBACK_RACK),
            display: text_or(loc.and_then(|l| l.display.as_deref()), FALLBACK_LOCATION),
        }
    }

    fn stock(&self, raw: &RawItem) -> StockInfo {
        let recognized = raw.stock.as_ref().and_then(|stock| {
            let status = StockStatus::parse(stock.status.as_deref()?)?;
            Some((status, stock))
        });
        match recognized {
            Some((status, stock)) => StockInfo {
                status,
                label: text_or(stock.label.as_deref(), status.default_label()),
                quantity: stock.quantity,
            },
            None => StockInfo {
                status: StockStatus::InStock,
                label: StockStatus::InStock.default_label().to_string(),
                quantity: None,
            },
        }
    }
}

fn clean(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn text_or(value: Option<&str>, fallback: &str) -> String {
    clean(value).unwrap_or(fallback).to_string()
}

fn list_or(values: Option<&[String]>, fallback: &str) -> Vec<String> {
    let kept: Vec<String> = values
        .unwrap_or_default()
        .iter()
        .filter_map(|v| clean(Some(v.as_str())))
        .map(str::to_string)
        .collect();
    if kept.is_empty() {
        vec![fallback.to_string()]
    } else {
        kept
    }
}

/// Similarity in `[0, 1]` as a whole percentage. Zero means no score.
fn match_score(similarity: Option<f64>) -> Option<u8> {
    let score = (similarity?.clamp(0.0, 1.0) * 100.0).round() as u8;
    (score > 0).then_some(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(value: serde_json::Value) -> NormalizedItem {
        RecommendationNormalizer::new().normalize(&RawItem::from_value(&value))
    }

    #[test]
    fn test_bare_id_gets_all_defaults() {
        let item = normalize(json!({"id": "42"}));
        assert_eq!(item.id, "42");
        assert_eq!(item.price, FALLBACK_PRICE);
        assert!(item.image_url.contains("42"));
        assert!(item.image_url.ends_with("/sample_images/42.jpg"));
        assert_eq!(item.stock.status, StockStatus::InStock);
        assert_eq!(item.stock.label, "In Stock");
        assert_eq!(item.location.display, "Aisle A, Rack 1");
        assert_eq!(item.location.aisle, "Aisle A");
        assert_eq!(item.location.rack, "Rack 1");
        assert_eq!(item.match_score, None);
        assert_eq!(item.perfect_for, vec!["Various occasions"]);
        assert_eq!(item.pairs_with, vec!["Accessories"]);
        assert_eq!(item.name, "Unnamed item");
        assert_eq!(item.article_type, "Item");
        assert_eq!(item.base_colour, "Assorted");
        assert_eq!(item.season, "All seasons");
        assert_eq!(item.usage, "Casual");
    }

    #[test]
    fn test_numeric_id_and_missing_id() {
        assert_eq!(normalize(json!({"id": 15970})).id, "15970");
        let item = normalize(json!({}));
        assert_eq!(item.id, "unknown");
        assert!(item.image_url.ends_with("/unknown.jpg"));
        assert_eq!(normalize(json!(null)).id, "unknown");
    }

    #[test]
    fn test_full_item_passes_through() {
        let item = normalize(json!({
            "id": 1163,
            "productDisplayName": "Nike Sahara Team India Fanwear Round Neck Jersey",
            "articleType": "Tshirts",
            "baseColour": "Blue",
            "season": "Summer",
            "usage": "Sports",
            "price": 89.5,
            "imageUrl": "https://cdn.example.com/1163.jpg",
            "similarity_score": 0.873,
            "storeLocation": {"aisle": "Aisle C", "rack": "Rack 4", "display": "Aisle C, Rack 4"},
            "stock": {"status": "low_stock", "label": "Only 2 left", "quantity": 2},
            "retailContext": {"perfectFor": ["Match day"], "pairsWellWith": ["Track pants", ""]}
        }));
        assert_eq!(item.name, "Nike Sahara Team India Fanwear Round Neck Jersey");
        assert_eq!(item.price, 89.5);
        assert_eq!(item.image_url, "https://cdn.example.com/1163.jpg");
        assert_eq!(item.match_score, Some(87));
        assert_eq!(item.location.display, "Aisle C, Rack 4");
        assert_eq!(item.stock.status, StockStatus::LowStock);
        assert_eq!(item.stock.label, "Only 2 left");
        assert_eq!(item.stock.quantity, Some(2));
        assert_eq!(item.perfect_for, vec!["Match day"]);
        assert_eq!(item.pairs_with, vec!["Track pants"]);
    }

    #[test]
    fn test_wrongly_typed_fields_are_missing() {
        let item = normalize(json!({
            "id": "7",
            "productDisplayName": ["not", "a", "string"],
            "price": "cheap",
            "imageUrl": 3.5,
            "similarity_score": "high",
            "storeLocation": "Aisle Z",
            "stock": true,
            "retailContext": {"perfectFor": "weddings"}
        }));
        assert_eq!(item.name, "Unnamed item");
        assert_eq!(item.price, FALLBACK_PRICE);
        assert_eq!(item.match_score, None);
        assert_eq!(item.location.display, "Aisle A, Rack 1");
        assert_eq!(item.stock.label, "In Stock");
        assert_eq!(item.perfect_for, vec!["Various occasions"]);
    }

    #[test]
    fn test_non_positive_price_falls_back() {
        assert_eq!(normalize(json!({"price": 0})).price, FALLBACK_PRICE);
        assert_eq!(normalize(json!({"price": -10})).price, FALLBACK_PRICE);
        assert_eq!(normalize(json!({"price": "$120"})).price, 120.0);
    }

    #[test]
    fn test_blank_image_url_falls_back() {
        let item = normalize(json!({"id": 9, "imageUrl": "   "}));
        assert!(item.image_url.ends_with("/9.jpg"));
    }

    #[test]
    fn test_match_score_rounding_and_omission() {
        assert_eq!(normalize(json!({"similarity_score": 0})).match_score, None);
        assert_eq!(normalize(json!({"similarity_score": 0.004})).match_score, None);
        assert_eq!(normalize(json!({"similarity_score": 0.005})).match_score, Some(1));
        assert_eq!(normalize(json!({"similarity_score": 1.7})).match_score, Some(100));
        assert_eq!(normalize(json!({"similarity_score": -0.3})).match_score, None);
    }

    #[test]
    fn test_stock_status_handling() {
        let unknown = normalize(json!({"stock": {"status": "backordered", "label": "Soon"}}));
        assert_eq!(unknown.stock.status, StockStatus::InStock);
        assert_eq!(unknown.stock.label, "In Stock");

        let unlabelled = normalize(json!({"stock": {"status": "out_of_stock"}}));
        assert_eq!(unlabelled.stock.status, StockStatus::OutOfStock);
        assert_eq!(unlabelled.stock.label, "Out of Stock");
        assert!(!unlabelled.is_available());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let normalizer = RecommendationNormalizer::new();
        let inputs = [
            json!({"id": "42"}),
            json!({}),
            json!({"id": 3, "price": 12.25, "similarity_score": 0.555, "productDisplayName": "  Linen Shirt "}),
            json!({"stock": {"status": "LOW_STOCK"}, "retailContext": {"pairsWellWith": [" Loafers "]}}),
            json!({"storeLocation": {"aisle": "B"}, "similarity_score": 0.29}),
        ];
        for input in inputs {
            let once = normalizer.normalize(&RawItem::from_value(&input));
            let twice = normalizer.normalize(&once.to_raw());
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_normalize_does_not_mutate_input() {
        let raw = RawItem::from_value(&json!({"id": "5", "price": -1}));
        let before = raw.clone();
        RecommendationNormalizer::new().normalize(&raw);
        assert_eq!(raw, before);
    }

    #[test]
    fn test_normalize_all_preserves_order() {
        let raw: Vec<RawItem> = [json!({"id": "b"}), json!({"id": "a"})]
            .iter()
            .map(RawItem::from_value)
            .collect();
        let ids: Vec<_> = RecommendationNormalizer::new()
            .normalize_all(&raw)
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
