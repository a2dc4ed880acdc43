//! Event records: request normalisation and row mapping

use crate::error::{Error, Result};
use crate::types::{Color, Column, Row};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A submitted record before validation.
///
/// Keys are normalised on construction (lowercase, spaces and underscores to
/// hyphens, apostrophes dropped) so `"Order ID"`, `"order_id"` and
/// `"order-id"` all address the same column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventRecordInput {
    fields: BTreeMap<String, String>,
}

impl EventRecordInput {
    /// Build from a JSON body. Anything but an object is rejected.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self::from_map(map)),
            Value::Null => Err(Error::Validation("Request body is empty".to_string())),
            other => Err(Error::Validation(format!(
                "Request body must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Build from key/value pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut input = Self::default();
        for (key, value) in pairs {
            input.insert(key.as_ref(), value.into());
        }
        input
    }

    fn from_map(map: Map<String, Value>) -> Self {
        let mut input = Self::default();
        for (key, value) in map {
            if let Some(text) = cell_text(&value) {
                input.insert(&key, text);
            }
        }
        input
    }

    fn insert(&mut self, key: &str, value: String) {
        let normalized = normalize_key(key);
        // an exactly-spelled key beats a looser spelling of the same column
        if key == normalized || !self.fields.contains_key(&normalized) {
            self.fields.insert(normalized, value);
        }
    }

    /// Value for a normalised key
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(&normalize_key(key)).map(String::as_str)
    }

    /// Value for a ledger column, or "" when absent
    pub fn column(&self, column: Column) -> &str {
        self.field(&column.input_key()).unwrap_or("")
    }

    /// True when no fields were supplied
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Normalise a request key: lowercase, whitespace/underscores to hyphens.
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .replace('\'', "")
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        // nested structures have no cell representation
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A validated record, every column except Date
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    /// Courier
    pub courier: String,
    /// Quantity, as entered
    pub qty: String,
    /// Description
    pub description: String,
    /// Order id
    pub order_id: String,
    /// Remarks
    pub remarks: String,
    /// Marketplace, already uppercased
    pub marketplace: String,
}

impl EventRecord {
    /// Validate `input`. The marketplace must be non-blank unless a default
    /// is configured; every other column defaults to "".
    pub fn from_input(input: &EventRecordInput, default_marketplace: Option<&str>) -> Result<Self> {
        let marketplace = match input.field(&Column::Marketplace.input_key()) {
            Some(value) if !value.trim().is_empty() => value,
            _ => default_marketplace
                .filter(|d| !d.trim().is_empty())
                .ok_or_else(|| Error::Validation("marketplace is required".to_string()))?,
        };

        Ok(Self {
            courier: input.column(Column::Courier).to_string(),
            qty: input.column(Column::Qty).to_string(),
            description: input.column(Column::Description).to_string(),
            order_id: input.column(Column::OrderId).to_string(),
            remarks: input.column(Column::Remarks).to_string(),
            marketplace: marketplace.to_uppercase(),
        })
    }

    /// Cells in sheet order with `timestamp` in the Date column
    pub fn to_row(&self, timestamp: String) -> Row {
        Column::ALL
            .iter()
            .map(|column| match column {
                Column::Date => timestamp.clone(),
                Column::Courier => self.courier.clone(),
                Column::Qty => self.qty.clone(),
                Column::Description => self.description.clone(),
                Column::OrderId => self.order_id.clone(),
                Column::Remarks => self.remarks.clone(),
                Column::Marketplace => self.marketplace.clone(),
            })
            .collect()
    }

    /// Highlight for the Remarks cell, if any
    pub fn remarks_highlight(&self) -> Option<RemarksHighlight> {
        RemarksHighlight::classify(&self.remarks)
    }
}

/// Background applied to the Remarks cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemarksHighlight {
    /// Remarks mention SUCCESS
    Success,
    /// Remarks mention FAILED
    Failed,
}

impl RemarksHighlight {
    /// Case-insensitive; SUCCESS wins when both words appear.
    pub fn classify(remarks: &str) -> Option<Self> {
        let upper = remarks.to_uppercase();
        if upper.contains("SUCCESS") {
            Some(RemarksHighlight::Success)
        } else if upper.contains("FAILED") {
            Some(RemarksHighlight::Failed)
        } else {
            None
        }
    }

    /// Cell background for this highlight
    pub fn color(self) -> Color {
        match self {
            RemarksHighlight::Success => Color::SUCCESS_GREEN,
            RemarksHighlight::Failed => Color::FAILED_RED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Order ID"), "order-id");
        assert_eq!(normalize_key("order_id"), "order-id");
        assert_eq!(normalize_key("  QTY "), "qty");
        assert_eq!(normalize_key("Buyer's Note"), "buyers-note");
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert!(matches!(
            EventRecordInput::from_json(Value::Null),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            EventRecordInput::from_json(json!([1, 2])),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_scalars_become_text() {
        let input = EventRecordInput::from_json(json!({
            "qty": 3,
            "remarks": true,
            "courier": null,
            "description": {"nested": 1},
            "marketplace": "shopee"
        }))
        .unwrap();
        assert_eq!(input.column(Column::Qty), "3");
        assert_eq!(input.column(Column::Remarks), "true");
        assert_eq!(input.column(Column::Courier), "");
        assert_eq!(input.column(Column::Description), "");
    }

    #[test]
    fn test_exact_key_wins_over_loose_spelling() {
        let input = EventRecordInput::from_pairs([("Order ID", "loose"), ("order-id", "exact")]);
        assert_eq!(input.column(Column::OrderId), "exact");
    }

    #[test]
    fn test_marketplace_required_and_uppercased() {
        let missing = EventRecordInput::from_pairs([("qty", "1")]);
        assert!(matches!(
            EventRecord::from_input(&missing, None),
            Err(Error::Validation(_))
        ));

        let blank = EventRecordInput::from_pairs([("marketplace", "  ")]);
        assert!(EventRecord::from_input(&blank, None).is_err());

        let defaulted = EventRecord::from_input(&missing, Some("walk-in")).unwrap();
        assert_eq!(defaulted.marketplace, "WALK-IN");

        let given = EventRecordInput::from_pairs([("marketplace", "lazada")]);
        let record = EventRecord::from_input(&given, Some("walk-in")).unwrap();
        assert_eq!(record.marketplace, "LAZADA");
    }

    #[test]
    fn test_row_mapping_order() {
        let input = EventRecordInput::from_pairs([
            ("courier", "J&T"),
            ("qty", "3"),
            ("description", "Phone case"),
            ("order-id", "ORD-1"),
            ("remarks", "pending"),
            ("marketplace", "lazada"),
            ("date", "1/1/1999, 1:00:00 AM"),
        ]);
        let record = EventRecord::from_input(&input, None).unwrap();
        let row = record.to_row("8/8/2025, 9:00:00 AM".to_string());
        assert_eq!(
            row,
            vec![
                "8/8/2025, 9:00:00 AM",
                "J&T",
                "3",
                "Phone case",
                "ORD-1",
                "pending",
                "LAZADA"
            ]
        );
    }

    #[test]
    fn test_remarks_highlight() {
        assert_eq!(
            RemarksHighlight::classify("Delivery FAILED"),
            Some(RemarksHighlight::Failed)
        );
        assert_eq!(
            RemarksHighlight::classify("SUCCESS: delivered"),
            Some(RemarksHighlight::Success)
        );
        assert_eq!(
            RemarksHighlight::classify("success after failed attempt"),
            Some(RemarksHighlight::Success)
        );
        assert_eq!(RemarksHighlight::classify("pending"), None);
        assert_eq!(RemarksHighlight::Failed.color(), Color::FAILED_RED);
    }
}
