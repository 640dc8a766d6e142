use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A normalized OCR result.
///
/// Invariant: `output` is always an object and `output.items` is always an
/// array. Every result entering the result cache goes through
/// [`OcrPayload::normalize`], so downstream consumers never see a shape
/// variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrPayload {
    output: Map<String, Value>,
}

impl OcrPayload {
    /// A payload with no header fields and no items.
    pub fn empty() -> Self {
        Self::normalize(Value::Null)
    }

    /// Coerce whatever the remote service returned into the canonical
    /// `{ output: { items: [...] } }` shape.
    ///
    /// Tolerated variants, mirroring what the service has been observed to
    /// send: a flat body with the fields at top level, a body already
    /// wrapped in `output`, a doubly nested `output.output`, and an
    /// array-wrapped response where the element carrying `output` wins.
    /// Item data present in any of these is preserved; anything else
    /// collapses to an empty item list. Never fails.
    pub fn normalize(raw: Value) -> Self {
        let raw = match raw {
            Value::Array(mut elems) => {
                match elems.iter().position(|e| e.get("output").is_some()) {
                    Some(idx) => elems.swap_remove(idx),
                    None => elems.into_iter().next().unwrap_or(Value::Null),
                }
            }
            other => other,
        };

        let body = match raw {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let mut output = match body.get("output") {
            Some(Value::Object(inner)) => match inner.get("output") {
                // Doubly nested: the real fields live one level down.
                Some(Value::Object(deep)) => deep.clone(),
                _ => inner.clone(),
            },
            Some(_) => Map::new(),
            // Flat responses carry the fields at the top level.
            None => body,
        };

        if !matches!(output.get("items"), Some(Value::Array(_))) {
            output.insert("items".to_string(), Value::Array(Vec::new()));
        }

        Self { output }
    }

    /// The header fields plus the `items` array.
    pub fn output(&self) -> &Map<String, Value> {
        &self.output
    }

    /// The line items. Guaranteed present, possibly empty.
    pub fn items(&self) -> &[Value] {
        match self.output.get("items") {
            Some(Value::Array(items)) => items,
            _ => &[],
        }
    }

    pub fn item_count(&self) -> usize {
        self.items().len()
    }

    /// The payload re-wrapped as a JSON value, for save bodies and exports.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("output".to_string(), Value::Object(self.output.clone()));
        Value::Object(map)
    }
}
