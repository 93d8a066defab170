use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Diagnostics describing how a result was produced. Only present when the
/// request asked for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationTrace {
    #[serde(deserialize_with = "deserialize_tables_used")]
    pub tables_used: BTreeSet<String>,
    pub intermediate_values: BTreeMap<String, TraceValue>,
    pub warnings: Vec<String>,
    pub assumptions: Vec<String>,
}

/// One intermediate value. Shapes outside this set are kept as compact JSON text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TraceValue {
    Number(f64),
    Text(String),
    Flag(bool),
    List(Vec<String>),
}

impl TraceValue {
    pub fn display(&self) -> String {
        match self {
            Self::Number(value) => format!("{value}"),
            Self::Text(text) => text.clone(),
            Self::Flag(flag) => flag.to_string(),
            Self::List(items) => items.join(", "),
        }
    }
}

impl From<serde_json::Value> for TraceValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Number(number) => match number.as_f64() {
                Some(float) => Self::Number(float),
                None => Self::Text(number.to_string()),
            },
            Value::String(text) => Self::Text(text),
            Value::Bool(flag) => Self::Flag(flag),
            Value::Array(items) if items.iter().all(Value::is_string) => Self::List(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(text) => Some(text),
                        _ => None,
                    })
                    .collect(),
            ),
            other => Self::Text(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for TraceValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(TraceValue::from)
    }
}

/// The service reports tables either as a list of names or as an object
/// keyed by table name.
fn deserialize_tables_used<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TablesUsed {
        List(Vec<String>),
        Keyed(BTreeMap<String, serde_json::Value>),
    }

    Ok(match Option::<TablesUsed>::deserialize(deserializer)? {
        Some(TablesUsed::List(names)) => names.into_iter().collect(),
        Some(TablesUsed::Keyed(entries)) => entries.into_keys().collect(),
        None => BTreeSet::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tables_used_accepts_list_or_object() {
        let listed: CalculationTrace = serde_json::from_value(json!({
            "tables_used": ["nml_table", "scenario_table", "nml_table"]
        }))
        .expect("list form parses");
        let keyed: CalculationTrace = serde_json::from_value(json!({
            "tables_used": {"scenario_table": {"rows": 12}, "nml_table": "v3"}
        }))
        .expect("object form parses");

        assert_eq!(listed.tables_used, keyed.tables_used);
        assert_eq!(listed.tables_used.len(), 2);
    }

    #[test]
    fn intermediate_values_fall_back_to_json_text() {
        let trace: CalculationTrace = serde_json::from_value(json!({
            "intermediate_values": {
                "lw_total": 108.2,
                "category": "R1",
                "barrier": false,
                "sources": ["excavator", "truck"],
                "geometry": {"distance": 50},
                "mixed": [1, "a"]
            }
        }))
        .expect("trace parses");

        let values = &trace.intermediate_values;
        assert_eq!(values["lw_total"], TraceValue::Number(108.2));
        assert_eq!(values["category"], TraceValue::Text("R1".to_string()));
        assert_eq!(values["barrier"], TraceValue::Flag(false));
        assert_eq!(
            values["sources"],
            TraceValue::List(vec!["excavator".to_string(), "truck".to_string()])
        );
        assert_eq!(
            values["geometry"],
            TraceValue::Text("{\"distance\":50}".to_string())
        );
        assert_eq!(values["mixed"], TraceValue::Text("[1,\"a\"]".to_string()));
    }
}
