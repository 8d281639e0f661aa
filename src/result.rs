//! Call results

use crate::value::Value;
use std::collections::HashMap;
use std::ops::Index;

/// Parameter values by name, in descriptor order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fields {
    names: Vec<String>,
    values: Vec<Value>,
    index: HashMap<String, usize>,
}

impl Fields {
    fn new(names: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, values, index }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index.get(name).map(|&i| &self.values[i])
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Outcome of one foreign call. Immutable once assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct CallResult {
    status: i32,
    fields: Fields,
}

impl CallResult {
    pub(crate) fn new(status: i32, names: Vec<String>, values: Vec<Value>) -> Self {
        Self {
            status,
            fields: Fields::new(names, values),
        }
    }

    /// Integer the foreign function returned
    pub fn status(&self) -> i32 {
        self.status
    }

    /// Final value of the named parameter
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Final values in descriptor order
    pub fn values(&self) -> &[Value] {
        &self.fields.values
    }

    /// Name → value mapping
    pub fn dictionary(&self) -> &Fields {
        &self.fields
    }

    pub fn into_values(self) -> Vec<Value> {
        self.fields.values
    }

    /// Owned (name, value) pairs in descriptor order
    pub fn into_pairs(self) -> Vec<(String, Value)> {
        self.fields.names.into_iter().zip(self.fields.values).collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let dictionary: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect();

        serde_json::json!({
            "status": self.status,
            "values": self.fields.values.iter().map(Value::to_json).collect::<Vec<_>>(),
            "dictionary": dictionary,
        })
    }
}

impl Index<&str> for CallResult {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        match self.fields.get(name) {
            Some(value) => value,
            None => panic!("no parameter named '{}' in call result", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> CallResult {
        CallResult::new(
            3,
            vec!["n".into(), "label".into()],
            vec![Value::Int(10), Value::from("ok")],
        )
    }

    #[test]
    fn test_lookup() {
        let result = sample();
        assert_eq!(result.status(), 3);
        assert_eq!(result.get("n"), Some(&Value::Int(10)));
        assert_eq!(result["label"].as_text().unwrap(), "ok");
        assert!(result.get("status").is_none());
        assert!(result.dictionary().contains_key("n"));
    }

    #[test]
    fn test_order_preserved() {
        let result = sample();
        assert_eq!(result.dictionary().keys().collect::<Vec<_>>(), vec!["n", "label"]);
        assert_eq!(result.values()[0], Value::Int(10));
        let pairs = result.into_pairs();
        assert_eq!(pairs[1].0, "label");
    }

    #[test]
    fn test_to_json() {
        let json = sample().to_json();
        assert_eq!(json["status"], json!(3));
        assert_eq!(json["values"], json!([10, "ok"]));
        assert_eq!(json["dictionary"]["n"], json!(10));
    }

    #[test]
    #[should_panic(expected = "no parameter named")]
    fn test_index_missing() {
        let _ = &sample()["missing"];
    }
}
