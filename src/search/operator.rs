use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Comparison applied to a mapped field
///
/// Mapping tables are parsed leniently: symbolic aliases such as `>=` or
/// `nin` are accepted and anything unknown falls back to equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Operator {
    #[default]
    Eq,
    Ne,
    Like,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    Ni,
    IsNull,
    Exists,
}

impl From<&str> for Operator {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "ne" | "!=" => Operator::Ne,
            "like" | "regex" => Operator::Like,
            "gt" | ">" => Operator::Gt,
            "lt" | "<" => Operator::Lt,
            "gte" | ">=" => Operator::Gte,
            "lte" | "<=" => Operator::Lte,
            "in" => Operator::In,
            "ni" | "nin" => Operator::Ni,
            "is_null" | "isnull" => Operator::IsNull,
            "exists" => Operator::Exists,
            _ => Operator::Eq,
        }
    }
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        Operator::from(s.as_str())
    }
}

impl Operator {
    /// MongoDB query operator for this comparison
    pub fn mongo_operator(&self) -> &'static str {
        match self {
            Operator::Eq | Operator::IsNull => "$eq",
            Operator::Ne => "$ne",
            Operator::Like => "$regex",
            Operator::Gt => "$gt",
            Operator::Lt => "$lt",
            Operator::Gte => "$gte",
            Operator::Lte => "$lte",
            Operator::In => "$in",
            Operator::Ni => "$nin",
            Operator::Exists => "$exists",
        }
    }
}

/// Native field name and comparison bound to an abstract filter key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(rename = "field")]
    pub field_name: String,
    #[serde(default)]
    pub operator: Operator,
}

impl Filter {
    pub fn new(field_name: impl Into<String>, operator: Operator) -> Self {
        Self {
            field_name: field_name.into(),
            operator,
        }
    }
}

/// Table from abstract descriptor keys to native fields.
///
/// Supplied once per repository and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping(HashMap<String, Filter>);

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to `field_name` compared with `operator`
    pub fn with(
        mut self,
        key: impl Into<String>,
        field_name: impl Into<String>,
        operator: Operator,
    ) -> Self {
        self.0.insert(key.into(), Filter::new(field_name, operator));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Filter> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, Filter>> for FieldMapping {
    fn from(map: HashMap<String, Filter>) -> Self {
        Self(map)
    }
}
