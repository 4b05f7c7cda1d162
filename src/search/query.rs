use super::operator::{FieldMapping, Operator};
use super::pagination::Pagination;
use crate::error::{AppError, AppResult};
use mongodb::bson::{Bson, Document};
use serde::{Deserialize, Serialize};

/// One sort request of a descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sorted {
    pub id: String,
    #[serde(default)]
    pub desc: bool,
}

/// One filter request of a descriptor; the value is opaque JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filtered {
    pub id: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Page/sort/filter descriptor as sent by table-style UIs
///
/// ```json
/// {"pageSize":10,"page":1,"sorted":[{"id":"firstName","desc":false}],"filtered":[{"id":"firstName","value":"3"}]}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub page_size: i64,
    #[serde(default)]
    pub sorted: Vec<Sorted>,
    #[serde(default)]
    pub filtered: Vec<Filtered>,
}

impl Query {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page,
            page_size,
            ..Default::default()
        }
    }

    pub fn sort_by(mut self, id: impl Into<String>, desc: bool) -> Self {
        self.sorted.push(Sorted {
            id: id.into(),
            desc,
        });
        self
    }

    pub fn filter_by(mut self, id: impl Into<String>, value: serde_json::Value) -> Self {
        self.filtered.push(Filtered {
            id: id.into(),
            value,
        });
        self
    }

    /// Build the native filter document.
    ///
    /// Entries whose key is not in `mapping` are dropped. Two entries mapped
    /// onto the same native field are merged into one operator document.
    pub fn mark_filtered(&self, mapping: &FieldMapping) -> AppResult<Document> {
        let mut filter = Document::new();

        for entry in &self.filtered {
            let Some(column) = mapping.get(&entry.id) else {
                continue;
            };

            let value = Bson::try_from(entry.value.clone()).map_err(|e| {
                AppError::BadRequest(format!("Invalid value for filter '{}': {}", entry.id, e))
            })?;

            let mut clause = Document::new();
            match column.operator {
                Operator::IsNull => {
                    clause.insert("$eq", Bson::Null);
                }
                Operator::Exists => {
                    let exists = match value {
                        Bson::Boolean(exists) => exists,
                        Bson::Null => true,
                        other => {
                            return Err(AppError::BadRequest(format!(
                                "Filter '{}' expects a boolean, got {}",
                                entry.id, other
                            )))
                        }
                    };
                    clause.insert("$exists", exists);
                }
                op => {
                    clause.insert(op.mongo_operator(), value);
                }
            }

            match filter.get_mut(&column.field_name) {
                Some(Bson::Document(existing)) => {
                    for (op, value) in clause {
                        existing.insert(op, value);
                    }
                }
                _ => {
                    filter.insert(column.field_name.clone(), clause);
                }
            }
        }

        tracing::debug!("Translated filter: {}", filter);
        Ok(filter)
    }

    /// Build the native sort document, `None` when nothing maps.
    ///
    /// Entries combine into a multi-key sort in descriptor order.
    pub fn mark_sort(&self, mapping: &FieldMapping) -> Option<Document> {
        let mut sort = Document::new();
        for entry in &self.sorted {
            if let Some(column) = mapping.get(&entry.id) {
                sort.insert(column.field_name.clone(), if entry.desc { -1 } else { 1 });
            }
        }
        if sort.is_empty() {
            None
        } else {
            Some(sort)
        }
    }

    pub fn mark_page(&self) -> Pagination {
        Pagination::new(self.page, self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId};
    use serde_json::json;

    fn as_json(filter: Document) -> serde_json::Value {
        Bson::Document(filter).into_relaxed_extjson()
    }

    fn mapping() -> FieldMapping {
        FieldMapping::new()
            .with("firstName", "first_name", Operator::Like)
            .with("status", "status", Operator::Ne)
            .with("minAge", "age", Operator::Gte)
            .with("maxAge", "age", Operator::Lt)
            .with("roles", "roles", Operator::In)
            .with("banned", "tags", Operator::Ni)
            .with("deleted", "deleted_at", Operator::IsNull)
            .with("email", "email", Operator::Exists)
            .with("owner", "owner_id", Operator::Eq)
            .with("created", "created_at", Operator::Gt)
            .with("updated", "updated_at", Operator::Lte)
    }

    #[test]
    fn test_descriptor_wire_shape() {
        let query: Query = serde_json::from_str(
            r#"{"pageSize":10,"page":0,"sorted":[{"id":"firstName","desc":false}],"filtered":[{"id":"firstName","value":"3"}]}"#,
        )
        .unwrap();
        assert_eq!(query.page_size, 10);
        assert_eq!(query.page, 0);
        assert_eq!(query.sorted[0].id, "firstName");
        assert!(!query.sorted[0].desc);
        assert_eq!(query.filtered[0].value, json!("3"));

        let empty: Query = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, Query::default());
    }

    #[test]
    fn test_empty_filtered_matches_everything() {
        let filter = Query::new(1, 10).mark_filtered(&mapping()).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_unknown_filter_keys_are_dropped() {
        let query = Query::new(1, 10)
            .filter_by("nickname", json!("bob"))
            .filter_by("status", json!("archived"));
        let filter = query.mark_filtered(&mapping()).unwrap();
        assert_eq!(filter, doc! { "status": { "$ne": "archived" } });
    }

    #[test]
    fn test_operator_translation() {
        let query = Query::new(1, 10)
            .filter_by("firstName", json!("^jo"))
            .filter_by("roles", json!(["admin", "ops"]))
            .filter_by("banned", json!(["spam"]))
            .filter_by("created", json!(100))
            .filter_by("updated", json!(200));
        let filter = query.mark_filtered(&mapping()).unwrap();
        assert_eq!(
            as_json(filter),
            json!({
                "first_name": { "$regex": "^jo" },
                "roles": { "$in": ["admin", "ops"] },
                "tags": { "$nin": ["spam"] },
                "created_at": { "$gt": 100 },
                "updated_at": { "$lte": 200 },
            })
        );
    }

    #[test]
    fn test_unspecified_operator_defaults_to_equality() {
        let mapping: FieldMapping =
            serde_json::from_value(json!({"name": {"field": "name"}})).unwrap();
        let filter = Query::new(1, 10)
            .filter_by("name", json!("uio"))
            .mark_filtered(&mapping)
            .unwrap();
        assert_eq!(filter, doc! { "name": { "$eq": "uio" } });
    }

    #[test]
    fn test_same_field_ranges_merge() {
        let query = Query::new(1, 10)
            .filter_by("minAge", json!(18))
            .filter_by("maxAge", json!(65));
        let filter = query.mark_filtered(&mapping()).unwrap();
        assert_eq!(as_json(filter), json!({ "age": { "$gte": 18, "$lt": 65 } }));
    }

    #[test]
    fn test_null_and_exists() {
        let query = Query::new(1, 10)
            .filter_by("deleted", json!("ignored"))
            .filter_by("email", json!(false));
        let filter = query.mark_filtered(&mapping()).unwrap();
        assert_eq!(
            filter,
            doc! {
                "deleted_at": { "$eq": null },
                "email": { "$exists": false },
            }
        );

        let filter = Query::new(1, 10)
            .filter_by("email", json!(null))
            .mark_filtered(&mapping())
            .unwrap();
        assert_eq!(filter, doc! { "email": { "$exists": true } });
    }

    #[test]
    fn test_exists_rejects_non_boolean() {
        for value in [json!("false"), json!(0), json!({"a": 1})] {
            let result = Query::new(1, 10)
                .filter_by("email", value)
                .mark_filtered(&mapping());
            assert!(matches!(result, Err(AppError::BadRequest(_))));
        }
    }

    #[test]
    fn test_extended_json_object_id() {
        let oid = ObjectId::new();
        let filter = Query::new(1, 10)
            .filter_by("owner", json!({ "$oid": oid.to_hex() }))
            .mark_filtered(&mapping())
            .unwrap();
        assert_eq!(filter, doc! { "owner_id": { "$eq": oid } });
    }

    #[test]
    fn test_sort_combines_in_order() {
        let query = Query::new(1, 10)
            .sort_by("firstName", false)
            .sort_by("nickname", true)
            .sort_by("minAge", true);
        let sort = query.mark_sort(&mapping()).unwrap();
        assert_eq!(sort, doc! { "first_name": 1, "age": -1 });
        let keys: Vec<&String> = sort.keys().collect();
        assert_eq!(keys, vec!["first_name", "age"]);
    }

    #[test]
    fn test_sort_without_mapped_keys() {
        assert!(Query::new(1, 10).mark_sort(&mapping()).is_none());
        assert!(Query::new(1, 10)
            .sort_by("nickname", true)
            .mark_sort(&mapping())
            .is_none());
    }

    #[test]
    fn test_mark_page() {
        let page = Query::new(2, 5).mark_page();
        assert_eq!(page.limit(), (5, 5));
    }
}
