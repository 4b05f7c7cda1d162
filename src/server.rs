//! HTTP surface over the repositories of the configured collections
//!
//! ```text
//! GET   /health
//! POST  /collections/{name}          save
//! GET   /collections/{name}/{id}     read by id
//! PATCH /collections/{name}/{id}     update
//! POST  /collections/{name}/search   descriptor query
//! ```

use crate::engine::MongoEngine;
use crate::error::{AppError, AppResult};
use crate::logging::logging_middleware;
use crate::repository::{id_to_string, parse_id, BaseRepository};
use crate::search::{FieldMapping, Query};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use mongodb::bson::{doc, Bson, Document};
use mongodb::Database;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub struct AppState {
    pub database: Database,
    pub repositories: HashMap<String, BaseRepository>,
}

impl AppState {
    /// One repository per collection, each with its own field mapping
    pub fn new(database: Database, collections: &HashMap<String, FieldMapping>) -> Self {
        let repositories = collections
            .iter()
            .map(|(name, mapping)| {
                (
                    name.clone(),
                    BaseRepository::new(database.clone(), mapping.clone()),
                )
            })
            .collect();
        Self {
            database,
            repositories,
        }
    }

    fn repository(&self, name: &str) -> AppResult<&BaseRepository> {
        self.repositories
            .get(name)
            .ok_or_else(|| AppError::NotFound(format!("Unknown collection: {}", name)))
    }
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/collections/{name}", post(save_record))
        .route("/collections/{name}/search", post(search_records))
        .route(
            "/collections/{name}/{id}",
            get(read_record).patch(update_record),
        )
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

async fn health(State(state): State<SharedState>) -> AppResult<Json<Value>> {
    MongoEngine::ping(&state.database).await?;
    Ok(Json(json!({
        "status": "ok",
        "database": state.database.name()
    })))
}

async fn save_record(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let repository = state.repository(&name)?;
    let record = to_document(body)?;
    let id = repository.save(&name, &record).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id_to_string(&id) }))))
}

async fn read_record(
    State(state): State<SharedState>,
    Path((name, id)): Path<(String, String)>,
) -> AppResult<Json<Value>> {
    let repository = state.repository(&name)?;
    let record: Document = repository.read_by_id(&name, parse_id(&id)).await?;
    Ok(Json(Bson::Document(record).into_relaxed_extjson()))
}

async fn update_record(
    State(state): State<SharedState>,
    Path((name, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    let repository = state.repository(&name)?;
    let update = as_update(to_document(body)?)?;
    let modified = repository.update(&name, parse_id(&id), update).await?;
    Ok(Json(json!({ "modified": modified })))
}

async fn search_records(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(query): Json<Query>,
) -> AppResult<Json<Value>> {
    let repository = state.repository(&name)?;
    let (page, list) = repository.query::<Document>(&query, &name).await?;
    let list: Vec<Value> = list
        .into_iter()
        .map(|record| Bson::Document(record).into_relaxed_extjson())
        .collect();
    Ok(Json(json!({ "page": page, "list": list })))
}

/// Convert a JSON body into a document, honouring extended JSON ({"$oid": ..})
fn to_document(body: Value) -> AppResult<Document> {
    let bson = Bson::try_from(body).map_err(|e| AppError::BadRequest(e.to_string()))?;
    match bson {
        Bson::Document(document) => Ok(document),
        other => Err(AppError::BadRequest(format!(
            "Expected a JSON object, got {:?}",
            other.element_type()
        ))),
    }
}

/// Plain field/value bodies become a `$set`; operator documents pass through.
///
/// Bodies mixing operators and plain fields are rejected.
fn as_update(body: Document) -> AppResult<Document> {
    let operators = body.keys().filter(|k| k.starts_with('$')).count();
    if operators == 0 {
        Ok(doc! { "$set": body })
    } else if operators == body.len() {
        Ok(body)
    } else {
        Err(AppError::BadRequest(
            "Update body mixes operators with plain fields".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::Operator;
    use axum_test::TestServer;

    async fn test_server() -> TestServer {
        // Nothing listens on port 1; requests that reach the driver fail fast
        let client =
            mongodb::Client::with_uri_str("mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200")
                .await
                .unwrap();
        let collections = HashMap::from([(
            "users".to_string(),
            FieldMapping::new()
                .with("name", "name", Operator::Like)
                .with("owner", "owner_id", Operator::Eq),
        )]);
        let state = Arc::new(AppState::new(client.database("app"), &collections));
        TestServer::new(router(state)).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_collection_is_not_found() {
        let server = test_server().await;

        let response = server
            .post("/collections/orders/search")
            .json(&json!({"page": 1, "pageSize": 10}))
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["status"], 404);

        let response = server.post("/collections/orders").json(&json!({"a": 1})).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

        let response = server.get("/collections/orders/abc").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_descriptor_is_rejected() {
        let server = test_server().await;
        let response = server
            .post("/collections/users/search")
            .json(&json!({"page": "first"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_invalid_filter_value_is_bad_request() {
        let server = test_server().await;
        let response = server
            .post("/collections/users/search")
            .json(&json!({
                "page": 1,
                "pageSize": 10,
                "filtered": [{"id": "owner", "value": {"$oid": "not-an-object-id"}}]
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_body_must_be_object() {
        let server = test_server().await;
        let response = server
            .patch("/collections/users/abc")
            .json(&json!(["name", "x"]))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_reports_unreachable_database() {
        let server = test_server().await;
        let response = server.get("/health").await;
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_as_update() {
        assert_eq!(
            as_update(doc! { "name": "123456" }).unwrap(),
            doc! { "$set": { "name": "123456" } }
        );
        assert_eq!(
            as_update(doc! { "$inc": { "age": 1 } }).unwrap(),
            doc! { "$inc": { "age": 1 } }
        );
        assert!(matches!(
            as_update(doc! { "$inc": { "age": 1 }, "name": "x" }),
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_mixed_update_body_is_bad_request() {
        let server = test_server().await;
        let response = server
            .patch("/collections/users/abc")
            .json(&json!({"$inc": {"age": 1}, "name": "x"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_huge_page_reaches_database_without_panicking() {
        let server = test_server().await;
        let response = server
            .post("/collections/users/search")
            .json(&json!({"page": i64::MAX, "pageSize": i64::MAX}))
            .await;
        // the query itself runs; only the unreachable database fails it
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
