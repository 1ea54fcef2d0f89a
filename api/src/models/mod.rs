pub mod product;
pub mod user;

use mongodb::bson::{oid::ObjectId, Bson, Document};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::AppError;

/// Parses a 24-character hex id supplied by a client.
pub fn parse_object_id(field: &str, raw: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw.trim())
        .map_err(|_| AppError::Validation(format!("{field} is not a valid id")))
}

/// Renders stored extra fields as plain JSON (relaxed extended JSON).
pub(crate) fn document_to_json(doc: Document) -> Map<String, Value> {
    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Outcome of a single-document insert.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResponse {
    pub acknowledged: bool,
    pub inserted_id: String,
}

impl From<ObjectId> for InsertResponse {
    fn from(id: ObjectId) -> Self {
        Self {
            acknowledged: true,
            inserted_id: id.to_hex(),
        }
    }
}
