use mongodb::bson::{oid::ObjectId, Document};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

/// Account role. Only sellers may submit products.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    Seller,
    #[default]
    Buyer,
}

impl From<String> for Role {
    // unknown or legacy values ("ordinary") are plain buyers
    fn from(raw: String) -> Self {
        if raw.trim().eq_ignore_ascii_case("seller") {
            Role::Seller
        } else {
            Role::Buyer
        }
    }
}

/// A user document as stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub wishlist: Vec<ObjectId>,
    /// Profile fields supplied at registration (name, photo, ...).
    #[serde(flatten)]
    pub profile: Document,
}

impl User {
    pub fn is_seller(&self) -> bool {
        self.role == Role::Seller
    }
}

/// Registration payload for `POST /users`.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl CreateUser {
    pub fn into_user(mut self) -> Result<User, AppError> {
        let email = validate_email(&self.email)?;
        // server-owned fields
        self.profile.remove("_id");
        self.profile.remove("wishlist");
        let profile = mongodb::bson::to_document(&self.profile)
            .map_err(|e| AppError::Validation(format!("invalid profile fields: {e}")))?;

        Ok(User {
            id: None,
            email,
            role: self.role,
            wishlist: Vec::new(),
            profile,
        })
    }
}

/// Trims and checks an email supplied in a request body.
pub fn validate_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(AppError::Validation("email is required".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::Validation("email is malformed".to_string()));
    }
    Ok(email.to_string())
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub email: String,
    pub role: Role,
    pub wishlist: Vec<String>,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()),
            email: user.email,
            role: user.role,
            wishlist: user.wishlist.iter().map(|id| id.to_hex()).collect(),
            profile: super::document_to_json(user.profile),
        }
    }
}
