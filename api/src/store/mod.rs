//! Document store access.
//!
//! Handlers only see the [`UserStore`] and [`ProductStore`] traits; the
//! process wires in [`mongo::MongoStore`], tests use [`memory::MemoryStore`].

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use thiserror::Error;

use crate::catalog::{Facets, ProductFilter, ProductQuery};
use crate::models::{product::Product, user::User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),

    #[error("Store offline: {0}")]
    Offline(String),
}

/// Result of a create-if-absent insert keyed on email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created(ObjectId),
    AlreadyExists,
}

/// Counts reported by a single-document update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    pub matched_count: u64,
    pub modified_count: u64,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>, StoreError>;

    /// Inserts `user` unless one with the same email exists. Uniqueness must
    /// be enforced by the store itself, not by a prior read.
    async fn register(&self, user: User) -> Result<Registration, StoreError>;

    /// Adds `product` to the wishlist unless already present.
    async fn add_to_wishlist(
        &self,
        email: &str,
        product: ObjectId,
    ) -> Result<UpdateSummary, StoreError>;

    /// Removes every occurrence of `product` from the wishlist.
    async fn remove_from_wishlist(
        &self,
        email: &str,
        product: ObjectId,
    ) -> Result<UpdateSummary, StoreError>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// One page of products matching the filter, sorted by price.
    async fn find_page(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError>;

    async fn count(&self, filter: &ProductFilter) -> Result<u64, StoreError>;

    /// Distinct brands and categories over the whole collection.
    async fn facets(&self) -> Result<Facets, StoreError>;

    async fn find_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Product>, StoreError>;

    async fn insert(&self, product: Product) -> Result<ObjectId, StoreError>;
}
