//! In-process store with the same semantics as the MongoDB backend.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use super::{ProductStore, Registration, StoreError, UpdateSummary, UserStore};
use crate::catalog::{Facets, ProductFilter, ProductQuery};
use crate::models::{product::Product, user::User};

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    products: RwLock<Vec<Product>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail as if the store were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Offline("memory store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check()?;
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>, StoreError> {
        self.check()?;
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == Some(id)).cloned())
    }

    async fn register(&self, mut user: User) -> Result<Registration, StoreError> {
        self.check()?;
        // the existence check and the push happen under one write lock
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Ok(Registration::AlreadyExists);
        }

        let id = ObjectId::new();
        user.id = Some(id);
        users.push(user);
        Ok(Registration::Created(id))
    }

    async fn add_to_wishlist(
        &self,
        email: &str,
        product: ObjectId,
    ) -> Result<UpdateSummary, StoreError> {
        self.check()?;
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.email == email) else {
            return Ok(UpdateSummary::default());
        };

        let modified = !user.wishlist.contains(&product);
        if modified {
            user.wishlist.push(product);
        }
        Ok(UpdateSummary {
            matched_count: 1,
            modified_count: u64::from(modified),
        })
    }

    async fn remove_from_wishlist(
        &self,
        email: &str,
        product: ObjectId,
    ) -> Result<UpdateSummary, StoreError> {
        self.check()?;
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.email == email) else {
            return Ok(UpdateSummary::default());
        };

        let before = user.wishlist.len();
        user.wishlist.retain(|id| *id != product);
        Ok(UpdateSummary {
            matched_count: 1,
            modified_count: u64::from(user.wishlist.len() != before),
        })
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn find_page(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        self.check()?;
        let products = self.products.read().await;
        let mut matching: Vec<&Product> = products
            .iter()
            .filter(|p| query.filter.matches(p))
            .collect();
        matching.sort_by(|a, b| query.sort.compare_prices(a.price, b.price));

        let skip = usize::try_from(query.page.skip()).unwrap_or(usize::MAX);
        let take = usize::try_from(query.page.size).unwrap_or(usize::MAX);
        Ok(matching.into_iter().skip(skip).take(take).cloned().collect())
    }

    async fn count(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        self.check()?;
        let products = self.products.read().await;
        Ok(products.iter().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn facets(&self) -> Result<Facets, StoreError> {
        self.check()?;
        let products = self.products.read().await;
        Ok(Facets::collect(
            products.iter().map(|p| p.brand.clone()),
            products.iter().map(|p| p.category.clone()),
        ))
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Product>, StoreError> {
        self.check()?;
        let products = self.products.read().await;
        Ok(products
            .iter()
            .filter(|p| p.id.is_some_and(|id| ids.contains(&id)))
            .cloned()
            .collect())
    }

    async fn insert(&self, mut product: Product) -> Result<ObjectId, StoreError> {
        self.check()?;
        let id = ObjectId::new();
        product.id = Some(id);
        self.products.write().await.push(product);
        Ok(id)
    }
}
