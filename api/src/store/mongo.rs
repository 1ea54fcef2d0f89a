use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions, ServerApi, ServerApiVersion},
    Client, Collection, Database, IndexModel,
};

use super::{ProductStore, Registration, StoreError, UpdateSummary, UserStore};
use crate::catalog::{Facets, ProductFilter, ProductQuery};
use crate::models::{product::Product, user::User};

const USERS: &str = "users";
const PRODUCTS: &str = "products";
const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed store. Cheap to clone; the driver pools connections.
///
/// The client runs with Stable API v1 in strict mode, so every command issued
/// here must belong to that API (`aggregate` rather than `distinct`).
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
    users: Collection<User>,
    products: Collection<Product>,
    email_index_ready: Arc<AtomicBool>,
}

impl MongoStore {
    /// Builds a client for `uri`. No round trip happens here; see [`Self::prepare`].
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some("gadget-shop".to_string());
        options.server_api = Some(
            ServerApi::builder()
                .version(ServerApiVersion::V1)
                .strict(true)
                .deprecation_errors(true)
                .build(),
        );

        let client = Client::with_options(options)?;
        Ok(Self::new(client.database(db_name)))
    }

    pub fn new(db: Database) -> Self {
        Self {
            users: db.collection(USERS),
            products: db.collection(PRODUCTS),
            db,
            email_index_ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Pings the deployment and makes sure `users.email` is unique.
    pub async fn prepare(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        self.ensure_email_index().await
    }

    /// Creates the unique email index once; later calls are free.
    /// `createIndexes` is idempotent, so a failed attempt is simply retried
    /// by the next caller.
    async fn ensure_email_index(&self) -> Result<(), StoreError> {
        if self.email_index_ready.load(Ordering::Acquire) {
            return Ok(());
        }
        self.users.create_index(email_unique_index()).await?;
        self.email_index_ready.store(true, Ordering::Release);
        tracing::info!("unique index on users.email is in place");
        Ok(())
    }
}

fn email_unique_index() -> IndexModel {
    IndexModel::builder()
        .keys(doc! { "email": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn email_filter(email: &str) -> Document {
    doc! { "email": email }
}

fn add_to_wishlist_update(product: ObjectId) -> Document {
    doc! { "$addToSet": { "wishlist": product } }
}

fn remove_from_wishlist_update(product: ObjectId) -> Document {
    doc! { "$pull": { "wishlist": product } }
}

fn ids_filter(ids: &[ObjectId]) -> Document {
    doc! { "_id": { "$in": ids.to_vec() } }
}

/// Single `$group` over the whole collection collecting both facet sets.
fn facet_pipeline() -> Vec<Document> {
    vec![doc! {
        "$group": {
            "_id": Bson::Null,
            "brands": { "$addToSet": "$brand" },
            "categories": { "$addToSet": "$category" },
        }
    }]
}

/// Reads the `$group` output. An empty collection yields no document.
fn facets_from_group(group: Option<Document>) -> Facets {
    let Some(group) = group else {
        return Facets::default();
    };
    let values = |key: &str| group.get_array(key).map(|a| a.clone()).unwrap_or_default();

    Facets::collect(strings(values("brands")), strings(values("categories")))
}

fn is_duplicate_key(kind: &ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

fn strings(values: Vec<Bson>) -> impl Iterator<Item = String> {
    values.into_iter().filter_map(|value| match value {
        Bson::String(s) => Some(s),
        _ => None,
    })
}

fn summary(result: mongodb::results::UpdateResult) -> UpdateSummary {
    UpdateSummary {
        matched_count: result.matched_count,
        modified_count: result.modified_count,
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.find_one(email_filter(email)).await?)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>, StoreError> {
        Ok(self.users.find_one(doc! { "_id": id }).await?)
    }

    async fn register(&self, mut user: User) -> Result<Registration, StoreError> {
        // without the unique index an insert could duplicate an email
        if let Err(e) = self.ensure_email_index().await {
            tracing::warn!("refusing registration, email index unavailable: {}", e);
            return Err(StoreError::Offline(format!(
                "unique email index unavailable: {e}"
            )));
        }

        let id = ObjectId::new();
        user.id = Some(id);

        match self.users.insert_one(&user).await {
            Ok(_) => Ok(Registration::Created(id)),
            Err(e) if is_duplicate_key(&e.kind) => Ok(Registration::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    async fn add_to_wishlist(
        &self,
        email: &str,
        product: ObjectId,
    ) -> Result<UpdateSummary, StoreError> {
        let result = self
            .users
            .update_one(email_filter(email), add_to_wishlist_update(product))
            .await?;

        Ok(summary(result))
    }

    async fn remove_from_wishlist(
        &self,
        email: &str,
        product: ObjectId,
    ) -> Result<UpdateSummary, StoreError> {
        let result = self
            .users
            .update_one(email_filter(email), remove_from_wishlist_update(product))
            .await?;

        Ok(summary(result))
    }
}

#[async_trait]
impl ProductStore for MongoStore {
    async fn find_page(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        let cursor = self
            .products
            .find(query.filter.to_document())
            .sort(query.sort.to_document())
            .skip(query.page.skip())
            .limit(query.page.limit())
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn count(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        Ok(self.products.count_documents(filter.to_document()).await?)
    }

    async fn facets(&self) -> Result<Facets, StoreError> {
        let mut cursor = self.products.aggregate(facet_pipeline()).await?;
        let group = cursor.try_next().await?;

        Ok(facets_from_group(group))
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Product>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self.products.find(ids_filter(ids)).await?;

        Ok(cursor.try_collect().await?)
    }

    async fn insert(&self, mut product: Product) -> Result<ObjectId, StoreError> {
        let id = ObjectId::new();
        product.id = Some(id);
        self.products.insert_one(&product).await?;

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use mongodb::error::WriteError;

    fn write_error(code: i32) -> ErrorKind {
        let write: WriteError = mongodb::bson::from_document(doc! {
            "code": code,
            "codeName": "DuplicateKey",
            "errmsg": "E11000 duplicate key error collection: gadgetShop.users",
        })
        .unwrap();
        ErrorKind::Write(WriteFailure::WriteError(write))
    }

    #[test]
    fn duplicate_key_write_is_a_conflict() {
        assert!(is_duplicate_key(&write_error(11000)));
        assert!(!is_duplicate_key(&write_error(121)));
    }

    #[test]
    fn facet_pipeline_groups_the_whole_collection() {
        let pipeline = facet_pipeline();
        assert_eq!(pipeline.len(), 1);
        assert_eq!(
            pipeline[0],
            doc! {
                "$group": {
                    "_id": Bson::Null,
                    "brands": { "$addToSet": "$brand" },
                    "categories": { "$addToSet": "$category" },
                }
            }
        );
        // no $match stage: facets ignore the listing filter
        assert!(!pipeline[0].contains_key("$match"));
    }

    #[test]
    fn facets_from_group_keeps_strings_only() {
        let group = doc! {
            "_id": Bson::Null,
            "brands": ["Sony", "Apple", Bson::Null, 7_i32],
            "categories": ["Phone", "Audio"],
        };
        let facets = facets_from_group(Some(group));
        assert_eq!(facets.brands, vec!["Apple", "Sony"]);
        assert_eq!(facets.categories, vec!["Audio", "Phone"]);

        assert_eq!(facets_from_group(None), Facets::default());
    }

    #[test]
    fn wishlist_updates_use_set_operators() {
        let product = ObjectId::new();
        assert_eq!(
            add_to_wishlist_update(product),
            doc! { "$addToSet": { "wishlist": product } }
        );
        assert_eq!(
            remove_from_wishlist_update(product),
            doc! { "$pull": { "wishlist": product } }
        );
        assert_eq!(email_filter("a@x.com"), doc! { "email": "a@x.com" });
    }

    #[test]
    fn ids_filter_uses_in() {
        let ids = vec![ObjectId::new(), ObjectId::new()];
        assert_eq!(
            ids_filter(&ids),
            doc! { "_id": { "$in": [ids[0], ids[1]] } }
        );
    }

    #[test]
    fn email_index_is_unique() {
        let index = email_unique_index();
        assert_eq!(index.keys, doc! { "email": 1 });
        assert_eq!(index.options.and_then(|o| o.unique), Some(true));
    }

    #[tokio::test]
    async fn registration_is_refused_without_the_email_index() {
        let store = MongoStore::connect(
            "mongodb://127.0.0.1:9/?serverSelectionTimeoutMS=200&connectTimeoutMS=200",
            "gadgetShopTest",
        )
        .await
        .unwrap();

        let user = User {
            id: None,
            email: "a@x.com".to_string(),
            role: Role::Buyer,
            wishlist: Vec::new(),
            profile: Document::new(),
        };
        let result = store.register(user).await;

        assert!(matches!(result, Err(StoreError::Offline(_))));
        assert!(!store.email_index_ready.load(Ordering::Acquire));
    }
}
