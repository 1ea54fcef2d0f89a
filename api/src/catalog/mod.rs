//! Product listing: request parameters to store query, plus facets.
//!
//! The same [`ProductFilter`] drives both backends. MongoDB receives it as a
//! filter document via [`ProductFilter::to_document`]; the in-memory store
//! evaluates [`ProductFilter::matches`] directly. Both must agree.
//!
//! Facets are computed over the whole collection on every call, so listing
//! cost grows with the catalog regardless of the filter. Precompute them if
//! that starts to matter.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::product::{Product, ProductResponse};
use crate::store::{ProductStore, StoreError};

pub const MAX_PAGE_SIZE: u64 = 100;

/// Raw query string of `GET /all-porducts`. Everything is optional and kept
/// as text so malformed numbers surface as validation errors.
#[derive(Debug, Default, Deserialize)]
pub struct ListingParams {
    pub title: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive substring of `title`.
    pub title: Option<String>,
    /// Case-insensitive substring of `category`.
    pub category: Option<String>,
    /// Exact `brand`.
    pub brand: Option<String>,
}

impl ProductFilter {
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if let Some(title) = &self.title {
            filter.insert("title", contains_ignore_case(title));
        }
        if let Some(category) = &self.category {
            filter.insert("category", contains_ignore_case(category));
        }
        if let Some(brand) = &self.brand {
            filter.insert("brand", brand.as_str());
        }
        filter
    }

    pub fn matches(&self, product: &Product) -> bool {
        let title_ok = self
            .title
            .as_deref()
            .map_or(true, |needle| contains_folded(&product.title, needle));
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |needle| contains_folded(&product.category, needle));
        let brand_ok = self
            .brand
            .as_deref()
            .map_or(true, |brand| product.brand == brand);

        title_ok && category_ok && brand_ok
    }
}

fn contains_ignore_case(needle: &str) -> Document {
    doc! { "$regex": regex::escape(needle), "$options": "i" }
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Price ordering. Anything but `asc` sorts descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("asc") => SortOrder::Ascending,
            _ => SortOrder::Descending,
        }
    }

    pub fn direction(self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }

    pub fn to_document(self) -> Document {
        doc! { "price": self.direction() }
    }

    pub fn compare_prices(self, a: f64, b: f64) -> Ordering {
        match self {
            SortOrder::Ascending => a.total_cmp(&b),
            SortOrder::Descending => b.total_cmp(&a),
        }
    }
}

/// 1-based page of `size` products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u64,
    pub size: u64,
}

impl Page {
    pub fn skip(&self) -> u64 {
        self.number.saturating_sub(1).saturating_mul(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::try_from(self.size).unwrap_or(i64::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub sort: SortOrder,
    pub page: Page,
}

impl ProductQuery {
    pub fn from_params(params: ListingParams, default_page_size: u64) -> Result<Self, AppError> {
        let filter = ProductFilter {
            title: present(params.title),
            category: present(params.category),
            brand: present(params.brand),
        };
        let sort = SortOrder::parse(params.sort.as_deref());

        let number = parse_positive("page", params.page)?.unwrap_or(1);
        let size = parse_positive("limit", params.limit)?
            .unwrap_or(default_page_size)
            .clamp(1, MAX_PAGE_SIZE);

        // the skip must fit the store's signed 64-bit field
        let fits = (number - 1)
            .checked_mul(size)
            .is_some_and(|skip| i64::try_from(skip).is_ok());
        if !fits {
            return Err(AppError::Validation("page is out of range".to_string()));
        }

        Ok(Self {
            filter,
            sort,
            page: Page { number, size },
        })
    }
}

/// Search text is used verbatim; only an empty string means "no constraint".
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_positive(field: &str, raw: Option<String>) -> Result<Option<u64>, AppError> {
    let Some(raw) = raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<u64>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(AppError::Validation(format!(
            "{field} must be a positive integer"
        ))),
    }
}

/// Distinct brands and categories across every product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    pub brands: Vec<String>,
    pub categories: Vec<String>,
}

impl Facets {
    pub fn collect<B, C>(brands: B, categories: C) -> Self
    where
        B: IntoIterator<Item = String>,
        C: IntoIterator<Item = String>,
    {
        Self {
            brands: distinct(brands),
            categories: distinct(categories),
        }
    }
}

fn distinct(values: impl IntoIterator<Item = String>) -> Vec<String> {
    values
        .into_iter()
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    pub products: Vec<ProductResponse>,
    pub brands: Vec<String>,
    pub categories: Vec<String>,
    pub total_products: u64,
}

/// Runs the page query, the count and the facet scan, in that order.
pub async fn list_products(
    store: &dyn ProductStore,
    query: &ProductQuery,
) -> Result<ProductListing, StoreError> {
    let products = store.find_page(query).await?;
    let total_products = store.count(&query.filter).await?;
    let facets = store.facets().await?;

    tracing::debug!(
        returned = products.len(),
        total_products,
        page = query.page.number,
        "listed products"
    );

    Ok(ProductListing {
        products: products.into_iter().map(ProductResponse::from).collect(),
        brands: facets.brands,
        categories: facets.categories,
        total_products,
    })
}
