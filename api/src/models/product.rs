use mongodb::bson::{oid::ObjectId, Document};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

/// A product document as stored in the `products` collection.
///
/// The listing fields are typed; anything else a seller submits rides along
/// in `details` untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub price: f64,
    #[serde(flatten)]
    pub details: Document,
}

/// Submission payload for `POST /add-porduct`.
#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub brand: String,
    pub price: Option<f64>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl CreateProduct {
    pub fn into_product(mut self) -> Result<Product, AppError> {
        let title = required("title", &self.title)?;
        let category = required("category", &self.category)?;
        let brand = required("brand", &self.brand)?;
        let price = match self.price {
            Some(price) if price.is_finite() && price >= 0.0 => price,
            Some(_) => {
                return Err(AppError::Validation(
                    "price must be a non-negative number".to_string(),
                ))
            }
            None => return Err(AppError::Validation("price is required".to_string())),
        };

        self.details.remove("_id");
        let details = mongodb::bson::to_document(&self.details)
            .map_err(|e| AppError::Validation(format!("invalid product fields: {e}")))?;

        Ok(Product {
            id: None,
            title,
            category,
            brand,
            price,
            details,
        })
    }
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub category: String,
    pub brand: String,
    pub price: f64,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.map(|id| id.to_hex()),
            title: product.title,
            category: product.category,
            brand: product.brand,
            price: product.price,
            details: super::document_to_json(product.details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn submission_keeps_seller_fields() {
        let payload: CreateProduct = serde_json::from_value(json!({
            "title": "Pixel 8",
            "category": "Phone",
            "brand": "Google",
            "price": 599,
            "image": "https://img.example/pixel.png",
            "sellerEmail": "s@x.com"
        }))
        .unwrap();

        let product = payload.into_product().unwrap();
        assert_eq!(product.price, 599.0);
        assert_eq!(product.details.get_str("sellerEmail").unwrap(), "s@x.com");
        assert!(product.id.is_none());
    }

    #[test]
    fn submission_requires_listing_fields() {
        let missing_brand: CreateProduct = serde_json::from_value(json!({
            "title": "Pixel 8", "category": "Phone", "price": 1
        }))
        .unwrap();
        assert!(matches!(
            missing_brand.into_product(),
            Err(AppError::Validation(msg)) if msg.contains("brand")
        ));

        let negative: CreateProduct = serde_json::from_value(json!({
            "title": "Pixel 8", "category": "Phone", "brand": "Google", "price": -3
        }))
        .unwrap();
        assert!(negative.into_product().is_err());
    }

    #[test]
    fn response_flattens_details() {
        let product = Product {
            id: Some(ObjectId::new()),
            title: "Pixel 8".to_string(),
            category: "Phone".to_string(),
            brand: "Google".to_string(),
            price: 599.0,
            details: mongodb::bson::doc! { "image": "p.png" },
        };

        let body = serde_json::to_value(ProductResponse::from(product)).unwrap();
        assert_eq!(body["image"], "p.png");
        assert_eq!(body["price"], 599.0);
    }
}
