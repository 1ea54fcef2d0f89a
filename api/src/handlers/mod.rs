pub mod auth;
pub mod products;
pub mod users;
pub mod wishlist;

pub async fn liveness() -> &'static str {
    "gadget shop server is running"
}
