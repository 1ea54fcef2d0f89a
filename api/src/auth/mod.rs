mod extract;
mod token;

pub use extract::{authorize_seller, bearer_token, AuthUser, RequireSeller};
pub use token::{Claims, JwtKeys, TOKEN_TTL_DAYS};
