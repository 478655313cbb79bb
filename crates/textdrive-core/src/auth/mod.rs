pub mod authorizer;
pub mod model;

pub use authorizer::Authorizer;
pub use model::{AccessToken, AuthConfig, AuthRequest, AuthState, IDENTITY_SCOPE};
