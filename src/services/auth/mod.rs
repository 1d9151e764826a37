pub mod access_jwt;
pub mod controller;
pub mod factory;
pub mod principal;

pub use access_jwt::{JwtVerifier, TokenVerifier, VerifyError};
pub use controller::{AccessController, AuthorizationError, RoleRequirements};
pub use factory::build_access_controller;
pub use principal::Principal;
