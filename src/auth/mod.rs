mod helpers;
mod middleware;
mod provider;
mod token;

pub use middleware::{AuthError, RequireSession};
pub use provider::{IdentityProvider, IssuedToken, LocalIdentityProvider};
pub use token::{SecretHasher, TokenGenerator, parse_token};
