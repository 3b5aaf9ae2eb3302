pub mod claims;
pub mod error;
pub mod exchange;
pub mod factory;
pub mod idp;
pub mod issuer;
pub mod local;
pub mod policy;
pub mod verifier;

pub use claims::Claims;
pub use error::AuthError;
pub use exchange::TokenExchange;
pub use factory::{build_exchange, build_verifier};
pub use idp::{ExternalIdpVerifier, HttpIdentityProvider, IdentityProvider, IdpClaims, IdpError};
pub use issuer::{IssuedToken, LocalTokenIssuer};
pub use local::LocalTokenVerifier;
pub use policy::{RoleRule, RouteClass, RoutePolicy};
pub use verifier::{CredentialVerifier, VerificationError};
