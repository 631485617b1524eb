//! `doorman-auth` — token issuance/verification/revocation and the
//! authorization guard that gates every protected endpoint.
//!
//! This crate is intentionally decoupled from HTTP and storage: the
//! credential and revocation stores are injected behind traits.

pub mod claims;
pub mod guard;
pub mod principal;
pub mod store;
pub mod token;

pub use claims::{TokenClaims, WindowError, validate_window};
pub use guard::{GuardError, Policy, authorize};
pub use principal::{Principal, Role, UserId};
pub use store::{CredentialStore, RevocationStore, StoreError};
pub use token::{TokenError, TokenService};
