//! Token issuance/refresh (`token`) and API-key generation/verification
//! (`apikey`), per spec.md §4.9.

pub mod apikey;
pub mod token;

pub use apikey::ApiKeyService;
pub use token::{Claims, IssuedTokens, TokenConfig, TokenKind, TokenService};
