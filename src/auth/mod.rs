//! Authentication module

pub mod basic;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod session;
pub mod token;

pub use basic::BasicCredentials;
pub use jwt::{Claims, JwtService};
pub use middleware::{extract_token, login_required, logout_required, AuthContext, AUTH_TOKEN_HEADER};
pub use password::PasswordHasher;
pub use session::SessionTokens;
pub use token::{TokenError, TokenService, VerifiedToken};
