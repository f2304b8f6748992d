//! Authentication-related models

use serde::{Deserialize, Serialize};

/// Sign-in response
#[derive(Debug, Serialize, Deserialize)]
pub struct SignInResponse {
    pub token: String,
}
