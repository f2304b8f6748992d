//! Business logic services layer

pub mod auth_service;
pub mod permission_service;
pub mod user_service;
pub mod video_service;

pub use auth_service::AuthService;
pub use permission_service::{authorize, require, Action, Decision};
pub use user_service::UserService;
pub use video_service::VideoService;
