//! 数据模型模块

pub mod auth;
pub mod user;
pub mod video;
