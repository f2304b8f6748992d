//! 权限判定
//!
//! 规则：管理员总是放行；归属类操作在调用者即资源所有者时放行；
//! 仅管理员操作没有所有者兜底。未认证一律拒绝。

use crate::{auth::AuthContext, error::AppError};
use uuid::Uuid;

/// 需要授权的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    UpdateUser,
    DeleteUser,
    /// 修改账户的管理员标记
    GrantAdmin,
    ListUsers,
    UserStats,
    CreateVideo,
    UpdateVideo,
    DeleteVideo,
    ListVideos,
    VideoStats,
}

impl Action {
    pub fn is_admin_only(self) -> bool {
        match self {
            Action::UpdateUser | Action::DeleteUser | Action::UpdateVideo | Action::DeleteVideo => {
                false
            }
            Action::GrantAdmin
            | Action::ListUsers
            | Action::UserStats
            | Action::CreateVideo
            | Action::ListVideos
            | Action::VideoStats => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::UpdateUser => "user.update",
            Action::DeleteUser => "user.delete",
            Action::GrantAdmin => "user.grant_admin",
            Action::ListUsers => "user.list",
            Action::UserStats => "user.stats",
            Action::CreateVideo => "video.create",
            Action::UpdateVideo => "video.update",
            Action::DeleteVideo => "video.delete",
            Action::ListVideos => "video.list",
            Action::VideoStats => "video.stats",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// 纯函数判定，不会失败
pub fn authorize(identity: Option<&AuthContext>, action: Action, owner_id: Option<Uuid>) -> Decision {
    let Some(identity) = identity else {
        return Decision::Deny;
    };

    if identity.is_admin {
        return Decision::Allow;
    }

    if !action.is_admin_only() && owner_id == Some(identity.user_id) {
        return Decision::Allow;
    }

    Decision::Deny
}

/// 判定并在拒绝时返回 Forbidden
pub fn require(identity: &AuthContext, action: Action, owner_id: Option<Uuid>) -> Result<(), AppError> {
    match authorize(Some(identity), action, owner_id) {
        Decision::Allow => Ok(()),
        Decision::Deny => {
            tracing::warn!(
                user_id = %identity.user_id,
                action = action.as_str(),
                owner_id = ?owner_id,
                "Permission denied"
            );
            Err(AppError::Forbidden)
        }
    }
}
