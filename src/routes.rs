//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::{
    auth::{login_required, logout_required},
    error::AppError,
    handlers,
    middleware::AppState,
};

/// 请求体上限
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_service = state.auth_service.clone();

    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 仅限未登录调用者（注册、登录）
    let guest_routes = Router::new()
        .route("/users/signUp", post(handlers::user::sign_up))
        .route("/auth/signIn", get(handlers::auth::sign_in))
        .route_layer(axum::middleware::from_fn_with_state(
            auth_service.clone(),
            logout_required,
        ));

    // 需要认证的路由
    let authenticated_routes = Router::new()
        .route("/auth/signOut", get(handlers::auth::sign_out))
        // 用户
        .route("/users/me", get(handlers::user::me))
        .route("/users/all", get(handlers::user::list_users))
        .route("/users/stats", get(handlers::user::user_stats))
        .route(
            "/users/{id}",
            put(handlers::user::update_user).delete(handlers::user::delete_user),
        )
        // 视频
        .route("/videos", post(handlers::video::create_video))
        .route("/videos/me", get(handlers::video::my_videos))
        .route("/videos/all", get(handlers::video::list_videos))
        .route("/videos/stats", get(handlers::video::video_stats))
        .route("/videos/random", get(handlers::video::random_video))
        .route("/videos/find/{id}", get(handlers::video::find_video))
        .route(
            "/videos/{id}",
            put(handlers::video::update_video).delete(handlers::video::delete_video),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            auth_service,
            login_required,
        ));

    // 组合所有路由
    let router = Router::new()
        .merge(public_routes)
        .merge(guest_routes)
        .merge(authenticated_routes)
        .fallback(route_not_found)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http());

    let router = match cors_layer(state.config.server.cors_allowed_origins.as_deref()) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .with_state(state)
}

/// 未匹配的路径
async fn route_not_found() -> AppError {
    AppError::not_found("Route")
}

/// 配置了来源时才启用 CORS
fn cors_layer(origins: Option<&[String]>) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins?
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_only_with_origins() {
        assert!(cors_layer(None).is_none());
        assert!(cors_layer(Some(&[][..])).is_none());
        let origins = vec!["https://app.example.com".to_string()];
        assert!(cors_layer(Some(origins.as_slice())).is_some());
    }
}
