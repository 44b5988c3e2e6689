use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::Response, Json};

use crate::app::dto::{SessionRequest, SessionResponse};
use crate::app::errors::json_error;
use crate::app::routes::common::ok;
use crate::app::services::AppServices;

/// POST /session: exchange username + password for a bearer token.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<SessionRequest>,
) -> Response {
    let Some(user) = services.find_user(body.username.trim()) else {
        return invalid_credentials();
    };
    if !user.check_password(&body.password) {
        return invalid_credentials();
    }
    if !user.is_enabled {
        return json_error(StatusCode::FORBIDDEN, "user_disabled", "user is disabled");
    }

    let principal = match user.principal() {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "login refused");
            return json_error(StatusCode::CONFLICT, "invalid_role_assignment", e.to_string());
        }
    };

    match services.issue_token(principal) {
        Ok(token) => {
            tracing::info!(user_id = %user.id, role = %principal.role, "session issued");
            ok(SessionResponse {
                token,
                role: principal.role,
                user_id: principal.user_id,
            })
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to sign token");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "token_error", e.to_string())
        }
    }
}

fn invalid_credentials() -> Response {
    json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", "invalid username or password")
}
