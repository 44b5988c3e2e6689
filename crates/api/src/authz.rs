//! API-side authorization guards.
//!
//! Handlers call these before touching any store; the decision itself lives
//! in `adportal-auth`.

use axum::http::StatusCode;
use axum::response::Response;

use adportal_auth::{authorize, require_any, Role, Screen};

use crate::app::errors::json_error;
use crate::context::PrincipalContext;

pub fn guard_screen(principal: &PrincipalContext, screen: Screen) -> Result<(), Response> {
    authorize(principal.principal(), screen)
        .map_err(|e| json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
}

pub fn guard_roles(principal: &PrincipalContext, roles: &[Role]) -> Result<(), Response> {
    require_any(principal.principal(), roles)
        .map_err(|e| json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
}
