use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use adportal_auth::{NewUser, Screen, User, UserUpdate};
use adportal_core::{FieldErrors, UserId};
use adportal_infra::EntityStore;

use crate::app::errors;
use crate::app::routes::common::{created, items, ok, parse_id};
use crate::app::services::AppServices;
use crate::authz::guard_screen;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).patch(update_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Users) {
        return resp;
    }
    items(services.users.list().iter().map(User::view).collect())
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Users) {
        return resp;
    }
    let id: UserId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.users.get(id) {
        Some(user) => ok(user.view()),
        None => errors::not_found(),
    }
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(draft): Json<NewUser>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Users) {
        return resp;
    }
    if services.find_user(draft.username.trim()).is_some() {
        let mut fields = FieldErrors::new();
        fields.add("username", "Already exists.");
        return errors::field_errors(fields);
    }
    match User::create(services.users.next_id(), draft, Utc::now()) {
        Ok(user) => {
            tracing::info!(user_id = %user.id, username = %user.username, roles = ?user.roles, "user created");
            let view = user.view();
            services.users.upsert(user);
            created(view)
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(update): Json<UserUpdate>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Users) {
        return resp;
    }
    let id: UserId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Some(mut user) = services.users.get(id) else {
        return errors::not_found();
    };
    if let Err(e) = user.update(update, Utc::now()) {
        return errors::domain_error_to_response(e);
    }
    let view = user.view();
    services.users.upsert(user);
    ok(view)
}
