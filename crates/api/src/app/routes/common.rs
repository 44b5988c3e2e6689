use std::str::FromStr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use adportal_core::DomainError;

use crate::app::errors::json_error;

/// Path segment → serial id, `400 invalid_id` otherwise.
pub fn parse_id<T>(raw: &str) -> Result<T, Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse()
        .map_err(|e: DomainError| json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

pub fn ok<T: Serialize>(value: T) -> Response {
    (StatusCode::OK, Json(value)).into_response()
}

pub fn created<T: Serialize>(value: T) -> Response {
    (StatusCode::CREATED, Json(value)).into_response()
}

pub fn items<T: Serialize>(items: Vec<T>) -> Response {
    ok(serde_json::json!({ "items": items }))
}

/// Form submissions must be JSON objects keyed by field name.
pub fn form_object(body: JsonValue) -> Result<Map<String, JsonValue>, Response> {
    match body {
        JsonValue::Object(map) => Ok(map),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_body",
            "expected a JSON object keyed by field name",
        )),
    }
}
