// src/error.rs
use crate::auth::AuthError;
use crate::models::ErrorResponse;
use log::error;
use std::convert::Infallible;
use std::fmt;
use warp::http::header::{HeaderValue, CONTENT_TYPE};
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::reply::Response;
use warp::{Rejection, Reply};

pub const UNKNOWN_ERROR: &str = "An unknown error occurred";

/// Handler failure carrying the status and message sent to the client.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl Reject for ApiError {}

/// Builds the `{"message": ...}` body, degrading to plaintext when the body
/// itself cannot be encoded.
pub fn error_reply(message: &str, status: StatusCode) -> Response {
    render_error(
        serde_json::to_vec(&ErrorResponse {
            message: message.to_string(),
        }),
        status,
    )
}

fn render_error(body: serde_json::Result<Vec<u8>>, status: StatusCode) -> Response {
    match body {
        Ok(json) => {
            let mut res = Response::new(json.into());
            *res.status_mut() = status;
            res.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            res
        }
        Err(e) => {
            error!("Failed to encode error response: {}", e);
            warp::reply::with_status(UNKNOWN_ERROR, StatusCode::INTERNAL_SERVER_ERROR)
                .into_response()
        }
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if let Some(e) = err.find::<ApiError>() {
        return Ok(error_reply(&e.message, e.status));
    }
    if let Some(e) = err.find::<AuthError>() {
        return Ok(error_reply(&e.to_string(), e.status()));
    }
    if err.is_not_found() {
        return Ok(error_reply("Not found", StatusCode::NOT_FOUND));
    }
    if err.find::<warp::reject::InvalidHeader>().is_some()
        || err.find::<warp::reject::MissingHeader>().is_some()
    {
        return Ok(error_reply(
            "Missing or malformed credentials",
            StatusCode::UNAUTHORIZED,
        ));
    }
    if err.find::<warp::reject::PayloadTooLarge>().is_some()
        || err.find::<warp::reject::LengthRequired>().is_some()
        || err.find::<warp::reject::UnsupportedMediaType>().is_some()
        || err.find::<warp::body::BodyDeserializeError>().is_some()
    {
        return Ok(error_reply(
            "Failed to read request body.",
            StatusCode::BAD_REQUEST,
        ));
    }
    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(error_reply(
            "Method not allowed",
            StatusCode::METHOD_NOT_ALLOWED,
        ));
    }

    error!("Unhandled rejection: {:?}", err);
    Ok(error_reply(UNKNOWN_ERROR, StatusCode::INTERNAL_SERVER_ERROR))
}
