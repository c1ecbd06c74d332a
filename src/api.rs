// src/api.rs
use crate::auth::{decode_segment, subject_from_token, trusted_path_id, Authenticator};
use crate::error::{handle_rejection, ApiError};
use crate::models::Userprofile;
use crate::service::{ServiceError, UserprofileService};
use crate::validation::validate_fields;
use log::{error, info};
use std::sync::Arc;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::{Filter, Rejection, Reply};

pub const LOG_TARGET: &str = "stock_user_profile";

const DESERIALIZE_FAILED: &str = "Failed to deserialize payload.";
const IDENTITY_MISMATCH: &str = "UserID in request doesn't match userID in token";

/// Authenticated listener: identity comes from the bearer token.
pub fn external_routes(
    service: Arc<UserprofileService>,
    authenticator: Arc<Authenticator>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["authorization", "content-type"])
        .allow_methods(vec![
            "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS",
        ]);

    create_route(service.clone(), subject_from_token(authenticator.clone()))
        .or(get_route(service, subject_from_token(authenticator)))
        .recover(handle_rejection)
        .with(cors)
        .with(warp::log(LOG_TARGET))
}

/// Internal listener: the requested id is trusted as the identity.
pub fn internal_routes(
    service: Arc<UserprofileService>,
) -> impl Filter<Extract = impl Reply, Error = std::convert::Infallible> + Clone {
    get_route(service, trusted_path_id())
        .recover(handle_rejection)
        .with(warp::log(LOG_TARGET))
}

pub fn create_route(
    service: Arc<UserprofileService>,
    identity: BoxedFilter<(String,)>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("userprofile")
        .and(warp::path::end())
        .and(warp::post())
        .and(identity)
        .and(warp::body::bytes())
        .and(with_service(service))
        .and_then(create_userprofile_handler)
}

pub fn get_route(
    service: Arc<UserprofileService>,
    identity: BoxedFilter<(String,)>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("userprofile")
        .and(warp::get())
        .and(identity)
        .and(path_id())
        .and(warp::path::end())
        .and(with_service(service))
        .and_then(get_userprofile_handler)
}

fn path_id() -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::path::param::<String>().and_then(|raw: String| async move {
        decode_segment(&raw).ok_or_else(warp::reject::not_found)
    })
}

fn with_service(
    service: Arc<UserprofileService>,
) -> impl Filter<Extract = (Arc<UserprofileService>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || service.clone())
}

async fn create_userprofile_handler(
    user_id: String,
    body: Bytes,
    service: Arc<UserprofileService>,
) -> Result<impl Reply, Rejection> {
    let userprofile: Userprofile = serde_json::from_slice(&body).map_err(|e| {
        error!("userId={} failed to deserialize payload: {}", user_id, e);
        reject(StatusCode::BAD_REQUEST, DESERIALIZE_FAILED)
    })?;

    if userprofile.user_id != user_id {
        error!(
            "Unauthorized: userId={} request_userId={}",
            user_id, userprofile.user_id
        );
        return Err(reject(StatusCode::UNAUTHORIZED, IDENTITY_MISMATCH));
    }

    validate_fields(&userprofile).map_err(|e| {
        error!("userId={} {}", user_id, e);
        reject(StatusCode::BAD_REQUEST, e.to_string())
    })?;

    service
        .create(&userprofile)
        .await
        .map_err(service_rejection)?;

    info!("userId={} userprofile saved", user_id);
    Ok(warp::reply::with_status(warp::reply(), StatusCode::CREATED))
}

async fn get_userprofile_handler(
    user_id: String,
    id: String,
    service: Arc<UserprofileService>,
) -> Result<impl Reply, Rejection> {
    if user_id != id {
        error!("Unauthorized: userId={} request_userId={}", user_id, id);
        return Err(reject(StatusCode::UNAUTHORIZED, IDENTITY_MISMATCH));
    }

    let userprofile = service.get(&id).await.map_err(service_rejection)?;

    info!("userId={} userprofile retrieved", id);
    Ok(warp::reply::json(&userprofile))
}

fn reject(status: StatusCode, message: impl Into<String>) -> Rejection {
    warp::reject::custom(ApiError::new(status, message))
}

fn service_rejection(e: ServiceError) -> Rejection {
    let message = format!("Failed to process request: {}", e);
    error!("{}", message);
    reject(e.status(), message)
}
