// src/service.rs
use crate::db::UserprofileStore;
use crate::models::Userprofile;
use log::error;
use std::sync::Arc;
use thiserror::Error;
use warp::http::StatusCode;

/// Failure of a service operation, already classified for the caller.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Internal(String),
    #[error("{0}")]
    BadRequest(String),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

pub struct UserprofileService {
    store: Arc<dyn UserprofileStore>,
}

impl UserprofileService {
    pub fn new(store: Arc<dyn UserprofileStore>) -> Self {
        Self { store }
    }

    /// Creates or replaces the profile. Any store failure is internal.
    pub async fn create(&self, up: &Userprofile) -> Result<(), ServiceError> {
        self.store
            .save(up)
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))
    }

    /// Reads the profile. Not-found and store failures are both reported as
    /// a bad request.
    pub async fn get(&self, user_id: &str) -> Result<Userprofile, ServiceError> {
        self.store.get(user_id).await.map_err(|e| {
            error!("userId={} {}", user_id, e);
            ServiceError::BadRequest(format!("Cannot read userprofile {}", e))
        })
    }
}
