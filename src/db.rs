// src/db.rs
use crate::models::{Expectation, Userprofile};
use async_trait::async_trait;
use log::{error, info};
use scylla::{frame::response::result::CqlValue, query::Query, Session, SessionBuilder};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no userprofile found for {0}")]
    NotFound(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("malformed userprofile row: {0}")]
    Decode(String),
}

impl From<scylla::transport::errors::QueryError> for StoreError {
    fn from(e: scylla::transport::errors::QueryError) -> Self {
        StoreError::Query(e.to_string())
    }
}

/// Persistence of userprofiles keyed by user id.
#[async_trait]
pub trait UserprofileStore: Send + Sync {
    /// Creates the profile or replaces the stored one with the same user id.
    async fn save(&self, up: &Userprofile) -> Result<(), StoreError>;

    async fn get(&self, user_id: &str) -> Result<Userprofile, StoreError>;
}

pub struct ScyllaUserprofileStore {
    session: Session,
    keyspace: String,
}

impl ScyllaUserprofileStore {
    pub async fn connect(node: &str, keyspace: &str) -> Result<Self, StoreError> {
        let session = SessionBuilder::new()
            .known_node(node)
            .build()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        session
            .query(
                format!(
                    "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
                    keyspace
                ),
                &[],
            )
            .await?;
        session
            .query(
                format!(
                    "CREATE TABLE IF NOT EXISTS {}.userprofiles (user_id TEXT PRIMARY KEY, email TEXT, expectations TEXT, expected_return DOUBLE, default_expectation DOUBLE)",
                    keyspace
                ),
                &[],
            )
            .await?;

        info!("Successfully connected to ScyllaDB at {}.", node);
        Ok(Self {
            session,
            keyspace: keyspace.to_string(),
        })
    }
}

#[async_trait]
impl UserprofileStore for ScyllaUserprofileStore {
    async fn save(&self, up: &Userprofile) -> Result<(), StoreError> {
        let expectations_json = serde_json::to_string(&up.expectations)
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        // Every column is written, so an existing row is fully replaced.
        let query = Query::new(format!(
            "INSERT INTO {}.userprofiles (user_id, email, expectations, expected_return, default_expectation) VALUES (?, ?, ?, ?, ?)",
            self.keyspace
        ));
        if let Err(e) = self
            .session
            .query(
                query,
                (
                    up.user_id.as_str(),
                    up.email.as_str(),
                    expectations_json,
                    up.expected_return,
                    up.default_expectation,
                ),
            )
            .await
        {
            error!("userId={} failed to save userprofile: {}", up.user_id, e);
            return Err(e.into());
        }
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Userprofile, StoreError> {
        let query = Query::new(format!(
            "SELECT email, expectations, expected_return, default_expectation FROM {}.userprofiles WHERE user_id = ?",
            self.keyspace
        ));
        let result = self.session.query(query, (user_id,)).await.map_err(|e| {
            error!("userId={} failed to read userprofile: {}", user_id, e);
            StoreError::from(e)
        })?;

        let row = result
            .rows
            .and_then(|rows| rows.into_iter().next())
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))?;

        userprofile_from_row(user_id, &row.columns)
    }
}

/// Decodes the columns of the `get` query:
/// `email, expectations, expected_return, default_expectation`.
fn userprofile_from_row(
    user_id: &str,
    columns: &[Option<CqlValue>],
) -> Result<Userprofile, StoreError> {
    let email = text_column(columns, 0)?;
    let expectations: Vec<Expectation> = match columns.get(1).and_then(|c| c.as_ref()) {
        Some(value) => {
            let raw = value
                .as_text()
                .ok_or_else(|| StoreError::Decode("expectations is not text".to_string()))?;
            serde_json::from_str(raw).map_err(|e| StoreError::Decode(e.to_string()))?
        }
        None => Vec::new(),
    };

    Ok(Userprofile {
        user_id: user_id.to_string(),
        email,
        expectations,
        expected_return: double_column(columns, 2),
        default_expectation: double_column(columns, 3),
    })
}

fn text_column(columns: &[Option<CqlValue>], idx: usize) -> Result<String, StoreError> {
    match columns.get(idx).and_then(|c| c.as_ref()) {
        Some(value) => value
            .as_text()
            .cloned()
            .ok_or_else(|| StoreError::Decode(format!("column {} is not text", idx))),
        None => Ok(String::new()),
    }
}

fn double_column(columns: &[Option<CqlValue>], idx: usize) -> Option<f64> {
    columns
        .get(idx)
        .and_then(|c| c.as_ref())
        .and_then(|v| v.as_double())
}

/// Process-local store, selected with `DB_CONNECTION_URI=memory`.
#[derive(Default)]
pub struct MemoryUserprofileStore {
    profiles: RwLock<HashMap<String, Userprofile>>,
}

impl MemoryUserprofileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserprofileStore for MemoryUserprofileStore {
    async fn save(&self, up: &Userprofile) -> Result<(), StoreError> {
        self.profiles
            .write()
            .await
            .insert(up.user_id.clone(), up.clone());
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Userprofile, StoreError> {
        self.profiles
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))
    }
}
