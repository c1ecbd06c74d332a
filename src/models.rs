// src/models.rs
use serde::{Deserialize, Deserializer, Serialize};

/// Expected percentage raise for one stock symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expectation {
    #[serde(default)]
    pub stock: String,
    #[serde(default)]
    pub expected_raise: Option<f64>,
}

/// Investment expectations of a single user, keyed by `user_id`.
///
/// Numeric fields are optional so that a payload omitting them can be told
/// apart from one sending `0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Userprofile {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub expectations: Vec<Expectation>,
    #[serde(default)]
    pub expected_return: Option<f64>,
    #[serde(default)]
    pub default_expectation: Option<f64>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Expectation>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Expectation>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Userprofile {
    /// Expected raise for `stock`, or the default expectation when the
    /// profile has no entry for it. The first matching entry wins.
    pub fn get_expectation(&self, stock: &str) -> Option<f64> {
        match self.expectations.iter().find(|exp| exp.stock == stock) {
            Some(exp) => exp.expected_raise,
            None => self.default_expectation,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}
