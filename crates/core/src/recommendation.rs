//! Payloads of the recommendation endpoint.
//!
//! Generating recommendations is an external collaborator's job; these types
//! only fix the request/response contract.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::profile::{UserProfile, sanitize_profile_data};
use crate::types::UserId;

/// Where the user wants to eat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationType {
    #[serde(rename = "En casa")]
    AtHome,
    #[serde(rename = "Fuera")]
    EatingOut,
}

/// Body of `POST /api/recommendations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    #[serde(default)]
    pub meal_type: String,
    #[serde(default)]
    pub cooking_time: String,
    #[serde(default)]
    pub cravings: Vec<String>,
    /// Sanitized on the way in, whatever shape the client sent.
    #[serde(default, deserialize_with = "sanitized_profile")]
    pub user_profile: UserProfile,
}

fn sanitized_profile<'de, D>(deserializer: D) -> Result<UserProfile, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(sanitize_profile_data(Some(&raw)))
}

/// Acknowledgement returned once a request is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub id: String,
}
