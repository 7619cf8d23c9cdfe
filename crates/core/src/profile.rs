//! The user profile: one single-owner document per user, kept under
//! optimistic concurrency control.

use serde::{Deserialize, Serialize};

use crate::merge::DocumentData;

/// Prefix of every profile document key.
pub const PROFILE_KEY_PREFIX: &str = "profile:";

/// Storage key of `owner`'s profile document: `profile:<owner>`.
pub fn profile_key(owner: &str) -> String {
    format!("{PROFILE_KEY_PREFIX}{owner}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub phone: String,
    pub avatar_url: String,
    pub bio: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            full_name: String::new(),
            email: String::new(),
            role: "Support".to_string(),
            phone: String::new(),
            avatar_url: String::new(),
            bio: String::new(),
        }
    }
}

impl Profile {
    /// Render as a document body.
    pub fn to_document(&self) -> DocumentData {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => DocumentData::new(),
        }
    }

    /// Read a document body, filling missing fields with defaults.
    pub fn from_document(data: &DocumentData) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(data.clone()))
    }
}
