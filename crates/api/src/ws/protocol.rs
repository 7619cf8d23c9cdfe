//! Socket message shapes.
//!
//! Inbound messages are JSON objects tagged by `"type"`, optionally carrying
//! a `request_id` that is echoed on the reply. Outbound frames are either a
//! [`Reply`], a curator event, or a [`DocumentChangedPush`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tutorlog_core::merge::DocumentData;
use tutorlog_core::records::{NewRecord, RecordFilter, RecordPatch};
use tutorlog_core::roles::Role;
use tutorlog_core::types::{EntityId, UserId};

use crate::error::AppError;

/// A client frame: the message plus its correlation id.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub message: ClientMessage,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Trusted identity assertion from the external auth layer.
    #[serde(rename = "authenticate")]
    Authenticate {
        user_id: UserId,
        name: String,
        role: Role,
    },

    #[serde(rename = "student.autofill")]
    StudentAutofill { name: String },

    #[serde(rename = "record.submit")]
    RecordSubmit(NewRecord),

    #[serde(rename = "record.update")]
    RecordUpdate {
        id: EntityId,
        #[serde(flatten)]
        patch: RecordPatch,
    },

    #[serde(rename = "record.delete")]
    RecordDelete { id: EntityId },

    #[serde(rename = "records.list")]
    RecordsList(RecordFilter),

    #[serde(rename = "notifications.list")]
    NotificationsList,

    #[serde(rename = "notifications.seen")]
    NotificationsSeen,

    #[serde(rename = "profile.get")]
    ProfileGet,

    #[serde(rename = "profile.save")]
    ProfileSave {
        base_version: u64,
        data: DocumentData,
    },
}

impl ClientMessage {
    /// The `"type"` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Authenticate { .. } => "authenticate",
            ClientMessage::StudentAutofill { .. } => "student.autofill",
            ClientMessage::RecordSubmit(_) => "record.submit",
            ClientMessage::RecordUpdate { .. } => "record.update",
            ClientMessage::RecordDelete { .. } => "record.delete",
            ClientMessage::RecordsList(_) => "records.list",
            ClientMessage::NotificationsList => "notifications.list",
            ClientMessage::NotificationsSeen => "notifications.seen",
            ClientMessage::ProfileGet => "profile.get",
            ClientMessage::ProfileSave { .. } => "profile.save",
        }
    }
}

/// Response to one client frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(rename = "type")]
    pub kind: String,
    pub request_id: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Reply {
    pub fn ok(request_id: Option<String>, data: Value) -> Self {
        Self {
            kind: "reply".to_string(),
            request_id,
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn err(request_id: Option<String>, error: &AppError) -> Self {
        let (_, code, message) = error.classify();
        Self {
            kind: "reply".to_string(),
            request_id,
            success: false,
            data: None,
            error: Some(message),
            code: Some(code.to_string()),
        }
    }
}

/// Relay of a profile change made by another connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChangedPush {
    #[serde(rename = "type")]
    pub kind: String,
    pub key: String,
    pub raw: String,
}

impl DocumentChangedPush {
    pub fn new(key: String, raw: String) -> Self {
        Self {
            kind: "document.changed".to_string(),
            key,
            raw,
        }
    }
}
