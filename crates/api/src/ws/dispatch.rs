//! Socket message dispatch.
//!
//! Maps each [`ClientMessage`] onto the write coordinator or the profile
//! document, independent of the socket itself so it can be driven directly
//! in tests.

use serde::Serialize;
use serde_json::{json, Value};
use tutorlog_concurrency::{DocumentChanged, WriteOutcome};
use tutorlog_core::channels::{support_channel, CHANNEL_CURATORS};
use tutorlog_core::error::CoreError;
use tutorlog_core::profile::profile_key;
use tutorlog_core::roles::Session;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::ws::protocol::{ClientMessage, DocumentChangedPush, Envelope, Reply};

/// Per-connection state.
#[derive(Debug, Clone)]
pub struct Connection {
    pub conn_id: String,
    pub session: Option<Session>,
}

impl Connection {
    pub fn new(conn_id: impl Into<String>) -> Self {
        Self {
            conn_id: conn_id.into(),
            session: None,
        }
    }

    fn session(&self) -> AppResult<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| CoreError::Unauthorized("Authenticate first".to_string()).into())
    }

    /// Subscriber channels this connection belongs to.
    fn channels(session: &Session) -> Vec<String> {
        if session.is_curator() {
            vec![CHANNEL_CURATORS.to_string()]
        } else {
            vec![support_channel(&session.user_id)]
        }
    }
}

/// Parse one text frame and produce its reply.
pub async fn handle_text(state: &AppState, conn: &mut Connection, text: &str) -> Reply {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::debug!(conn_id = %conn.conn_id, error = %e, "Unparseable socket message");
            return Reply::err(None, &AppError::BadRequest(format!("Invalid message: {e}")));
        }
    };

    let kind = envelope.message.kind();
    match dispatch(state, conn, envelope.message).await {
        Ok(data) => Reply::ok(envelope.request_id, data),
        Err(e) => {
            tracing::debug!(conn_id = %conn.conn_id, kind, error = %e, "Socket message failed");
            Reply::err(envelope.request_id, &e)
        }
    }
}

/// Execute one message on behalf of `conn`.
pub async fn dispatch(state: &AppState, conn: &mut Connection, message: ClientMessage) -> AppResult<Value> {
    match message {
        ClientMessage::Authenticate { user_id, name, role } => {
            let session = Session::new(user_id, name, role);
            authenticate(state, conn, session.clone()).await;
            to_data(&session)
        }

        ClientMessage::StudentAutofill { name } => {
            conn.session()?;
            to_data(&state.coordinator.autofill(&name)?)
        }

        ClientMessage::RecordSubmit(payload) => {
            let session = conn.session()?;
            to_data(&state.coordinator.submit(session, payload).await?)
        }

        ClientMessage::RecordUpdate { id, patch } => {
            let session = conn.session()?;
            to_data(&state.coordinator.update(session, &id, patch).await?)
        }

        ClientMessage::RecordDelete { id } => {
            let session = conn.session()?;
            state.coordinator.delete(session, &id).await?;
            Ok(json!({ "id": id }))
        }

        ClientMessage::RecordsList(filter) => {
            conn.session()?;
            to_data(&state.coordinator.list_records(&filter)?)
        }

        ClientMessage::NotificationsList => {
            let session = conn.session()?;
            to_data(&state.coordinator.list_notifications(session)?)
        }

        ClientMessage::NotificationsSeen => {
            let session = conn.session()?;
            to_data(&state.coordinator.mark_all_seen(session).await?)
        }

        ClientMessage::ProfileGet => {
            let session = conn.session()?;
            to_data(&state.profile(&session.user_id).read()?)
        }

        ClientMessage::ProfileSave { base_version, data } => {
            let session = conn.session()?;
            let outcome = state
                .profile(&session.user_id)
                .write(&conn.conn_id, base_version, &data)
                .await?;
            let status = match &outcome {
                WriteOutcome::Saved(_) => "saved",
                WriteOutcome::Conflict(_) => "conflict",
            };
            Ok(json!({ "status": status, "document": to_data(outcome.document())? }))
        }
    }
}

/// The push to send `conn` for a profile change, if it may see it.
///
/// Only authenticated connections get a push, only for their own user's
/// profile, and never for their own writes.
pub fn relay_change(conn: &Connection, signal: &DocumentChanged) -> Option<DocumentChangedPush> {
    let session = conn.session.as_ref()?;
    if signal.origin == conn.conn_id || signal.key != profile_key(&session.user_id) {
        return None;
    }
    Some(DocumentChangedPush::new(signal.key.clone(), signal.raw.clone()))
}

/// Bind `session` to the connection and move it to the session's channels.
async fn authenticate(state: &AppState, conn: &mut Connection, session: Session) {
    if let Some(previous) = conn.session.take() {
        for channel in Connection::channels(&previous) {
            state.registry.leave(&conn.conn_id, &channel).await;
        }
    }

    state.registry.identify(&conn.conn_id, session.user_id.clone()).await;
    let channels = Connection::channels(&session);
    for channel in &channels {
        state.registry.join(&conn.conn_id, channel).await;
    }

    tracing::info!(
        conn_id = %conn.conn_id,
        user_id = %session.user_id,
        role = session.role.as_str(),
        ?channels,
        "Socket authenticated"
    );
    conn.session = Some(session);
}

fn to_data<T: Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|e| AppError::InternalError(e.to_string()))
}
