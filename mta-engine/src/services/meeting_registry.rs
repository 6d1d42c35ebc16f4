//! Registry of monitored meetings
//!
//! Each session accumulates transcript segments and the action items found in
//! them until it is stopped. All mutation goes through the registry's
//! operations; sessions are never handed out by reference.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use mta_common::time::now;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::transcript::extract_action_items;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Meeting session not found: {0}")]
    NotFound(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    Monitoring,
}

/// One piece of transcript as submitted
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptInput {
    #[serde(default)]
    pub speaker: Option<String>,
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct TranscriptSegment {
    text: String,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct MeetingSession {
    id: Uuid,
    meeting_name: String,
    external_id: Option<String>,
    status: MeetingStatus,
    started_at: DateTime<Utc>,
    participants: BTreeSet<String>,
    segments: Vec<TranscriptSegment>,
    action_items: Vec<String>,
}

impl MeetingSession {
    fn snapshot(&self) -> MeetingSnapshot {
        MeetingSnapshot {
            id: self.id,
            meeting_name: self.meeting_name.clone(),
            external_id: self.external_id.clone(),
            status: self.status,
            started_at: self.started_at,
            participants: self.participants.iter().cloned().collect(),
            segment_count: self.segments.len(),
            action_items: self.action_items.clone(),
        }
    }
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingSnapshot {
    pub id: Uuid,
    pub meeting_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub status: MeetingStatus,
    pub started_at: DateTime<Utc>,
    pub participants: Vec<String>,
    pub segment_count: usize,
    pub action_items: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendOutcome {
    /// Items first seen in this segment
    pub new_action_items: Vec<String>,
    pub total_action_items: usize,
}

/// Final report of a stopped session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingSummary {
    pub id: Uuid,
    pub meeting_name: String,
    pub participants: Vec<String>,
    pub segment_count: usize,
    /// Between the first and last segment
    pub duration_seconds: i64,
    pub action_items: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MeetingRegistry {
    sessions: RwLock<HashMap<Uuid, MeetingSession>>,
}

impl MeetingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn start(&self, meeting_name: String, external_id: Option<String>) -> MeetingSnapshot {
        let session = MeetingSession {
            id: Uuid::new_v4(),
            meeting_name,
            external_id,
            status: MeetingStatus::Monitoring,
            started_at: now(),
            participants: BTreeSet::new(),
            segments: Vec::new(),
            action_items: Vec::new(),
        };
        let snapshot = session.snapshot();
        info!(session = %session.id, meeting = %session.meeting_name, "Meeting monitoring started");
        self.sessions.write().await.insert(session.id, session);
        snapshot
    }

    pub async fn append(&self, id: Uuid, input: TranscriptInput) -> Result<AppendOutcome, RegistryError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(RegistryError::NotFound(id))?;

        if let Some(speaker) = input.speaker.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            session.participants.insert(speaker.to_string());
        }

        let mut new_action_items = Vec::new();
        for item in extract_action_items(&input.text) {
            if !session.action_items.contains(&item) {
                session.action_items.push(item.clone());
                new_action_items.push(item);
            }
        }

        session.segments.push(TranscriptSegment {
            text: input.text,
            timestamp: input.timestamp.unwrap_or_else(now),
        });

        debug!(
            session = %id,
            segments = session.segments.len(),
            found = new_action_items.len(),
            "Transcript segment added"
        );

        Ok(AppendOutcome {
            new_action_items,
            total_action_items: session.action_items.len(),
        })
    }

    pub async fn status(&self, id: Uuid) -> Result<MeetingSnapshot, RegistryError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .map(MeetingSession::snapshot)
            .ok_or(RegistryError::NotFound(id))
    }

    /// All sessions, oldest first
    pub async fn list(&self) -> Vec<MeetingSnapshot> {
        let sessions = self.sessions.read().await;
        let mut snapshots: Vec<MeetingSnapshot> = sessions.values().map(MeetingSession::snapshot).collect();
        snapshots.sort_by_key(|s| s.started_at);
        snapshots
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// End a session and return what it collected
    pub async fn stop(&self, id: Uuid) -> Result<MeetingSummary, RegistryError> {
        let session = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(RegistryError::NotFound(id))?;

        let duration_seconds = match (session.segments.first(), session.segments.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_seconds().max(0),
            _ => 0,
        };
        let transcript_chars: usize = session.segments.iter().map(|s| s.text.len()).sum();

        info!(
            session = %id,
            meeting = %session.meeting_name,
            segments = session.segments.len(),
            transcript_chars,
            action_items = session.action_items.len(),
            "Meeting monitoring stopped"
        );

        Ok(MeetingSummary {
            id,
            meeting_name: session.meeting_name,
            participants: session.participants.into_iter().collect(),
            segment_count: session.segments.len(),
            duration_seconds,
            action_items: session.action_items,
        })
    }
}
