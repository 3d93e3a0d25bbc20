//! Episodes: named, bounded activities within a session (spec §3).

use crate::error::{Error, Result};
use crate::types::entry::{EntryId, EntryType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type EpisodeId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeStatus {
    Planned,
    Active,
    Completed,
    Failed,
    Cancelled,
}

impl EpisodeStatus {
    /// Whether this status is terminal: further event appends are frozen
    /// (spec §3 Lifecycles).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EpisodeStatus::Completed | EpisodeStatus::Failed | EpisodeStatus::Cancelled
        )
    }

    /// Validate a state transition against the episode state machine.
    #[must_use]
    pub fn can_transition_to(self, next: EpisodeStatus) -> bool {
        use EpisodeStatus::{Active, Cancelled, Completed, Failed, Planned};
        match (self, next) {
            (Planned, Active | Cancelled) => true,
            (Active, Completed | Failed | Cancelled) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    pub session_id: String,
    pub name: String,
    pub status: EpisodeStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Episode {
    #[must_use]
    pub fn new(session_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            name: name.into(),
            status: EpisodeStatus::Planned,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Attempt a state transition, enforcing the episode state machine
    /// (spec §5 "Episode state-machine transitions are linearizable per
    /// episode").
    pub fn transition(&mut self, next: EpisodeStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::validation(
                "status",
                format!("cannot transition episode from {:?} to {:?}", self.status, next),
            ));
        }
        self.status = next;
        if next.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeEventType {
    Started,
    Checkpoint,
    Decision,
    Error,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeEvent {
    pub id: Uuid,
    pub episode_id: EpisodeId,
    pub event_type: EpisodeEventType,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeLinkRole {
    Created,
    Modified,
    Referenced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeLink {
    pub id: Uuid,
    pub episode_id: EpisodeId,
    pub entry_type: EntryType,
    pub entry_id: EntryId,
    pub role: EpisodeLinkRole,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions_succeed() {
        let mut e = Episode::new("s1", "do-thing");
        assert!(e.transition(EpisodeStatus::Active).is_ok());
        assert!(e.transition(EpisodeStatus::Completed).is_ok());
        assert!(e.status.is_terminal());
        assert!(e.ended_at.is_some());
    }

    #[test]
    fn terminal_transitions_are_frozen() {
        let mut e = Episode::new("s1", "do-thing");
        e.transition(EpisodeStatus::Active).unwrap();
        e.transition(EpisodeStatus::Failed).unwrap();
        assert!(e.transition(EpisodeStatus::Active).is_err());
        assert!(e.transition(EpisodeStatus::Completed).is_err());
    }

    #[test]
    fn cannot_skip_planned_to_completed() {
        let mut e = Episode::new("s1", "do-thing");
        assert!(e.transition(EpisodeStatus::Completed).is_err());
    }
}
