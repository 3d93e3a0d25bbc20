//! Episode repository (spec §3 `Episode`/`EpisodeEvent`/`EpisodeLink`,
//! invariant P-episode, spec §6.1 episode resolution fallback chain).

use crate::error::{Error, Result};
use crate::storage::Database;
use crate::types::*;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct EpisodeRepository {
    db: Arc<Database>,
}

impl EpisodeRepository {
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Begin a new episode. Fails if the session already has an active
    /// episode (invariant P-episode: at most one active episode per
    /// session).
    pub fn begin(&self, session_id: impl Into<String>, name: impl Into<String>) -> Result<Episode> {
        let session_id = session_id.into();
        if self.db.active_episode_for_session(&session_id).is_some() {
            return Err(Error::validation(
                "session",
                "session already has an active episode",
            ));
        }
        let episode = Episode::new(session_id, name);
        self.db.insert_episode(episode.clone());
        Ok(episode)
    }

    #[must_use]
    pub fn get(&self, id: EpisodeId) -> Option<Episode> {
        self.db.get_episode(id)
    }

    /// Episode resolution fallback chain (spec §6.1): explicit `id` ->
    /// `(name, sessionId)` lookup -> active episode for `sessionId`.
    #[must_use]
    pub fn resolve(&self, id: Option<EpisodeId>, name: Option<&str>, session_id: Option<&str>) -> Option<Episode> {
        if let Some(id) = id {
            if let Some(e) = self.db.get_episode(id) {
                return Some(e);
            }
        }
        if let (Some(name), Some(session_id)) = (name, session_id) {
            if let Some(e) = self.db.episode_by_name(session_id, name) {
                return Some(e);
            }
        }
        if let Some(session_id) = session_id {
            return self.db.active_episode_for_session(session_id);
        }
        None
    }

    pub fn start(&self, id: EpisodeId) -> Result<Episode> {
        self.transition(id, EpisodeStatus::Active)
    }

    pub fn complete(&self, id: EpisodeId) -> Result<Episode> {
        self.transition(id, EpisodeStatus::Completed)
    }

    pub fn fail(&self, id: EpisodeId) -> Result<Episode> {
        self.transition(id, EpisodeStatus::Failed)
    }

    pub fn cancel(&self, id: EpisodeId) -> Result<Episode> {
        self.transition(id, EpisodeStatus::Cancelled)
    }

    fn transition(&self, id: EpisodeId, next: EpisodeStatus) -> Result<Episode> {
        let mut episode = self.db.get_episode(id).ok_or_else(|| Error::not_found(id.to_string()))?;
        episode.transition(next)?;
        self.db.update_episode(episode.clone());
        Ok(episode)
    }

    /// Append an event. Terminal episodes freeze further appends (spec
    /// §3 Lifecycles).
    pub fn add_event(&self, episode_id: EpisodeId, event_type: EpisodeEventType, description: impl Into<String>) -> Result<EpisodeEvent> {
        let episode = self.db.get_episode(episode_id).ok_or_else(|| Error::not_found(episode_id.to_string()))?;
        if episode.status.is_terminal() {
            return Err(Error::validation(
                "episode",
                "cannot append events to a terminal episode",
            ));
        }
        let event = EpisodeEvent {
            id: Uuid::new_v4(),
            episode_id,
            event_type,
            description: description.into(),
            created_at: Utc::now(),
        };
        self.db.add_episode_event(event.clone());
        Ok(event)
    }

    #[must_use]
    pub fn events(&self, episode_id: EpisodeId) -> Vec<EpisodeEvent> {
        self.db.events_for_episode(episode_id)
    }

    pub fn link_entity(
        &self,
        episode_id: EpisodeId,
        entry_type: EntryType,
        entry_id: EntryId,
        role: EpisodeLinkRole,
    ) -> EpisodeLink {
        let link = EpisodeLink {
            id: Uuid::new_v4(),
            episode_id,
            entry_type,
            entry_id,
            role,
            created_at: Utc::now(),
        };
        self.db.add_episode_link(link.clone());
        link
    }

    #[must_use]
    pub fn linked_entities(&self, episode_id: EpisodeId) -> Vec<EpisodeLink> {
        self.db.links_for_episode(episode_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_most_one_active_episode_per_session() {
        let repo = EpisodeRepository::new(Arc::new(Database::new()));
        let e1 = repo.begin("s1", "task-a").unwrap();
        repo.start(e1.id).unwrap();
        assert!(repo.begin("s1", "task-b").is_err());
    }

    #[test]
    fn resolution_fallback_chain() {
        let repo = EpisodeRepository::new(Arc::new(Database::new()));
        let e = repo.begin("s1", "task-a").unwrap();
        repo.start(e.id).unwrap();

        assert_eq!(repo.resolve(Some(e.id), None, None).unwrap().id, e.id);
        assert_eq!(repo.resolve(None, Some("task-a"), Some("s1")).unwrap().id, e.id);
        assert_eq!(repo.resolve(None, None, Some("s1")).unwrap().id, e.id);
        assert!(repo.resolve(None, None, Some("s2")).is_none());
    }

    #[test]
    fn terminal_episode_rejects_further_events() {
        let repo = EpisodeRepository::new(Arc::new(Database::new()));
        let e = repo.begin("s1", "task-a").unwrap();
        repo.start(e.id).unwrap();
        repo.complete(e.id).unwrap();
        assert!(repo
            .add_event(e.id, EpisodeEventType::Checkpoint, "late event")
            .is_err());
    }
}
