//! `memory_episode` tool contract (spec §6.1: `begin, log, add, get, list,
//! update, deactivate, delete, start, complete, fail, cancel, add_event,
//! get_events, link_entity, get_linked, get_messages, get_timeline,
//! what_happened, trace_causal_chain`).
//!
//! Actions that don't take an explicit `id` resolve through the fallback
//! chain spec §6.1 names: explicit `id` -> (`name` + `sessionId`) lookup ->
//! active episode for `sessionId`. [`EpisodeResolution`] carries whichever
//! of those three the caller supplied; picking among them is
//! [`memory_core::repositories::episode_repo::EpisodeRepository::resolve`]'s job, not this crate's.

use memory_core::types::{EntryId, EpisodeEventType, EpisodeId, EpisodeLinkRole, EntryType};
use serde::{Deserialize, Serialize};

use crate::error::{ToolError, ToolResult};
use crate::query::{EntryTypeParam, RelationDirectionParam};

pub const VALID_ACTIONS: &[&str] = &[
    "begin", "log", "add", "get", "list", "update", "deactivate", "delete", "start", "complete",
    "fail", "cancel", "add_event", "get_events", "link_entity", "get_linked", "get_messages",
    "get_timeline", "what_happened", "trace_causal_chain",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeActionParam {
    Begin,
    Log,
    Add,
    Get,
    List,
    Update,
    Deactivate,
    Delete,
    Start,
    Complete,
    Fail,
    Cancel,
    AddEvent,
    GetEvents,
    LinkEntity,
    GetLinked,
    GetMessages,
    GetTimeline,
    WhatHappened,
    TraceCausalChain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeEventTypeParam {
    Started,
    Checkpoint,
    Decision,
    Error,
    Completed,
}

impl From<EpisodeEventTypeParam> for EpisodeEventType {
    fn from(value: EpisodeEventTypeParam) -> Self {
        match value {
            EpisodeEventTypeParam::Started => EpisodeEventType::Started,
            EpisodeEventTypeParam::Checkpoint => EpisodeEventType::Checkpoint,
            EpisodeEventTypeParam::Decision => EpisodeEventType::Decision,
            EpisodeEventTypeParam::Error => EpisodeEventType::Error,
            EpisodeEventTypeParam::Completed => EpisodeEventType::Completed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeLinkRoleParam {
    Created,
    Modified,
    Referenced,
}

impl From<EpisodeLinkRoleParam> for EpisodeLinkRole {
    fn from(value: EpisodeLinkRoleParam) -> Self {
        match value {
            EpisodeLinkRoleParam::Created => EpisodeLinkRole::Created,
            EpisodeLinkRoleParam::Modified => EpisodeLinkRole::Modified,
            EpisodeLinkRoleParam::Referenced => EpisodeLinkRole::Referenced,
        }
    }
}

/// The three ways a non-`begin`/`list` action may name its episode (spec
/// §6.1 fallback chain).
#[derive(Debug, Clone)]
pub enum EpisodeResolution {
    ById(EpisodeId),
    ByNameAndSession { name: String, session_id: String },
    ActiveForSession(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEpisodeParams {
    pub action: EpisodeActionParam,
    #[serde(default)]
    pub id: Option<EpisodeId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub event_type: Option<EpisodeEventTypeParam>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub entry_type: Option<EntryTypeParam>,
    #[serde(default)]
    pub entry_id: Option<EntryId>,
    #[serde(default)]
    pub role: Option<EpisodeLinkRoleParam>,
    #[serde(default)]
    pub direction: Option<RelationDirectionParam>,
    #[serde(default)]
    pub max_depth: Option<usize>,
}

pub enum EpisodeRequest {
    Begin { session_id: String, name: String },
    Resolve(EpisodeResolution),
    List,
    AddEvent { resolution: EpisodeResolution, event_type: EpisodeEventType, description: String },
    LinkEntity { resolution: EpisodeResolution, entry_type: EntryType, entry_id: EntryId, role: EpisodeLinkRole },
    TraceCausalChain { entry_type: EntryType, entry_id: EntryId, direction: memory_core::query::RelationDirection, max_depth: usize },
}

fn missing_field(field: &str) -> ToolError {
    ToolError {
        error: format!("memory_episode: '{field}' is required for this action"),
        code: "E1000",
        context: None,
    }
}

impl MemoryEpisodeParams {
    fn resolve(&self) -> ToolResult<EpisodeResolution> {
        if let Some(id) = self.id {
            return Ok(EpisodeResolution::ById(id));
        }
        if let (Some(name), Some(session_id)) = (&self.name, &self.session_id) {
            return Ok(EpisodeResolution::ByNameAndSession { name: name.clone(), session_id: session_id.clone() });
        }
        if let Some(session_id) = &self.session_id {
            return Ok(EpisodeResolution::ActiveForSession(session_id.clone()));
        }
        Err(missing_field("id (or name+sessionId, or sessionId)"))
    }

    pub fn decode(&self) -> ToolResult<EpisodeRequest> {
        match self.action {
            EpisodeActionParam::Begin => Ok(EpisodeRequest::Begin {
                session_id: self.session_id.clone().ok_or_else(|| missing_field("sessionId"))?,
                name: self.name.clone().ok_or_else(|| missing_field("name"))?,
            }),
            EpisodeActionParam::List => Ok(EpisodeRequest::List),
            EpisodeActionParam::AddEvent | EpisodeActionParam::Log | EpisodeActionParam::Add => {
                Ok(EpisodeRequest::AddEvent {
                    resolution: self.resolve()?,
                    event_type: self.event_type.ok_or_else(|| missing_field("eventType"))?.into(),
                    description: self.description.clone().ok_or_else(|| missing_field("description"))?,
                })
            }
            EpisodeActionParam::LinkEntity => Ok(EpisodeRequest::LinkEntity {
                resolution: self.resolve()?,
                entry_type: self.entry_type.ok_or_else(|| missing_field("entryType"))?.into(),
                entry_id: self.entry_id.ok_or_else(|| missing_field("entryId"))?,
                role: self.role.ok_or_else(|| missing_field("role"))?.into(),
            }),
            EpisodeActionParam::TraceCausalChain => Ok(EpisodeRequest::TraceCausalChain {
                entry_type: self.entry_type.ok_or_else(|| missing_field("entryType"))?.into(),
                entry_id: self.entry_id.ok_or_else(|| missing_field("entryId"))?,
                direction: self.direction.unwrap_or(RelationDirectionParam::Both).into(),
                max_depth: self.max_depth.unwrap_or(memory_core::constants::MAX_RELATION_DEPTH),
            }),
            // get/update/deactivate/delete/start/complete/fail/cancel/
            // get_events/get_linked/get_messages/get_timeline/what_happened
            // all key off the same resolution chain; the action name alone
            // tells the handler which repository call to make.
            _ => Ok(EpisodeRequest::Resolve(self.resolve()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(action: EpisodeActionParam) -> MemoryEpisodeParams {
        MemoryEpisodeParams {
            action,
            id: None,
            name: None,
            session_id: None,
            event_type: None,
            description: None,
            entry_type: None,
            entry_id: None,
            role: None,
            direction: None,
            max_depth: None,
        }
    }

    #[test]
    fn resolution_prefers_id_over_name_and_session() {
        let mut params = base(EpisodeActionParam::Get);
        params.id = Some(EpisodeId::new_v4());
        params.name = Some("ignored".into());
        params.session_id = Some("s1".into());
        match params.decode().unwrap() {
            EpisodeRequest::Resolve(EpisodeResolution::ById(_)) => {}
            _ => panic!("expected ById resolution"),
        }
    }

    #[test]
    fn resolution_falls_back_to_name_and_session() {
        let mut params = base(EpisodeActionParam::Get);
        params.name = Some("refactor".into());
        params.session_id = Some("s1".into());
        match params.decode().unwrap() {
            EpisodeRequest::Resolve(EpisodeResolution::ByNameAndSession { name, session_id }) => {
                assert_eq!(name, "refactor");
                assert_eq!(session_id, "s1");
            }
            _ => panic!("expected ByNameAndSession resolution"),
        }
    }

    #[test]
    fn resolution_falls_back_to_active_for_session() {
        let mut params = base(EpisodeActionParam::Get);
        params.session_id = Some("s1".into());
        match params.decode().unwrap() {
            EpisodeRequest::Resolve(EpisodeResolution::ActiveForSession(session_id)) => {
                assert_eq!(session_id, "s1");
            }
            _ => panic!("expected ActiveForSession resolution"),
        }
    }

    #[test]
    fn get_with_no_identifying_field_is_rejected() {
        let params = base(EpisodeActionParam::Get);
        assert!(params.decode().is_err());
    }

    #[test]
    fn begin_requires_session_and_name() {
        let params = base(EpisodeActionParam::Begin);
        assert!(params.decode().is_err());
    }
}
