//! `memory_conversation` tool contract (spec §6.1: `start, addMessage, get,
//! list, update, end, archive, search, linkContext, getContext`).

use std::collections::HashMap;

use memory_core::types::{ConversationId, EntryId, EntryType, MessageId, MessageRole};
use serde::{Deserialize, Serialize};

use crate::error::{ToolError, ToolResult};
use crate::query::EntryTypeParam;

pub const VALID_ACTIONS: &[&str] = &[
    "start", "addMessage", "get", "list", "update", "end", "archive", "search", "linkContext",
    "getContext",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConversationActionParam {
    Start,
    AddMessage,
    Get,
    List,
    Update,
    End,
    Archive,
    Search,
    LinkContext,
    GetContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRoleParam {
    User,
    Assistant,
    System,
}

impl From<MessageRoleParam> for MessageRole {
    fn from(value: MessageRoleParam) -> Self {
        match value {
            MessageRoleParam::User => MessageRole::User,
            MessageRoleParam::Assistant => MessageRole::Assistant,
            MessageRoleParam::System => MessageRole::System,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConversationParams {
    pub action: ConversationActionParam,
    #[serde(default)]
    pub id: Option<ConversationId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub role: Option<MessageRoleParam>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub context_entries: Vec<EntryId>,
    #[serde(default)]
    pub tools_used: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub message_id: Option<MessageId>,
    #[serde(default)]
    pub entry_type: Option<EntryTypeParam>,
    #[serde(default)]
    pub entry_id: Option<EntryId>,
    #[serde(default)]
    pub relevance_score: Option<f64>,
}

pub enum ConversationRequest {
    Start { title: String, session_id: Option<String>, project_id: Option<String> },
    AddMessage { conversation_id: ConversationId, role: MessageRole, content: String, context_entries: Vec<EntryId>, tools_used: Vec<String> },
    Get(ConversationId),
    List,
    Update { id: ConversationId, title: Option<String>, metadata: HashMap<String, String> },
    End(ConversationId),
    Archive(ConversationId),
    Search { conversation_id: ConversationId, query: String },
    LinkContext { conversation_id: ConversationId, message_id: Option<MessageId>, entry_type: EntryType, entry_id: EntryId, relevance_score: Option<f64> },
    GetContext(ConversationId),
}

fn missing_field(field: &str) -> ToolError {
    ToolError {
        error: format!("memory_conversation: '{field}' is required for this action"),
        code: "E1000",
        context: None,
    }
}

impl MemoryConversationParams {
    pub fn decode(&self) -> ToolResult<ConversationRequest> {
        match self.action {
            ConversationActionParam::Start => Ok(ConversationRequest::Start {
                title: self.title.clone().unwrap_or_else(|| "untitled".to_string()),
                session_id: self.session_id.clone(),
                project_id: self.project_id.clone(),
            }),
            ConversationActionParam::AddMessage => {
                let conversation_id = self.id.ok_or_else(|| missing_field("id"))?;
                let role = self.role.ok_or_else(|| missing_field("role"))?.into();
                let content = self.content.clone().ok_or_else(|| missing_field("content"))?;
                Ok(ConversationRequest::AddMessage {
                    conversation_id,
                    role,
                    content,
                    context_entries: self.context_entries.clone(),
                    tools_used: self.tools_used.clone(),
                })
            }
            ConversationActionParam::Get => Ok(ConversationRequest::Get(self.id.ok_or_else(|| missing_field("id"))?)),
            ConversationActionParam::List => Ok(ConversationRequest::List),
            ConversationActionParam::Update => Ok(ConversationRequest::Update {
                id: self.id.ok_or_else(|| missing_field("id"))?,
                title: self.title.clone(),
                metadata: self.metadata.clone(),
            }),
            ConversationActionParam::End => Ok(ConversationRequest::End(self.id.ok_or_else(|| missing_field("id"))?)),
            ConversationActionParam::Archive => {
                Ok(ConversationRequest::Archive(self.id.ok_or_else(|| missing_field("id"))?))
            }
            ConversationActionParam::Search => Ok(ConversationRequest::Search {
                conversation_id: self.id.ok_or_else(|| missing_field("id"))?,
                query: self.query.clone().ok_or_else(|| missing_field("query"))?,
            }),
            ConversationActionParam::LinkContext => Ok(ConversationRequest::LinkContext {
                conversation_id: self.id.ok_or_else(|| missing_field("id"))?,
                message_id: self.message_id,
                entry_type: self.entry_type.ok_or_else(|| missing_field("entryType"))?.into(),
                entry_id: self.entry_id.ok_or_else(|| missing_field("entryId"))?,
                relevance_score: self.relevance_score,
            }),
            ConversationActionParam::GetContext => {
                Ok(ConversationRequest::GetContext(self.id.ok_or_else(|| missing_field("id"))?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(action: ConversationActionParam) -> MemoryConversationParams {
        MemoryConversationParams {
            action,
            id: None,
            title: None,
            session_id: None,
            project_id: None,
            role: None,
            content: None,
            context_entries: Vec::new(),
            tools_used: Vec::new(),
            metadata: HashMap::new(),
            query: None,
            message_id: None,
            entry_type: None,
            entry_id: None,
            relevance_score: None,
        }
    }

    #[test]
    fn add_message_without_content_is_rejected() {
        let mut params = base(ConversationActionParam::AddMessage);
        params.id = Some(ConversationId::new_v4());
        params.role = Some(MessageRoleParam::User);
        assert!(params.decode().is_err());
    }

    #[test]
    fn start_defaults_title_when_absent() {
        let params = base(ConversationActionParam::Start);
        match params.decode().unwrap() {
            ConversationRequest::Start { title, .. } => assert_eq!(title, "untitled"),
            _ => panic!("expected Start"),
        }
    }

    #[test]
    fn link_context_requires_entry_type_and_id() {
        let mut params = base(ConversationActionParam::LinkContext);
        params.id = Some(ConversationId::new_v4());
        assert!(params.decode().is_err());
    }

    #[test]
    fn search_requires_query() {
        let mut params = base(ConversationActionParam::Search);
        params.id = Some(ConversationId::new_v4());
        assert!(params.decode().is_err());
    }
}
