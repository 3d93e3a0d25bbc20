//! Conversation/message repository (spec §3 `Conversation`/`Message`,
//! §6.1 `memory_conversation` actions).

use crate::constants::size_limits;
use crate::error::{Error, Result};
use crate::storage::Database;
use crate::types::*;
use crate::validation::{check_len, require_non_empty};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct ConversationRepository {
    db: Arc<Database>,
}

impl ConversationRepository {
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn start(&self, title: impl Into<String>, session_id: Option<String>, project_id: Option<String>) -> Conversation {
        let mut c = Conversation::new(title);
        c.session_id = session_id;
        c.project_id = project_id;
        self.db.insert_conversation(c.clone());
        c
    }

    #[must_use]
    pub fn get(&self, id: ConversationId) -> Option<Conversation> {
        self.db.get_conversation(id)
    }

    #[must_use]
    pub fn list(&self) -> Vec<Conversation> {
        self.db.list_conversations()
    }

    /// Adding a message to a non-active conversation fails with
    /// `ValidationError` (spec §8 round-trip behavior).
    pub fn add_message(
        &self,
        conversation_id: ConversationId,
        role: MessageRole,
        content: String,
        context_entries: Vec<EntryId>,
        tools_used: Vec<String>,
    ) -> Result<Message> {
        require_non_empty("content", &content)?;
        check_len("content", &content, size_limits::CONTENT_MAX_LENGTH)?;
        if context_entries.len() > size_limits::MESSAGE_CONTEXT_ENTRIES_MAX {
            return Err(Error::size_limit(
                "contextEntries",
                size_limits::MESSAGE_CONTEXT_ENTRIES_MAX,
                context_entries.len(),
            ));
        }
        if tools_used.len() > size_limits::MESSAGE_TOOLS_USED_MAX {
            return Err(Error::size_limit(
                "toolsUsed",
                size_limits::MESSAGE_TOOLS_USED_MAX,
                tools_used.len(),
            ));
        }
        let conversation = self
            .db
            .get_conversation(conversation_id)
            .ok_or_else(|| Error::not_found(conversation_id.to_string()))?;
        if !conversation.accepts_messages() {
            return Err(Error::validation(
                "conversation",
                "cannot add a message to a non-active conversation",
            ));
        }
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            role,
            content,
            context_entries,
            tools_used,
            metadata: Default::default(),
            created_at: Utc::now(),
        };
        self.db.insert_message(message.clone());
        Ok(message)
    }

    #[must_use]
    pub fn messages(&self, conversation_id: ConversationId) -> Vec<Message> {
        self.db.messages_for_conversation(conversation_id)
    }

    /// Status monotonically advances: `active -> completed -> archived`
    /// (spec §8 round-trip behavior).
    pub fn end(&self, id: ConversationId) -> Result<Conversation> {
        let mut c = self.db.get_conversation(id).ok_or_else(|| Error::not_found(id.to_string()))?;
        if c.status == ConversationStatus::Archived {
            return Err(Error::validation("status", "cannot end an archived conversation"));
        }
        c.status = ConversationStatus::Completed;
        c.updated_at = Utc::now();
        self.db.update_conversation(c.clone());
        Ok(c)
    }

    pub fn archive(&self, id: ConversationId) -> Result<Conversation> {
        let mut c = self.db.get_conversation(id).ok_or_else(|| Error::not_found(id.to_string()))?;
        c.status = ConversationStatus::Archived;
        c.updated_at = Utc::now();
        self.db.update_conversation(c.clone());
        Ok(c)
    }

    /// Update the title (metadata beyond title is merged key-by-key).
    pub fn update(&self, id: ConversationId, title: Option<String>, metadata: std::collections::HashMap<String, String>) -> Result<Conversation> {
        let mut c = self.db.get_conversation(id).ok_or_else(|| Error::not_found(id.to_string()))?;
        if let Some(title) = title {
            check_len("title", &title, size_limits::TITLE_MAX_LENGTH)?;
            c.title = title;
        }
        c.metadata.extend(metadata);
        c.updated_at = Utc::now();
        self.db.update_conversation(c.clone());
        Ok(c)
    }

    /// Substring search over message content within a conversation, mirroring
    /// the teacher's FTS substring-fallback idiom rather than a full index
    /// (spec does not require a separate message FTS table).
    #[must_use]
    pub fn search(&self, conversation_id: ConversationId, query: &str) -> Vec<Message> {
        let needle = query.to_lowercase();
        self.db
            .messages_for_conversation(conversation_id)
            .into_iter()
            .filter(|m| m.content.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn link_context(
        &self,
        conversation_id: ConversationId,
        message_id: Option<MessageId>,
        entry_type: EntryType,
        entry_id: EntryId,
        relevance_score: Option<f64>,
    ) -> ConversationContext {
        let ctx = ConversationContext {
            id: Uuid::new_v4(),
            conversation_id,
            message_id,
            entry_type,
            entry_id,
            relevance_score,
        };
        self.db.link_context(ctx.clone());
        ctx
    }

    #[must_use]
    pub fn context(&self, conversation_id: ConversationId) -> Vec<ConversationContext> {
        self.db.context_for_conversation(conversation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_conversation_accepts_messages() {
        let repo = ConversationRepository::new(Arc::new(Database::new()));
        let c = repo.start("test", None, None);
        let msg = repo.add_message(c.id, MessageRole::User, "hello".into(), vec![], vec![]);
        assert!(msg.is_ok());
    }

    #[test]
    fn archived_conversation_rejects_messages() {
        let repo = ConversationRepository::new(Arc::new(Database::new()));
        let c = repo.start("test", None, None);
        repo.archive(c.id).unwrap();
        let msg = repo.add_message(c.id, MessageRole::User, "hello".into(), vec![], vec![]);
        assert!(matches!(msg, Err(Error::Validation { .. })));
    }

    #[test]
    fn end_then_archive_advances_monotonically() {
        let repo = ConversationRepository::new(Arc::new(Database::new()));
        let c = repo.start("test", None, None);
        let completed = repo.end(c.id).unwrap();
        assert_eq!(completed.status, ConversationStatus::Completed);
        let archived = repo.archive(c.id).unwrap();
        assert_eq!(archived.status, ConversationStatus::Archived);
    }

    #[test]
    fn messages_ordered_by_arrival() {
        let repo = ConversationRepository::new(Arc::new(Database::new()));
        let c = repo.start("test", None, None);
        repo.add_message(c.id, MessageRole::User, "first".into(), vec![], vec![]).unwrap();
        repo.add_message(c.id, MessageRole::Assistant, "second".into(), vec![], vec![]).unwrap();
        let msgs = repo.messages(c.id);
        assert_eq!(msgs[0].content, "first");
        assert_eq!(msgs[1].content, "second");
    }
}
