use std::sync::Arc;

use serde::{Deserialize, Serialize};
use weft_ai::{Message, Role};

use crate::error::EngineError;

/// Ordered conversation. Named sessions are persisted through a
/// `SessionStore`; anonymous ones live for a single request. A turn is
/// closed once its assistant message lands; the next user message opens
/// a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Session {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub messages: Vec<Message>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            messages: vec![],
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// True while the latest turn still awaits its assistant reply.
    pub fn turn_open(&self) -> bool {
        matches!(
            self.messages.last(),
            Some(message) if message.role != Role::Assistant
        )
    }

    pub fn close_turn(&mut self, reply: Message) {
        debug_assert_eq!(reply.role, Role::Assistant);
        self.messages.push(reply);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

pub trait SessionStore: Send + Sync {
    fn load(&self, name: &str) -> Option<Session>;
    fn save(&self, name: &str, session: &Session) -> Result<(), EngineError>;
    fn list(&self) -> Vec<String>;
}

pub type SessionStoreRef = Arc<dyn SessionStore>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_state_tracks_last_role() {
        let mut session = Session::anonymous();
        assert!(!session.turn_open());

        session.append(Message::system("sys"));
        session.append(Message::user("question"));
        assert!(session.turn_open());

        session.close_turn(Message::assistant("answer"));
        assert!(!session.turn_open());
    }

    #[test]
    fn named_session_round_trips_through_json() {
        let mut session = Session::named("research");
        session.append(Message::user("q"));
        session.close_turn(Message::assistant("a"));

        let encoded = serde_json::to_string(&session).unwrap();
        let decoded: Session = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, session);
    }
}
