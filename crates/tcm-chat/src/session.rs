//! Per-conversation session state
//!
//! Sessions are ephemeral: created on first query, dropped on reset or
//! process restart. The chat engine owns them exclusively; all mutation
//! goes through its turn transitions.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker of one history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// Phase of the most recent turn, tracked for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Retrieving,
    Generating,
    Failed,
}

/// Conversation state for one client
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    turns: VecDeque<Turn>,
    phase: TurnPhase,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            turns: VecDeque::new(),
            phase: TurnPhase::Idle,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: TurnPhase) {
        self.phase = phase;
    }

    /// History entries, oldest first
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Record a completed exchange and trim to the sliding window.
    /// Only called on success, so a failed turn never touches history.
    pub fn record_exchange(&mut self, query: &str, answer: &str, window: usize) {
        self.turns.push_back(Turn {
            role: Role::User,
            text: query.to_string(),
        });
        self.turns.push_back(Turn {
            role: Role::Assistant,
            text: answer.to_string(),
        });
        while self.turns.len() > window {
            self.turns.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_exchange_appends_user_then_assistant() {
        let mut session = Session::new("s1");
        session.record_exchange("什么是气虚", "气虚是指...", 10);
        let turns: Vec<&Turn> = session.turns().collect();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text, "什么是气虚");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].text, "气虚是指...");
    }

    #[test]
    fn window_drops_oldest_first() {
        let mut session = Session::new("s1");
        for i in 0..5 {
            session.record_exchange(&format!("q{}", i), &format!("a{}", i), 4);
        }
        assert_eq!(session.len(), 4);
        let texts: Vec<&str> = session.turns().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["q3", "a3", "q4", "a4"]);
    }

    #[test]
    fn history_never_exceeds_window() {
        let mut session = Session::new("s1");
        for i in 0..20 {
            session.record_exchange(&format!("q{}", i), "a", 6);
            assert!(session.len() <= 6);
        }
        assert_eq!(session.len(), 6);
    }
}
