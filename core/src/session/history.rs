//! Bounded conversation window

use crate::llm::ChatMessage;

/// Turns sent to the model, oldest first
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: Vec<ChatMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.turns.push(message);
    }

    /// Keep only the most recent `max` turns
    pub fn trim(&mut self, max: usize) {
        if self.turns.len() > max {
            let excess = self.turns.len() - max;
            self.turns.drain(..excess);
        }
    }

    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_keeps_most_recent() {
        let mut history = ConversationHistory::new();
        for i in 0..25 {
            history.push(ChatMessage::user(format!("turn {}", i)));
            history.trim(10);
            assert!(history.len() <= 10);
        }

        let contents: Vec<_> = history.turns().iter().map(|m| m.content.clone()).collect();
        let expected: Vec<_> = (15..25).map(|i| format!("turn {}", i)).collect();
        assert_eq!(contents, expected);
    }

    #[test]
    fn test_trim_below_limit_is_noop() {
        let mut history = ConversationHistory::new();
        history.push(ChatMessage::user("a"));
        history.push(ChatMessage::assistant("b"));
        history.trim(10);
        assert_eq!(history.len(), 2);
        assert!(!history.is_empty());
    }
}
