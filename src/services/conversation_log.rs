//! 对话记录

use std::collections::VecDeque;

use crate::models::ConversationEntry;

/// 最近 M 条对话，超出后从最早的条目开始淘汰
#[derive(Debug, Clone)]
pub struct ConversationLog {
    entries: VecDeque<ConversationEntry>,
    capacity: usize,
}

impl ConversationLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, entry: ConversationEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> Vec<ConversationEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<&ConversationEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_bounded_fifo() {
        let mut log = ConversationLog::new(6);
        for i in 0..20 {
            log.append(ConversationEntry::subject(format!("sentence {}", i)));
            assert!(log.len() <= 6);
        }

        let texts: Vec<String> = log.entries().into_iter().map(|e| e.text).collect();
        assert_eq!(
            texts,
            (14..20).map(|i| format!("sentence {}", i)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_keeps_roles() {
        let mut log = ConversationLog::new(6);
        log.append(ConversationEntry::subject("I am experiencing pain."));
        log.append(ConversationEntry::counterpart("Where does it hurt?"));

        assert_eq!(log.entries()[0].role, Role::Subject);
        assert_eq!(log.last().map(|e| e.role), Some(Role::Counterpart));
    }

    #[test]
    fn test_clear() {
        let mut log = ConversationLog::new(2);
        log.append(ConversationEntry::subject("one"));
        log.clear();

        assert!(log.is_empty());
        assert!(log.last().is_none());
        assert_eq!(log.capacity(), 2);
    }
}
