//! Set of message ids the poll loop has already acted upon

use std::sync::Arc;

use dashmap::DashSet;

/// Seen-message set.
///
/// Ids are never evicted: the set grows for the life of the process.
#[derive(Debug, Default, Clone)]
pub struct SeenSet {
    ids: Arc<DashSet<String>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self {
            ids: Arc::new(DashSet::new()),
        }
    }

    /// Mark an id as seen. Returns `true` if it was not seen before.
    pub fn mark(&self, message_id: &str) -> bool {
        self.ids.insert(message_id.to_string())
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.ids.contains(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_once() {
        let seen = SeenSet::new();
        assert!(seen.mark("m1"));
        assert!(!seen.mark("m1"));
        assert!(seen.contains("m1"));
        assert!(!seen.contains("m2"));
    }

    #[test]
    fn test_clone_shares_ids() {
        let seen = SeenSet::new();
        let handle = seen.clone();
        handle.mark("m1");

        assert!(seen.contains("m1"));
        assert!(!seen.contains("m2"));
    }
}
