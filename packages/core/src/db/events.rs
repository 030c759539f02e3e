//! Domain Events for Tree Mutations
//!
//! `TreeService` emits these events after a mutation has been written,
//! including the descendant cascades it triggered. Subscribers receive them
//! through a tokio broadcast channel; emitting without subscribers is not an
//! error.

use crate::models::TreeNode;

/// Domain events emitted by TreeService
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// A new node was created
    NodeCreated(TreeNode),

    /// An existing node was updated (possibly re-parented)
    NodeUpdated(TreeNode),

    /// A node was deleted
    NodeDeleted { id: String },

    /// The paths of a re-parented node's descendants were rewritten
    DescendantsRewritten {
        ancestor_id: String,
        old_prefix: String,
        new_prefix: String,
        count: u64,
    },

    /// The descendants of a deleted node were removed
    DescendantsRemoved { ancestor_id: String, count: u64 },
}

impl DomainEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            DomainEvent::NodeCreated(_) => "node:created",
            DomainEvent::NodeUpdated(_) => "node:updated",
            DomainEvent::NodeDeleted { .. } => "node:deleted",
            DomainEvent::DescendantsRewritten { .. } => "subtree:rewritten",
            DomainEvent::DescendantsRemoved { .. } => "subtree:removed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        let removed = DomainEvent::DescendantsRemoved {
            ancestor_id: "B".to_string(),
            count: 0,
        };
        assert_eq!(removed.event_type(), "subtree:removed");

        let deleted = DomainEvent::NodeDeleted {
            id: "B".to_string(),
        };
        assert_eq!(deleted.event_type(), "node:deleted");
    }
}
