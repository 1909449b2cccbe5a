//! Change classification delivered through a `ChangeSet`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    ResourceCreated,
    ResourceModified,
    ResourceDeleted,
    InstanceCreated,
    InstanceModified,
    InstanceDeleted,
    /// Emitted once, synchronously, when a `ChangeSubscription` is first
    /// registered against a path that already has a value.
    Current,
}
