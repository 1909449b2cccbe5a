//! Operation Tree Builder.
//!
//! Accumulates per-path operations into an [`OperationLeaf`] tree, rejecting
//! a leaf whose path granularity the requested kind doesn't allow before it
//! ever reaches the pipeline.

use lwm2m_core::{LwM2mError, Path, PathKind};
use lwm2m_protocol::{OperationLeaf, RequestKind, Tree};

/// Builds one [`Tree<OperationLeaf>`], validating each added path against
/// the target-granularity rules for the request kind.
#[derive(Debug)]
pub struct OperationBuilder {
    kind: RequestKind,
    tree: Tree<OperationLeaf>,
    leaf_count: usize,
}

impl OperationBuilder {
    #[must_use]
    pub fn new(kind: RequestKind) -> Self {
        Self { kind, tree: Tree::new(), leaf_count: 0 }
    }

    /// Add one leaf at `path`. Fails if `path`'s granularity is not one this
    /// `kind` of request may target.
    pub fn add(mut self, path: Path, leaf: OperationLeaf) -> Result<Self, LwM2mError> {
        validate_target(self.kind, &path)?;
        self.tree.insert(path, leaf);
        self.leaf_count += 1;
        Ok(self)
    }

    /// Finish the tree, enforcing `max_leaves` (`RuntimeConfig::max_leaves_per_request`).
    pub fn build(self, max_leaves: u32) -> Result<Tree<OperationLeaf>, LwM2mError> {
        if self.leaf_count as u32 > max_leaves {
            return Err(LwM2mError::OperationInvalid {
                reason: format!("{} leaves exceeds configured max of {max_leaves}", self.leaf_count),
            });
        }
        Ok(self.tree)
    }
}

/// Target-granularity rule per request kind.
fn validate_target(kind: RequestKind, path: &Path) -> Result<(), LwM2mError> {
    let allowed: &[PathKind] = match kind {
        RequestKind::Read | RequestKind::WriteAttributes | RequestKind::Discover => {
            &[PathKind::Object, PathKind::ObjectInstance, PathKind::Resource]
        }
        RequestKind::Write => &[PathKind::ObjectInstance, PathKind::Resource],
        RequestKind::Execute => &[PathKind::Resource],
        RequestKind::Delete => &[PathKind::ObjectInstance, PathKind::Resource],
        RequestKind::Observe | RequestKind::CancelObserve => {
            &[PathKind::Object, PathKind::ObjectInstance, PathKind::Resource]
        }
        RequestKind::Create => &[PathKind::Object],
        RequestKind::Connect
        | RequestKind::Disconnect
        | RequestKind::Define
        | RequestKind::ListClients => &[],
    };

    if allowed.iter().any(|k| path.is_valid_for(*k)) {
        Ok(())
    } else {
        Err(LwM2mError::OperationInvalid {
            reason: format!("{kind:?} does not accept a target of this granularity: {path}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_accepts_object_instance_and_resource() {
        let b = OperationBuilder::new(RequestKind::Read);
        let b = b.add(Path::parse("/1000").unwrap(), OperationLeaf::Read).unwrap();
        let b = b.add(Path::parse("/1000/0").unwrap(), OperationLeaf::Read).unwrap();
        let b = b.add(Path::parse("/1000/0/101").unwrap(), OperationLeaf::Read).unwrap();
        assert_eq!(b.build(10).unwrap().leaf_count(), 3);
    }

    #[test]
    fn execute_rejects_instance_target() {
        let b = OperationBuilder::new(RequestKind::Execute);
        let err = b.add(Path::parse("/1000/0").unwrap(), OperationLeaf::Execute { args: None });
        assert!(matches!(err, Err(LwM2mError::OperationInvalid { .. })));
    }

    #[test]
    fn create_only_accepts_object_target() {
        let b = OperationBuilder::new(RequestKind::Create);
        assert!(b
            .add(Path::parse("/1000").unwrap(), OperationLeaf::Create { value: None })
            .is_ok());
    }

    #[test]
    fn build_enforces_max_leaves() {
        let b = OperationBuilder::new(RequestKind::Read);
        let b = b.add(Path::parse("/1000/0/101").unwrap(), OperationLeaf::Read).unwrap();
        let b = b.add(Path::parse("/1000/0/102").unwrap(), OperationLeaf::Read).unwrap();
        assert!(matches!(b.build(1), Err(LwM2mError::OperationInvalid { .. })));
    }
}
