//! Path parsing, construction and ordering.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LwM2mError;
use crate::ids::{InstanceId, ObjectId, ResourceId, ResourceInstanceId};

/// The granularity a path addresses, used by [`Path::is_valid_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Object,
    ObjectInstance,
    Resource,
}

/// A canonical LwM2M path: `/O`, `/O/I`, `/O/I/R`, or the virtual `/O/I/R/i`.
///
/// Constructible only through [`Path::parse`] or [`Path::new`] — every live
/// value already satisfies "leading slash, decimal segments, no gaps".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Path {
    Object(ObjectId),
    ObjectInstance(ObjectId, InstanceId),
    Resource(ObjectId, InstanceId, ResourceId),
    ResourceInstance(ObjectId, InstanceId, ResourceId, ResourceInstanceId),
}

impl Path {
    /// Construct directly from already-validated ID components.
    pub fn new(
        object: ObjectId,
        instance: Option<InstanceId>,
        resource: Option<ResourceId>,
        resource_instance: Option<ResourceInstanceId>,
    ) -> Result<Self, LwM2mError> {
        match (instance, resource, resource_instance) {
            (None, None, None) => Ok(Path::Object(object)),
            (Some(i), None, None) => Ok(Path::ObjectInstance(object, i)),
            (Some(i), Some(r), None) => Ok(Path::Resource(object, i, r)),
            (Some(i), Some(r), Some(ri)) => Ok(Path::ResourceInstance(object, i, r, ri)),
            _ => Err(LwM2mError::PathInvalid {
                reason: "resource or resource-instance present without required predecessor".into(),
            }),
        }
    }

    /// Parse a canonical path string: `/O(/I(/R(/i)?)?)?`.
    pub fn parse(s: &str) -> Result<Self, LwM2mError> {
        if !s.starts_with('/') {
            return Err(LwM2mError::PathInvalid {
                reason: "missing leading slash".into(),
            });
        }
        if s.len() > 1 && s.ends_with('/') {
            return Err(LwM2mError::PathInvalid {
                reason: "trailing slash not allowed".into(),
            });
        }

        let body = &s[1..];
        if body.is_empty() {
            return Err(LwM2mError::PathInvalid {
                reason: "empty path".into(),
            });
        }

        let mut segments = Vec::with_capacity(4);
        for segment in body.split('/') {
            segments.push(parse_segment(segment)?);
        }

        if segments.len() > 4 {
            return Err(LwM2mError::PathInvalid {
                reason: "too many segments".into(),
            });
        }

        let object = ObjectId::new(segments[0]).ok_or(LwM2mError::IdInvalid { value: segments[0] })?;
        let instance = segments
            .get(1)
            .map(|&v| InstanceId::new(v).ok_or(LwM2mError::IdInvalid { value: v }))
            .transpose()?;
        let resource = segments
            .get(2)
            .map(|&v| ResourceId::new(v).ok_or(LwM2mError::IdInvalid { value: v }))
            .transpose()?;
        let resource_instance = segments
            .get(3)
            .map(|&v| ResourceInstanceId::new(v).ok_or(LwM2mError::IdInvalid { value: v }))
            .transpose()?;

        Path::new(object, instance, resource, resource_instance)
    }

    /// Emit the canonical string form.
    #[must_use]
    pub fn make_path(&self) -> String {
        self.to_string()
    }

    /// Returns `true` if this path addresses exactly `kind`.
    #[must_use]
    pub fn is_valid_for(&self, kind: PathKind) -> bool {
        matches!(
            (self, kind),
            (Path::Object(_), PathKind::Object)
                | (Path::ObjectInstance(..), PathKind::ObjectInstance)
                | (Path::Resource(..), PathKind::Resource)
        )
    }

    #[must_use]
    pub fn object_id(&self) -> ObjectId {
        match *self {
            Path::Object(o)
            | Path::ObjectInstance(o, _)
            | Path::Resource(o, _, _)
            | Path::ResourceInstance(o, _, _, _) => o,
        }
    }

    #[must_use]
    pub fn instance_id(&self) -> Option<InstanceId> {
        match *self {
            Path::Object(_) => None,
            Path::ObjectInstance(_, i)
            | Path::Resource(_, i, _)
            | Path::ResourceInstance(_, i, _, _) => Some(i),
        }
    }

    #[must_use]
    pub fn resource_id(&self) -> Option<ResourceId> {
        match *self {
            Path::Resource(_, _, r) | Path::ResourceInstance(_, _, r, _) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn resource_instance_id(&self) -> Option<ResourceInstanceId> {
        match *self {
            Path::ResourceInstance(_, _, _, ri) => Some(ri),
            _ => None,
        }
    }

    /// Returns `true` if `other` addresses a descendant of, or `self` itself.
    #[must_use]
    pub fn contains(&self, other: &Path) -> bool {
        let self_tuple = self.as_tuple();
        let other_tuple = other.as_tuple();
        self_tuple
            .iter()
            .zip(other_tuple.iter())
            .all(|(a, b)| a == b)
            && self_tuple.len() <= other_tuple.len()
    }

    fn as_tuple(&self) -> Vec<u32> {
        let mut out = vec![self.object_id().value()];
        if let Some(i) = self.instance_id() {
            out.push(i.value());
        }
        if let Some(r) = self.resource_id() {
            out.push(r.value());
        }
        if let Some(ri) = self.resource_instance_id() {
            out.push(ri.value());
        }
        out
    }
}

fn parse_segment(segment: &str) -> Result<u32, LwM2mError> {
    if segment.is_empty() {
        return Err(LwM2mError::PathInvalid {
            reason: "empty path segment".into(),
        });
    }
    if segment.len() > 1 && segment.starts_with('0') {
        return Err(LwM2mError::PathInvalid {
            reason: "leading zero in path segment".into(),
        });
    }
    segment
        .parse::<u32>()
        .map_err(|_| LwM2mError::PathInvalid {
            reason: format!("non-decimal path segment {segment:?}"),
        })
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::Object(o) => write!(f, "/{o}"),
            Path::ObjectInstance(o, i) => write!(f, "/{o}/{i}"),
            Path::Resource(o, i, r) => write!(f, "/{o}/{i}/{r}"),
            Path::ResourceInstance(o, i, r, ri) => write!(f, "/{o}/{i}/{r}/{ri}"),
        }
    }
}

impl From<Path> for String {
    fn from(p: Path) -> Self {
        p.to_string()
    }
}

impl TryFrom<String> for Path {
    type Error = LwM2mError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Path::parse(&s)
    }
}

/// Paths compare lexicographically by numeric ID, not by string form.
impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Path {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_tuple().cmp(&other.as_tuple())
    }
}
