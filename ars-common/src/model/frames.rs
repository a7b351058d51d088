//! Captured frame references

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to one captured image (file path or URI from the camera service)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameReference(String);

impl FrameReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FrameReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered burst of successfully captured frames
///
/// Holds between 0 and the configured burst size entries. Failed capture
/// attempts never appear here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameBatch(Vec<FrameReference>);

impl FrameBatch {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, frame: FrameReference) {
        self.0.push(frame);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrameReference> {
        self.0.iter()
    }
}

impl From<Vec<FrameReference>> for FrameBatch {
    fn from(frames: Vec<FrameReference>) -> Self {
        Self(frames)
    }
}

impl FromIterator<FrameReference> for FrameBatch {
    fn from_iter<T: IntoIterator<Item = FrameReference>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FrameBatch {
    type Item = &'a FrameReference;
    type IntoIter = std::slice::Iter<'a, FrameReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
