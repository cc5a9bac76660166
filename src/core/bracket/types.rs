//! Types for the bracket module.

use crate::core::photo::Photo;

/// An ordered, non-empty run of exposures of one scene.
///
/// Stacks are built by [`BracketDetector`](super::BracketDetector) and
/// are read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    photos: Vec<Photo>,
    /// Signed exposure-bias step between consecutive members, fixed by
    /// the first two photos
    step: Option<f64>,
}

impl Stack {
    pub(crate) fn start(photo: Photo) -> Self {
        Self {
            photos: vec![photo],
            step: None,
        }
    }

    pub(crate) fn push(&mut self, photo: Photo, step: f64) {
        if self.step.is_none() {
            self.step = Some(step);
        }
        self.photos.push(photo);
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn first(&self) -> &Photo {
        &self.photos[0]
    }

    pub fn last(&self) -> &Photo {
        &self.photos[self.photos.len() - 1]
    }

    /// The established exposure-bias step, once the stack has two members
    pub fn step(&self) -> Option<f64> {
        self.step
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Photo> {
        self.photos.iter()
    }
}

impl<'a> IntoIterator for &'a Stack {
    type Item = &'a Photo;
    type IntoIter = std::slice::Iter<'a, Photo>;

    fn into_iter(self) -> Self::IntoIter {
        self.photos.iter()
    }
}

/// The stacks found in one directory scan, in enumeration order.
///
/// Every photo belongs to at most one stack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackCollection {
    stacks: Vec<Stack>,
}

impl StackCollection {
    pub(crate) fn push(&mut self, stack: Stack) {
        self.stacks.push(stack);
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// Number of photos across all stacks
    pub fn total_photos(&self) -> usize {
        self.stacks.iter().map(Stack::len).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Stack> {
        self.stacks.iter()
    }

    pub fn as_slice(&self) -> &[Stack] {
        &self.stacks
    }
}

impl IntoIterator for StackCollection {
    type Item = Stack;
    type IntoIter = std::vec::IntoIter<Stack>;

    fn into_iter(self) -> Self::IntoIter {
        self.stacks.into_iter()
    }
}
