//! Groups a flat list of photos into exposure brackets.
//!
//! A single pass keeps one open stack. Each photo either extends it or
//! closes it. Ambiguity always closes the stack: it is cheaper to miss
//! a bracket than to fuse two unrelated scenes.
//!
//! ## Extension rule
//! A photo extends the open stack when, compared with the last member:
//! 1. camera and lens are known and the same
//! 2. it was captured no later than 1s plus both shutter times afterwards
//! 3. its exposure bias differs
//! 4. once the stack has two members, the signed bias step is unchanged
//!
//! Symmetric camera sequences such as `0, -2, +2` are not recognized;
//! only strictly monotonic runs with a fixed step are.

use super::types::{Stack, StackCollection};
use crate::core::photo::Photo;

/// Slack allowed between capture timestamps, on top of exposure times
const CAPTURE_GAP_SECONDS: f64 = 1.0;

/// Bias steps closer than this are considered equal
const STEP_TOLERANCE: f64 = 0.01;

/// Why a photo did not extend the open stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakReason {
    /// Missing camera, lens, capture date or exposure bias
    Incomplete,
    DifferentCamera,
    DifferentLens,
    NotContiguous,
    RepeatedBias,
    StepChanged,
}

/// Finds brackets in enumeration order
#[derive(Debug, Clone)]
pub struct BracketDetector {
    min_stack_size: usize,
}

impl BracketDetector {
    /// Create a detector that emits stacks of at least `min_stack_size`
    /// photos (never less than 2)
    pub fn new(min_stack_size: usize) -> Self {
        Self {
            min_stack_size: min_stack_size.max(2),
        }
    }

    pub fn min_stack_size(&self) -> usize {
        self.min_stack_size
    }

    /// Group `photos` into disjoint, ordered stacks.
    pub fn find_brackets(&self, photos: &[Photo]) -> StackCollection {
        let mut collection = StackCollection::default();
        let mut open: Option<Stack> = None;

        for photo in photos {
            if !is_complete(photo) {
                tracing::debug!(photo = %photo.filename(), "Incomplete metadata, not stackable");
                self.close(open.take(), &mut collection);
                continue;
            }

            open = match open.take() {
                None => Some(Stack::start(photo.clone())),
                Some(mut stack) => match self.extends(&stack, photo) {
                    Ok(step) => {
                        stack.push(photo.clone(), step);
                        Some(stack)
                    }
                    Err(reason) => {
                        tracing::debug!(
                            photo = %photo.filename(),
                            last = %stack.last().filename(),
                            ?reason,
                            "Photo breaks the open stack"
                        );
                        self.close(Some(stack), &mut collection);
                        Some(Stack::start(photo.clone()))
                    }
                },
            };
        }
        self.close(open, &mut collection);

        tracing::info!(
            stacks = collection.len(),
            photos = photos.len(),
            "Bracket detection complete"
        );
        collection
    }

    /// Check whether `photo` continues `stack`, returning the signed bias step.
    pub fn extends(&self, stack: &Stack, photo: &Photo) -> Result<f64, BreakReason> {
        let last = stack.last();

        if photo.camera() != last.camera() {
            return Err(BreakReason::DifferentCamera);
        }
        if photo.lens() != last.lens() {
            return Err(BreakReason::DifferentLens);
        }

        let (Some(date), Some(last_date)) = (photo.date(), last.date()) else {
            return Err(BreakReason::Incomplete);
        };
        let gap = (date - last_date).num_milliseconds() as f64 / 1000.0;
        let allowed = CAPTURE_GAP_SECONDS
            + photo.shutter_speed().unwrap_or(0.0)
            + last.shutter_speed().unwrap_or(0.0);
        if gap < 0.0 || gap > allowed {
            return Err(BreakReason::NotContiguous);
        }

        let (Some(bias), Some(last_bias)) = (photo.exposure_bias(), last.exposure_bias()) else {
            return Err(BreakReason::Incomplete);
        };
        let step = bias - last_bias;
        if step.abs() < STEP_TOLERANCE {
            return Err(BreakReason::RepeatedBias);
        }

        match stack.step() {
            Some(expected) if (step - expected).abs() >= STEP_TOLERANCE => {
                Err(BreakReason::StepChanged)
            }
            _ => Ok(step),
        }
    }

    fn close(&self, stack: Option<Stack>, collection: &mut StackCollection) {
        if let Some(stack) = stack {
            if stack.len() >= self.min_stack_size {
                tracing::debug!(size = stack.len(), first = %stack.first().filename(), "Saved stack");
                collection.push(stack);
            }
        }
    }
}

impl Default for BracketDetector {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Camera and lens must be known: two photos missing both would
/// otherwise compare equal
fn is_complete(photo: &Photo) -> bool {
    photo.camera().is_some()
        && photo.lens().is_some()
        && photo.date().is_some()
        && photo.exposure_bias().is_some()
}
