//! Scene event queue
//!
//! A double-buffered queue of things that happened to a world's entities.
//! Events are written during one frame and read during the next, so
//! observers see a frame-consistent view regardless of update order.
//!
//! # Example
//!
//! ```ignore
//! world.update(&mut frame);
//!
//! for event in world.events().iter() {
//!     if let SceneEvent::EntityDestroyed { entity } = event {
//!         forget_selection(*entity);
//!     }
//! }
//! ```

use std::collections::VecDeque;

use crate::ecs::EntityId;

// ============================================================================
// Event Types
// ============================================================================

/// Structural changes to a world
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SceneEvent {
    /// A flush committed additions or removals
    EntitiesChanged {
        /// Entities committed by the flush
        added: usize,
        /// Entities removed by the flush
        removed: usize,
    },

    /// An entity was destroyed; it leaves the world at the next flush
    EntityDestroyed { entity: EntityId },

    /// An entity was detached and can be moved to another world
    EntityDetached { entity: EntityId },
}

// ============================================================================
// Event Queue
// ============================================================================

/// Double-buffered event queue.
///
/// Events pushed during frame N are available for reading during frame N+1.
#[derive(Debug)]
pub struct EventQueue {
    /// Events being written this frame
    pending: VecDeque<SceneEvent>,
    /// Events from previous frame, ready for processing
    processing: VecDeque<SceneEvent>,
}

impl EventQueue {
    const DEFAULT_CAPACITY: usize = 64;

    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            processing: VecDeque::with_capacity(capacity),
        }
    }

    /// Push an event to be read next frame
    #[inline]
    pub fn push(&mut self, event: SceneEvent) {
        self.pending.push_back(event);
    }

    /// Make this frame's events readable and start a new pending queue.
    /// Called once per frame by the world.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Events from the previous frame
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &SceneEvent> {
        self.processing.iter()
    }

    /// Take the events from the previous frame
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = SceneEvent> + '_ {
        self.processing.drain(..)
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    /// Number of events ready for reading
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    /// Number of events written this frame
    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop both buffers, e.g. when a scene is reloaded
    pub fn clear(&mut self) {
        self.pending.clear();
        self.processing.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
