//! Deferred world mutations queued by components
//!
//! A component cannot reach its own world while the world is iterating its
//! entities. It queues commands instead; the world applies them in FIFO
//! order after the update pass, which stages them for the next flush.

use super::{Entity, EntityId};

/// A structural change requested during an update
#[derive(Debug)]
pub enum Command {
    /// Add a new entity to the world
    Spawn(Entity),
    /// Destroy an entity and its descendants
    Destroy(EntityId),
    /// Remove an entity and its descendants without destroying them
    Detach(EntityId),
}

/// FIFO queue of [`Command`]s
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a spawn; returns the id the entity will have
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let id = entity.id();
        self.commands.push(Command::Spawn(entity));
        id
    }

    pub fn destroy(&mut self, entity: EntityId) {
        self.commands.push(Command::Destroy(entity));
    }

    pub fn detach(&mut self, entity: EntityId) {
        self.commands.push(Command::Detach(entity));
    }

    /// Take every queued command in submission order
    pub fn drain(&mut self) -> std::vec::Drain<'_, Command> {
        self.commands.drain(..)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_drain_in_order() {
        let mut buffer = CommandBuffer::new();
        let spawned = buffer.spawn(Entity::new("a"));
        buffer.destroy(spawned);
        buffer.detach(EntityId::from_raw(7));
        assert_eq!(buffer.len(), 3);

        let drained: Vec<_> = buffer.drain().collect();
        assert!(matches!(&drained[0], Command::Spawn(e) if e.id() == spawned));
        assert!(matches!(drained[1], Command::Destroy(id) if id == spawned));
        assert!(matches!(drained[2], Command::Detach(id) if id.raw() == 7));
        assert!(buffer.is_empty());
    }
}
