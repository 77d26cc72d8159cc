//! Entity component scene graph
//!
//! Worlds own entities, entities own components. Structural changes are
//! staged and committed once per frame so iteration never sees a list that
//! is being mutated.

pub mod component;
mod commands;
mod component_list;
mod components;
mod entity;
mod entity_list;
mod factory;
mod transform;
mod world;

pub use commands::{Command, CommandBuffer};
pub use component::{AsAny, Component, ComponentContext, ComponentId};
pub use component_list::ComponentList;
pub use components::Rotator;
pub use entity::{Entity, EntityId, WorldId};
pub use entity_list::{EntityList, FlushStats};
pub use factory::ComponentFactory;
pub use transform::Transform;
pub use world::World;
