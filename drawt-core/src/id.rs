//! # IDs
//! Entities are identified by a small integer that is unique within the scene owning them. Ids are handed out
//! by an [`IdCounter`] owned by the scene's entity store, and only ever by a Create action.
//!
//! Undoing a Create hands its id back to the counter. The id is only given out again once the parked Create
//! (and with it, the entity) has been pruned, so no two entities of a scene ever share an id.

/// Identifies an entity within its scene. Ids from different scenes may share a value but are unrelated.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(transparent)]
pub struct EntityID(pub u32);

impl EntityID {
    /// Get the raw numeric value of this ID.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}
impl std::fmt::Display for EntityID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity#{}", self.0)
    }
}
impl std::fmt::Debug for EntityID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <EntityID as std::fmt::Display>::fmt(self, f)
    }
}

/// The next id to be handed out. Every id below the counter belongs to an applied Create.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
#[repr(transparent)]
pub struct IdCounter(u32);

impl IdCounter {
    /// Rebuild a counter from its persisted value.
    #[must_use]
    pub(crate) fn from_raw(next: u32) -> Self {
        Self(next)
    }
    /// The raw value, as it is persisted.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
    /// The id that the next call to [`Self::allocate`] will return.
    #[must_use]
    pub fn peek(self) -> EntityID {
        EntityID(self.0)
    }
    /// Take the next id.
    pub(crate) fn allocate(&mut self) -> EntityID {
        let id = self.0;
        // A scene with four billion creates has other problems, but the counter must never wrap -
        // that would hand out ids of live entities.
        let Some(next) = id.checked_add(1) else {
            log::error!("{} overflow!", std::any::type_name::<EntityID>());
            panic!("EntityID overflow");
        };
        self.0 = next;
        EntityID(id)
    }
    /// Hand back the most recently allocated id. Used when a Create is undone.
    pub(crate) fn release(&mut self) {
        // Logic error to release more than was allocated. The log and store are desynchronized.
        self.0 = self
            .0
            .checked_sub(1)
            .expect("released an entity id that was never allocated");
    }
}
