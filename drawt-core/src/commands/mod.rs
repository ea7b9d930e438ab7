//! # Commands
//!
//! Actions are the way the entities of a scene are modified after they are created. Every gesture
//! (drawing a stroke, dragging, rotating, resizing) is recorded as exactly one [`Action`] in the scene's
//! [`ActionLog`](crate::queue::ActionLog), carrying both the before and after values of whatever it changed
//! so that it can be applied or unapplied in constant time through a [`CommandConsumer`].

use crate::id::EntityID;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("command constructed for a state that does not match the current state")]
    MismatchedState,
    #[error("resource referenced by the command is not found")]
    UnknownResource,
    #[error("command does not apply to this kind of resource")]
    Unsupported,
    #[error("strokes must contain at least one segment")]
    EmptyStroke,
    #[error("image path is too long to be stored")]
    PathTooLong,
}
pub trait CommandConsumer<C> {
    /// Apply a single command. If this generates an error,
    /// the state of `self` should *not* be observably changed.
    fn apply(&mut self, command: DoUndo<'_, C>) -> Result<(), CommandError>;
}

#[derive(PartialEq, Eq, Debug)]
pub enum DoUndo<'c, T> {
    Do(&'c T),
    Undo(&'c T),
}
impl<'c, T> DoUndo<'c, T> {
    #[must_use]
    pub fn inner(&self) -> &'c T {
        match self {
            Self::Do(c) | Self::Undo(c) => c,
        }
    }
}

/// The entity was created. It's geometry lives in the entity store, not here.
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Create {
    pub target: EntityID,
}
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Translate {
    pub target: EntityID,
    pub start: [f32; 2],
    pub end: [f32; 2],
}
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Rotate {
    pub target: EntityID,
    pub start: f32,
    pub end: f32,
}
/// Change of an entity's size vector. See [`EntityKind::size`](crate::state::entities::EntityKind::size).
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Scale {
    pub target: EntityID,
    pub start: [f32; 2],
    pub end: [f32; 2],
}

/// Persisted discriminant of an [`Action`].
#[derive(strum::FromRepr, strum::AsRefStr, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ActionTag {
    Create = 1,
    Translate = 2,
    Rotate = 3,
    Scale = 4,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Action {
    Create(Create),
    Translate(Translate),
    Rotate(Rotate),
    Scale(Scale),
}
impl Action {
    /// An action of the given kind with every field zeroed, ready to be filled in by a reader.
    #[must_use]
    pub fn zeroed(tag: ActionTag) -> Self {
        match tag {
            ActionTag::Create => Self::Create(bytemuck::Zeroable::zeroed()),
            ActionTag::Translate => Self::Translate(bytemuck::Zeroable::zeroed()),
            ActionTag::Rotate => Self::Rotate(bytemuck::Zeroable::zeroed()),
            ActionTag::Scale => Self::Scale(bytemuck::Zeroable::zeroed()),
        }
    }
    #[must_use]
    pub fn tag(&self) -> ActionTag {
        match self {
            Self::Create(_) => ActionTag::Create,
            Self::Translate(_) => ActionTag::Translate,
            Self::Rotate(_) => ActionTag::Rotate,
            Self::Scale(_) => ActionTag::Scale,
        }
    }
    #[must_use]
    pub fn target(&self) -> EntityID {
        match self {
            Self::Create(Create { target })
            | Self::Translate(Translate { target, .. })
            | Self::Rotate(Rotate { target, .. })
            | Self::Scale(Scale { target, .. }) => *target,
        }
    }
    /// Exact equality of every field, comparing floats by their bits.
    #[must_use]
    pub fn bits_eq(&self, other: &Self) -> bool {
        use bytemuck::bytes_of;
        match (self, other) {
            (Self::Create(a), Self::Create(b)) => bytes_of(a) == bytes_of(b),
            (Self::Translate(a), Self::Translate(b)) => bytes_of(a) == bytes_of(b),
            (Self::Rotate(a), Self::Rotate(b)) => bytes_of(a) == bytes_of(b),
            (Self::Scale(a), Self::Scale(b)) => bytes_of(a) == bytes_of(b),
            _ => false,
        }
    }
}
impl From<Create> for Action {
    fn from(value: Create) -> Self {
        Self::Create(value)
    }
}
impl From<Translate> for Action {
    fn from(value: Translate) -> Self {
        Self::Translate(value)
    }
}
impl From<Rotate> for Action {
    fn from(value: Rotate) -> Self {
        Self::Rotate(value)
    }
}
impl From<Scale> for Action {
    fn from(value: Scale) -> Self {
        Self::Scale(value)
    }
}

#[cfg(test)]
mod test {
    use super::{Action, ActionTag, Rotate, Translate};
    use crate::id::EntityID;

    #[test]
    fn zeroed_matches_tag() {
        for raw in 1..=4u8 {
            let tag = ActionTag::from_repr(raw).unwrap();
            let action = Action::zeroed(tag);
            assert_eq!(action.tag(), tag);
            assert_eq!(action.target(), EntityID(0));
        }
        assert!(ActionTag::from_repr(0).is_none());
        assert!(ActionTag::from_repr(5).is_none());
    }
    #[test]
    fn bits_eq() {
        let a = Action::from(Rotate {
            target: EntityID(1),
            start: 0.0,
            end: f32::NAN,
        });
        // Unlike PartialEq, identical NaNs are equal.
        assert!(a.bits_eq(&a));
        assert_ne!(a, a);

        let b = Action::from(Rotate {
            target: EntityID(1),
            start: -0.0,
            end: f32::NAN,
        });
        assert!(!a.bits_eq(&b));

        let c = Action::from(Translate {
            target: EntityID(1),
            start: [0.0; 2],
            end: [0.0; 2],
        });
        assert!(!a.bits_eq(&c));
    }
}
