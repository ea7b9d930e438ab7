//! Action Log
//!
//! The linear history of a scene. The cursor splits the log into *applied* actions, whose effects are visible
//! on the entities, and *parked* actions, which were undone and can still be redone.
//!
//! There is no redo tree - pushing a new action prunes everything parked, and that branch of history is gone.
//! The log itself never touches entities, see [`crate::state::Scene`] for the operations that keep both in step.

use crate::commands::Action;

pub mod writer;

/// Names an action appended to a log, for filling in the rest of its gesture later.
///
/// Only valid while the action is the newest applied one - once something is undone or pushed after it,
/// [`crate::state::Scene::writer`] refuses it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ActionHandle {
    index: usize,
    serial: u64,
}
impl ActionHandle {
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Clone, Debug, Default)]
pub struct ActionLog {
    actions: Vec<Action>,
    /// Number of applied actions. Always in `0..=actions.len()`
    cursor: usize,
    /// Bumped on every push, so handles to a pruned action don't alias its replacement.
    serial: u64,
}
impl ActionLog {
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor != 0
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor != self.actions.len()
    }
    #[must_use]
    pub fn applied(&self) -> &[Action] {
        &self.actions[..self.cursor]
    }
    #[must_use]
    pub fn parked(&self) -> &[Action] {
        &self.actions[self.cursor..]
    }
    /// Iterate the applied actions, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.applied().iter()
    }
    /// Remove every parked action, newest first - the order in which their effects must be torn down.
    pub(crate) fn take_parked(&mut self) -> impl Iterator<Item = Action> {
        self.actions.split_off(self.cursor).into_iter().rev()
    }
    /// Append after the cursor. Parked actions must have been taken already.
    pub(crate) fn push(&mut self, action: Action) -> ActionHandle {
        debug_assert!(!self.can_redo(), "pushed over parked actions");
        self.actions.truncate(self.cursor);
        self.actions.push(action);
        self.cursor = self.actions.len();
        self.serial += 1;
        ActionHandle {
            index: self.cursor - 1,
            serial: self.serial,
        }
    }
    /// Move the cursor back past one action, returning it.
    pub(crate) fn step_back(&mut self) -> Option<Action> {
        self.cursor = self.cursor.checked_sub(1)?;
        Some(self.actions[self.cursor])
    }
    /// Move the cursor forward past one action, returning it.
    pub(crate) fn step_forward(&mut self) -> Option<Action> {
        let action = *self.actions.get(self.cursor)?;
        self.cursor += 1;
        Some(action)
    }
    /// Get the action named by the handle, if it is still the newest applied action.
    pub(crate) fn head_mut(&mut self, handle: ActionHandle) -> Option<&mut Action> {
        if handle.serial != self.serial || self.can_redo() || handle.index + 1 != self.cursor {
            return None;
        }
        self.actions.get_mut(handle.index)
    }
    pub(crate) fn clear(&mut self) {
        self.actions.clear();
        self.cursor = 0;
    }
}
