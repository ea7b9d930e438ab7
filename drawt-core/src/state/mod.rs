//! # State
//!
//! A [`Scene`] is one drawing: its entities, the history that made them, and the metadata of the file it lives in.
//!
//! The only way to change a scene's entities is to push an action, and the only way to push an action is through
//! the scene, so that the entity store and the action log can never drift apart.

pub mod document;
pub mod entities;
pub mod transform;

pub use document::Document;

use crate::color::Color;
use crate::commands::{self, Action, CommandConsumer, CommandError, DoUndo};
use crate::id::EntityID;
use crate::queue::{writer::ActionWriter, ActionHandle, ActionLog};
use crate::render::{RenderTargetHandle, Renderer};
use entities::{EntityKind, EntityStore};
use transform::Similarity;

/// What a pointer does on the canvas.
#[derive(strum::FromRepr, strum::AsRefStr, Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Tool {
    #[default]
    Pencil = 0,
    Line = 1,
    Grid = 2,
    Circle = 3,
    Image = 4,
    Dropper = 5,
    Hand = 6,
    Rotate = 7,
    Scale = 8,
}

/// Camera and tool state. Saved with the file, but cosmetic - ignored by fingerprints and equality.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct View {
    pub camera_position: [f32; 2],
    pub camera_distance: f32,
    pub tool: Tool,
    pub draw_color: Color,
    pub draw_thickness: f32,
}
impl Default for View {
    fn default() -> Self {
        Self {
            camera_position: [0.0; 2],
            camera_distance: 1.0,
            tool: Tool::default(),
            draw_color: Color::WHITE,
            draw_thickness: 16.0,
        }
    }
}

pub struct Scene {
    pub(crate) entities: EntityStore,
    pub(crate) log: ActionLog,
    pub canvas_color: Color,
    pub view: View,
    pub(crate) document: Document,
    /// Survives loads into this scene.
    pub render_target: Option<RenderTargetHandle>,
}
impl Default for Scene {
    fn default() -> Self {
        Self {
            entities: EntityStore::default(),
            log: ActionLog::default(),
            canvas_color: Color::CANVAS,
            view: View::default(),
            document: Document::default(),
            render_target: None,
        }
    }
}
impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }
    #[must_use]
    pub fn log(&self) -> &ActionLog {
        &self.log
    }
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }
    /// Create a new, visible entity and log its creation.
    pub fn push_create(
        &mut self,
        kind: EntityKind,
        transform: Similarity,
        renderer: &mut dyn Renderer,
    ) -> Result<ActionHandle, CommandError> {
        kind.validate()?;
        // Pruned first, so the id of a pruned create is free to be handed out again.
        self.prune(renderer);
        let target = self.entities.create(kind, transform, renderer);
        let handle = self.push_unpruned(commands::Create { target }.into());
        if let Some(entity) = self.entities.get_mut(target) {
            entity.visible = true;
        }
        Ok(handle)
    }
    /// Start moving an entity. The gesture continues through [`ActionWriter::set_translation`].
    pub fn push_translate(
        &mut self,
        target: EntityID,
        renderer: &mut dyn Renderer,
    ) -> Result<ActionHandle, CommandError> {
        let start = self.visible(target)?.position();
        Ok(self.push(
            commands::Translate {
                target,
                start,
                end: start,
            }
            .into(),
            renderer,
        ))
    }
    /// Start rotating an entity. The gesture continues through [`ActionWriter::set_rotation`].
    pub fn push_rotate(
        &mut self,
        target: EntityID,
        renderer: &mut dyn Renderer,
    ) -> Result<ActionHandle, CommandError> {
        let start = self.visible(target)?.rotation();
        Ok(self.push(
            commands::Rotate {
                target,
                start,
                end: start,
            }
            .into(),
            renderer,
        ))
    }
    /// Start resizing an entity. The gesture continues through [`ActionWriter::set_size`].
    pub fn push_scale(
        &mut self,
        target: EntityID,
        renderer: &mut dyn Renderer,
    ) -> Result<ActionHandle, CommandError> {
        let start = self
            .visible(target)?
            .kind()
            .size()
            .ok_or(CommandError::Unsupported)?;
        Ok(self.push(
            commands::Scale {
                target,
                start,
                end: start,
            }
            .into(),
            renderer,
        ))
    }
    /// Continue the gesture of the newest action. `None` if the handle no longer names it.
    pub fn writer(&mut self, handle: ActionHandle) -> Option<ActionWriter<'_>> {
        let action = self.log.head_mut(handle)?;
        let entity = self.entities.get_mut(action.target())?;
        Some(ActionWriter { action, entity })
    }
    /// Unapply the newest applied action. Returns false if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(action) = self.log.step_back() else {
            return false;
        };
        self.apply(DoUndo::Undo(&action));
        true
    }
    /// Reapply the oldest parked action. Returns false if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(action) = self.log.step_forward() else {
            return false;
        };
        self.apply(DoUndo::Do(&action));
        true
    }
    /// The topmost visible entity under `point`.
    #[must_use]
    pub fn hit_test(&self, point: [f32; 2]) -> Option<EntityID> {
        self.entities.hit_test(point)
    }
    /// Hover the topmost visible entity under `point`, returning it.
    pub fn hover(&mut self, point: Option<[f32; 2]>) -> Option<EntityID> {
        let hovered = point.and_then(|point| self.hit_test(point));
        self.entities.set_hovered(hovered);
        hovered
    }
    /// Content fingerprint of everything that would be saved, minus the cosmetic view state.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        crate::io::fingerprint(self)
    }
    /// Exact comparison of everything that would be saved, minus the cosmetic view state.
    /// Parked actions, and the entities only they create, are not saved and so not compared.
    #[must_use]
    pub fn content_eq(&self, other: &Self) -> bool {
        if !self.canvas_color.bits_eq(&other.canvas_color)
            || self.entities.counter() != other.entities.counter()
            || self.log.cursor() != other.log.cursor()
        {
            return false;
        }
        self.log.iter().zip(other.log.iter()).all(|(a, b)| {
            a.bits_eq(b)
                && match a {
                    Action::Create(create) => {
                        match (
                            self.entities.try_get(create.target),
                            other.entities.try_get(create.target),
                        ) {
                            (Some(a), Some(b)) => a.content_eq(b),
                            _ => false,
                        }
                    }
                    _ => true,
                }
        })
    }
    /// Release every entity and forget all history.
    pub(crate) fn clear(&mut self, renderer: &mut dyn Renderer) {
        self.entities.clear(renderer);
        self.log.clear();
    }

    fn visible(&self, target: EntityID) -> Result<&entities::Entity, CommandError> {
        self.entities
            .try_get(target)
            .filter(|entity| entity.is_visible())
            .ok_or(CommandError::UnknownResource)
    }
    fn push(&mut self, action: Action, renderer: &mut dyn Renderer) -> ActionHandle {
        self.prune(renderer);
        self.push_unpruned(action)
    }
    fn push_unpruned(&mut self, action: Action) -> ActionHandle {
        log::trace!("pushing {action:?}");
        self.log.push(action)
    }
    /// Drop every parked action, destroying the entities they created.
    fn prune(&mut self, renderer: &mut dyn Renderer) {
        for action in self.log.take_parked() {
            if let Action::Create(commands::Create { target }) = action {
                if self.entities.remove(target, renderer).is_none() {
                    log::error!("dangling reference to {target} while pruning");
                    panic!("dangling reference to {target}");
                }
            }
        }
    }
    fn apply(&mut self, command: DoUndo<'_, Action>) {
        // Every logged action was valid against the state it is being applied to.
        // If not, the log and store have desynchronized and nothing can be trusted.
        let action = command.inner();
        if let Err(err) = self.entities.apply(command) {
            log::error!("log and entities desynchronized at {action:?}: {err}");
            panic!("log and entities desynchronized: {err}");
        }
    }
}
