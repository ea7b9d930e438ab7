//! The two sides of a traversal: [`LiveProvider`] hands out a live scene's records for saving and fingerprinting,
//! [`SceneBuilder`] collects freshly read records into a scratch scene, checking them on the way in.

use super::traverse::{Header, Provider, TraverseError, SIGNATURE, VERSION};
use crate::commands::{Action, ActionTag};
use crate::id::{EntityID, IdCounter};
use crate::state::entities::{Entity, EntityTag};
use crate::state::{Scene, Tool, View};
use az::SaturatingAs;

/// Reads the applied actions of a scene, and the entities they create.
pub struct LiveProvider<'s> {
    scene: &'s Scene,
    header: Header,
    actions: std::slice::Iter<'s, Action>,
    /// The traversal needs a mutable entity. Records are copied here first, reusing its allocations.
    scratch: Entity,
}
impl<'s> LiveProvider<'s> {
    #[must_use]
    pub fn new(scene: &'s Scene) -> Self {
        let View {
            camera_position,
            camera_distance,
            tool,
            draw_color,
            draw_thickness,
        } = scene.view;
        Self {
            scene,
            header: Header {
                signature: SIGNATURE,
                version: VERSION,
                camera_distance,
                camera_position,
                tool: tool as u8,
                draw_color,
                draw_thickness,
                action_count: scene.log().cursor().saturating_as(),
                canvas_color: scene.canvas_color,
                id_counter: scene.entities().counter().get(),
            },
            actions: scene.log().iter(),
            scratch: Entity::zeroed(EntityID(0), EntityTag::Pencil),
        }
    }
}
impl Provider for LiveProvider<'_> {
    fn header(&mut self) -> &mut Header {
        &mut self.header
    }
    fn next_action(&mut self) -> Action {
        // The traversal asks for exactly `action_count` actions.
        *self
            .actions
            .next()
            .expect("traversal read past the applied actions")
    }
    fn entity_for_id(&mut self, id: EntityID) -> &mut Entity {
        self.scratch.assign_from(self.scene.entities().get(id));
        &mut self.scratch
    }
    fn complete_entity(&mut self) -> Result<(), TraverseError> {
        Ok(())
    }
    fn complete_action(&mut self, _: Action) -> Result<(), TraverseError> {
        Ok(())
    }
}

/// Assembles a scene from records as they are read. Nothing here touches a renderer or the image cache -
/// a scene only gets those once it is committed.
pub struct SceneBuilder {
    header: Header,
    scene: Scene,
    entity: Entity,
    created: u32,
}
impl Default for SceneBuilder {
    fn default() -> Self {
        Self {
            header: Header::default(),
            scene: Scene::default(),
            entity: Entity::zeroed(EntityID(0), EntityTag::Pencil),
            created: 0,
        }
    }
}
impl SceneBuilder {
    /// Take the finished scene. Its document metadata is left blank.
    pub fn finish(self) -> Result<Scene, TraverseError> {
        let Self {
            header,
            mut scene,
            created,
            ..
        } = self;
        // Creates are numbered from zero in log order, so the counter sits just past the last.
        if header.id_counter != created {
            return Err(TraverseError::CounterMismatch {
                counter: header.id_counter,
                created,
            });
        }
        scene
            .entities
            .set_counter(IdCounter::from_raw(header.id_counter));
        scene.canvas_color = header.canvas_color;
        scene.view = View {
            camera_position: header.camera_position,
            camera_distance: header.camera_distance,
            tool: Tool::from_repr(header.tool).unwrap_or_else(|| {
                log::warn!("unknown tool {}, using the default", header.tool);
                Tool::default()
            }),
            draw_color: header.draw_color,
            draw_thickness: header.draw_thickness,
        };
        Ok(scene)
    }
}
impl Provider for SceneBuilder {
    fn header(&mut self) -> &mut Header {
        &mut self.header
    }
    fn next_action(&mut self) -> Action {
        Action::zeroed(ActionTag::Create)
    }
    fn entity_for_id(&mut self, id: EntityID) -> &mut Entity {
        self.entity = Entity::zeroed(id, EntityTag::Pencil);
        &mut self.entity
    }
    fn complete_entity(&mut self) -> Result<(), TraverseError> {
        let mut entity = std::mem::replace(
            &mut self.entity,
            Entity::zeroed(EntityID(0), EntityTag::Pencil),
        );
        let expected = EntityID(self.created);
        if entity.id != expected {
            return Err(TraverseError::UnexpectedId {
                expected,
                found: entity.id,
            });
        }
        // Applied creates are always visible.
        if !entity.visible {
            return Err(TraverseError::HiddenEntity(entity.id));
        }
        entity.refresh();
        self.scene.entities.insert_detached(entity);
        self.created += 1;
        Ok(())
    }
    fn complete_action(&mut self, action: Action) -> Result<(), TraverseError> {
        match action {
            // Checked as its entity completed.
            Action::Create(_) => (),
            Action::Translate(_) | Action::Rotate(_) => {
                let target = action.target();
                if self.scene.entities.try_get(target).is_none() {
                    return Err(TraverseError::MissingTarget(target));
                }
            }
            Action::Scale(scale) => {
                let entity = self
                    .scene
                    .entities
                    .try_get(scale.target)
                    .ok_or(TraverseError::MissingTarget(scale.target))?;
                if entity.kind().size().is_none() {
                    return Err(TraverseError::NoSize(scale.target));
                }
            }
        }
        let _ = self.scene.log.push(action);
        Ok(())
    }
}
