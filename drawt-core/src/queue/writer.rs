//! Writers continue the gesture that pushed an action - dragging updates a Translate's end, drawing adds segments
//! to a new stroke. Every edit goes to both the logged action and the live entity, so the two never disagree.

use crate::commands::{Action, CommandError};
use crate::state::entities::{Entity, EntityKind, LinePoint, Segment};

pub struct ActionWriter<'a> {
    pub(crate) action: &'a mut Action,
    pub(crate) entity: &'a mut Entity,
}
impl ActionWriter<'_> {
    #[must_use]
    pub fn action(&self) -> &Action {
        self.action
    }
    #[must_use]
    pub fn entity(&self) -> &Entity {
        self.entity
    }
    /// Move the end of a Translate.
    pub fn set_translation(&mut self, position: [f32; 2]) -> Result<(), CommandError> {
        let Action::Translate(translate) = &mut *self.action else {
            return Err(CommandError::MismatchedState);
        };
        translate.end = position;
        self.entity.set_position(position);
        Ok(())
    }
    /// Move the end of a Rotate.
    pub fn set_rotation(&mut self, rotation: f32) -> Result<(), CommandError> {
        let Action::Rotate(rotate) = &mut *self.action else {
            return Err(CommandError::MismatchedState);
        };
        rotate.end = rotation;
        self.entity.set_rotation(rotation);
        Ok(())
    }
    /// Move the end of a Scale, or size a grid, circle or image that is still being created.
    pub fn set_size(&mut self, size: [f32; 2]) -> Result<(), CommandError> {
        match &mut *self.action {
            Action::Scale(scale) => {
                self.entity.set_size(size)?;
                scale.end = size;
                Ok(())
            }
            Action::Create(_) => self.entity.set_size(size),
            _ => Err(CommandError::MismatchedState),
        }
    }
    /// Extend a stroke that is still being drawn.
    pub fn push_segment(&mut self, segment: Segment) -> Result<(), CommandError> {
        self.edit_created(|kind| match kind {
            EntityKind::Pencil(pencil) => {
                pencil.lines.push(segment);
                Ok(())
            }
            _ => Err(CommandError::Unsupported),
        })
    }
    /// Drag the far end of a line that is still being drawn.
    pub fn set_line_end(&mut self, end: LinePoint) -> Result<(), CommandError> {
        self.edit_created(|kind| match kind {
            EntityKind::Line(line) => {
                line.line.b = end;
                Ok(())
            }
            _ => Err(CommandError::Unsupported),
        })
    }
    pub fn set_grid_cells(&mut self, cells: [u32; 2]) -> Result<(), CommandError> {
        self.edit_created(|kind| match kind {
            EntityKind::Grid(grid) => {
                grid.cells = cells;
                Ok(())
            }
            _ => Err(CommandError::Unsupported),
        })
    }
    fn edit_created(
        &mut self,
        f: impl FnOnce(&mut EntityKind) -> Result<(), CommandError>,
    ) -> Result<(), CommandError> {
        if !matches!(self.action, Action::Create(_)) {
            return Err(CommandError::MismatchedState);
        }
        self.entity.edit_kind(f)
    }
}
