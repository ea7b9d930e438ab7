//! # Entities
//!
//! Drawable objects of a scene, and the [`EntityStore`] that owns them by id.
//!
//! An entity's placement is a [`Similarity`] (its pivot and rotation), its geometry is an [`EntityKind`],
//! relative to that pivot. The cached bounds are derived from both and refreshed by every mutator,
//! so outside the crate entities are read-only.

use crate::color::Color;
use crate::commands::{self, Action, CommandConsumer, CommandError, DoUndo};
use crate::geometry::Aabb;
use crate::id::{EntityID, IdCounter};
use crate::render::{RenderHandle, Renderer};
use crate::repositories::images::{self, ImageHandle};
use crate::state::transform::Similarity;

/// One end of a segment, relative to the entity's pivot.
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct LinePoint {
    pub position: [f32; 2],
    /// Full width of the stroke at this point.
    pub thickness: f32,
}
impl LinePoint {
    #[must_use]
    pub fn new(position: [f32; 2], thickness: f32) -> Self {
        Self {
            position,
            thickness,
        }
    }
    fn bounds(&self) -> Aabb {
        Aabb::from_point(self.position).inflate(self.thickness / 2.0)
    }
}
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Segment {
    pub a: LinePoint,
    pub b: LinePoint,
}
impl Segment {
    #[must_use]
    pub fn new(a: LinePoint, b: LinePoint) -> Self {
        Self { a, b }
    }
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        self.a.bounds().union(self.b.bounds())
    }
}

/// A freehand stroke.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pencil {
    pub color: Color,
    /// Never empty once the entity exists.
    pub lines: Vec<Segment>,
}
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Line {
    pub color: Color,
    pub line: Segment,
}
/// A rectangle of `cells` evenly spaced cells, spanning from the pivot to `size`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Grid {
    pub color: Color,
    pub thickness: f32,
    pub size: [f32; 2],
    pub cells: [u32; 2],
}
/// An outlined ellipse centered on the pivot.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Circle {
    pub color: Color,
    pub thickness: f32,
    pub radius: [f32; 2],
}
/// A picture loaded from disk, centered on the pivot.
#[derive(Clone, Debug, Default)]
pub struct Image {
    pub path: String,
    pub size: [f32; 2],
    /// Width over height at the time the entity was created or loaded. Not persisted.
    pub initial_aspect: f32,
    /// Shared pixel data. Only present while the entity is attached to a renderer.
    pub texture: Option<ImageHandle>,
}
impl Image {
    #[must_use]
    pub fn new(path: impl Into<String>, size: [f32; 2]) -> Self {
        Self {
            path: path.into(),
            size,
            initial_aspect: aspect(size),
            texture: None,
        }
    }
}
fn aspect([width, height]: [f32; 2]) -> f32 {
    if height == 0.0 {
        1.0
    } else {
        width / height
    }
}

/// Persisted discriminant of an [`EntityKind`].
#[derive(strum::FromRepr, strum::AsRefStr, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum EntityTag {
    Pencil = 1,
    Line = 2,
    Grid = 3,
    Circle = 4,
    Image = 5,
}

#[derive(Clone, Debug)]
pub enum EntityKind {
    Pencil(Pencil),
    Line(Line),
    Grid(Grid),
    Circle(Circle),
    Image(Image),
}
impl EntityKind {
    /// A kind with every field zeroed, ready to be filled in by a reader.
    #[must_use]
    pub fn zeroed(tag: EntityTag) -> Self {
        let zero = Color::new(0.0, 0.0, 0.0);
        match tag {
            EntityTag::Pencil => Self::Pencil(Pencil {
                color: zero,
                lines: Vec::new(),
            }),
            EntityTag::Line => Self::Line(Line {
                color: zero,
                ..Default::default()
            }),
            EntityTag::Grid => Self::Grid(Grid {
                color: zero,
                ..Default::default()
            }),
            EntityTag::Circle => Self::Circle(Circle {
                color: zero,
                ..Default::default()
            }),
            EntityTag::Image => Self::Image(Image::default()),
        }
    }
    #[must_use]
    pub fn tag(&self) -> EntityTag {
        match self {
            Self::Pencil(_) => EntityTag::Pencil,
            Self::Line(_) => EntityTag::Line,
            Self::Grid(_) => EntityTag::Grid,
            Self::Circle(_) => EntityTag::Circle,
            Self::Image(_) => EntityTag::Image,
        }
    }
    /// The vector a Scale action changes. Strokes and lines have none.
    #[must_use]
    pub fn size(&self) -> Option<[f32; 2]> {
        match self {
            Self::Grid(Grid { size, .. })
            | Self::Circle(Circle { radius: size, .. })
            | Self::Image(Image { size, .. }) => Some(*size),
            Self::Pencil(_) | Self::Line(_) => None,
        }
    }
    fn size_mut(&mut self) -> Option<&mut [f32; 2]> {
        match self {
            Self::Grid(Grid { size, .. })
            | Self::Circle(Circle { radius: size, .. })
            | Self::Image(Image { size, .. }) => Some(size),
            Self::Pencil(_) | Self::Line(_) => None,
        }
    }
    #[must_use]
    pub fn color(&self) -> Option<Color> {
        match self {
            Self::Pencil(Pencil { color, .. })
            | Self::Line(Line { color, .. })
            | Self::Grid(Grid { color, .. })
            | Self::Circle(Circle { color, .. }) => Some(*color),
            Self::Image(_) => None,
        }
    }
    /// Check that this geometry can be stored in a document.
    pub fn validate(&self) -> Result<(), CommandError> {
        match self {
            Self::Pencil(pencil) if pencil.lines.is_empty() => Err(CommandError::EmptyStroke),
            Self::Image(image) if image.path.encode_utf16().count() > usize::from(u16::MAX) => {
                Err(CommandError::PathTooLong)
            }
            _ => Ok(()),
        }
    }
    /// World-space bounds of this geometry placed by `transform`.
    #[must_use]
    pub fn bounds(&self, transform: &Similarity) -> Aabb {
        match self {
            Self::Pencil(pencil) => pencil
                .lines
                .iter()
                .fold(Aabb::EMPTY, |bounds, line| bounds.union(line.bounds()))
                .transformed(transform),
            Self::Line(line) => line.line.bounds().transformed(transform),
            Self::Grid(grid) => Aabb::from_points([[0.0; 2], grid.size])
                .inflate(grid.thickness / 2.0)
                .transformed(transform),
            Self::Circle(circle) => {
                // Exact box of the rotated ellipse, so only translate it after.
                let (sin, cos) = transform.rotation.sin_cos();
                let [rx, ry] = circle.radius;
                let half = [(rx * cos).hypot(ry * sin), (rx * sin).hypot(ry * cos)];
                Aabb::from_min_max([-half[0], -half[1]], half)
                    .inflate(circle.thickness / 2.0)
                    .transformed(&Similarity::new(transform.translation, 0.0))
            }
            Self::Image(image) => {
                let half = [image.size[0] / 2.0, image.size[1] / 2.0];
                Aabb::from_points([[-half[0], -half[1]], half]).transformed(transform)
            }
        }
    }
    /// Exact equality of the persisted fields, comparing floats by their bits.
    #[must_use]
    pub fn content_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Pencil(a), Self::Pencil(b)) => {
                a.color.bits_eq(&b.color)
                    && bytemuck::cast_slice::<Segment, u8>(&a.lines)
                        == bytemuck::cast_slice::<Segment, u8>(&b.lines)
            }
            (Self::Line(a), Self::Line(b)) => {
                a.color.bits_eq(&b.color) && bytemuck::bytes_of(&a.line) == bytemuck::bytes_of(&b.line)
            }
            (Self::Grid(a), Self::Grid(b)) => {
                a.color.bits_eq(&b.color)
                    && floats_eq(&[a.thickness], &[b.thickness])
                    && floats_eq(&a.size, &b.size)
                    && a.cells == b.cells
            }
            (Self::Circle(a), Self::Circle(b)) => {
                a.color.bits_eq(&b.color)
                    && floats_eq(&[a.thickness], &[b.thickness])
                    && floats_eq(&a.radius, &b.radius)
            }
            (Self::Image(a), Self::Image(b)) => a.path == b.path && floats_eq(&a.size, &b.size),
            _ => false,
        }
    }
    /// Become a copy of `other`, reusing allocations where the kinds match.
    /// The copy never carries an image handle.
    pub(crate) fn assign_from(&mut self, other: &Self) {
        match (self, other) {
            (Self::Pencil(this), Self::Pencil(other)) => {
                this.color = other.color;
                this.lines.clone_from(&other.lines);
            }
            (Self::Image(this), Self::Image(other)) => {
                this.path.clone_from(&other.path);
                this.size = other.size;
                this.initial_aspect = other.initial_aspect;
                this.texture = None;
            }
            (this, Self::Image(other)) => {
                *this = Self::Image(Image {
                    texture: None,
                    ..other.clone()
                });
            }
            (this, other) => *this = other.clone(),
        }
    }
}
fn floats_eq(a: &[f32], b: &[f32]) -> bool {
    bytemuck::cast_slice::<f32, u8>(a) == bytemuck::cast_slice::<f32, u8>(b)
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub(crate) id: EntityID,
    pub(crate) transform: Similarity,
    pub(crate) visible: bool,
    pub(crate) hovered: bool,
    pub(crate) bounds: Aabb,
    pub(crate) render: Option<RenderHandle>,
    pub(crate) kind: EntityKind,
}
impl Entity {
    pub(crate) fn new(id: EntityID, kind: EntityKind, transform: Similarity) -> Self {
        let mut this = Self {
            id,
            transform,
            visible: false,
            hovered: false,
            bounds: Aabb::EMPTY,
            render: None,
            kind,
        };
        this.refresh();
        this
    }
    /// An invisible, zeroed entity of the given kind, ready to be filled in by a reader.
    pub(crate) fn zeroed(id: EntityID, tag: EntityTag) -> Self {
        Self {
            id,
            transform: bytemuck::Zeroable::zeroed(),
            visible: false,
            hovered: false,
            bounds: Aabb::EMPTY,
            render: None,
            kind: EntityKind::zeroed(tag),
        }
    }
    #[must_use]
    pub fn id(&self) -> EntityID {
        self.id
    }
    #[must_use]
    pub fn transform(&self) -> &Similarity {
        &self.transform
    }
    #[must_use]
    pub fn position(&self) -> [f32; 2] {
        self.transform.translation
    }
    #[must_use]
    pub fn rotation(&self) -> f32 {
        self.transform.rotation
    }
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }
    #[must_use]
    pub fn is_hovered(&self) -> bool {
        self.hovered
    }
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }
    #[must_use]
    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }
    #[must_use]
    pub fn render_handle(&self) -> Option<RenderHandle> {
        self.render
    }
    /// Re-derive everything that is not persisted. Called once geometry has been read or constructed.
    pub(crate) fn refresh(&mut self) {
        if let EntityKind::Image(image) = &mut self.kind {
            image.initial_aspect = aspect(image.size);
        }
        self.recompute_bounds();
    }
    pub(crate) fn recompute_bounds(&mut self) {
        self.bounds = self.kind.bounds(&self.transform);
    }
    pub(crate) fn set_position(&mut self, position: [f32; 2]) {
        self.transform.translation = position;
        self.recompute_bounds();
    }
    pub(crate) fn set_rotation(&mut self, rotation: f32) {
        self.transform.rotation = rotation;
        self.recompute_bounds();
    }
    pub(crate) fn set_size(&mut self, size: [f32; 2]) -> Result<(), CommandError> {
        *self.kind.size_mut().ok_or(CommandError::Unsupported)? = size;
        self.recompute_bounds();
        Ok(())
    }
    /// Change the geometry in place, keeping the bounds current.
    pub(crate) fn edit_kind<R>(&mut self, f: impl FnOnce(&mut EntityKind) -> R) -> R {
        let result = f(&mut self.kind);
        self.recompute_bounds();
        result
    }
    /// Become a detached copy of `other`.
    pub(crate) fn assign_from(&mut self, other: &Self) {
        self.id = other.id;
        self.transform = other.transform;
        self.visible = other.visible;
        self.hovered = false;
        self.bounds = other.bounds;
        self.render = None;
        self.kind.assign_from(&other.kind);
    }
    /// Exact equality of the persisted fields. Hover, bounds and renderer state are ignored.
    #[must_use]
    pub fn content_eq(&self, other: &Self) -> bool {
        self.id == other.id
            && bytemuck::bytes_of(&self.transform) == bytemuck::bytes_of(&other.transform)
            && self.visible == other.visible
            && self.kind.content_eq(&other.kind)
    }
}

/// Owner of every entity of a scene, and of the counter handing out their ids.
#[derive(Default)]
pub struct EntityStore {
    entities: hashbrown::HashMap<EntityID, Entity>,
    counter: IdCounter,
}
impl EntityStore {
    /// Look up an entity referenced by the action log.
    ///
    /// # Panics
    /// If the entity does not exist. The log and store have desynchronized, and nothing can be trusted.
    #[must_use]
    pub fn get(&self, id: EntityID) -> &Entity {
        match self.entities.get(&id) {
            Some(entity) => entity,
            None => {
                log::error!("dangling reference to {id}");
                panic!("dangling reference to {id}");
            }
        }
    }
    /// Look up an entity that may not exist, e.g. one named by the user.
    #[must_use]
    pub fn try_get(&self, id: EntityID) -> Option<&Entity> {
        self.entities.get(&id)
    }
    pub(crate) fn get_mut(&mut self, id: EntityID) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
    /// Every entity, including hidden ones, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }
    pub fn iter_visible(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values().filter(|entity| entity.visible)
    }
    #[must_use]
    pub fn counter(&self) -> IdCounter {
        self.counter
    }
    pub(crate) fn set_counter(&mut self, counter: IdCounter) {
        self.counter = counter;
    }
    /// Allocate an id and insert a new, invisible entity, attached to the renderer.
    pub(crate) fn create(
        &mut self,
        kind: EntityKind,
        transform: Similarity,
        renderer: &mut dyn Renderer,
    ) -> EntityID {
        let id = self.counter.allocate();
        let mut entity = Entity::new(id, kind, transform);
        attach(&mut entity, renderer);
        self.entities.insert(id, entity);
        id
    }
    /// Insert an entity read from a file. Not attached, see [`Self::attach_all`].
    pub(crate) fn insert_detached(&mut self, entity: Entity) -> Option<Entity> {
        self.entities.insert(entity.id, entity)
    }
    /// Release an entity's renderer resources and erase it.
    pub(crate) fn remove(&mut self, id: EntityID, renderer: &mut dyn Renderer) -> Option<Entity> {
        let mut entity = self.entities.remove(&id)?;
        detach(&mut entity, renderer);
        Some(entity)
    }
    /// Release and erase every entity, and start ids over.
    pub(crate) fn clear(&mut self, renderer: &mut dyn Renderer) {
        for entity in self.entities.values_mut() {
            detach(entity, renderer);
        }
        self.entities.clear();
        self.counter = IdCounter::default();
    }
    /// Attach every entity not yet known to the renderer.
    pub(crate) fn attach_all(&mut self, renderer: &mut dyn Renderer) {
        for entity in self.entities.values_mut().filter(|e| e.render.is_none()) {
            attach(entity, renderer);
        }
    }
    /// The topmost (most recently created) visible entity whose bounds contain `point`.
    #[must_use]
    pub fn hit_test(&self, point: [f32; 2]) -> Option<EntityID> {
        self.iter_visible()
            .filter(|entity| entity.bounds.contains(point))
            .map(|entity| entity.id)
            .max()
    }
    /// Mark exactly one entity, or none, as hovered.
    pub fn set_hovered(&mut self, id: Option<EntityID>) {
        for entity in self.entities.values_mut() {
            entity.hovered = Some(entity.id) == id && entity.visible;
        }
    }
}

fn attach(entity: &mut Entity, renderer: &mut dyn Renderer) {
    if let EntityKind::Image(image) = &mut entity.kind {
        image.texture = Some(images::global().acquire(&image.path));
    }
    entity.render = Some(renderer.init_entity(entity));
}
fn detach(entity: &mut Entity, renderer: &mut dyn Renderer) {
    if let Some(handle) = entity.render.take() {
        renderer.release_entity(handle);
    }
    if let EntityKind::Image(image) = &mut entity.kind {
        image.texture = None;
    }
}

impl CommandConsumer<Action> for EntityStore {
    fn apply(&mut self, command: DoUndo<'_, Action>) -> Result<(), CommandError> {
        let target = command.inner().target();
        let entity = self
            .entities
            .get_mut(&target)
            .ok_or(CommandError::UnknownResource)?;
        match command {
            DoUndo::Do(Action::Create(_)) => {
                // Only the next id may be re-shown, otherwise ids would be handed out twice.
                if entity.visible || self.counter.peek() != target {
                    return Err(CommandError::MismatchedState);
                }
                entity.visible = true;
                let _ = self.counter.allocate();
            }
            DoUndo::Undo(Action::Create(_)) => {
                if !entity.visible || target.get().checked_add(1) != Some(self.counter.get()) {
                    return Err(CommandError::MismatchedState);
                }
                entity.visible = false;
                entity.hovered = false;
                self.counter.release();
            }
            DoUndo::Do(Action::Translate(commands::Translate { end: position, .. }))
            | DoUndo::Undo(Action::Translate(commands::Translate {
                start: position, ..
            })) => entity.set_position(*position),
            DoUndo::Do(Action::Rotate(commands::Rotate { end: rotation, .. }))
            | DoUndo::Undo(Action::Rotate(commands::Rotate {
                start: rotation, ..
            })) => entity.set_rotation(*rotation),
            DoUndo::Do(Action::Scale(commands::Scale { end: size, .. }))
            | DoUndo::Undo(Action::Scale(commands::Scale { start: size, .. })) => {
                entity.set_size(*size)?;
            }
        }
        Ok(())
    }
}
