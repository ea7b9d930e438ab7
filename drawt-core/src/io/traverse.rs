//! # Traversal
//!
//! The one description of the document format. Saving, loading and fingerprinting all run [`traverse`], which
//! visits every persisted field in file order and hands it to a [`ByteStream`]. Where the fields come from, and
//! where they go afterwards, is up to the [`Provider`].
//!
//! Adding a field to the format means editing this file and nothing else.

use super::stream::{ByteStream, StreamError};
use crate::color::Color;
use crate::commands::{Action, ActionTag};
use crate::id::EntityID;
use crate::state::entities::{Entity, EntityKind, EntityTag, Image, Segment};
use az::{Az, SaturatingAs};

/// `DRWT`, as the first four bytes of a file.
pub const SIGNATURE: u32 = u32::from_le_bytes(*b"DRWT");
pub const VERSION: u16 = 1;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fidelity {
    /// Everything, including camera and tool state. Used for files.
    Full,
    /// Only what makes up the drawing. Used for fingerprints.
    Content,
}

#[derive(thiserror::Error, Debug)]
pub enum TraverseError {
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error("bad signature {0:#010x}")]
    BadSignature(u32),
    #[error("unknown action kind {0}")]
    UnknownAction(u8),
    #[error("unknown entity kind {0}")]
    UnknownEntity(u8),
    #[error("{0} is a stroke with no segments")]
    EmptyStroke(EntityID),
    #[error("image path at byte {offset} is not valid UTF-16")]
    BadPath { offset: usize },
    #[error("image path of {0} is too long")]
    PathTooLong(EntityID),
    #[error("expected {expected} to be created next, found {found}")]
    UnexpectedId { expected: EntityID, found: EntityID },
    #[error("{0} is created hidden")]
    HiddenEntity(EntityID),
    #[error("action targets {0}, which does not exist")]
    MissingTarget(EntityID),
    #[error("{0} cannot be scaled")]
    NoSize(EntityID),
    #[error("id counter is {counter} but {created} entities were created")]
    CounterMismatch { counter: u32, created: u32 },
}

/// Every field before the first action record.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Header {
    pub signature: u32,
    pub version: u16,
    pub camera_distance: f32,
    pub camera_position: [f32; 2],
    pub tool: u8,
    pub draw_color: Color,
    pub draw_thickness: f32,
    /// Number of action records that follow - the cursor of the log.
    pub action_count: u32,
    pub canvas_color: Color,
    pub id_counter: u32,
}

/// Source and sink of the structured half of a traversal.
pub trait Provider {
    fn header(&mut self) -> &mut Header;
    /// The next action record. Readers return a placeholder, which the traversal overwrites.
    fn next_action(&mut self) -> Action;
    /// The entity record of the Create action targeting `id`.
    fn entity_for_id(&mut self, id: EntityID) -> &mut Entity;
    /// The entity last handed out by [`Self::entity_for_id`] has been fully traversed.
    fn complete_entity(&mut self) -> Result<(), TraverseError>;
    /// The action last handed out by [`Self::next_action`] has been fully traversed, into `action`.
    fn complete_action(&mut self, action: Action) -> Result<(), TraverseError>;
}

/// Visit every field of a document, in file order. Stops at the first failure.
pub fn traverse<S, P>(
    stream: &mut S,
    provider: &mut P,
    fidelity: Fidelity,
) -> Result<(), TraverseError>
where
    S: ByteStream + ?Sized,
    P: Provider + ?Sized,
{
    let header = provider.header();
    field(stream, &mut header.signature, "signature")?;
    if header.signature != SIGNATURE {
        return Err(TraverseError::BadSignature(header.signature));
    }
    field(stream, &mut header.version, "version")?;
    if header.version != VERSION {
        log::warn!(
            "document is version {}, expected {VERSION}. Reading anyway.",
            header.version
        );
    }
    if fidelity == Fidelity::Full {
        field(stream, &mut header.camera_distance, "camera distance")?;
        floats(stream, &mut header.camera_position, "camera position")?;
        field(stream, &mut header.tool, "tool")?;
        floats(stream, header.draw_color.as_array_mut(), "draw color")?;
        field(stream, &mut header.draw_thickness, "draw thickness")?;
    }
    field(stream, &mut header.action_count, "action count")?;
    floats(stream, header.canvas_color.as_array_mut(), "canvas color")?;
    field(stream, &mut header.id_counter, "entity id counter")?;

    let count = header.action_count;
    for _ in 0..count {
        let mut action = provider.next_action();
        action_record(stream, provider, &mut action)?;
        provider.complete_action(action)?;
    }
    Ok(())
}

fn action_record<S, P>(
    stream: &mut S,
    provider: &mut P,
    action: &mut Action,
) -> Result<(), TraverseError>
where
    S: ByteStream + ?Sized,
    P: Provider + ?Sized,
{
    let mut tag = action.tag() as u8;
    field(stream, &mut tag, "action kind")?;
    if tag != action.tag() as u8 {
        let tag = ActionTag::from_repr(tag).ok_or(TraverseError::UnknownAction(tag))?;
        *action = Action::zeroed(tag);
    }
    match action {
        Action::Create(create) => {
            field(stream, &mut create.target.0, "create target")?;
            entity_record(stream, provider.entity_for_id(create.target))?;
            provider.complete_entity()?;
        }
        Action::Translate(translate) => {
            field(stream, &mut translate.target.0, "translate target")?;
            floats(stream, &mut translate.start, "translate start")?;
            floats(stream, &mut translate.end, "translate end")?;
        }
        Action::Rotate(rotate) => {
            field(stream, &mut rotate.target.0, "rotate target")?;
            field(stream, &mut rotate.start, "rotate start")?;
            field(stream, &mut rotate.end, "rotate end")?;
        }
        Action::Scale(scale) => {
            field(stream, &mut scale.target.0, "scale target")?;
            floats(stream, &mut scale.start, "scale start")?;
            floats(stream, &mut scale.end, "scale end")?;
        }
    }
    Ok(())
}

fn entity_record<S>(stream: &mut S, entity: &mut Entity) -> Result<(), TraverseError>
where
    S: ByteStream + ?Sized,
{
    let mut tag = entity.kind.tag() as u8;
    field(stream, &mut tag, "entity kind")?;
    if tag != entity.kind.tag() as u8 {
        let tag = EntityTag::from_repr(tag).ok_or(TraverseError::UnknownEntity(tag))?;
        entity.kind = EntityKind::zeroed(tag);
    }
    floats(stream, &mut entity.transform.translation, "position")?;
    field(stream, &mut entity.transform.rotation, "rotation")?;
    let mut visible = u8::from(entity.visible);
    field(stream, &mut visible, "visible")?;
    entity.visible = visible != 0;

    let id = entity.id;
    match &mut entity.kind {
        EntityKind::Pencil(pencil) => {
            floats(stream, pencil.color.as_array_mut(), "pencil color")?;
            let mut count: u32 = pencil.lines.len().saturating_as();
            field(stream, &mut count, "pencil line count")?;
            if count == 0 {
                return Err(TraverseError::EmptyStroke(id));
            }
            // Grown one at a time, a corrupt count runs out of bytes long before it runs out of memory.
            let count = count.az::<usize>();
            for index in 0..count {
                if index == pencil.lines.len() {
                    pencil.lines.push(Segment::default());
                }
                segment(stream, &mut pencil.lines[index])?;
            }
            pencil.lines.truncate(count);
        }
        EntityKind::Line(line) => {
            floats(stream, line.color.as_array_mut(), "line color")?;
            segment(stream, &mut line.line)?;
        }
        EntityKind::Grid(grid) => {
            floats(stream, grid.color.as_array_mut(), "grid color")?;
            field(stream, &mut grid.thickness, "grid thickness")?;
            floats(stream, &mut grid.size, "grid size")?;
            field(stream, &mut grid.cells[0], "grid cell count x")?;
            field(stream, &mut grid.cells[1], "grid cell count y")?;
        }
        EntityKind::Circle(circle) => {
            floats(stream, circle.color.as_array_mut(), "circle color")?;
            field(stream, &mut circle.thickness, "circle thickness")?;
            floats(stream, &mut circle.radius, "circle radius")?;
        }
        EntityKind::Image(image) => {
            floats(stream, &mut image.size, "image size")?;
            image_path(stream, image, id)?;
        }
    }
    Ok(())
}

fn segment<S>(stream: &mut S, segment: &mut Segment) -> Result<(), StreamError>
where
    S: ByteStream + ?Sized,
{
    floats(stream, &mut segment.a.position, "segment start")?;
    field(stream, &mut segment.a.thickness, "segment start thickness")?;
    floats(stream, &mut segment.b.position, "segment end")?;
    field(stream, &mut segment.b.thickness, "segment end thickness")
}

/// Length-prefixed UTF-16, little endian.
fn image_path<S>(stream: &mut S, image: &mut Image, id: EntityID) -> Result<(), TraverseError>
where
    S: ByteStream + ?Sized,
{
    let units: Vec<u16> = image.path.encode_utf16().collect();
    let mut len = u16::try_from(units.len()).map_err(|_| TraverseError::PathTooLong(id))?;
    field(stream, &mut len, "image path length")?;

    let mut bytes = vec![0; usize::from(len) * 2];
    if units.len() == usize::from(len) {
        for (pair, unit) in bytes.chunks_exact_mut(2).zip(&units) {
            pair.copy_from_slice(&unit.to_le_bytes());
        }
    }
    stream.consume(&mut bytes, "image path")?;

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    match String::from_utf16(&units) {
        Ok(path) => {
            image.path = path;
            Ok(())
        }
        Err(_) => {
            // Point the error at the start of the path rather than past it.
            stream.revert(bytes.len());
            Err(TraverseError::BadPath {
                offset: stream.consumed(),
            })
        }
    }
}

/// A fixed-width little-endian primitive.
trait Field: Copy {
    type Bytes: AsMut<[u8]>;
    fn to_bytes(self) -> Self::Bytes;
    fn from_bytes(bytes: Self::Bytes) -> Self;
}
macro_rules! le_field {
    ($($ty:ty),*) => {
        $(
            impl Field for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];
                fn to_bytes(self) -> Self::Bytes {
                    self.to_le_bytes()
                }
                fn from_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}
le_field!(u8, u16, u32, f32);

fn field<S, T>(stream: &mut S, value: &mut T, name: &'static str) -> Result<(), StreamError>
where
    S: ByteStream + ?Sized,
    T: Field,
{
    let mut bytes = value.to_bytes();
    stream.consume(bytes.as_mut(), name)?;
    *value = T::from_bytes(bytes);
    Ok(())
}
fn floats<S, const N: usize>(
    stream: &mut S,
    values: &mut [f32; N],
    name: &'static str,
) -> Result<(), StreamError>
where
    S: ByteStream + ?Sized,
{
    for value in values {
        field(stream, value, name)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{traverse, Action, Entity, EntityID, Fidelity, Header, Provider, TraverseError};
    use crate::commands::{self, ActionTag};
    use crate::io::stream::{Reader, StreamWriter};
    use crate::state::entities::{EntityKind, EntityTag, Image};

    /// Provides a single image-creating action.
    struct OneImage {
        header: Header,
        entity: Entity,
        actions: Vec<Action>,
    }
    impl OneImage {
        fn new(path: &str) -> Self {
            let mut entity = Entity::zeroed(EntityID(0), EntityTag::Image);
            entity.kind = EntityKind::Image(Image::new(path, [2.0, 1.0]));
            entity.visible = true;
            Self {
                header: Header {
                    signature: super::SIGNATURE,
                    version: super::VERSION,
                    action_count: 1,
                    id_counter: 1,
                    ..Default::default()
                },
                entity,
                actions: Vec::new(),
            }
        }
        fn reader() -> Self {
            Self {
                header: Header::default(),
                entity: Entity::zeroed(EntityID(0), EntityTag::Pencil),
                actions: Vec::new(),
            }
        }
    }
    impl Provider for OneImage {
        fn header(&mut self) -> &mut Header {
            &mut self.header
        }
        fn next_action(&mut self) -> Action {
            Action::Create(commands::Create {
                target: EntityID(0),
            })
        }
        fn entity_for_id(&mut self, _: EntityID) -> &mut Entity {
            &mut self.entity
        }
        fn complete_entity(&mut self) -> Result<(), TraverseError> {
            Ok(())
        }
        fn complete_action(&mut self, action: Action) -> Result<(), TraverseError> {
            self.actions.push(action);
            Ok(())
        }
    }
    fn write(provider: &mut OneImage) -> Vec<u8> {
        let mut writer = StreamWriter::new(Vec::new());
        traverse(&mut writer, provider, Fidelity::Full).unwrap();
        writer.into_inner()
    }

    #[test]
    fn layout() {
        let bytes = write(&mut OneImage::new("ab"));
        assert_eq!(&bytes[..4], b"DRWT");
        assert_eq!(&bytes[4..6], &[1, 0]);
        // Header: 4 + 2 + (4 + 8 + 1 + 12 + 4) + 4 + 12 + 4
        let records = &bytes[55..];
        assert_eq!(records[0], ActionTag::Create as u8);
        assert_eq!(&records[1..5], &[0; 4]);
        assert_eq!(records[5], EntityTag::Image as u8);
        // position, rotation, visible, size, then the path.
        assert_eq!(records[5 + 1 + 12], 1);
        let path = &records[5 + 1 + 12 + 1 + 8..];
        assert_eq!(path, &[2, 0, b'a', 0, b'b', 0]);
    }
    #[test]
    fn read_back() {
        let bytes = write(&mut OneImage::new("ab"));
        let mut reader = OneImage::reader();
        traverse(&mut Reader::new(&bytes), &mut reader, Fidelity::Full).unwrap();
        assert_eq!(reader.actions.len(), 1);
        let EntityKind::Image(image) = &reader.entity.kind else {
            panic!("expected an image, got {:?}", reader.entity.kind)
        };
        assert_eq!(image.path, "ab");
        assert_eq!(image.size, [2.0, 1.0]);
        assert!(reader.entity.visible);
    }
    #[test]
    fn bad_path_reverts() {
        let mut bytes = write(&mut OneImage::new("ab"));
        let len = bytes.len();
        // Lone low surrogate.
        bytes[len - 4..len - 2].copy_from_slice(&0xDC00u16.to_le_bytes());
        let err = traverse(
            &mut Reader::new(&bytes),
            &mut OneImage::reader(),
            Fidelity::Full,
        )
        .unwrap_err();
        assert!(
            matches!(err, TraverseError::BadPath { offset } if offset == len - 4),
            "{err}"
        );
    }
    #[test]
    fn bad_signature() {
        let mut bytes = write(&mut OneImage::new("ab"));
        bytes[0] = b'X';
        let err = traverse(
            &mut Reader::new(&bytes),
            &mut OneImage::reader(),
            Fidelity::Full,
        )
        .unwrap_err();
        assert!(matches!(err, TraverseError::BadSignature(_)));
    }
    #[test]
    fn unknown_tags() {
        let bytes = write(&mut OneImage::new("ab"));
        let mut action = bytes.clone();
        action[55] = 9;
        assert!(matches!(
            traverse(&mut Reader::new(&action), &mut OneImage::reader(), Fidelity::Full),
            Err(TraverseError::UnknownAction(9))
        ));
        let mut entity = bytes;
        entity[55 + 5] = 0;
        assert!(matches!(
            traverse(&mut Reader::new(&entity), &mut OneImage::reader(), Fidelity::Full),
            Err(TraverseError::UnknownEntity(0))
        ));
    }
    #[test]
    fn every_truncation_fails() {
        let bytes = write(&mut OneImage::new("ab"));
        for len in 0..bytes.len() {
            let result = traverse(
                &mut Reader::new(&bytes[..len]),
                &mut OneImage::reader(),
                Fidelity::Full,
            );
            assert!(
                matches!(result, Err(TraverseError::Stream(_))),
                "length {len}"
            );
        }
    }
}
