//! # IO
//!
//! Reading, writing, and fingerprinting scenes. All three go through the single description of the format in
//! [`traverse`], and differ only in which [`stream::ByteStream`] and [`traverse::Provider`] they pair it with.
//!
//! Loading is transactional: a file is read into a scratch [`Scene`] in full before anything is committed, so a
//! failure partway through never leaves a half-loaded scene behind.

pub mod fingerprint;
pub mod provider;
pub mod stream;
pub mod traverse;

use std::path::{Path, PathBuf};

use crate::state::Scene;
use provider::{LiveProvider, SceneBuilder};
use stream::{ByteStream, Reader, StreamWriter};
use traverse::{traverse, Fidelity, TraverseError};

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Format(#[from] TraverseError),
    #[error("{0} unexpected bytes after the last action")]
    TrailingBytes(usize),
}

#[derive(thiserror::Error, Debug)]
pub enum SaveError {
    #[error("could not write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Format(#[from] TraverseError),
}

/// Content fingerprint of a scene, see [`Scene::fingerprint`].
#[must_use]
pub fn fingerprint(scene: &Scene) -> u64 {
    let mut stream = fingerprint::Fingerprint::default();
    // Fingerprints never fail to consume, and the live provider only hands out validated records.
    traverse(&mut stream, &mut LiveProvider::new(scene), Fidelity::Content)
        .expect("fingerprinting a live scene failed");
    stream.finish()
}

/// Write the full document into `writer`.
pub fn write_scene(scene: &Scene, writer: impl std::io::Write) -> Result<(), TraverseError> {
    let mut stream = StreamWriter::new(writer);
    traverse(&mut stream, &mut LiveProvider::new(scene), Fidelity::Full)?;
    log::trace!("wrote {} bytes", stream.consumed());
    Ok(())
}

/// The full document, as bytes.
pub fn to_bytes(scene: &Scene) -> Result<Vec<u8>, TraverseError> {
    let mut bytes = Vec::new();
    write_scene(scene, &mut bytes)?;
    Ok(bytes)
}

/// Write the full document to `path`, replacing whatever is there.
/// The scene's document metadata is not touched.
pub fn write_path(scene: &Scene, path: &Path) -> Result<(), SaveError> {
    // Serialized up front, so a scene that can't be written never truncates the file.
    let bytes = to_bytes(scene)?;
    std::fs::write(path, bytes).map_err(|source| SaveError::Io {
        path: path.to_owned(),
        source,
    })
}

/// Read a whole document into a fresh, detached scene. Nothing outside the returned scene is touched.
pub fn read_scene(bytes: &[u8]) -> Result<Scene, LoadError> {
    let mut reader = Reader::new(bytes);
    let mut builder = SceneBuilder::default();
    traverse(&mut reader, &mut builder, Fidelity::Full)?;
    let trailing = reader.remaining();
    if trailing != 0 {
        return Err(LoadError::TrailingBytes(trailing));
    }
    Ok(builder.finish()?)
}

pub fn read_path(path: &Path) -> Result<Scene, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_owned(),
        source,
    })?;
    read_scene(&bytes)
}

#[cfg(test)]
mod test {
    use super::{read_scene, to_bytes, LoadError};
    use crate::color::Color;
    use crate::commands::Action;
    use crate::id::EntityID;
    use crate::io::traverse::TraverseError;
    use crate::render::NullRenderer;
    use crate::state::entities::{Circle, EntityKind, Grid, Image, Line, LinePoint, Pencil, Segment};
    use crate::state::transform::Similarity;
    use crate::state::{Scene, Tool};

    fn segment(x: f32) -> Segment {
        Segment::new(
            LinePoint::new([x, 0.0], 2.0),
            LinePoint::new([x + 1.0, 1.0], 3.0),
        )
    }
    fn pencil(segments: usize) -> EntityKind {
        EntityKind::Pencil(Pencil {
            color: Color::new(0.1, 0.2, 0.3),
            lines: (0..segments).map(|i| segment(i as f32)).collect(),
        })
    }
    /// A scene with one of everything, and some history on top.
    fn busy_scene(renderer: &mut NullRenderer) -> Scene {
        let mut scene = Scene::new();
        let kinds = [
            pencil(4),
            EntityKind::Line(Line {
                color: Color::WHITE,
                line: segment(5.0),
            }),
            EntityKind::Grid(Grid {
                color: Color::BLACK,
                thickness: 1.5,
                size: [10.0, 20.0],
                cells: [3, 7],
            }),
            EntityKind::Circle(Circle {
                color: Color::new(1.0, 0.0, 0.0),
                thickness: 2.0,
                radius: [5.0, 6.0],
            }),
            EntityKind::Image(Image::new("pictures/cat €.png", [64.0, 32.0])),
        ];
        for (i, kind) in kinds.into_iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let offset = i as f32;
            scene
                .push_create(kind, Similarity::new([offset, -offset], offset / 4.0), renderer)
                .unwrap();
        }
        let translate = scene.push_translate(EntityID(1), renderer).unwrap();
        scene
            .writer(translate)
            .unwrap()
            .set_translation([7.0, 8.0])
            .unwrap();
        let rotate = scene.push_rotate(EntityID(3), renderer).unwrap();
        scene.writer(rotate).unwrap().set_rotation(2.0).unwrap();
        let scale = scene.push_scale(EntityID(4), renderer).unwrap();
        scene.writer(scale).unwrap().set_size([16.0, 8.0]).unwrap();
        // Parked, and so not saved.
        let parked = scene.push_translate(EntityID(0), renderer).unwrap();
        scene
            .writer(parked)
            .unwrap()
            .set_translation([-1.0, -1.0])
            .unwrap();
        scene.undo();

        scene.canvas_color = Color::new(0.5, 0.5, 0.6);
        scene.view.camera_position = [3.0, 4.0];
        scene.view.camera_distance = 0.5;
        scene.view.tool = Tool::Circle;
        scene.view.draw_color = Color::new(0.0, 1.0, 0.0);
        scene.view.draw_thickness = 9.0;
        scene
    }

    #[test]
    fn round_trip() {
        let mut renderer = NullRenderer::default();
        let scene = busy_scene(&mut renderer);
        let bytes = to_bytes(&scene).unwrap();
        let loaded = read_scene(&bytes).unwrap();

        assert!(loaded.content_eq(&scene));
        assert_eq!(loaded.fingerprint(), scene.fingerprint());
        assert_eq!(loaded.view, scene.view);
        assert_eq!(loaded.log().len(), 8);
        assert_eq!(loaded.log().cursor(), 8);
        assert_eq!(loaded.entities().counter().get(), 5);
        // Detached until committed.
        assert!(loaded.entities().iter().all(|e| e.render_handle().is_none()));
        assert_eq!(loaded.entities().get(EntityID(1)).position(), [7.0, 8.0]);
        assert_eq!(loaded.entities().get(EntityID(3)).rotation(), 2.0);
        let EntityKind::Image(image) = loaded.entities().get(EntityID(4)).kind() else {
            panic!("expected an image");
        };
        assert_eq!(image.path, "pictures/cat €.png");
        assert_eq!(image.size, [16.0, 8.0]);
        assert_eq!(image.initial_aspect, 2.0);
        // Bounds are derived, not stored.
        for entity in scene.entities().iter() {
            assert_eq!(loaded.entities().get(entity.id()).bounds(), entity.bounds());
        }
        // And writing it back out is byte-identical.
        assert_eq!(to_bytes(&loaded).unwrap(), bytes);
    }
    #[test]
    fn pencil_save_load_undo_push() {
        let mut renderer = NullRenderer::default();
        let mut scene = Scene::new();
        scene
            .push_create(pencil(3), Similarity::default(), &mut renderer)
            .unwrap();
        assert_eq!(scene.log().cursor(), 1);

        let mut loaded = read_scene(&to_bytes(&scene).unwrap()).unwrap();
        assert_eq!(loaded.entities().len(), 1);
        let EntityKind::Pencil(stroke) = loaded.entities().get(EntityID(0)).kind() else {
            panic!("expected a pencil");
        };
        assert_eq!(stroke.lines.len(), 3);
        assert_eq!(loaded.log().cursor(), 1);
        assert_eq!(loaded.fingerprint(), scene.fingerprint());

        assert!(loaded.undo());
        assert_eq!(loaded.log().cursor(), 0);
        assert!(!loaded.entities().get(EntityID(0)).is_visible());
        assert_eq!(loaded.entities().len(), 1);

        let line = EntityKind::Line(Line {
            color: Color::WHITE,
            line: segment(0.0),
        });
        loaded
            .push_create(line, Similarity::default(), &mut renderer)
            .unwrap();
        // The pencil is gone, and its id went to the line.
        assert_eq!(loaded.entities().len(), 1);
        assert!(matches!(
            loaded.entities().get(EntityID(0)).kind(),
            EntityKind::Line(_)
        ));
        assert_eq!(loaded.log().len(), 1);
        assert_eq!(loaded.log().cursor(), 1);
        assert!(matches!(loaded.log().applied()[0], Action::Create(_)));
    }
    #[test]
    fn empty_scene() {
        let scene = Scene::new();
        let bytes = to_bytes(&scene).unwrap();
        assert_eq!(bytes.len(), 55);
        let loaded = read_scene(&bytes).unwrap();
        assert!(loaded.content_eq(&scene));
        assert!(loaded.entities().is_empty());
    }
    #[test]
    fn truncated_never_loads() {
        let mut renderer = NullRenderer::default();
        let bytes = to_bytes(&busy_scene(&mut renderer)).unwrap();
        for len in 0..bytes.len() {
            assert!(
                matches!(read_scene(&bytes[..len]), Err(LoadError::Format(_))),
                "length {len}"
            );
        }
    }
    #[test]
    fn other_version_still_loads() {
        let mut renderer = NullRenderer::default();
        let scene = busy_scene(&mut renderer);
        let mut bytes = to_bytes(&scene).unwrap();
        bytes[4..6].copy_from_slice(&2u16.to_le_bytes());

        let loaded = read_scene(&bytes).unwrap();
        assert!(loaded.content_eq(&scene));
        assert_eq!(loaded.view, scene.view);
        // Written back out under the current version.
        assert_eq!(&to_bytes(&loaded).unwrap()[4..6], &[1, 0]);
    }
    #[test]
    fn trailing_bytes() {
        let mut bytes = to_bytes(&Scene::new()).unwrap();
        bytes.extend_from_slice(&[0; 3]);
        assert!(matches!(read_scene(&bytes), Err(LoadError::TrailingBytes(3))));
    }
    #[test]
    fn rejects_inconsistent_history() {
        let mut renderer = NullRenderer::default();
        let mut scene = Scene::new();
        scene
            .push_create(pencil(1), Similarity::default(), &mut renderer)
            .unwrap();
        let bytes = to_bytes(&scene).unwrap();
        // Header is 55 bytes, the id counter its last four.
        let counter = 51..55;
        let target = 56..60;
        // Visible flag: action tag, target, entity tag, position, rotation.
        let visible = 55 + 1 + 4 + 1 + 12;

        let mut bad = bytes.clone();
        bad[counter].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(
            read_scene(&bad),
            Err(LoadError::Format(TraverseError::CounterMismatch {
                counter: 2,
                created: 1
            }))
        ));

        let mut bad = bytes.clone();
        bad[target].copy_from_slice(&1u32.to_le_bytes());
        assert!(matches!(
            read_scene(&bad),
            Err(LoadError::Format(TraverseError::UnexpectedId { .. }))
        ));

        let mut bad = bytes.clone();
        bad[visible] = 0;
        assert!(matches!(
            read_scene(&bad),
            Err(LoadError::Format(TraverseError::HiddenEntity(EntityID(0))))
        ));

        // Zero segments.
        let mut bad = bytes.clone();
        bad[visible + 13..visible + 17].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            read_scene(&bad),
            Err(LoadError::Format(TraverseError::EmptyStroke(EntityID(0))))
        ));
    }
    #[test]
    fn rejects_dangling_targets() {
        let mut renderer = NullRenderer::default();
        let mut scene = Scene::new();
        scene
            .push_create(pencil(1), Similarity::default(), &mut renderer)
            .unwrap();
        scene.push_rotate(EntityID(0), &mut renderer).unwrap();
        let mut bytes = to_bytes(&scene).unwrap();
        // Rotate record is the last 13 bytes: tag, target, start, end.
        let len = bytes.len();
        bytes[len - 12..len - 8].copy_from_slice(&5u32.to_le_bytes());
        assert!(matches!(
            read_scene(&bytes),
            Err(LoadError::Format(TraverseError::MissingTarget(EntityID(5))))
        ));
    }
    #[test]
    fn rejects_unsized_scale() {
        let mut renderer = NullRenderer::default();
        let mut scene = Scene::new();
        scene
            .push_create(pencil(1), Similarity::default(), &mut renderer)
            .unwrap();
        scene
            .push_create(
                EntityKind::Grid(Grid::default()),
                Similarity::default(),
                &mut renderer,
            )
            .unwrap();
        scene.push_scale(EntityID(1), &mut renderer).unwrap();
        let mut bytes = to_bytes(&scene).unwrap();
        // Scale record is the last 21 bytes: tag, target, start, end. Point it at the pencil.
        let len = bytes.len();
        bytes[len - 20..len - 16].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            read_scene(&bytes),
            Err(LoadError::Format(TraverseError::NoSize(EntityID(0))))
        ));
    }
}
