use std::path::{Path, PathBuf};

use crate::color::Color;
use crate::io::{self, LoadError, SaveError};
use crate::render::Renderer;

/// Where a scene lives on disk, and what it looked like when it got there.
#[derive(Clone, Debug, Default)]
pub struct Document {
    /// The path from which the scene was loaded or saved, or None if never saved.
    path: Option<PathBuf>,
    /// Fingerprint of the scene as of the last save, load, or initialization.
    saved_fingerprint: u64,
    /// Scenes that were never opened are never unsaved.
    initialized: bool,
}
impl Document {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
    /// Name of the document, inferred from its path.
    #[must_use]
    pub fn name(&self) -> String {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .map_or_else(
                || "New Scene".to_owned(),
                |name| name.to_string_lossy().into_owned(),
            )
    }
    #[must_use]
    pub fn saved_fingerprint(&self) -> u64 {
        self.saved_fingerprint
    }
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl super::Scene {
    /// Start tracking changes, treating the scene as it is now as saved.
    pub fn initialize(&mut self) {
        self.document.initialized = true;
        self.document.saved_fingerprint = self.fingerprint();
    }
    /// Write the scene to `path`, and remember it as the scene's file.
    ///
    /// On failure the scene is exactly as unsaved as it was before.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), SaveError> {
        let path = path.as_ref();
        if let Err(err) = io::write_path(self, path) {
            log::error!("failed to save {}: {err}", self.document.name());
            return Err(err);
        }
        self.document.path = Some(path.to_owned());
        self.document.saved_fingerprint = self.fingerprint();
        self.document.initialized = true;
        log::info!("saved {} to {}", self.document.name(), path.display());
        Ok(())
    }
    /// Replace this scene with the one stored at `path`.
    ///
    /// Either the whole file is read and the scene replaced, or the scene is left untouched.
    pub fn load(
        &mut self,
        path: impl AsRef<Path>,
        renderer: &mut dyn Renderer,
    ) -> Result<(), LoadError> {
        let path = path.as_ref();
        let mut loaded = match io::read_path(path) {
            Ok(loaded) => loaded,
            Err(err) => {
                log::error!("failed to load {}: {err}", path.display());
                return Err(err);
            }
        };

        // Commit.
        self.entities.clear(renderer);
        loaded.render_target = self.render_target;
        std::mem::swap(self, &mut loaded);
        self.entities.attach_all(renderer);
        self.document = Document {
            path: Some(path.to_owned()),
            saved_fingerprint: self.fingerprint(),
            initialized: true,
        };
        log::info!(
            "loaded {} ({} entities, {} actions)",
            self.document.name(),
            self.entities.len(),
            self.log.len()
        );
        Ok(())
    }
    /// Has anything that would be saved changed since the scene was last saved, loaded, or initialized?
    ///
    /// A matching fingerprint is confirmed against the file on disk, if there is one.
    #[must_use]
    pub fn is_unsaved(&self) -> bool {
        if !self.document.initialized {
            return false;
        }
        if self.fingerprint() != self.document.saved_fingerprint {
            return true;
        }
        let Some(path) = self.document.path() else {
            return false;
        };
        match io::read_path(path) {
            Ok(saved) => !self.content_eq(&saved),
            Err(err) => {
                log::warn!("could not reread {}: {err}", path.display());
                true
            }
        }
    }
    /// Release every entity and forget the history and file. The scene is left blank and saved.
    pub fn close(&mut self, renderer: &mut dyn Renderer) {
        log::info!("closing {}", self.document.name());
        self.clear(renderer);
        self.canvas_color = Color::CANVAS;
        self.document = Document::default();
        self.initialize();
    }
    /// Write a copy of the scene without making `path` the scene's file.
    pub fn save_copy(&self, path: impl AsRef<Path>) -> Result<(), SaveError> {
        io::write_path(self, path.as_ref())
    }
}
