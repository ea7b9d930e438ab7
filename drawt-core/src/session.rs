//! A fixed set of scene slots, one of which is selected for editing.

use std::path::{Path, PathBuf};

use crate::color::Color;
use crate::render::Renderer;
use crate::state::Scene;

pub struct DocumentSession {
    scenes: Vec<Scene>,
    selected: usize,
    /// Canvas of every blank scene, including ones blanked by [`Self::close`].
    canvas_color: Color,
}
impl DocumentSession {
    /// `count` blank scenes, the first selected. At least one slot always exists.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self::with_canvas_color(count, Color::CANVAS)
    }
    #[must_use]
    pub fn with_canvas_color(count: usize, canvas_color: Color) -> Self {
        let mut scenes: Vec<Scene> = std::iter::repeat_with(|| Scene {
            canvas_color,
            ..Scene::default()
        })
        .take(count.max(1))
        .collect();
        scenes[0].initialize();
        Self {
            scenes,
            selected: 0,
            canvas_color,
        }
    }
    #[must_use]
    pub fn canvas_color(&self) -> Color {
        self.canvas_color
    }
    /// Blank the scene in slot `index`, see [`Scene::close`]. Returns false if there is no such slot.
    pub fn close(&mut self, index: usize, renderer: &mut dyn Renderer) -> bool {
        let Some(scene) = self.scenes.get_mut(index) else {
            return false;
        };
        scene.close(renderer);
        scene.canvas_color = self.canvas_color;
        scene.initialize();
        true
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenes.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
    #[must_use]
    pub fn scene(&self, index: usize) -> Option<&Scene> {
        self.scenes.get(index)
    }
    pub fn scene_mut(&mut self, index: usize) -> Option<&mut Scene> {
        self.scenes.get_mut(index)
    }
    pub fn iter(&self) -> impl Iterator<Item = &Scene> + '_ {
        self.scenes.iter()
    }
    #[must_use]
    pub fn selected(&self) -> usize {
        self.selected
    }
    /// Switch to the scene in slot `index`, opening it if it was never opened.
    /// Returns false, selecting nothing, if there is no such slot.
    pub fn select(&mut self, index: usize) -> bool {
        let Some(scene) = self.scenes.get_mut(index) else {
            log::warn!("no scene slot {index}");
            return false;
        };
        if !scene.document().is_initialized() {
            scene.initialize();
        }
        self.selected = index;
        true
    }
    #[must_use]
    pub fn current(&self) -> &Scene {
        &self.scenes[self.selected]
    }
    pub fn current_mut(&mut self) -> &mut Scene {
        &mut self.scenes[self.selected]
    }
    /// Does any opened scene have changes not on disk?
    #[must_use]
    pub fn any_unsaved(&self) -> bool {
        self.scenes.iter().any(Scene::is_unsaved)
    }
    /// Write every unsaved scene into `dir`, under a fresh timestamped folder.
    /// Used when the application is going down and can't ask where to put things.
    pub fn emergency_save(&self, dir: &Path) -> Vec<PathBuf> {
        let timestamp = chrono::Local::now().format("%Y_%m_%d_%H_%M_%S").to_string();
        self.emergency_save_at(dir, &timestamp)
    }
    /// Write every unsaved scene to `dir/timestamp/<slot>.drawt`. Returns the paths that were written.
    ///
    /// Scenes keep their path and saved state, the copies are not where the user saved them.
    /// Failures are logged and skipped, there is no one left to report them to.
    pub fn emergency_save_at(&self, dir: &Path, timestamp: &str) -> Vec<PathBuf> {
        let unsaved: Vec<(usize, &Scene)> = self
            .scenes
            .iter()
            .enumerate()
            .filter(|(_, scene)| scene.is_unsaved())
            .collect();
        if unsaved.is_empty() {
            return Vec::new();
        }
        let dir = dir.join(timestamp);
        if let Err(err) = std::fs::create_dir_all(&dir) {
            log::error!("could not create {}: {err}", dir.display());
            return Vec::new();
        }
        let mut written = Vec::with_capacity(unsaved.len());
        for (index, scene) in unsaved {
            let path = dir.join(format!("{index}.drawt"));
            match scene.save_copy(&path) {
                Ok(()) => {
                    log::info!("saved {} to {}", scene.document().name(), path.display());
                    written.push(path);
                }
                Err(err) => log::error!("failed to save {}: {err}", scene.document().name()),
            }
        }
        written
    }
}
