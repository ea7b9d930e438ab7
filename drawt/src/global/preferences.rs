use std::path::{Path, PathBuf};

use drawt_core::color::Color;
use drawt_core::Scene;

const DOCUMENTATION: &str = r"# drawt preferences. You may edit this file, but be aware that formatting and comments will not
# be preserved. Missing keys take their default value.

# scene_count: number of scene slots, each holding one open document.
# autosave_dir: where unsaved scenes are written if drawt goes down unexpectedly.
# canvas_color: linear RGB of the canvas in new scenes, each channel in [0, 1].
# draw_thickness: starting stroke width of the drawing tools.

";

#[must_use]
pub fn preferences_dir() -> Option<PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

#[must_use]
fn default_autosave_dir() -> PathBuf {
    let mut dir = dirs::data_local_dir().unwrap_or_default();
    dir.push(env!("CARGO_PKG_NAME"));
    dir.push("saves");
    dir
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Preferences {
    pub scene_count: usize,
    pub autosave_dir: PathBuf,
    pub canvas_color: [f32; 3],
    pub draw_thickness: f32,
    #[serde(skip)]
    failed_to_load: bool,
}
impl Default for Preferences {
    fn default() -> Self {
        let fresh = Scene::new();
        Self {
            scene_count: 10,
            autosave_dir: default_autosave_dir(),
            canvas_color: fresh.canvas_color.as_array(),
            draw_thickness: fresh.view.draw_thickness,
            failed_to_load: false,
        }
    }
}
impl Preferences {
    const FILENAME: &'static str = "preferences.toml";
    /// Shared global preferences, loaded from the user's preference directory.
    /// (Or defaulted, if unavailable for some reason)
    #[must_use]
    pub fn get() -> &'static Self {
        static GLOBAL_PREFERENCES: std::sync::OnceLock<Preferences> = std::sync::OnceLock::new();

        GLOBAL_PREFERENCES.get_or_init(|| match preferences_dir() {
            None => {
                log::warn!("Preferences dir wasn't available, defaulting.");
                Self::default()
            }
            Some(mut dir) => {
                dir.push(Self::FILENAME);
                Self::load_or_default(&dir)
            }
        })
    }
    /// Read preferences from `path`. A missing file is created with the defaults,
    /// a malformed one is left alone for the user to fix.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        let loaded: anyhow::Result<Preferences> = try_block::try_block! {
            let string = std::fs::read_to_string(path)?;
            let preferences : Preferences = toml::from_str(&string)?;

            Ok(preferences)
        };

        match loaded {
            Ok(preferences) => preferences,
            Err(err)
                if err
                    .downcast_ref::<std::io::Error>()
                    .is_some_and(|err| err.kind() == std::io::ErrorKind::NotFound) =>
            {
                let defaults = Self::default();
                if let Err(err) = defaults.save(path) {
                    log::warn!("Failed to write default preferences:\n{err:?}");
                }
                defaults
            }
            Err(err) => {
                log::warn!("Failed to load {}, defaulting:\n{err:?}", path.display());
                Self {
                    failed_to_load: true,
                    ..Self::default()
                }
            }
        }
    }
    /// Return true if the user's file exists but could not be read. This can be useful for
    /// displaying a warning.
    #[must_use]
    pub fn did_fail_to_load(&self) -> bool {
        self.failed_to_load
    }
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            // Explicity do *not* create recursively. If not found, the user probably has a good reason.
            // Ignore errors (could already exist). Any real errors will be emitted by file access below.
            let _ = std::fs::DirBuilder::new().create(parent);
        }
        let string = DOCUMENTATION.to_owned() + &toml::ser::to_string_pretty(self)?;
        std::fs::write(path, string)?;
        Ok(())
    }
    /// Set up a blank scene with the user's defaults.
    pub fn apply(&self, scene: &mut Scene) {
        let [r, g, b] = self.canvas_color;
        scene.canvas_color = Color::new(r, g, b);
        scene.view.draw_thickness = self.draw_thickness;
    }
}

#[cfg(test)]
mod test {
    use super::Preferences;

    #[test]
    fn missing_file_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml");
        let preferences = Preferences::load_or_default(&path);
        assert_eq!(preferences, Preferences::default());
        assert!(!preferences.did_fail_to_load());
        // And reads back the same.
        assert_eq!(Preferences::load_or_default(&path), preferences);
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .starts_with("# drawt preferences"));
    }
    #[test]
    fn partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml");
        std::fs::write(&path, "scene_count = 3\ncanvas_color = [1.0, 0.0, 0.5]\n").unwrap();
        let preferences = Preferences::load_or_default(&path);
        assert_eq!(preferences.scene_count, 3);
        assert_eq!(preferences.canvas_color, [1.0, 0.0, 0.5]);
        assert_eq!(
            preferences.draw_thickness,
            Preferences::default().draw_thickness
        );

        let mut scene = drawt_core::Scene::new();
        preferences.apply(&mut scene);
        assert_eq!(scene.canvas_color.as_array(), [1.0, 0.0, 0.5]);
    }
    #[test]
    fn malformed_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml");
        let contents = "scene_count = \"many\"\n";
        std::fs::write(&path, contents).unwrap();
        let preferences = Preferences::load_or_default(&path);
        assert!(preferences.did_fail_to_load());
        assert_eq!(preferences.scene_count, Preferences::default().scene_count);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), contents);
    }
}
