//! Global singletons.

pub mod preferences;

use std::path::Path;

use drawt_core::DocumentSession;

/// Get the shared global session, with one scene slot per the user's preferences.
///
/// The session only lives here so panic recovery can reach it, everything else is handed it by reference.
pub fn session() -> &'static parking_lot::Mutex<DocumentSession> {
    static SESSION: std::sync::OnceLock<parking_lot::Mutex<DocumentSession>> =
        std::sync::OnceLock::new();

    SESSION.get_or_init(|| {
        let preferences = preferences::Preferences::get();
        let [r, g, b] = preferences.canvas_color;
        let mut session = DocumentSession::with_canvas_color(
            preferences.scene_count,
            drawt_core::color::Color::new(r, g, b),
        );
        for index in 0..session.len() {
            if let Some(scene) = session.scene_mut(index) {
                preferences.apply(scene);
            }
        }
        // Slot 0 was opened before it was set up.
        session.current_mut().initialize();
        parking_lot::Mutex::new(session)
    })
}

/// Write every unsaved scene of `session` to `dir`, logging where they went.
pub fn emergency_save(session: &DocumentSession, dir: &Path) {
    let written = session.emergency_save(dir);
    log::error!(
        "Panicked, saved {} unsaved scenes to {}",
        written.len(),
        dir.display()
    );
}

/// Run `body`. If it panics, save every unsaved scene of `session` to `dir` once the unwind has released
/// whatever locks `body` held, then carry on panicking.
pub fn guarded<R>(
    session: &parking_lot::Mutex<DocumentSession>,
    dir: &Path,
    body: impl FnOnce() -> R,
) -> R {
    // Locks aren't poisoned, and the session is only read from here on.
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(body)) {
        Ok(result) => result,
        Err(payload) => {
            emergency_save(&session.lock(), dir);
            std::panic::resume_unwind(payload)
        }
    }
}
