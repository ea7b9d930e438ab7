#![warn(clippy::pedantic)]

pub mod global;

use drawt_core::render::NullRenderer;
use drawt_core::repositories::images;

use anyhow::Result as AnyResult;

/// Save unsaved scenes when a thread other than main panics. Main recovers through [`global::guarded`].
fn install_emergency_save() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        previous(info);
        if std::thread::current().name() == Some("main") {
            return;
        }
        let dir = &global::preferences::Preferences::get().autosave_dir;
        // Can't wait on a lock held by whoever panicked.
        match global::session().try_lock() {
            Some(session) => global::emergency_save(&session, dir),
            None => log::error!("Panicked while the session was in use, nothing saved."),
        }
    }));
}

/// Open every path given on the command line into its own scene slot, and print what each slot holds.
/// Returns false if paths were given but none of them could be opened.
fn open_and_report() -> bool {
    // Headless, there is nothing to draw into.
    let mut renderer = NullRenderer::default();

    // Args are a simple list of paths to open at startup, one per scene slot.
    // Paths are OSStrings, let the system handle character encoding restrictions.
    let paths: Vec<std::path::PathBuf> = std::env::args_os().skip(1).map(Into::into).collect();
    let mut session = global::session().lock();
    if paths.len() > session.len() {
        log::warn!(
            "Only {} scene slots, ignoring {} paths.",
            session.len(),
            paths.len() - session.len()
        );
    }
    // Did we have at least one success? No paths is a success.
    let mut had_success = paths.is_empty();
    for (index, path) in paths.iter().enumerate().take(session.len()) {
        session.select(index);
        match session.current_mut().load(path, &mut renderer) {
            Ok(()) => had_success = true,
            Err(e) => log::error!("failed to open file {path:?}: {e:#}"),
        }
    }
    session.select(0);

    // Upload whatever images finished decoding while the files were read.
    let uploaded = images::global().poll(&mut renderer);
    log::debug!("{uploaded} images ready");

    for (index, scene) in session
        .iter()
        .enumerate()
        .filter(|(_, scene)| scene.document().is_initialized())
    {
        println!(
            "{index}: {} - {} entities, {} of {} actions applied{}",
            scene.document().name(),
            scene.entities().len(),
            scene.log().cursor(),
            scene.log().len(),
            if scene.is_unsaved() { ", unsaved" } else { "" }
        );
    }
    had_success
}

fn main() -> AnyResult<()> {
    let has_term = std::io::IsTerminal::is_terminal(&std::io::stdin());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", log::LevelFilter::Debug);
    }

    if global::preferences::Preferences::get().did_fail_to_load() {
        log::warn!("Using default preferences.");
    }
    install_emergency_save();

    let autosave_dir = &global::preferences::Preferences::get().autosave_dir;
    let had_success = global::guarded(global::session(), autosave_dir, open_and_report);

    // False if every file failed.
    if !had_success {
        anyhow::bail!("Failed to load any provided document.");
    }
    Ok(())
}
