//! Application entry point for the branching-letters viewer.
//!
//! This binary sets up logging and eframe/egui, loads a glyph catalogue and
//! delegates all interactive logic and rendering to [`Viewer`].

mod demo;
mod viewer;

use branches_core::Catalogue;
use viewer::Viewer;

/// Starts the native eframe application.
///
/// The first command-line argument, if any, is a JSON glyph catalogue to
/// load; otherwise the built-in demo catalogue is used.
///
/// ### Returns
/// - `Ok(())` if the application runs to completion without errors.
/// - `Err` if the catalogue cannot be loaded, or eframe fails to create the
///   native window or event loop.
fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let catalogue = match std::env::args_os().nth(1) {
        Some(path) => Catalogue::load(path),
        None => demo::catalogue(),
    }
    .map_err(|err| {
        log::error!("could not load glyph catalogue: {err}");
        eframe::Error::AppCreation(Box::new(err))
    })?;
    log::info!("catalogue holds {} glyphs", catalogue.len());

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Branches",
        options,
        Box::new(|_cc| Ok(Box::new(Viewer::new(catalogue)))),
    )
}
