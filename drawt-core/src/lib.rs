//! Document model of drawt: scenes of drawable entities, the undoable history that builds them, and the
//! file format they are saved in. Nothing here draws - rendering goes through the [`render::Renderer`] seam.

pub mod color;
pub mod commands;
pub mod geometry;
pub mod id;
pub mod io;
pub mod queue;
pub mod render;
pub mod repositories;
pub mod session;
pub mod state;

pub use id::EntityID;
pub use session::DocumentSession;
pub use state::Scene;
