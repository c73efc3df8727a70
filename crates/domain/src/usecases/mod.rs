//! Application use cases / business logic

pub mod render;
pub mod run_loop;

pub use render::{RenderConfig, Renderer};
pub use run_loop::{RunLoop, RunLoopConfig, RunLoopError};
