//! Raster political map engine.
//!
//! Everything here is a pure function of a [`World`] (province index,
//! ownership, country colours) plus view state. Derived layers are caches
//! that can be dropped and rebuilt at any time.

pub mod borders;
pub mod camera;
pub mod compositor;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod job;
pub mod labels;
pub mod political;
pub mod text;
pub mod world;

#[cfg(test)]
pub mod testing;

pub use camera::Camera;
pub use config::EngineConfig;
pub use engine::{EngineLoader, InteractionMode, MapEngine, MapEvent};
pub use error::EngineError;
pub use input::{PointerButton, PointerEvent};
pub use world::World;
