//! Tile kernel-language backend.

pub mod compiler;
pub mod generator;
pub mod writer;

pub use compiler::{TileCompiler, TileFunction};
pub use generator::{tile_nesting, TileGenerator, TileOptions};
pub use writer::TileWriter;
