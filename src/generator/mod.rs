//! Target-independent code generation from expression trees.

pub mod context;
pub mod language;
pub mod nesting;
pub mod writer;

pub use context::GeneratorContext;
pub use language::{LanguageGenerator, Position, Side};
pub use nesting::NestingPolicy;
pub use writer::LanguageWriter;
