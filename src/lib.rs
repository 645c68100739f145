pub mod assets;
pub mod error;
pub mod pipeline;

pub use error::{ErrorKind, GenerationError};
