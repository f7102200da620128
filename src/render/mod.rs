pub mod anchor;
pub mod color;
pub mod engine;
pub mod error;
pub mod sink;

pub use anchor::Anchor;
pub use engine::{IconSide, Renderer, TextStyle};
pub use error::RenderError;
pub use sink::Sink;
