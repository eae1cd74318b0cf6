pub mod content;
pub mod message;

pub use content::{Content, ImageEncoding, ImageSource, MediaType};
pub use message::{Message, Role, TurnInput};
