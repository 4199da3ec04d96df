pub mod duration;
pub mod error;
pub mod inputs;
pub mod lexer;
pub mod rich_text;
pub mod style;
pub mod testing;
pub mod unmarshal;

pub use crate::duration::PositiveDuration;
pub use crate::inputs::{scan_inputs, Inputs, InputsConfig, Test};
pub use crate::lexer::Lexer;
pub use crate::rich_text::RichText;
