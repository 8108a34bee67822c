pub mod pdf;
pub mod source;
pub mod text;

pub use pdf::*;
pub use source::*;
pub use text::*;
