pub mod document;
pub mod health;
pub mod messages;
pub mod diagnostics;
pub mod error;

pub use document::*;
pub use health::*;
pub use messages::*;
pub use diagnostics::*;
pub use error::*;
