pub mod health;
pub mod doc_session;
pub mod doc_deactivate;
pub mod doc_get;
pub mod doc_update;
pub mod diagnostics;

pub use health::*;
pub use doc_session::*;
pub use doc_deactivate::*;
pub use doc_get::*;
pub use doc_update::*;
pub use diagnostics::*;
