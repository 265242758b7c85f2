pub mod store;
pub mod dbdocs;
pub mod memdocs;

pub use store::*;
pub use dbdocs::PgDocumentStore;
pub use memdocs::MemoryDocumentStore;
