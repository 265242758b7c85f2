pub mod auth_service;
pub mod doc_lifecycle_service;
pub mod session_service;
pub mod sweeper_service;
pub mod update_policy;
