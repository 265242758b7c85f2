pub mod broadcast;
pub mod connctx;
pub mod gateway;
pub mod handler;
pub mod msg_presence_handler;
pub mod msg_update_handler;
