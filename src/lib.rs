pub mod config;
pub mod core;
pub mod dispatch;
pub mod host;
pub mod persistence;
pub mod providers;
pub mod resolve;
pub mod session;
pub mod suggestion;
pub mod template;

pub use crate::core::SuggestError;
