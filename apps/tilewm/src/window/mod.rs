pub mod client;
pub mod drag;
pub mod error;
pub mod layout;
pub mod manager;
pub mod registry;
pub mod workspace;
