// ABOUTME: Library root for dockhand - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod configs;
pub mod error;
pub mod init_system;
pub mod layout;
pub mod lifecycle;
pub mod notify;
pub mod registry;
pub mod runtime;
pub mod settings;
pub mod types;
