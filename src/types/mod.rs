// ABOUTME: Domain value types shared across the crate.
// ABOUTME: Validated service/config names and container image references.

mod config_name;
mod image_ref;
mod service_name;

pub use config_name::{ConfigName, IllegalConfigName};
pub use image_ref::{ImageRef, ParseImageRefError};
pub use service_name::{IllegalServiceName, ServiceName};

/// Legality predicate shared by service and configuration names: at least
/// one character, first character alphanumeric, no whitespace anywhere.
pub(crate) fn legal_name(name: &str) -> bool {
    match name.chars().next() {
        Some(first) if first.is_alphanumeric() => {}
        _ => return false,
    }

    !name.chars().any(char::is_whitespace)
}
