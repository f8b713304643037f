//! Command handlers grouped by concern.

pub(crate) mod meta;

use crate::registry::{CommandRegistry, RegistrationError};

/// Register every command, in display order.
pub(crate) fn register(registry: &mut CommandRegistry) -> Result<(), RegistrationError> {
    meta::register(registry)
}
