use serde::{Deserialize, Serialize};

/// How a [`super::CdcConfig`] came to hold its current values.
///
/// Purely informational: printed in the startup banner so an operator can
/// tell a loaded config file apart from the built-in defaults at a glance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadStyle {
    Default,
    Toml,
}
