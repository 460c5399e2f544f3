use thiserror::Error;

/// Provider-registry errors.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The requested provider name has no registration. Lists currently
    /// registered names to aid debugging.
    #[error("Provider not found: '{name}'. Available providers: {available}")]
    NotFound { name: String, available: String },
    #[error("Provider registration failed: {0}")]
    Registration(String),
}

impl PluginError {
    pub(crate) fn not_found(name: &str, registered: &[String]) -> Self {
        let available = if registered.is_empty() {
            "(none)".to_string()
        } else {
            registered.join(", ")
        };
        PluginError::NotFound {
            name: name.to_string(),
            available,
        }
    }
}
