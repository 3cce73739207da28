pub use crate::types::AutoReconError;

pub type Result<T> = std::result::Result<T, AutoReconError>;

/// Attaches a message to a failure while reading or writing the settings
/// store. The result is always [`AutoReconError::ConfigError`].
pub trait ConfigContext<T> {
    fn config_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ConfigContext<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn config_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AutoReconError::ConfigError(format!("{}: {}", f(), e)))
    }
}
