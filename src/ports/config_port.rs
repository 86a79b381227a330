//! Configuration access port.

/// Key/value configuration grouped into named sections.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    /// `Ok(None)` when the key is absent or blank, `Err` when present but not a boolean.
    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, String>;
    /// All section names, sorted.
    fn sections(&self) -> Vec<String>;
}
