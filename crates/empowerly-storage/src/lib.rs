pub mod db;
pub mod memory;
pub mod migrations;

use anyhow::Result;

pub use db::Database;
pub use memory::MemoryStorage;

/// Durable string key/value storage, the "local storage" behind a session.
///
/// Multi-key writes and removals are all-or-nothing: an implementation must
/// never leave only some of the given keys changed.
pub trait KeyValueStore: Send {
    /// Read a single value
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write every pair in one step
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; no key is changed in that case
    fn set_items(&mut self, items: &[(&str, &str)]) -> Result<()>;

    /// Remove every key in one step. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails; no key is removed in that case
    fn remove_items(&mut self, keys: &[&str]) -> Result<()>;
}
