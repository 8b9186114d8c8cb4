use crate::error::AppError;
use std::collections::HashMap;

pub mod json_store;

pub use json_store::JsonFileStore;

/// String-keyed persistence backing a board.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError>;

    fn remove(&mut self, key: &str) -> Result<(), AppError>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), AppError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Handle onto one [`MemoryStore`] that several boards can write through,
/// standing in for processes sharing a store file.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub(crate) struct SharedStore(std::rc::Rc<std::cell::RefCell<MemoryStore>>);

#[cfg(test)]
impl KeyValueStore for SharedStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        self.0.borrow().get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        self.0.borrow_mut().set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), AppError> {
        self.0.borrow_mut().remove(key)
    }
}
