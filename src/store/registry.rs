use crate::subgraph::Property;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Builds a fresh property instance on every lookup.
pub type PropertyFactory = Arc<dyn Fn() -> Box<dyn Property> + Send + Sync>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown subgraph property '{name}' (registered: {})", .known.join(", "))]
    UnknownProperty { name: String, known: Vec<String> },
    #[error("Subgraph property '{0}' is already registered")]
    DuplicateProperty(String),
}

/// Maps rule names to property factories.
#[derive(Clone, Default)]
pub struct PropertyRegistry {
    factories: BTreeMap<String, PropertyFactory>,
}

impl PropertyRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Box<dyn Property> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(RegistryError::DuplicateProperty(name));
        }
        self.factories.insert(name, Arc::new(factory));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<Box<dyn Property>, RegistryError> {
        match self.factories.get(name) {
            Some(factory) => Ok(factory()),
            None => Err(RegistryError::UnknownProperty {
                name: name.to_string(),
                known: self.names().map(str::to_string).collect(),
            }),
        }
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for PropertyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyRegistry").field("properties", &self.factories.keys().collect::<Vec<_>>()).finish()
    }
}
