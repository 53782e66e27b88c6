//! Ordered, immutable registry of listing sources.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::traits::{ListingSource, Result, SearchError};

/// A registered source: stable name, enabled flag, priority and the adapter itself.
#[derive(Clone)]
pub struct SourceDescriptor {
    pub name: String,
    pub enabled: bool,
    /// Higher is more trusted and ranks first
    pub priority: i32,
    pub source: Arc<dyn ListingSource>,
}

impl SourceDescriptor {
    pub fn new(
        name: impl Into<String>,
        priority: i32,
        source: impl ListingSource + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            priority,
            source: Arc::new(source),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn info(&self) -> SourceInfo {
        SourceInfo {
            name: self.name.clone(),
            enabled: self.enabled,
            priority: self.priority,
        }
    }
}

impl fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Serializable view of a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub enabled: bool,
    pub priority: i32,
}

/// Sources in registration order. Changing the set means building a new registry.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    descriptors: Vec<SourceDescriptor>,
}

impl SourceRegistry {
    /// Build a registry, rejecting blank or duplicate names.
    pub fn new(descriptors: Vec<SourceDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for descriptor in &descriptors {
            if descriptor.name.trim().is_empty() {
                return Err(SearchError::Registry("source name must not be blank".into()));
            }
            if !seen.insert(descriptor.name.as_str()) {
                return Err(SearchError::Registry(format!(
                    "duplicate source name '{}'",
                    descriptor.name
                )));
            }
        }

        Ok(Self { descriptors })
    }

    /// Enabled descriptors, in registration order.
    pub fn enabled(&self) -> Vec<&SourceDescriptor> {
        self.descriptors.iter().filter(|d| d.enabled).collect()
    }

    pub fn get(&self, name: &str) -> Option<&SourceDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn total(&self) -> usize {
        self.descriptors.len()
    }

    pub fn enabled_count(&self) -> usize {
        self.descriptors.iter().filter(|d| d.enabled).count()
    }

    pub fn infos(&self) -> Vec<SourceInfo> {
        self.descriptors.iter().map(SourceDescriptor::info).collect()
    }
}
