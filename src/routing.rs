//! Category → destination lookup.
//!
//! Built once at startup and shared read-only. Categories without a
//! configured destination go to the default (the brain dump database).

use std::collections::HashMap;

use crate::categorize::Category;

/// Immutable routing table with a mandatory default destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    destinations: HashMap<Category, String>,
    default: String,
}

impl RoutingTable {
    /// Table that sends everything to `default`.
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            destinations: HashMap::new(),
            default: default.into(),
        }
    }

    /// Add a destination for `category`. Blank ids are ignored.
    pub fn with_destination(mut self, category: Category, destination: impl Into<String>) -> Self {
        let destination = destination.into();
        if !destination.trim().is_empty() {
            self.destinations.insert(category, destination);
        }
        self
    }

    /// Destination for `category`, or the default when none is configured.
    pub fn destination_for(&self, category: Category) -> &str {
        self.destinations
            .get(&category)
            .map(String::as_str)
            .unwrap_or(&self.default)
    }

    /// Destination for a raw category name; unknown names use the default.
    pub fn destination_for_name(&self, name: &str) -> &str {
        match Category::from_name(name) {
            Some(category) => self.destination_for(category),
            None => &self.default,
        }
    }

    pub fn default_destination(&self) -> &str {
        &self.default
    }

    /// Whether `category` has its own destination.
    pub fn is_configured(&self, category: Category) -> bool {
        self.destinations.contains_key(&category)
    }
}
