//! Transform registry
//!
//! Holds transforms in export order.

use super::{Signals2LogMel, Spec2LogMel, Transform};
use crate::error::{Result, WebfeatError};

/// Ordered collection of exportable transforms
pub struct TransformRegistry {
    transforms: Vec<Box<dyn Transform>>,
}

impl TransformRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    /// Registry with `spec2logmel` followed by `signals2logmel`
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(Spec2LogMel));
        registry.register(Box::new(Signals2LogMel));
        registry
    }

    /// Append a transform, replacing any earlier one with the same name
    pub fn register(&mut self, transform: Box<dyn Transform>) {
        self.transforms.retain(|t| t.name() != transform.name());
        self.transforms.push(transform);
    }

    /// Get a transform by name
    pub fn get(&self, name: &str) -> Result<&dyn Transform> {
        self.transforms
            .iter()
            .find(|t| t.name() == name)
            .map(|t| &**t)
            .ok_or_else(|| WebfeatError::UnknownTransform {
                name: name.to_string(),
            })
    }

    /// Registered names in export order
    pub fn names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Transform> {
        self.transforms.iter().map(|t| &**t)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
