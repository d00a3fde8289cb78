use indexmap::IndexMap;

use crate::binding::Binding;
use crate::errors::InjectorError;
use crate::key::{BindingKey, BindingKeyView};

/// Insertion-ordered map from binding key to binding.
///
/// Lookup accepts [`BindingKeyView`] so the hot path never allocates a
/// key. Iteration order is the order configurations added bindings in,
/// which keeps printouts and graph dumps deterministic.
#[derive(Default)]
pub(crate) struct BindingMap {
    entries: IndexMap<BindingKey, Box<dyn Binding>>,
}

impl BindingMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Inserts a binding under its own key. An existing entry for the
    /// key is an error.
    pub(crate) fn put(&mut self, binding: Box<dyn Binding>) -> Result<(), InjectorError> {
        let key = binding.key().clone();
        if self.entries.contains_key(&key) {
            return Err(InjectorError::DuplicateBinding { key });
        }
        self.entries.insert(key, binding);
        Ok(())
    }

    pub(crate) fn has_key(&self, key: &BindingKey) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn find(&self, view: &BindingKeyView<'_>) -> Option<&dyn Binding> {
        self.entries.get(view).map(|b| b.as_ref())
    }

    pub(crate) fn get(&self, key: &BindingKey) -> Result<&dyn Binding, InjectorError> {
        self.entries
            .get(key)
            .map(|b| b.as_ref())
            .ok_or_else(|| InjectorError::NoBinding { key: key.clone() })
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&BindingKey, &dyn Binding)> {
        self.entries.iter().map(|(k, b)| (k, b.as_ref()))
    }
}
