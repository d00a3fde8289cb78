//! Binding identity.
//!
//! A binding is addressed by its meta-type (how instances are produced),
//! the target type, and an instance name. The empty name addresses the
//! unnamed binding of a type.

use std::any::{type_name, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::Equivalent;

/// How a binding produces instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BindingMetaType {
    /// A new stack value per injection.
    Value,
    /// A new heap instance per injection, ownership transferred.
    Unique,
    /// A handle to an externally owned instance.
    Reference,
    /// A shared handle to a single instance.
    Shared,
    /// A weak handle to a shared binding. Appears only in dependency
    /// keys and is promoted to [`BindingMetaType::Shared`] when matched
    /// against provided bindings.
    WeakPromotion,
}

impl fmt::Display for BindingMetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BindingMetaType::Value => "Value",
            BindingMetaType::Unique => "Unique",
            BindingMetaType::Reference => "Reference",
            BindingMetaType::Shared => "Shared",
            BindingMetaType::WeakPromotion => "Weak",
        };
        f.write_str(s)
    }
}

/// Owned binding key.
///
/// Equality and hashing cover the meta-type, the type id, and the name.
/// The captured type name participates only in ordering and display.
#[derive(Debug, Clone)]
pub struct BindingKey {
    meta_type: BindingMetaType,
    type_id: TypeId,
    type_name: &'static str,
    name: String,
}

impl BindingKey {
    pub fn new<T: ?Sized + 'static>(meta_type: BindingMetaType, name: &str) -> Self {
        Self {
            meta_type,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            name: name.to_owned(),
        }
    }

    pub fn value<T: ?Sized + 'static>(name: &str) -> Self {
        Self::new::<T>(BindingMetaType::Value, name)
    }

    pub fn unique<T: ?Sized + 'static>(name: &str) -> Self {
        Self::new::<T>(BindingMetaType::Unique, name)
    }

    pub fn reference<T: ?Sized + 'static>(name: &str) -> Self {
        Self::new::<T>(BindingMetaType::Reference, name)
    }

    pub fn shared<T: ?Sized + 'static>(name: &str) -> Self {
        Self::new::<T>(BindingMetaType::Shared, name)
    }

    pub fn weak<T: ?Sized + 'static>(name: &str) -> Self {
        Self::new::<T>(BindingMetaType::WeakPromotion, name)
    }

    pub fn meta_type(&self) -> BindingMetaType {
        self.meta_type
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rewrites a weak dependency key to the shared key it resolves
    /// against. Other meta-types pass through unchanged.
    pub fn promote(mut self) -> Self {
        if self.meta_type == BindingMetaType::WeakPromotion {
            self.meta_type = BindingMetaType::Shared;
        }
        self
    }

    pub fn view(&self) -> BindingKeyView<'_> {
        BindingKeyView {
            meta_type: self.meta_type,
            type_id: self.type_id,
            type_name: self.type_name,
            name: &self.name,
        }
    }
}

impl PartialEq for BindingKey {
    fn eq(&self, other: &Self) -> bool {
        self.meta_type == other.meta_type
            && self.type_id == other.type_id
            && self.name == other.name
    }
}

impl Eq for BindingKey {}

impl Hash for BindingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.meta_type.hash(state);
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl Ord for BindingKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.meta_type
            .cmp(&other.meta_type)
            .then_with(|| self.type_name.cmp(other.type_name))
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.type_id.cmp(&other.type_id))
    }
}

impl PartialOrd for BindingKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}, \"{}\"}}", self.meta_type, self.type_name, self.name)
    }
}

/// Borrowed binding key, used to look bindings up without allocating.
///
/// Hashes identically to [`BindingKey`], so it can serve as a map lookup
/// key via [`indexmap::Equivalent`].
#[derive(Debug, Clone, Copy)]
pub struct BindingKeyView<'a> {
    meta_type: BindingMetaType,
    type_id: TypeId,
    type_name: &'static str,
    name: &'a str,
}

impl<'a> BindingKeyView<'a> {
    pub fn new<T: ?Sized + 'static>(meta_type: BindingMetaType, name: &'a str) -> Self {
        Self {
            meta_type,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            name,
        }
    }

    pub fn value<T: ?Sized + 'static>(name: &'a str) -> Self {
        Self::new::<T>(BindingMetaType::Value, name)
    }

    pub fn unique<T: ?Sized + 'static>(name: &'a str) -> Self {
        Self::new::<T>(BindingMetaType::Unique, name)
    }

    pub fn reference<T: ?Sized + 'static>(name: &'a str) -> Self {
        Self::new::<T>(BindingMetaType::Reference, name)
    }

    pub fn shared<T: ?Sized + 'static>(name: &'a str) -> Self {
        Self::new::<T>(BindingMetaType::Shared, name)
    }

    pub fn meta_type(&self) -> BindingMetaType {
        self.meta_type
    }

    pub fn to_key(&self) -> BindingKey {
        BindingKey {
            meta_type: self.meta_type,
            type_id: self.type_id,
            type_name: self.type_name,
            name: self.name.to_owned(),
        }
    }
}

impl PartialEq for BindingKeyView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.meta_type == other.meta_type
            && self.type_id == other.type_id
            && self.name == other.name
    }
}

impl Eq for BindingKeyView<'_> {}

impl Hash for BindingKeyView<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.meta_type.hash(state);
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl Equivalent<BindingKey> for BindingKeyView<'_> {
    fn equivalent(&self, key: &BindingKey) -> bool {
        self.meta_type == key.meta_type
            && self.type_id == key.type_id
            && self.name == key.name
    }
}

impl fmt::Display for BindingKeyView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}, \"{}\"}}", self.meta_type, self.type_name, self.name)
    }
}
