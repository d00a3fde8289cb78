//! The binding family.
//!
//! Each meta-type has one generic binding shape. Bindings are stored
//! type-erased behind [`Binding`] and recovered with a concrete downcast
//! at lookup time; the key's type id guarantees the downcast target.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use once_cell::sync::OnceCell;

use crate::errors::InjectorError;
use crate::injector::Injector;
use crate::key::BindingKey;

pub(crate) type Produce<T> =
    Box<dyn Fn(&Injector) -> Result<T, InjectorError> + Send + Sync>;

/// Type-erased binding stored in the binding map.
pub(crate) trait Binding: Send + Sync {
    fn key(&self) -> &BindingKey;

    /// Keys this binding resolves during production. Static descriptor
    /// only; calling this never instantiates anything.
    fn dependency_keys(&self) -> &[BindingKey];

    fn is_shared(&self) -> bool {
        false
    }

    fn is_eager(&self) -> bool {
        false
    }

    fn is_thread_local(&self) -> bool {
        false
    }

    /// Forces instantiation for eager bindings; a no-op for the rest.
    fn instantiate_if_eager(&self, _injector: &Injector) -> Result<(), InjectorError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;
}

impl std::fmt::Debug for dyn Binding + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("key", self.key())
            .finish_non_exhaustive()
    }
}

/// Produces a fresh stack value per injection.
pub(crate) struct ValueBinding<T> {
    key: BindingKey,
    dependencies: Vec<BindingKey>,
    produce: Produce<T>,
}

impl<T: Send + Sync + 'static> ValueBinding<T> {
    pub(crate) fn new(key: BindingKey, dependencies: Vec<BindingKey>, produce: Produce<T>) -> Self {
        Self { key, dependencies, produce }
    }

    pub(crate) fn get(&self, injector: &Injector) -> Result<T, InjectorError> {
        (self.produce)(injector)
    }
}

impl<T: Send + Sync + 'static> Binding for ValueBinding<T> {
    fn key(&self) -> &BindingKey {
        &self.key
    }

    fn dependency_keys(&self) -> &[BindingKey] {
        &self.dependencies
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Produces a fresh heap instance per injection, ownership transferred
/// to the caller.
pub(crate) struct UniqueBinding<T> {
    key: BindingKey,
    dependencies: Vec<BindingKey>,
    produce: Produce<Box<T>>,
}

impl<T: Send + Sync + 'static> UniqueBinding<T> {
    pub(crate) fn new(
        key: BindingKey,
        dependencies: Vec<BindingKey>,
        produce: Produce<Box<T>>,
    ) -> Self {
        Self { key, dependencies, produce }
    }

    pub(crate) fn get(&self, injector: &Injector) -> Result<Box<T>, InjectorError> {
        (self.produce)(injector)
    }
}

impl<T: Send + Sync + 'static> Binding for UniqueBinding<T> {
    fn key(&self) -> &BindingKey {
        &self.key
    }

    fn dependency_keys(&self) -> &[BindingKey] {
        &self.dependencies
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Hands out a reference to an externally owned instance. Resolution
/// never allocates or constructs.
pub(crate) struct ReferenceBinding<T: 'static> {
    key: BindingKey,
    reference: &'static T,
}

impl<T: Send + Sync + 'static> ReferenceBinding<T> {
    pub(crate) fn new(key: BindingKey, reference: &'static T) -> Self {
        Self { key, reference }
    }

    pub(crate) fn get(&self) -> &'static T {
        self.reference
    }
}

impl<T: Send + Sync + 'static> Binding for ReferenceBinding<T> {
    fn key(&self) -> &BindingKey {
        &self.key
    }

    fn dependency_keys(&self) -> &[BindingKey] {
        &[]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Singleton binding: lazy, eager, provided, or thread-local.
///
/// Instance storage lives inside the binding, so injectors sharing a
/// binding map (prototype children) share singletons.
pub(crate) struct SharedBinding<T> {
    key: BindingKey,
    dependencies: Vec<BindingKey>,
    eager: bool,
    thread_local: bool,
    produce: Produce<Arc<T>>,
    singleton: OnceCell<Arc<T>>,
    // entries for exited threads are retained until the binding drops
    per_thread: Mutex<HashMap<ThreadId, Arc<T>>>,
}

impl<T: Send + Sync + 'static> SharedBinding<T> {
    pub(crate) fn new(
        key: BindingKey,
        dependencies: Vec<BindingKey>,
        produce: Produce<Arc<T>>,
        eager: bool,
        thread_local: bool,
    ) -> Self {
        Self {
            key,
            dependencies,
            eager,
            thread_local,
            produce,
            singleton: OnceCell::new(),
            per_thread: Mutex::new(HashMap::new()),
        }
    }

    /// A singleton seeded with an already constructed instance.
    pub(crate) fn with_instance(key: BindingKey, instance: Arc<T>) -> Self {
        let seed = instance.clone();
        Self {
            key,
            dependencies: Vec::new(),
            eager: false,
            thread_local: false,
            produce: Box::new(move |_| Ok(seed.clone())),
            singleton: OnceCell::with_value(instance),
            per_thread: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn get(&self, injector: &Injector) -> Result<Arc<T>, InjectorError> {
        if self.thread_local {
            return self.get_for_thread(injector);
        }
        self.singleton
            .get_or_try_init(|| (self.produce)(injector))
            .map(Arc::clone)
    }

    fn get_for_thread(&self, injector: &Injector) -> Result<Arc<T>, InjectorError> {
        let id = thread::current().id();
        {
            let table = lock_or_recover(&self.per_thread);
            if let Some(instance) = table.get(&id) {
                return Ok(instance.clone());
            }
        }
        // construct with the lock released; dependency resolution may
        // land back on other bindings
        let instance = (self.produce)(injector)?;
        let mut table = lock_or_recover(&self.per_thread);
        Ok(table.entry(id).or_insert(instance).clone())
    }
}

pub(crate) fn lock_or_recover<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl<T: Send + Sync + 'static> Binding for SharedBinding<T> {
    fn key(&self) -> &BindingKey {
        &self.key
    }

    fn dependency_keys(&self) -> &[BindingKey] {
        &self.dependencies
    }

    fn is_shared(&self) -> bool {
        true
    }

    fn is_eager(&self) -> bool {
        self.eager
    }

    fn is_thread_local(&self) -> bool {
        self.thread_local
    }

    fn instantiate_if_eager(&self, injector: &Injector) -> Result<(), InjectorError> {
        if self.eager {
            self.get(injector)?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
