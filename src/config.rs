//! Injector configuration surface.
//!
//! Configurations receive a [`Binder`] and declare bindings through the
//! fluent [`BindingBuilder`]. A configuration may pull further
//! configurations in with [`Binder::add_configuration`]; these are
//! merged recursively before the binding map is built.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::binding::{Binding, ReferenceBinding, SharedBinding, UniqueBinding, ValueBinding};
use crate::injectable::Injectable;
use crate::injector::Injector;
use crate::key::BindingKey;

pub(crate) type PostConstruction = Box<dyn FnOnce(&Arc<Injector>) + Send>;
pub(crate) type PreDestruction = Box<dyn FnOnce() + Send>;

/// A set of binding declarations.
///
/// ```
/// use bindery::{Binder, Injector, InjectorConfiguration};
///
/// struct Config;
///
/// impl InjectorConfiguration for Config {
///     fn configure(&self, binder: &mut Binder) {
///         binder.bind::<u32>("retries").to_prototype(3);
///     }
/// }
///
/// let injector = Injector::create(&[&Config]).unwrap();
/// assert_eq!(injector.get_value::<u32>("retries").unwrap(), 3);
/// ```
pub trait InjectorConfiguration {
    fn configure(&self, binder: &mut Binder);
}

/// Collects bindings, nested configurations, and lifecycle callbacks
/// while configurations run.
#[derive(Default)]
pub struct Binder {
    pub(crate) entries: Vec<Box<dyn Binding>>,
    pub(crate) extra: Vec<Box<dyn InjectorConfiguration>>,
    pub(crate) post_construction: Vec<PostConstruction>,
    pub(crate) pre_destruction: Vec<PreDestruction>,
}

impl Binder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Starts a binding declaration for `T` under `name`. The returned
    /// builder must be finished with one of its `to_*` methods; an
    /// unfinished builder declares nothing.
    pub fn bind<T: Send + Sync + 'static>(&mut self, name: &str) -> BindingBuilder<'_, T> {
        BindingBuilder {
            binder: self,
            name: name.to_owned(),
            _target: PhantomData,
        }
    }

    /// Merges another configuration into this one. Applied after the
    /// current configuration finishes; nested additions are drained
    /// until none remain.
    pub fn add_configuration(&mut self, configuration: impl InjectorConfiguration + 'static) {
        self.extra.push(Box::new(configuration));
    }

    /// Registers a callback invoked once the injector is fully
    /// constructed, after eager singletons are instantiated.
    pub fn register_post_construction(
        &mut self,
        callback: impl FnOnce(&Arc<Injector>) + Send + 'static,
    ) {
        self.post_construction.push(Box::new(callback));
    }

    /// Registers a callback invoked when the injector is dropped,
    /// before its bindings are released.
    pub fn register_pre_destruction(&mut self, callback: impl FnOnce() + Send + 'static) {
        self.pre_destruction.push(Box::new(callback));
    }

    fn put(&mut self, binding: Box<dyn Binding>) {
        self.entries.push(binding);
    }
}

/// Fluent terminal step of a binding declaration.
pub struct BindingBuilder<'b, T> {
    binder: &'b mut Binder,
    name: String,
    _target: PhantomData<T>,
}

impl<'b, T: Send + Sync + 'static> BindingBuilder<'b, T> {
    /// New value per injection, built by the type's own constructor.
    pub fn to_value(self)
    where
        T: Injectable,
    {
        let key = BindingKey::value::<T>(&self.name);
        self.binder.put(Box::new(ValueBinding::<T>::new(
            key,
            T::dependencies(),
            Box::new(T::construct),
        )));
    }

    /// New value per injection, cloned from a prototype.
    pub fn to_prototype(self, prototype: T)
    where
        T: Clone,
    {
        let key = BindingKey::value::<T>(&self.name);
        self.binder.put(Box::new(ValueBinding::<T>::new(
            key,
            Vec::new(),
            Box::new(move |_| Ok(prototype.clone())),
        )));
    }

    /// New value per injection, produced by a closure.
    pub fn to_value_provider(self, provider: impl Fn() -> T + Send + Sync + 'static) {
        let key = BindingKey::value::<T>(&self.name);
        self.binder.put(Box::new(ValueBinding::<T>::new(
            key,
            Vec::new(),
            Box::new(move |_| Ok(provider())),
        )));
    }

    /// New heap instance per injection, built by the type's own
    /// constructor; ownership passes to the caller.
    pub fn to_unique(self)
    where
        T: Injectable,
    {
        let key = BindingKey::unique::<T>(&self.name);
        self.binder.put(Box::new(UniqueBinding::<T>::new(
            key,
            T::dependencies(),
            Box::new(|injector| Ok(Box::new(T::construct(injector)?))),
        )));
    }

    /// New heap instance per injection, produced by a closure.
    pub fn to_unique_provider(self, provider: impl Fn() -> Box<T> + Send + Sync + 'static) {
        let key = BindingKey::unique::<T>(&self.name);
        self.binder.put(Box::new(UniqueBinding::<T>::new(
            key,
            Vec::new(),
            Box::new(move |_| Ok(provider())),
        )));
    }

    /// Handle to an instance owned outside the injector.
    pub fn to_reference(self, reference: &'static T) {
        let key = BindingKey::reference::<T>(&self.name);
        self.binder
            .put(Box::new(ReferenceBinding::<T>::new(key, reference)));
    }

    /// Lazy singleton, constructed on first resolution.
    pub fn to_singleton(self)
    where
        T: Injectable,
    {
        self.shared(false, false);
    }

    /// Singleton constructed during injector construction, in
    /// dependency order.
    pub fn to_eager_singleton(self)
    where
        T: Injectable,
    {
        self.shared(true, false);
    }

    /// Lazy singleton with one instance per resolving thread.
    ///
    /// Instances are retained by the binding for its whole lifetime,
    /// including those created by threads that have since exited.
    pub fn to_thread_local(self)
    where
        T: Injectable,
    {
        self.shared(false, true);
    }

    /// Singleton seeded with an already constructed instance.
    pub fn to_provided_instance(self, instance: Arc<T>) {
        let key = BindingKey::shared::<T>(&self.name);
        self.binder
            .put(Box::new(SharedBinding::<T>::with_instance(key, instance)));
    }

    /// Lazy singleton produced by a closure on first resolution.
    pub fn to_singleton_provider(self, provider: impl Fn() -> Arc<T> + Send + Sync + 'static) {
        let key = BindingKey::shared::<T>(&self.name);
        self.binder.put(Box::new(SharedBinding::<T>::new(
            key,
            Vec::new(),
            Box::new(move |_| Ok(provider())),
            false,
            false,
        )));
    }

    fn shared(self, eager: bool, thread_local: bool)
    where
        T: Injectable,
    {
        let key = BindingKey::shared::<T>(&self.name);
        self.binder.put(Box::new(SharedBinding::<T>::new(
            key,
            T::dependencies(),
            Box::new(|injector| Ok(Arc::new(T::construct(injector)?))),
            eager,
            thread_local,
        )));
    }
}
