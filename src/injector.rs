//! The injector.
//!
//! Construction runs in strict phases: collect binding declarations,
//! build the binding map, validate the dependency graph, instantiate
//! eager singletons in dependency order, then run post-construction
//! callbacks. A failure in any phase aborts construction with the
//! first error encountered.
//!
//! Lookup resolves against the injector's own bindings first and then
//! walks the parent chain; shared lookups of the injector type resolve
//! to the requesting injector itself.

use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, Weak};

use indexmap::Equivalent;
use tracing::{debug, trace};

use crate::binding::{
    lock_or_recover, ReferenceBinding, SharedBinding, UniqueBinding, ValueBinding,
};
use crate::binding_map::BindingMap;
use crate::config::{Binder, InjectorConfiguration, PostConstruction, PreDestruction};
use crate::errors::InjectorError;
use crate::graph::BindingGraph;
use crate::key::{BindingKey, BindingKeyView};

/// A configuration that passed the collection and validation phases.
/// Produced by [`Injector::validate`] and consumed as the parent of
/// [`Injector::validate_child`].
pub struct Validation {
    injector: Arc<Injector>,
}

impl std::fmt::Debug for Validation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validation").finish_non_exhaustive()
    }
}

struct CallbackRegistry {
    post_construction: VecDeque<PostConstruction>,
    pre_destruction: Vec<PreDestruction>,
}

pub struct Injector {
    parent: Option<Arc<Injector>>,
    bindings: Arc<BindingMap>,
    self_weak: Weak<Injector>,
    callbacks: Mutex<CallbackRegistry>,
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector").finish_non_exhaustive()
    }
}

impl Injector {
    /// Builds a root injector from the supplied configurations.
    pub fn create(
        configurations: &[&dyn InjectorConfiguration],
    ) -> Result<Arc<Self>, InjectorError> {
        Self::build(None, configurations)
    }

    /// Builds a child injector with `self` as parent. The child's
    /// bindings may depend on anything the parent chain provides.
    pub fn create_child(
        self: &Arc<Self>,
        configurations: &[&dyn InjectorConfiguration],
    ) -> Result<Arc<Self>, InjectorError> {
        Self::build(Some(self.clone()), configurations)
    }

    /// Builds a child injector that reuses `prototype`'s already
    /// validated bindings, parented under `self`. No construction phase
    /// runs; singletons are shared with every injector built from the
    /// same prototype.
    pub fn create_child_from_prototype(
        self: &Arc<Self>,
        prototype: &Arc<Injector>,
    ) -> Arc<Self> {
        debug!("creating child injector from prototype");
        Arc::new_cyclic(|weak| Injector {
            parent: Some(self.clone()),
            bindings: prototype.bindings.clone(),
            self_weak: weak.clone(),
            callbacks: Mutex::new(CallbackRegistry {
                post_construction: VecDeque::new(),
                pre_destruction: Vec::new(),
            }),
        })
    }

    /// Runs the collection and validation phases without constructing a
    /// usable injector: eager singletons are not instantiated and no
    /// post-construction callback runs. Configuration errors surface
    /// exactly as they would from [`Injector::create`].
    pub fn validate(
        configurations: &[&dyn InjectorConfiguration],
    ) -> Result<Validation, InjectorError> {
        let (injector, _) = Self::assemble(None, configurations)?;
        Ok(Validation { injector })
    }

    /// As [`Injector::validate`], for a configuration layered on an
    /// already validated parent.
    pub fn validate_child(
        parent: &Validation,
        configurations: &[&dyn InjectorConfiguration],
    ) -> Result<Validation, InjectorError> {
        let (injector, _) = Self::assemble(Some(parent.injector.clone()), configurations)?;
        Ok(Validation { injector })
    }

    fn build(
        parent: Option<Arc<Injector>>,
        configurations: &[&dyn InjectorConfiguration],
    ) -> Result<Arc<Self>, InjectorError> {
        let (injector, order) = Self::assemble(parent, configurations)?;

        debug!("instantiating eager singletons");
        for key in &order {
            injector.bindings.get(key)?.instantiate_if_eager(&injector)?;
        }

        debug!("running post-construction callbacks");
        loop {
            // pop with the lock released so callbacks can register more
            let callback = {
                let mut registry = lock_or_recover(&injector.callbacks);
                registry.post_construction.pop_front()
            };
            match callback {
                Some(callback) => callback(&injector),
                None => break,
            }
        }

        trace!("injector constructed:\n{}", injector.print_bindings(true));
        Ok(injector)
    }

    /// Phases shared by construction and validation: collect binding
    /// declarations, build the map, validate the dependency graph.
    fn assemble(
        parent: Option<Arc<Injector>>,
        configurations: &[&dyn InjectorConfiguration],
    ) -> Result<(Arc<Self>, Vec<BindingKey>), InjectorError> {
        debug!(
            configurations = configurations.len(),
            "collecting binding declarations"
        );
        let mut binder = Binder::new();
        for configuration in configurations {
            configuration.configure(&mut binder);
        }
        let mut pending = std::mem::take(&mut binder.extra);
        while !pending.is_empty() {
            for configuration in pending {
                configuration.configure(&mut binder);
            }
            pending = std::mem::take(&mut binder.extra);
        }

        debug!(declarations = binder.entries.len(), "building binding map");
        let mut map = BindingMap::new();
        for binding in binder.entries.drain(..) {
            map.put(binding)?;
        }

        let graph = validate(&map, parent.as_deref())?;
        let order = graph.dependency_order();

        let post_construction: VecDeque<PostConstruction> =
            binder.post_construction.drain(..).collect();
        let pre_destruction: Vec<PreDestruction> = binder.pre_destruction.drain(..).collect();

        let injector = Arc::new_cyclic(|weak| Injector {
            parent,
            bindings: Arc::new(map),
            self_weak: weak.clone(),
            callbacks: Mutex::new(CallbackRegistry {
                post_construction,
                pre_destruction,
            }),
        });
        Ok((injector, order))
    }

    /// Registers a callback invoked before construction completes.
    /// Callable from eager constructors and from post-construction
    /// callbacks; registrations made after construction never run.
    pub fn register_post_construction_call(
        &self,
        callback: impl FnOnce(&Arc<Injector>) + Send + 'static,
    ) {
        lock_or_recover(&self.callbacks)
            .post_construction
            .push_back(Box::new(callback));
    }

    /// Registers a callback invoked when this injector is dropped,
    /// before its bindings are released.
    pub fn register_pre_destruction_call(&self, callback: impl FnOnce() + Send + 'static) {
        lock_or_recover(&self.callbacks)
            .pre_destruction
            .push(Box::new(callback));
    }

    fn chain(&self) -> impl Iterator<Item = &Injector> + '_ {
        std::iter::successors(Some(self), |injector| injector.parent.as_deref())
    }

    /// Reports whether this injector or any ancestor provides `key`.
    pub fn has_binding(&self, key: &BindingKey) -> bool {
        self.chain().any(|injector| injector.bindings.has_key(key))
    }

    /// Resolves a value binding, producing a fresh value.
    pub fn get_value<T: Send + Sync + 'static>(&self, name: &str) -> Result<T, InjectorError> {
        let view = BindingKeyView::value::<T>(name);
        for injector in self.chain() {
            if let Some(binding) = injector.bindings.find(&view) {
                if let Some(value) = binding.as_any().downcast_ref::<ValueBinding<T>>() {
                    return value.get(injector);
                }
            }
        }
        Err(InjectorError::NoBinding { key: view.to_key() })
    }

    /// As [`Injector::get_value`], returning `default` when no binding
    /// exists for the key.
    pub fn get_value_or<T: Send + Sync + 'static>(
        &self,
        name: &str,
        default: T,
    ) -> Result<T, InjectorError> {
        self.get_value(name)
            .or_default(BindingKeyView::value::<T>(name), || default)
    }

    /// As [`Injector::get_value`], calling `supplier` when no binding
    /// exists for the key.
    pub fn get_value_or_else<T: Send + Sync + 'static>(
        &self,
        name: &str,
        supplier: impl FnOnce() -> T,
    ) -> Result<T, InjectorError> {
        self.get_value(name)
            .or_default(BindingKeyView::value::<T>(name), supplier)
    }

    /// Resolves a unique binding, producing a fresh owned heap instance.
    pub fn get_unique<T: Send + Sync + 'static>(&self, name: &str) -> Result<Box<T>, InjectorError> {
        let view = BindingKeyView::unique::<T>(name);
        for injector in self.chain() {
            if let Some(binding) = injector.bindings.find(&view) {
                if let Some(unique) = binding.as_any().downcast_ref::<UniqueBinding<T>>() {
                    return unique.get(injector);
                }
            }
        }
        Err(InjectorError::NoBinding { key: view.to_key() })
    }

    pub fn get_unique_or<T: Send + Sync + 'static>(
        &self,
        name: &str,
        default: Box<T>,
    ) -> Result<Box<T>, InjectorError> {
        self.get_unique(name)
            .or_default(BindingKeyView::unique::<T>(name), || default)
    }

    pub fn get_unique_or_else<T: Send + Sync + 'static>(
        &self,
        name: &str,
        supplier: impl FnOnce() -> Box<T>,
    ) -> Result<Box<T>, InjectorError> {
        self.get_unique(name)
            .or_default(BindingKeyView::unique::<T>(name), supplier)
    }

    /// As [`Injector::get_unique`], returning `None` when no binding
    /// exists for the key.
    pub fn get_unique_or_none<T: Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Option<Box<T>>, InjectorError> {
        self.get_unique(name)
            .map(Some)
            .or_default(BindingKeyView::unique::<T>(name), || None)
    }

    /// Resolves a reference binding to its externally owned instance.
    pub fn get_reference<T: Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<&'static T, InjectorError> {
        let view = BindingKeyView::reference::<T>(name);
        for injector in self.chain() {
            if let Some(binding) = injector.bindings.find(&view) {
                if let Some(reference) = binding.as_any().downcast_ref::<ReferenceBinding<T>>() {
                    return Ok(reference.get());
                }
            }
        }
        Err(InjectorError::NoBinding { key: view.to_key() })
    }

    pub fn get_reference_or<T: Send + Sync + 'static>(
        &self,
        name: &str,
        default: &'static T,
    ) -> Result<&'static T, InjectorError> {
        self.get_reference(name)
            .or_default(BindingKeyView::reference::<T>(name), || default)
    }

    /// Resolves a shared binding to its singleton.
    ///
    /// When no binding exists and the requested type is the injector
    /// itself under the empty name, the requesting injector is returned.
    pub fn get_shared<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, InjectorError> {
        let view = BindingKeyView::shared::<T>(name);
        if let Some(binding) = self.bindings.find(&view) {
            if let Some(shared) = binding.as_any().downcast_ref::<SharedBinding<T>>() {
                return shared.get(self);
            }
        }
        if name.is_empty() && TypeId::of::<T>() == TypeId::of::<Injector>() {
            return self.self_handle();
        }
        for injector in self.chain().skip(1) {
            if let Some(binding) = injector.bindings.find(&view) {
                if let Some(shared) = binding.as_any().downcast_ref::<SharedBinding<T>>() {
                    return shared.get(injector);
                }
            }
        }
        Err(InjectorError::NoBinding { key: view.to_key() })
    }

    pub fn get_shared_or<T: Send + Sync + 'static>(
        &self,
        name: &str,
        default: Arc<T>,
    ) -> Result<Arc<T>, InjectorError> {
        self.get_shared(name)
            .or_default(BindingKeyView::shared::<T>(name), || default)
    }

    pub fn get_shared_or_else<T: Send + Sync + 'static>(
        &self,
        name: &str,
        supplier: impl FnOnce() -> Arc<T>,
    ) -> Result<Arc<T>, InjectorError> {
        self.get_shared(name)
            .or_default(BindingKeyView::shared::<T>(name), supplier)
    }

    /// As [`Injector::get_shared`], returning `None` when no binding
    /// exists for the key.
    pub fn get_shared_or_none<T: Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Option<Arc<T>>, InjectorError> {
        self.get_shared(name)
            .map(Some)
            .or_default(BindingKeyView::shared::<T>(name), || None)
    }

    /// Resolves a shared binding and downgrades the handle. This is how
    /// a singleton holds the injector without keeping it alive.
    pub fn get_weak<T: Send + Sync + 'static>(&self, name: &str) -> Result<Weak<T>, InjectorError> {
        self.get_shared::<T>(name)
            .map(|instance| Arc::downgrade(&instance))
    }

    fn self_handle<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, InjectorError> {
        let no_binding = || InjectorError::NoBinding {
            key: BindingKey::shared::<T>(""),
        };
        let strong = self.self_weak.upgrade().ok_or_else(no_binding)?;
        let erased: Arc<dyn Any + Send + Sync> = strong;
        erased.downcast::<T>().map_err(|_| no_binding())
    }

    /// One line per binding key, in declaration order. With `ancestors`
    /// set, each parent's bindings follow, indented one level deeper.
    pub fn print_bindings(&self, ancestors: bool) -> String {
        let mut out = String::new();
        for (level, injector) in self.chain().enumerate() {
            for (key, _) in injector.bindings.iter() {
                for _ in 0..level {
                    out.push_str("    ");
                }
                let _ = writeln!(out, "{key}");
            }
            if !ancestors {
                break;
            }
        }
        out
    }

    /// One line per binding key, each followed by the binding's
    /// dependency keys indented beneath it. Eager and thread-local
    /// singletons are marked as such. Local bindings only.
    pub fn print_bindings_detailed(&self) -> String {
        let mut out = String::new();
        for (key, binding) in self.bindings.iter() {
            let marker = if binding.is_eager() {
                " [eager]"
            } else if binding.is_thread_local() {
                " [thread-local]"
            } else {
                ""
            };
            let _ = writeln!(out, "{key}{marker}");
            for dependency in binding.dependency_keys() {
                let _ = writeln!(out, "    {dependency}");
            }
        }
        out
    }
}

impl Drop for Injector {
    fn drop(&mut self) {
        let callbacks = match self.callbacks.get_mut() {
            Ok(registry) => std::mem::take(&mut registry.pre_destruction),
            Err(poisoned) => std::mem::take(&mut poisoned.into_inner().pre_destruction),
        };
        if !callbacks.is_empty() {
            debug!(callbacks = callbacks.len(), "running pre-destruction callbacks");
        }
        for callback in callbacks {
            callback();
        }
    }
}

/// Builds the dependency graph for the binding map and rejects missing
/// dependencies, shared injector handles in shared bindings, and cycles.
fn validate(
    bindings: &BindingMap,
    parent: Option<&Injector>,
) -> Result<BindingGraph, InjectorError> {
    debug!(bindings = bindings.len(), "validating dependency graph");
    let mut graph = BindingGraph::new();
    for (key, _) in bindings.iter() {
        graph.add_dependency(key.clone())?;
    }

    let shared_injector = BindingKey::shared::<Injector>("");
    let weak_injector = BindingKey::weak::<Injector>("");

    for (key, binding) in bindings.iter() {
        for dependency in binding.dependency_keys() {
            if *dependency == shared_injector {
                if binding.is_shared() {
                    return Err(InjectorError::SharedInjector { key: key.clone() });
                }
                // resolves to the requesting injector, never an edge
                continue;
            }
            if *dependency == weak_injector {
                continue;
            }
            let dependency = dependency.clone().promote();
            if graph.has_dependency(&dependency) {
                graph.add_relationship(&dependency, key);
            } else if !ancestor_provides(parent, &dependency) {
                return Err(InjectorError::MissingDependency {
                    dependent: key.clone(),
                    dependency,
                });
            }
        }
    }

    let mut cycle = Vec::new();
    if graph.has_cycles(&mut cycle) {
        return Err(InjectorError::CyclicDependency {
            edges: cycle.into(),
        });
    }
    trace!("dependency graph:\n{graph}");
    Ok(graph)
}

fn ancestor_provides(parent: Option<&Injector>, key: &BindingKey) -> bool {
    let mut current = parent;
    while let Some(injector) = current {
        if injector.bindings.has_key(key) {
            return true;
        }
        current = injector.parent.as_deref();
    }
    false
}

/// Shared shape of the `_or` / `_or_else` / `_or_none` lookups: the
/// fallback applies only when the requested key itself has no binding;
/// every other failure propagates.
trait OrDefault<T> {
    fn or_default(
        self,
        requested: BindingKeyView<'_>,
        fallback: impl FnOnce() -> T,
    ) -> Result<T, InjectorError>;
}

impl<T> OrDefault<T> for Result<T, InjectorError> {
    fn or_default(
        self,
        requested: BindingKeyView<'_>,
        fallback: impl FnOnce() -> T,
    ) -> Result<T, InjectorError> {
        match self {
            Err(InjectorError::NoBinding { ref key }) if requested.equivalent(key) => {
                Ok(fallback())
            }
            other => other,
        }
    }
}
