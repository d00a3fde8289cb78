use thiserror::Error;

use crate::graph::CycleEdges;
use crate::key::BindingKey;

/// Failures raised while building an injector or resolving a binding.
#[derive(Debug, Error)]
pub enum InjectorError {
    /// Two configurations provided a binding with the same key.
    #[error("duplicate binding: {key}")]
    DuplicateBinding { key: BindingKey },

    /// The dependency graph contains at least one cycle. The message
    /// lists every edge of the cycle, one `A --> B` pair per line.
    #[error("cyclic dependency detected:\n{edges}")]
    CyclicDependency { edges: CycleEdges },

    /// A binding declared a dependency that neither this injector nor
    /// any ancestor provides.
    #[error("binding {dependent} requires {dependency}, which is not provided")]
    MissingDependency {
        dependent: BindingKey,
        dependency: BindingKey,
    },

    /// A shared binding declared a shared handle on the injector, which
    /// would keep the injector alive from within itself. Weak injector
    /// handles are the supported alternative.
    #[error("shared binding {key} must take a weak injector handle, not a shared one")]
    SharedInjector { key: BindingKey },

    /// Lookup found no binding for the requested key.
    #[error("no binding found for {key}")]
    NoBinding { key: BindingKey },

    /// A user-supplied factory or constructor failed.
    #[error("factory for {key} failed: {source}")]
    Factory {
        key: BindingKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
