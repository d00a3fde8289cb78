use crate::errors::InjectorError;
use crate::injector::Injector;
use crate::key::BindingKey;

/// A type the injector can construct.
///
/// `dependencies` is a static descriptor of the binding keys the
/// constructor resolves; it is consulted during graph validation and
/// must never instantiate anything. `construct` performs the actual
/// wiring by resolving each dependency through the supplied injector.
///
/// ```
/// use bindery::{BindingKey, Injectable, Injector, InjectorError};
/// use std::sync::Arc;
///
/// struct Engine;
///
/// impl Injectable for Engine {
///     fn construct(_injector: &Injector) -> Result<Self, InjectorError> {
///         Ok(Engine)
///     }
/// }
///
/// struct Car {
///     engine: Arc<Engine>,
/// }
///
/// impl Injectable for Car {
///     fn dependencies() -> Vec<BindingKey> {
///         vec![BindingKey::shared::<Engine>("")]
///     }
///
///     fn construct(injector: &Injector) -> Result<Self, InjectorError> {
///         Ok(Car { engine: injector.get_shared::<Engine>("")? })
///     }
/// }
/// ```
pub trait Injectable: Send + Sync + 'static {
    /// Binding keys resolved by [`Injectable::construct`].
    fn dependencies() -> Vec<BindingKey> {
        Vec::new()
    }

    fn construct(injector: &Injector) -> Result<Self, InjectorError>
    where
        Self: Sized;
}
