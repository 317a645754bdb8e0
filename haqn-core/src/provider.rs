//! Provider trait: a module of related implementation registrations.
//!
//! Providers group the implementations of one area together so the
//! registry can be assembled from modules instead of one long chain.
//!
//! # Examples
//! ```rust,ignore
//! struct GreetingImplementations;
//!
//! impl Provider for GreetingImplementations {
//!     fn register(&self, registry: &mut dyn ProviderRegistry) {
//!         register::<dyn SomeInterface, _>(registry, "org.example.SomeImpl".into(), || {
//!             Ok(Box::new(SomeImpl::default()) as Box<dyn SomeInterface>)
//!         });
//!         register::<dyn SomeInterface, _>(registry, "org.example.OtherImpl".into(), || {
//!             Ok(Box::new(OtherImpl::default()) as Box<dyn SomeInterface>)
//!         });
//!     }
//! }
//!
//! let registry = FactoryRegistry::builder()
//!     .add_provider(&GreetingImplementations)
//!     .build()?;
//! ```

use crate::key::ContractKey;
use crate::registry::FactoryFn;

/// A module that registers related implementations.
pub trait Provider: Send + Sync {
    /// Register implementations into the registry builder.
    ///
    /// Called once while the registry is being built.
    fn register(&self, registry: &mut dyn ProviderRegistry);

    /// Optional: human-readable name for log lines.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Interface that providers use to register implementations.
///
/// A subset of [`FactoryRegistryBuilder`](crate::registry::FactoryRegistryBuilder),
/// so providers can be tested against a mock.
pub trait ProviderRegistry {
    /// Register an erased constructor for implementation `name` of `contract`.
    fn register_factory(&mut self, name: String, contract: ContractKey, factory: FactoryFn);
}
