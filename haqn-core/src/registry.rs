//! Factory registry: implementation names mapped to constructors.
//!
//! The binding table only holds names. The registry turns a name into a
//! fresh instance by calling the zero-argument constructor registered
//! under it. Implementations get there in one of two ways:
//!
//! - explicitly, through [`FactoryRegistryBuilder::implementation`] or a
//!   [`Provider`]
//! - at link time, with `#[haqn::implementation]`, which submits an
//!   [`Implementation`] entry to `inventory`

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use haqn_support::rendering::suggest_similar;
use tracing::{debug, trace, warn};

use crate::error::{AlreadyRegisteredError, BoxError, HaqnError, InstantiationCause, Result};
use crate::injectable::{Instance, erase};
use crate::key::{Contract, ContractKey};
use crate::provider::{Provider, ProviderRegistry};

/// Type-erased zero-argument constructor.
///
/// The returned `Box<dyn Any>` holds a `Box<dyn C>` for the contract the
/// factory was registered with.
///
/// # Why `Arc` and not `Box`?
/// The registry is shared between threads and cloned into every injector.
pub type FactoryFn = Arc<dyn Fn() -> std::result::Result<Box<dyn Any>, BoxError> + Send + Sync>;

/// Link-time registration entry, emitted by `#[haqn::implementation]`.
///
/// Function pointers keep the entry `const`-constructible, which
/// `inventory::submit!` requires.
pub struct Implementation {
    name: &'static str,
    contract: fn() -> ContractKey,
    construct: fn() -> std::result::Result<Box<dyn Any>, BoxError>,
}

impl Implementation {
    pub const fn new(
        name: &'static str,
        contract: fn() -> ContractKey,
        construct: fn() -> std::result::Result<Box<dyn Any>, BoxError>,
    ) -> Self {
        Self {
            name,
            contract,
            construct,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn contract(&self) -> ContractKey {
        (self.contract)()
    }
}

inventory::collect!(Implementation);

/// Registration entry for a single implementation.
#[derive(Clone)]
pub(crate) struct Registration {
    pub contract: ContractKey,
    pub factory: FactoryFn,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("contract", &self.contract)
            .finish()
    }
}

/// Immutable set of known implementations.
///
/// Cheap to clone; all clones share the same table.
#[derive(Clone, Default)]
pub struct FactoryRegistry {
    registrations: Arc<HashMap<String, Registration>>,
}

impl FactoryRegistry {
    /// Create a new builder.
    pub fn builder() -> FactoryRegistryBuilder {
        FactoryRegistryBuilder::new()
    }

    /// Registry holding every `#[haqn::implementation]` linked into the binary.
    pub fn from_inventory() -> Result<Self> {
        Self::builder().with_inventory().build()
    }

    /// Returns `true` if an implementation is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.registrations.contains_key(name)
    }

    /// Returns the contract the implementation `name` satisfies.
    pub fn contract_of(&self, name: &str) -> Option<ContractKey> {
        self.registrations.get(name).map(|r| r.contract)
    }

    /// Returns all registered implementation names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.registrations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Constructs a new instance of `implementation` for `field`.
    ///
    /// Every call runs the constructor again; nothing is cached.
    ///
    /// # Errors
    /// [`HaqnError::InstantiationFailure`] if the name is unknown, the
    /// implementation serves a different contract, or the constructor
    /// returns an error or panics.
    pub fn instantiate(
        &self,
        field: &str,
        contract: &ContractKey,
        implementation: &str,
    ) -> Result<Instance> {
        let failure = |source: BoxError| HaqnError::InstantiationFailure {
            field: field.to_string(),
            implementation: implementation.to_string(),
            source,
        };

        let registration = self.registrations.get(implementation).ok_or_else(|| {
            failure(Box::new(InstantiationCause::UnknownImplementation {
                suggestions: suggest_similar(implementation, &self.names(), 3),
            }))
        })?;

        if registration.contract != *contract {
            return Err(failure(Box::new(InstantiationCause::ContractMismatch {
                expected: contract.name(),
                actual: registration.contract.name(),
            })));
        }

        trace!(implementation, contract = %contract, "Constructing");
        let value = match catch_unwind(AssertUnwindSafe(|| (registration.factory)())) {
            Ok(Ok(value)) => value,
            Ok(Err(source)) => return Err(failure(source)),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(implementation, message = %message, "Constructor panicked");
                return Err(failure(Box::new(InstantiationCause::Panicked(message))));
            }
        };

        Ok(Instance::from_erased(*contract, implementation, value))
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("implementations", &self.names())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

/// Builds a [`FactoryRegistry`].
///
/// # Examples
/// ```
/// use haqn_core::key::Contract;
/// use haqn_core::registry::FactoryRegistry;
///
/// pub trait Clock {
///     fn now(&self) -> u64;
/// }
/// impl Contract for dyn Clock {
///     const NAME: &'static str = "app.Clock";
/// }
///
/// struct FixedClock;
/// impl Clock for FixedClock {
///     fn now(&self) -> u64 { 42 }
/// }
///
/// let registry = FactoryRegistry::builder()
///     .implementation::<dyn Clock>("app.FixedClock", || Ok(Box::new(FixedClock) as Box<dyn Clock>))
///     .build()
///     .unwrap();
///
/// assert!(registry.contains("app.FixedClock"));
/// ```
pub struct FactoryRegistryBuilder {
    registrations: HashMap<String, Registration>,
    allow_override: bool,
    conflict: Option<HaqnError>,
}

impl FactoryRegistryBuilder {
    fn new() -> Self {
        Self {
            registrations: HashMap::new(),
            allow_override: false,
            conflict: None,
        }
    }

    /// Allow a later registration to replace an earlier one with the same name.
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }

    /// Register a constructor for implementation `name` of contract `C`.
    pub fn implementation<C: ?Sized + Contract>(
        mut self,
        name: impl Into<String>,
        factory: impl Fn() -> std::result::Result<Box<C>, BoxError> + Send + Sync + 'static,
    ) -> Self {
        register::<C, _>(&mut self, name.into(), factory);
        self
    }

    /// Add a [`Provider`] module.
    pub fn add_provider(mut self, provider: &dyn Provider) -> Self {
        debug!(provider = provider.name(), "Adding provider");
        provider.register(&mut self);
        self
    }

    /// Add every `#[haqn::implementation]` linked into the binary.
    pub fn with_inventory(mut self) -> Self {
        for entry in inventory::iter::<Implementation>() {
            let construct = entry.construct;
            self.insert(
                entry.name.to_string(),
                Registration {
                    contract: entry.contract(),
                    factory: Arc::new(construct),
                },
            );
        }
        self
    }

    /// Build the registry.
    ///
    /// # Errors
    /// [`HaqnError::AlreadyRegistered`] for the first duplicated name,
    /// unless overriding is allowed.
    pub fn build(self) -> Result<FactoryRegistry> {
        if let Some(conflict) = self.conflict {
            return Err(conflict);
        }

        debug!(registered = self.registrations.len(), "Factory registry built");
        Ok(FactoryRegistry {
            registrations: Arc::new(self.registrations),
        })
    }

    fn insert(&mut self, name: String, registration: Registration) {
        if !self.allow_override && self.registrations.contains_key(&name) {
            if self.conflict.is_none() {
                self.conflict = Some(HaqnError::AlreadyRegistered(AlreadyRegisteredError { name }));
            }
            return;
        }

        debug!(implementation = %name, contract = %registration.contract, "Registered implementation");
        self.registrations.insert(name, registration);
    }
}

impl ProviderRegistry for FactoryRegistryBuilder {
    fn register_factory(&mut self, name: String, contract: ContractKey, factory: FactoryFn) {
        self.insert(name, Registration { contract, factory });
    }
}

/// Register a typed constructor through any [`ProviderRegistry`].
///
/// Use this inside [`Provider::register`]:
///
/// ```rust,ignore
/// fn register(&self, registry: &mut dyn ProviderRegistry) {
///     haqn_core::registry::register::<dyn SomeInterface, _>(
///         registry,
///         "org.example.SomeImpl".to_string(),
///         || Ok(Box::new(SomeImpl::default()) as Box<dyn SomeInterface>),
///     );
/// }
/// ```
pub fn register<C, F>(registry: &mut dyn ProviderRegistry, name: String, factory: F)
where
    C: ?Sized + Contract,
    F: Fn() -> std::result::Result<Box<C>, BoxError> + Send + Sync + 'static,
{
    let factory: FactoryFn = Arc::new(move || factory().map(erase::<C>));
    registry.register_factory(name, ContractKey::of::<C>(), factory);
}
