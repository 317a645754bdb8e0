//! # The Injector: heart of Haqn
//!
//! Fills the `#[inject]` fields of an object with fresh implementations,
//! chosen by name from a binding table.
//!
//! # Architecture
//! ```text
//! ConfigSource ──load()──> Bindings ─┐
//!                                    ├──> Injector ──inject(&mut target)──> target
//! FactoryRegistry ───────────────────┘
//! ```
//!
//! For every injection point of the target, in declaration order:
//!
//! 1. the declared type must be a contract, else `ContractViolation`
//! 2. the contract name must be bound to a non-blank implementation name,
//!    else `UnresolvedDependency`
//! 3. the registry constructs that implementation, else `InstantiationFailure`
//! 4. the target's setter stores the instance
//!
//! The first failure stops the call. Fields assigned before it keep their
//! new values.
//!
//! # Examples
//! ```rust
//! use haqn_core::prelude::*;
//!
//! pub trait Greeter {
//!     fn greet(&self) -> &'static str;
//! }
//! impl Contract for dyn Greeter {
//!     const NAME: &'static str = "app.Greeter";
//! }
//!
//! struct English;
//! impl Greeter for English {
//!     fn greet(&self) -> &'static str { "hello" }
//! }
//!
//! #[derive(Default)]
//! struct Frontdesk {
//!     greeter: Option<Box<dyn Greeter>>,
//! }
//!
//! // What #[derive(Injectable)] generates, written out
//! impl Injectable for Frontdesk {
//!     fn injection_points(&self) -> &'static [InjectionPoint] {
//!         static POINTS: once_cell::sync::Lazy<Vec<InjectionPoint>> =
//!             once_cell::sync::Lazy::new(|| vec![InjectionPoint::contract::<dyn Greeter>("greeter")]);
//!         &POINTS
//!     }
//!
//!     fn assign(&mut self, field: &str, instance: Instance) -> Result<()> {
//!         match field {
//!             "greeter" => {
//!                 self.greeter = Some(instance.into_field::<dyn Greeter>("Frontdesk", field)?);
//!                 Ok(())
//!             }
//!             _ => Err(haqn_core::injectable::unknown_field("Frontdesk", field)),
//!         }
//!     }
//! }
//!
//! let injector = Injector::builder()
//!     .config(PropertiesText::new("inline", "app.Greeter=app.English"))
//!     .factories(
//!         FactoryRegistry::builder()
//!             .implementation::<dyn Greeter>("app.English", || Ok(Box::new(English) as Box<dyn Greeter>))
//!             .build()
//!             .expect("Failed to build registry"),
//!     )
//!     .build()
//!     .expect("Failed to build injector");
//!
//! let mut desk = Frontdesk::default();
//! injector.inject(&mut desk).expect("Failed to inject");
//! assert_eq!(desk.greeter.unwrap().greet(), "hello");
//! ```

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use haqn_support::rendering::suggest_similar;
use tracing::{debug, info, instrument, trace};

use crate::config::{Bindings, ConfigSource};
use crate::error::{ContractViolationError, HaqnError, Result, UnresolvedDependencyError};
use crate::injectable::{Declared, Injectable, InjectionPoint};
use crate::key::ContractKey;
use crate::registry::FactoryRegistry;

// ============================================================
// InjectorBuilder
// ============================================================

/// Builds an [`Injector`].
///
/// A configuration source is required. Without explicit factories the
/// registry is collected from `#[haqn::implementation]` entries.
#[derive(Default)]
pub struct InjectorBuilder {
    source: Option<Box<dyn ConfigSource>>,
    factories: Option<FactoryRegistry>,
}

impl InjectorBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Source of the binding table, read once by [`build`](InjectorBuilder::build).
    pub fn config(mut self, source: impl ConfigSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Implementations the bindings may name.
    pub fn factories(mut self, factories: FactoryRegistry) -> Self {
        self.factories = Some(factories);
        self
    }

    /// Load the configuration and build the injector.
    ///
    /// # Errors
    /// Configuration errors from the source; [`HaqnError::InvalidArgument`]
    /// if no source was given; registry errors when falling back to the
    /// inventory.
    #[instrument(skip(self), name = "injector_build")]
    pub fn build(self) -> Result<Injector> {
        let source = self
            .source
            .ok_or(HaqnError::InvalidArgument("a configuration source is required"))?;

        let factories = match self.factories {
            Some(factories) => factories,
            None => FactoryRegistry::from_inventory()?,
        };

        Injector::new(source.as_ref(), factories)
    }
}

// ═══════════════════════════════════════════
// Injector
// ═══════════════════════════════════════════

/// Immutable, thread-safe field injector.
///
/// Holds no per-call state: every [`inject`](Injector::inject) is
/// independent, and injecting the same object twice simply replaces each
/// marked field with a new instance.
pub struct Injector {
    bindings: Arc<Bindings>,
    factories: FactoryRegistry,
}

impl Injector {
    /// Create a new builder.
    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::new()
    }

    /// Load `source` and create an injector over `factories`.
    pub fn new(source: &dyn ConfigSource, factories: FactoryRegistry) -> Result<Self> {
        let location = source.describe();
        let bindings = source.load()?;

        info!(
            location = %location,
            bindings = bindings.len(),
            implementations = factories.len(),
            "Injector ready"
        );

        Ok(Self {
            bindings: Arc::new(bindings),
            factories,
        })
    }

    /// Returns a copy of the loaded binding table.
    ///
    /// Changing the copy has no effect on this injector.
    pub fn bindings(&self) -> Bindings {
        Bindings::clone(&self.bindings)
    }

    /// Returns the registry implementations are constructed from.
    pub fn factories(&self) -> &FactoryRegistry {
        &self.factories
    }

    /// Inject every marked field of `target`, returning `target` itself.
    ///
    /// ```rust,ignore
    /// let bean = injector.inject(&mut bean)?;
    /// bean.foo(&mut std::io::stdout())?;
    /// ```
    ///
    /// # Errors
    /// The error for the first field that fails; later fields are not
    /// visited and earlier ones stay assigned.
    #[instrument(skip_all, name = "inject", fields(target = type_name::<T>()))]
    pub fn inject<'t, T: Injectable + ?Sized>(&self, target: &'t mut T) -> Result<&'t mut T> {
        let points = target.injection_points();
        debug!(points = points.len(), "Injecting");

        for point in points {
            self.inject_point(target, point)?;
        }

        Ok(target)
    }

    /// [`inject`](Injector::inject) for a target that may be absent.
    ///
    /// # Errors
    /// [`HaqnError::InvalidArgument`] for `None`, before anything else.
    pub fn inject_option<'t, T: Injectable + ?Sized>(
        &self,
        target: Option<&'t mut T>,
    ) -> Result<&'t mut T> {
        let target = target.ok_or(HaqnError::InvalidArgument("inject target cannot be absent"))?;
        self.inject(target)
    }

    fn inject_point<T: Injectable + ?Sized>(&self, target: &mut T, point: &InjectionPoint) -> Result<()> {
        let field = point.field();

        let contract = match point.declared() {
            Declared::Contract(contract) => contract,
            Declared::Concrete(declared) => {
                return Err(HaqnError::ContractViolation(ContractViolationError {
                    field,
                    declared,
                }));
            }
        };

        let implementation = self.resolve(field, &contract)?;
        let instance = self.factories.instantiate(field, &contract, implementation)?;
        target.assign(field, instance)?;

        debug!(field, contract = %contract, implementation, "Injected field");
        Ok(())
    }

    fn resolve(&self, field: &'static str, contract: &ContractKey) -> Result<&str> {
        trace!(field, contract = %contract, "Looking up binding");

        self.bindings.implementation_for(contract.name()).ok_or_else(|| {
            HaqnError::UnresolvedDependency(UnresolvedDependencyError {
                field,
                contract: contract.name(),
                blank: self.bindings.contains_key(contract.name()),
                suggestions: suggest_similar(contract.name(), &self.bindings.keys(), 3),
            })
        })
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("bindings", &self.bindings.len())
            .field("implementations", &self.factories.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Injector, InjectorBuilder};
    pub use crate::config::{Bindings, ConfigSource, PropertiesFile, PropertiesText};
    pub use crate::error::{HaqnError, Result};
    pub use crate::injectable::{Declared, Injectable, InjectionPoint, Instance};
    pub use crate::key::{Contract, ContractKey};
    pub use crate::provider::{Provider, ProviderRegistry};
    pub use crate::registry::FactoryRegistry;
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PropertiesText;
    use crate::injectable::{Instance, not_a_contract, unknown_field};
    use crate::key::Contract;
    use once_cell::sync::Lazy;
    use std::sync::atomic::{AtomicU64, Ordering};

    static SERIAL: AtomicU64 = AtomicU64::new(0);

    trait Engine: Send + Sync {
        fn label(&self) -> &'static str;
        fn serial(&self) -> u64;
    }

    impl Contract for dyn Engine {
        const NAME: &'static str = "car.Engine";
    }

    trait Radio: Send + Sync {
        fn station(&self) -> &'static str;
    }

    impl Contract for dyn Radio {
        const NAME: &'static str = "car.Radio";
    }

    struct V8 {
        serial: u64,
    }

    impl Default for V8 {
        fn default() -> Self {
            Self {
                serial: SERIAL.fetch_add(1, Ordering::SeqCst),
            }
        }
    }

    impl Engine for V8 {
        fn label(&self) -> &'static str {
            "V8"
        }
        fn serial(&self) -> u64 {
            self.serial
        }
    }

    struct Electric;

    impl Engine for Electric {
        fn label(&self) -> &'static str {
            "Electric"
        }
        fn serial(&self) -> u64 {
            0
        }
    }

    struct Fm;

    impl Radio for Fm {
        fn station(&self) -> &'static str {
            "FM"
        }
    }

    // Hand-written equivalent of #[derive(Injectable)]
    #[derive(Default)]
    struct Car {
        engine: Option<Box<dyn Engine>>,
        radio: Option<Box<dyn Radio>>,
        owner: Option<String>,
    }

    impl Injectable for Car {
        fn injection_points(&self) -> &'static [InjectionPoint] {
            static POINTS: Lazy<Vec<InjectionPoint>> = Lazy::new(|| {
                vec![
                    InjectionPoint::contract::<dyn Engine>("engine"),
                    InjectionPoint::contract::<dyn Radio>("radio"),
                ]
            });
            &POINTS
        }

        fn assign(&mut self, field: &str, instance: Instance) -> Result<()> {
            match field {
                "engine" => self.engine = Some(instance.into_field::<dyn Engine>("Car", field)?),
                "radio" => self.radio = Some(instance.into_field::<dyn Radio>("Car", field)?),
                _ => return Err(unknown_field("Car", field)),
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct Bicycle {
        bell: Option<String>,
    }

    impl Injectable for Bicycle {
        fn injection_points(&self) -> &'static [InjectionPoint] {
            &[]
        }

        fn assign(&mut self, field: &str, _instance: Instance) -> Result<()> {
            Err(unknown_field("Bicycle", field))
        }
    }

    // Marks a concrete field after a valid one
    #[derive(Default)]
    struct Truck {
        engine: Option<Box<dyn Engine>>,
        trailer: Option<String>,
    }

    impl Injectable for Truck {
        fn injection_points(&self) -> &'static [InjectionPoint] {
            static POINTS: Lazy<Vec<InjectionPoint>> = Lazy::new(|| {
                vec![
                    InjectionPoint::contract::<dyn Engine>("engine"),
                    InjectionPoint::concrete::<Option<String>>("trailer"),
                ]
            });
            &POINTS
        }

        fn assign(&mut self, field: &str, instance: Instance) -> Result<()> {
            match field {
                "engine" => self.engine = Some(instance.into_field::<dyn Engine>("Truck", field)?),
                "trailer" => return Err(not_a_contract("Truck", field)),
                _ => return Err(unknown_field("Truck", field)),
            }
            Ok(())
        }
    }

    fn registry() -> FactoryRegistry {
        FactoryRegistry::builder()
            .implementation::<dyn Engine>("car.V8", || Ok(Box::new(V8::default()) as Box<dyn Engine>))
            .implementation::<dyn Engine>("car.Electric", || Ok(Box::new(Electric) as Box<dyn Engine>))
            .implementation::<dyn Radio>("car.Fm", || Ok(Box::new(Fm) as Box<dyn Radio>))
            .build()
            .unwrap()
    }

    fn injector(properties: &str) -> Injector {
        Injector::builder()
            .config(PropertiesText::new("test", properties))
            .factories(registry())
            .build()
            .unwrap()
    }

    const DEFAULT: &str = "car.Engine=car.V8\ncar.Radio=car.Fm\n";

    #[test]
    fn fills_all_marked_fields() {
        let injector = injector(DEFAULT);
        let mut car = Car::default();
        injector.inject(&mut car).unwrap();

        assert_eq!(car.engine.as_ref().unwrap().label(), "V8");
        assert_eq!(car.radio.as_ref().unwrap().station(), "FM");
    }

    #[test]
    fn returns_the_same_reference() {
        let injector = injector(DEFAULT);
        let mut car = Car::default();
        let input: *const Car = &car;

        let output = injector.inject(&mut car).unwrap();
        assert!(std::ptr::eq(input, output));
    }

    #[test]
    fn unmarked_fields_are_untouched() {
        let injector = injector(DEFAULT);
        let mut car = Car {
            owner: Some("ilya".to_string()),
            ..Car::default()
        };
        injector.inject(&mut car).unwrap();
        assert_eq!(car.owner.as_deref(), Some("ilya"));

        let mut empty = Car::default();
        injector.inject(&mut empty).unwrap();
        assert!(empty.owner.is_none());
    }

    #[test]
    fn target_without_points_is_returned_as_is() {
        let injector = injector(DEFAULT);
        let mut bike = Bicycle {
            bell: Some("ring".to_string()),
        };
        let input: *const Bicycle = &bike;

        let output = injector.inject(&mut bike).unwrap();
        assert!(std::ptr::eq(input, output));
        assert_eq!(output.bell.as_deref(), Some("ring"));
    }

    #[test]
    fn absent_target_is_invalid_argument() {
        let injector = injector(DEFAULT);
        let result = injector.inject_option::<Car>(None);
        assert!(matches!(result, Err(HaqnError::InvalidArgument(_))));
    }

    #[test]
    fn present_option_target_is_injected() {
        let injector = injector(DEFAULT);
        let mut car = Car::default();
        injector.inject_option(Some(&mut car)).unwrap();
        assert!(car.engine.is_some());
    }

    #[test]
    fn distinct_targets_get_distinct_instances() {
        let injector = injector(DEFAULT);
        let mut a = Car::default();
        let mut b = Car::default();
        injector.inject(&mut a).unwrap();
        injector.inject(&mut b).unwrap();

        assert_ne!(
            a.engine.as_ref().unwrap().serial(),
            b.engine.as_ref().unwrap().serial()
        );
    }

    #[test]
    fn reinjection_replaces_instances() {
        let injector = injector(DEFAULT);
        let mut car = Car::default();

        injector.inject(&mut car).unwrap();
        let first = car.engine.as_ref().unwrap().serial();

        injector.inject(&mut car).unwrap();
        let second = car.engine.as_ref().unwrap().serial();

        assert_ne!(first, second);
    }

    #[test]
    fn configuration_selects_implementation() {
        let injector = injector("car.Engine=car.Electric\ncar.Radio=car.Fm\n");
        let mut car = Car::default();
        injector.inject(&mut car).unwrap();
        assert_eq!(car.engine.unwrap().label(), "Electric");
    }

    #[test]
    fn missing_binding_is_unresolved() {
        let injector = injector("car.Radio=car.Fm\n");
        let mut car = Car::default();

        match injector.inject(&mut car) {
            Err(HaqnError::UnresolvedDependency(e)) => {
                assert_eq!(e.contract, "car.Engine");
                assert_eq!(e.field, "engine");
                assert!(!e.blank);
            }
            other => panic!("Expected UnresolvedDependency, got: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn blank_binding_is_unresolved() {
        let injector = injector("car.Engine =    \ncar.Radio=car.Fm\n");
        let mut car = Car::default();

        match injector.inject(&mut car) {
            Err(HaqnError::UnresolvedDependency(e)) => assert!(e.blank),
            other => panic!("Expected UnresolvedDependency, got: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn binding_value_is_trimmed() {
        let injector = injector("car.Engine =   car.V8   \ncar.Radio=car.Fm\n");
        let mut car = Car::default();
        injector.inject(&mut car).unwrap();
        assert_eq!(car.engine.unwrap().label(), "V8");
    }

    #[test]
    fn unknown_implementation_is_instantiation_failure() {
        let injector = injector("car.Engine=car.Diesel\ncar.Radio=car.Fm\n");
        let mut car = Car::default();

        match injector.inject(&mut car) {
            Err(HaqnError::InstantiationFailure { field, implementation, .. }) => {
                assert_eq!(field, "engine");
                assert_eq!(implementation, "car.Diesel");
            }
            other => panic!("Expected InstantiationFailure, got: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn binding_to_wrong_contract_is_instantiation_failure() {
        let injector = injector("car.Engine=car.Fm\ncar.Radio=car.Fm\n");
        let mut car = Car::default();

        assert!(matches!(
            injector.inject(&mut car),
            Err(HaqnError::InstantiationFailure { .. })
        ));
        assert!(car.engine.is_none());
    }

    #[test]
    fn concrete_field_is_contract_violation_regardless_of_config() {
        let injector = injector("car.Engine=car.V8\nalloc.string.String=car.V8\n");
        let mut truck = Truck::default();

        match injector.inject(&mut truck) {
            Err(HaqnError::ContractViolation(e)) => {
                assert_eq!(e.field, "trailer");
                assert!(e.declared.contains("String"));
            }
            other => panic!("Expected ContractViolation, got: {:?}", other.map(|_| ())),
        }
    }

    // A sized type posing as a contract
    struct Plate;

    impl Contract for Plate {
        const NAME: &'static str = "car.Plate";
    }

    #[derive(Default)]
    struct Van {
        plate: Option<Box<Plate>>,
    }

    impl Injectable for Van {
        fn injection_points(&self) -> &'static [InjectionPoint] {
            static POINTS: Lazy<Vec<InjectionPoint>> =
                Lazy::new(|| vec![InjectionPoint::contract::<Plate>("plate")]);
            &POINTS
        }

        fn assign(&mut self, field: &str, instance: Instance) -> Result<()> {
            match field {
                "plate" => self.plate = Some(instance.into_field::<Plate>("Van", field)?),
                _ => return Err(unknown_field("Van", field)),
            }
            Ok(())
        }
    }

    #[test]
    fn sized_contract_field_is_contract_violation() {
        let registry = FactoryRegistry::builder()
            .implementation::<Plate>("car.Plate", || Ok(Box::new(Plate)))
            .build()
            .unwrap();
        let injector = Injector::builder()
            .config(PropertiesText::new("test", "car.Plate=car.Plate"))
            .factories(registry)
            .build()
            .unwrap();

        let mut van = Van::default();
        match injector.inject(&mut van) {
            Err(HaqnError::ContractViolation(e)) => {
                assert_eq!(e.field, "plate");
                assert!(e.declared.ends_with("Plate"));
            }
            other => panic!("Expected ContractViolation, got: {:?}", other.map(|_| ())),
        }
        assert!(van.plate.is_none());
    }

    #[test]
    fn failure_keeps_earlier_fields_assigned() {
        let injector = injector(DEFAULT);
        let mut truck = Truck::default();

        assert!(injector.inject(&mut truck).is_err());
        assert_eq!(truck.engine.as_ref().unwrap().label(), "V8");
        assert!(truck.trailer.is_none());
    }

    #[test]
    fn failure_stops_remaining_fields() {
        // engine fails first, radio must stay empty
        let injector = injector("car.Engine=car.Diesel\ncar.Radio=car.Fm\n");
        let mut car = Car::default();

        assert!(injector.inject(&mut car).is_err());
        assert!(car.radio.is_none());
    }

    #[test]
    fn bindings_accessor_returns_copy() {
        let injector = injector(DEFAULT);
        let mut copy = injector.bindings();
        assert_eq!(copy.implementation_for("car.Engine"), Some("car.V8"));

        copy.insert("car.Engine", "car.Electric");

        assert_eq!(injector.bindings().implementation_for("car.Engine"), Some("car.V8"));
        let mut car = Car::default();
        injector.inject(&mut car).unwrap();
        assert_eq!(car.engine.unwrap().label(), "V8");
    }

    #[test]
    fn build_requires_a_source() {
        let result = Injector::builder().factories(registry()).build();
        assert!(matches!(result, Err(HaqnError::InvalidArgument(_))));
    }

    #[test]
    fn build_fails_on_bad_configuration() {
        let result = Injector::builder()
            .config(PropertiesText::new("broken", "car.Engine=\\uZZZZ\n"))
            .factories(registry())
            .build();
        assert!(matches!(result, Err(HaqnError::ConfigurationRead { .. })));
    }

    #[test]
    fn injects_concurrently_from_many_threads() {
        let injector = injector(DEFAULT);

        let serials: Vec<u64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        let mut car = Car::default();
                        injector.inject(&mut car).unwrap();
                        car.engine.unwrap().serial()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut unique = serials.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), serials.len());
    }

    #[test]
    fn injects_through_dyn_target() {
        let injector = injector(DEFAULT);
        let mut car = Car::default();
        let target: &mut dyn Injectable = &mut car;
        injector.inject(target).unwrap();
        assert!(car.radio.is_some());
    }

    #[test]
    fn debug_display() {
        let debug = format!("{:?}", injector(DEFAULT));
        assert!(debug.contains("Injector"));
        assert!(debug.contains("bindings: 2"));
    }
}
