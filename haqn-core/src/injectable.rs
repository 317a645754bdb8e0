//! The capability a target type exposes to the injector.
//!
//! A target lists its injection points (field name + declared type) once per
//! type and provides a typed setter. `#[derive(Injectable)]` writes both from
//! the `#[inject]` markers; this module is what the derive expands to.

use std::any::{Any, type_name};
use std::fmt;

use crate::error::{HaqnError, Result};
use crate::key::{Contract, ContractKey};

/// Declared type of an injection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declared {
    /// A contract trait object, the only injectable kind.
    Contract(ContractKey),
    /// Anything else; carries the Rust type name for diagnostics.
    Concrete(&'static str),
}

/// One marked field of a target type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectionPoint {
    field: &'static str,
    declared: Declared,
}

impl InjectionPoint {
    /// A field declared with contract `C`.
    ///
    /// A sized `C` is not a trait object and is recorded as
    /// [`Declared::Concrete`], even if it implements [`Contract`].
    pub fn contract<C: ?Sized + Contract>(field: &'static str) -> Self {
        let declared = if is_unsized::<C>() {
            Declared::Contract(ContractKey::of::<C>())
        } else {
            Declared::Concrete(type_name::<C>())
        };

        Self { field, declared }
    }

    /// A marked field declared with the non-contract type `T`.
    pub fn concrete<T: ?Sized>(field: &'static str) -> Self {
        Self {
            field,
            declared: Declared::Concrete(type_name::<T>()),
        }
    }

    #[inline]
    pub fn field(&self) -> &'static str {
        self.field
    }

    #[inline]
    pub fn declared(&self) -> Declared {
        self.declared
    }
}

/// `true` when pointers to `C` are fat, as for `dyn Trait`.
fn is_unsized<C: ?Sized>() -> bool {
    size_of::<*const C>() != size_of::<*const ()>()
}

/// A type whose fields can be populated by the
/// [`Injector`](crate::injector::Injector).
///
/// Usually derived:
///
/// ```rust,ignore
/// #[derive(Default, Injectable)]
/// pub struct SomeBean {
///     #[inject]
///     field1: Option<Box<dyn SomeInterface>>,
///     #[inject]
///     field2: Option<Box<dyn SomeOtherInterface>>,
/// }
/// ```
///
/// Hand-written implementations must return the same table on every call
/// and accept, in [`assign`](Injectable::assign), exactly the fields the
/// table names.
pub trait Injectable {
    /// Marked fields declared directly on this type, in declaration order.
    fn injection_points(&self) -> &'static [InjectionPoint];

    /// Writes `instance` into `field`, replacing its previous value.
    fn assign(&mut self, field: &str, instance: Instance) -> Result<()>;
}

/// A freshly constructed implementation on its way into a field.
///
/// The value is type-erased between the registry and the target; the
/// target recovers `Box<dyn Contract>` with [`Instance::downcast`].
pub struct Instance {
    contract: ContractKey,
    implementation: String,
    value: Box<dyn Any>,
}

impl Instance {
    /// Wraps a value of contract `C` produced by `implementation`.
    pub fn new<C: ?Sized + Contract>(implementation: impl Into<String>, value: Box<C>) -> Self {
        Self {
            contract: ContractKey::of::<C>(),
            implementation: implementation.into(),
            value: Box::new(value),
        }
    }

    /// Builds an instance from a value erased by [`erase`].
    ///
    /// `value` must hold a `Box<C>` where `C` is the contract `contract`
    /// identifies; otherwise [`downcast`](Instance::downcast) fails later.
    pub(crate) fn from_erased(
        contract: ContractKey,
        implementation: impl Into<String>,
        value: Box<dyn Any>,
    ) -> Self {
        Self {
            contract,
            implementation: implementation.into(),
            value,
        }
    }

    #[inline]
    pub fn contract(&self) -> ContractKey {
        self.contract
    }

    /// Name the implementation was registered under.
    #[inline]
    pub fn implementation(&self) -> &str {
        &self.implementation
    }

    /// Recovers the boxed contract object.
    ///
    /// Returns the instance unchanged if it does not hold contract `C`.
    pub fn downcast<C: ?Sized + Contract>(self) -> std::result::Result<Box<C>, Instance> {
        if !self.contract.is::<C>() {
            return Err(self);
        }

        let Self {
            contract,
            implementation,
            value,
        } = self;

        value
            .downcast::<Box<C>>()
            .map(|boxed| *boxed)
            .map_err(|value| Self {
                contract,
                implementation,
                value,
            })
    }

    /// [`downcast`](Instance::downcast) for setters: a mismatch becomes
    /// [`HaqnError::Assignment`].
    pub fn into_field<C: ?Sized + Contract>(
        self,
        target: &'static str,
        field: &str,
    ) -> Result<Box<C>> {
        self.downcast::<C>().map_err(|instance| HaqnError::Assignment {
            target,
            field: field.to_string(),
            reason: format!(
                "expected an implementation of {}, got {} implementing {}",
                C::NAME,
                instance.implementation,
                instance.contract.name(),
            ),
        })
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("contract", &self.contract)
            .field("implementation", &self.implementation)
            .finish()
    }
}

/// Type-erases a contract object for transport in an [`Instance`].
///
/// Used by registry factories and by `#[implementation]` expansions.
pub fn erase<C: ?Sized + Contract>(value: Box<C>) -> Box<dyn Any> {
    Box::new(value)
}

/// Error for a setter asked to write a field it does not know.
pub fn unknown_field(target: &'static str, field: &str) -> HaqnError {
    HaqnError::Assignment {
        target,
        field: field.to_string(),
        reason: "no such injectable field".to_string(),
    }
}

/// Error for a setter asked to write a field that does not declare a contract.
pub fn not_a_contract(target: &'static str, field: &str) -> HaqnError {
    HaqnError::Assignment {
        target,
        field: field.to_string(),
        reason: "the field does not declare a contract".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter {
        fn greet(&self) -> String;
    }

    impl Contract for dyn Greeter {
        const NAME: &'static str = "test.Greeter";
    }

    trait Counter {}

    impl Contract for dyn Counter {
        const NAME: &'static str = "test.Counter";
    }

    struct Hello;

    impl Greeter for Hello {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn point_records_contract() {
        let point = InjectionPoint::contract::<dyn Greeter>("greeter");
        assert_eq!(point.field(), "greeter");
        assert_eq!(point.declared(), Declared::Contract(ContractKey::of::<dyn Greeter>()));
    }

    struct Plain;

    impl Contract for Plain {
        const NAME: &'static str = "test.Plain";
    }

    #[test]
    fn sized_contract_impl_is_concrete() {
        let point = InjectionPoint::contract::<Plain>("plain");
        match point.declared() {
            Declared::Concrete(name) => assert!(name.ends_with("Plain")),
            other => panic!("Expected Concrete, got: {other:?}"),
        }
    }

    #[test]
    fn point_records_concrete_type_name() {
        let point = InjectionPoint::concrete::<Option<String>>("note");
        match point.declared() {
            Declared::Concrete(name) => assert!(name.contains("String")),
            other => panic!("Expected Concrete, got: {other:?}"),
        }
    }

    #[test]
    fn instance_downcasts_to_its_contract() {
        let instance = Instance::new::<dyn Greeter>("test.Hello", Box::new(Hello));
        assert_eq!(instance.implementation(), "test.Hello");

        let greeter = instance.downcast::<dyn Greeter>().unwrap();
        assert_eq!(greeter.greet(), "hello");
    }

    #[test]
    fn instance_refuses_other_contract() {
        let instance = Instance::new::<dyn Greeter>("test.Hello", Box::new(Hello));
        let Err(instance) = instance.downcast::<dyn Counter>() else {
            panic!("Expected the instance back");
        };
        assert!(instance.contract().is::<dyn Greeter>());
    }

    #[test]
    fn into_field_reports_mismatch() {
        let instance = Instance::new::<dyn Greeter>("test.Hello", Box::new(Hello));
        let Err(err) = instance.into_field::<dyn Counter>("Target", "counter") else {
            panic!("Expected an assignment error");
        };

        let msg = format!("{err}");
        assert!(msg.contains("counter"));
        assert!(msg.contains("test.Counter"));
        assert!(msg.contains("test.Hello"));
    }

    #[test]
    fn erased_value_round_trips() {
        let value: Box<dyn Greeter> = Box::new(Hello);
        let instance = Instance::from_erased(
            ContractKey::of::<dyn Greeter>(),
            "test.Hello",
            erase::<dyn Greeter>(value),
        );
        assert_eq!(instance.downcast::<dyn Greeter>().unwrap().greet(), "hello");
    }
}
