//! Contract identification keys.
//!
//! A contract is a trait whose trait object (`dyn Trait`) implements
//! [`Contract`]. [`ContractKey`] identifies one at run time: it combines the
//! [`TypeId`] of the trait object with the configured contract name, which is
//! the key looked up in the binding table.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Marker for abstract contract types.
///
/// Implemented for `dyn Trait`. The trait is not sealed, but an
/// [`InjectionPoint`](crate::injectable::InjectionPoint) for a sized
/// implementor is recorded as a concrete declaration and rejected with
/// `ContractViolation`. Usually derived
/// with `#[haqn::contract]` on the trait definition:
///
/// ```rust,ignore
/// #[haqn::contract(name = "org.example.SomeInterface")]
/// pub trait SomeInterface {
///     fn do_something(&self, out: &mut dyn std::io::Write) -> std::io::Result<()>;
/// }
/// ```
///
/// Implementing it by hand works the same way:
///
/// ```
/// use haqn_core::key::Contract;
///
/// pub trait Greeter {
///     fn greet(&self) -> String;
/// }
///
/// impl Contract for dyn Greeter {
///     const NAME: &'static str = "org.example.Greeter";
/// }
/// ```
pub trait Contract: 'static {
    /// Name of the contract in the binding table.
    const NAME: &'static str;
}

/// Uniquely identifies a contract.
///
/// Two keys are equal when they refer to the same trait object type.
///
/// # Examples
/// ```
/// use haqn_core::key::{Contract, ContractKey};
///
/// trait Clock {}
/// impl Contract for dyn Clock {
///     const NAME: &'static str = "app.Clock";
/// }
///
/// let key = ContractKey::of::<dyn Clock>();
/// assert_eq!(key.name(), "app.Clock");
/// assert!(key.type_name().contains("Clock"));
/// ```
#[derive(Clone, Copy)]
pub struct ContractKey {
    type_id: TypeId,
    type_name: &'static str,
    name: &'static str,
}

impl ContractKey {
    /// Creates the key for contract `C`.
    #[inline]
    pub fn of<C: ?Sized + Contract>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: type_name::<C>(),
            name: C::NAME,
        }
    }

    /// Returns the [`TypeId`] of the contract's trait object.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the Rust type name of the trait object (`dyn path::Trait`).
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the configured contract name, the binding table key.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if this key identifies contract `C`.
    #[inline]
    pub fn is<C: ?Sized + Contract>(&self) -> bool {
        self.type_id == TypeId::of::<C>()
    }
}

impl PartialEq for ContractKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ContractKey {}

impl Hash for ContractKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractKey({}, type={})", self.name, self.type_name)
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
