//! Core injection engine for Haqn.

pub mod config;
pub mod error;
pub mod injectable;
pub mod injector;
pub mod key;
pub mod provider;
pub mod registry;

pub use config::{Bindings, ConfigSource, PropertiesFile, PropertiesText};
pub use error::{BoxError, HaqnError, Result};
pub use injectable::{Declared, Injectable, InjectionPoint, Instance};
pub use injector::{Injector, InjectorBuilder, prelude};
pub use key::{Contract, ContractKey};
pub use registry::{FactoryRegistry, Implementation};

/// Re-exports used by the code `haqn-macros` generates.
#[doc(hidden)]
pub mod __private {
    pub use inventory;
    pub use once_cell::sync::Lazy;
}
