//! Error types for Haqn configuration and injection.
//!
//! Every message names the field, contract or implementation involved,
//! so a failed injection is actionable without a debugger.

use std::fmt;

use haqn_support::rendering::shorten_type_name;

use crate::config::escape_properties_key;

/// Boxed error produced by implementation constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all Haqn operations.
#[derive(Debug, thiserror::Error)]
pub enum HaqnError {
    /// The configuration resource does not exist.
    #[error(
        "Configuration not found: {location}\n  Hint: Check the path of the properties resource"
    )]
    ConfigurationNotFound { location: String },

    /// The configuration resource exists but could not be read or parsed.
    #[error("Error reading the configuration {location}: {source}")]
    ConfigurationRead {
        location: String,
        #[source]
        source: BoxError,
    },

    /// A required argument was absent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A marked field does not declare a contract.
    #[error("{}", .0)]
    ContractViolation(ContractViolationError),

    /// No usable binding exists for a field's contract.
    #[error("{}", .0)]
    UnresolvedDependency(UnresolvedDependencyError),

    /// The bound implementation could not be constructed.
    #[error("Injection error in the field {field}: failed to create an instance of {implementation}: {source}")]
    InstantiationFailure {
        field: String,
        implementation: String,
        #[source]
        source: BoxError,
    },

    /// Two implementations were registered under the same name.
    #[error("{}", .0)]
    AlreadyRegistered(AlreadyRegisteredError),

    /// The target refused an instance handed to its setter.
    #[error("Cannot assign field {field} of {target}: {reason}")]
    Assignment {
        target: &'static str,
        field: String,
        reason: String,
    },
}

impl HaqnError {
    /// Returns the name of the field the error is about, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            HaqnError::ContractViolation(e) => Some(e.field),
            HaqnError::UnresolvedDependency(e) => Some(e.field),
            HaqnError::InstantiationFailure { field, .. } => Some(field.as_str()),
            HaqnError::Assignment { field, .. } => Some(field.as_str()),
            _ => None,
        }
    }
}

/// Error when a marked field is declared with a concrete type.
#[derive(Debug)]
pub struct ContractViolationError {
    /// Field that carries the marker
    pub field: &'static str,
    /// Declared type of that field
    pub declared: &'static str,
}

impl fmt::Display for ContractViolationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Field {} should be a contract, but it has a type: {}",
            self.field, self.declared,
        )?;
        write!(
            f,
            "\n  Hint: Declare the field as Option<Box<dyn Trait>> with a #[contract] trait instead of {}",
            shorten_type_name(self.declared),
        )
    }
}

/// Error when a contract has no usable binding.
#[derive(Debug)]
pub struct UnresolvedDependencyError {
    /// Field being injected
    pub field: &'static str,
    /// Contract name that was looked up
    pub contract: &'static str,
    /// `true` if the key exists but its value is blank
    pub blank: bool,
    /// Configured keys that look like the contract name
    pub suggestions: Vec<String>,
}

impl fmt::Display for UnresolvedDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "No implementation found for the contract: {} (field {})",
            self.contract, self.field,
        )?;

        if self.blank {
            write!(f, "\n  The binding exists but its value is empty")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: Add `{}=<implementation>` to the properties",
            escape_properties_key(self.contract),
        )
    }
}

/// Error when trying to register an implementation name twice.
#[derive(Debug)]
pub struct AlreadyRegisteredError {
    pub name: String,
}

impl fmt::Display for AlreadyRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Implementation already registered: {}", self.name)?;
        write!(
            f,
            "\n  Hint: Rename one of the implementations, or enable allow_override on the registry builder"
        )
    }
}

/// Cause attached to [`HaqnError::InstantiationFailure`].
#[derive(Debug, thiserror::Error)]
pub enum InstantiationCause {
    /// No factory is registered under the configured name.
    #[error("no implementation is registered under this name{}", render_suggestions(.suggestions))]
    UnknownImplementation { suggestions: Vec<String> },

    /// The factory exists but produces a different contract.
    #[error("it implements {actual}, not {expected}")]
    ContractMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// The constructor panicked.
    #[error("constructor panicked: {0}")]
    Panicked(String),
}

fn render_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {})", suggestions.join(", "))
    }
}

/// Convenient Result type for Haqn operations.
pub type Result<T> = std::result::Result<T, HaqnError>;
