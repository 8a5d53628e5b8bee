//! Variable classes computed by a separate pass over the program.

use std::collections::BTreeSet;
use std::fmt;

use crate::location::MemoryLocation;

/// Oracle telling how a variable is used throughout the program.
pub trait VariableClassification: fmt::Debug + Send + Sync {
    /// Only ever holds 0 or 1.
    fn is_boolean(&self, location: &MemoryLocation) -> bool;

    /// Only compared for equality with constants or other such variables.
    fn is_int_equal(&self, location: &MemoryLocation) -> bool;

    /// Only used in additions and equality comparisons.
    fn is_int_add(&self, location: &MemoryLocation) -> bool;
}

/// Classification from explicit sets of qualified names (`f::x` or `g`).
#[derive(Debug, Clone, Default)]
pub struct VariableClasses {
    pub boolean: BTreeSet<String>,
    pub int_equal: BTreeSet<String>,
    pub int_add: BTreeSet<String>,
}

impl VariableClasses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boolean(mut self, name: &str) -> Self {
        self.boolean.insert(name.to_string());
        self
    }

    pub fn with_int_equal(mut self, name: &str) -> Self {
        self.int_equal.insert(name.to_string());
        self
    }

    pub fn with_int_add(mut self, name: &str) -> Self {
        self.int_add.insert(name.to_string());
        self
    }
}

impl VariableClassification for VariableClasses {
    fn is_boolean(&self, location: &MemoryLocation) -> bool {
        self.boolean.contains(&location.qualified_name())
    }

    fn is_int_equal(&self, location: &MemoryLocation) -> bool {
        self.int_equal.contains(&location.qualified_name())
    }

    fn is_int_add(&self, location: &MemoryLocation) -> bool {
        self.int_add.contains(&location.qualified_name())
    }
}
