//! Memory locations: the keys of an abstract state.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::AnalysisError;

/// A storage cell: a global or a function-local identifier, optionally narrowed
/// to a sub-object by byte offset.
///
/// Ordering is lexicographic over (function, identifier, offset, reference), so
/// all globals sort before locals and the sub-objects of one variable are adjacent.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MemoryLocation {
    function: Option<Arc<str>>,
    identifier: Arc<str>,
    offset: Option<u64>,
    reference: bool,
}

impl MemoryLocation {
    pub fn global(identifier: impl Into<Arc<str>>) -> Self {
        Self {
            function: None,
            identifier: identifier.into(),
            offset: None,
            reference: false,
        }
    }

    pub fn local(function: impl Into<Arc<str>>, identifier: impl Into<Arc<str>>) -> Self {
        Self {
            function: Some(function.into()),
            identifier: identifier.into(),
            offset: None,
            reference: false,
        }
    }

    /// Location scoped to `function` when given, global otherwise.
    pub fn scoped(function: Option<&str>, identifier: &str) -> Self {
        match function {
            Some(f) => Self::local(f, identifier),
            None => Self::global(identifier),
        }
    }

    /// The sub-object of this location at `offset` bytes further in, or
    /// `None` when the resulting offset does not fit `u64`.
    pub fn with_added_offset(&self, offset: u64) -> Option<Self> {
        Some(Self {
            offset: Some(self.offset.unwrap_or(0).checked_add(offset)?),
            ..self.clone()
        })
    }

    pub fn with_offset(&self, offset: Option<u64>) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }

    pub fn as_reference(&self) -> Self {
        Self {
            reference: true,
            ..self.clone()
        }
    }

    /// The whole object this location belongs to.
    pub fn owner(&self) -> Self {
        Self {
            offset: None,
            reference: false,
            ..self.clone()
        }
    }

    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn is_reference(&self) -> bool {
        self.reference
    }

    pub fn is_global(&self) -> bool {
        self.function.is_none()
    }

    pub fn is_on_function_stack(&self, function: &str) -> bool {
        self.function.as_deref() == Some(function)
    }

    /// Whether this location is the object `owner` or one of its sub-objects.
    pub fn belongs_to(&self, owner: &MemoryLocation) -> bool {
        self.function == owner.function && self.identifier == owner.identifier
    }

    /// Qualified name without offset: `f::x` for locals, `x` for globals.
    pub fn qualified_name(&self) -> String {
        match &self.function {
            Some(f) => format!("{}::{}", f, self.identifier),
            None => self.identifier.to_string(),
        }
    }
}

impl fmt::Display for MemoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(function) = &self.function {
            write!(f, "{}::", function)?;
        }
        write!(f, "{}", self.identifier)?;
        if let Some(offset) = self.offset {
            write!(f, "/{}", offset)?;
        }
        if self.reference {
            write!(f, "&")?;
        }
        Ok(())
    }
}

impl FromStr for MemoryLocation {
    type Err = AnalysisError;

    /// Parses the [`Display`](fmt::Display) form back.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AnalysisError::InvalidQuery(format!("invalid memory location '{}'", s));
        let (s, reference) = match s.strip_suffix('&') {
            Some(rest) => (rest, true),
            None => (s, false),
        };
        let (s, offset) = match s.rsplit_once('/') {
            Some((name, offset)) => (name, Some(offset.parse::<u64>().map_err(|_| invalid())?)),
            None => (s, None),
        };
        let (function, identifier) = match s.split_once("::") {
            Some((f, id)) => (Some(f), id),
            None => (None, s),
        };
        if identifier.is_empty() || function.is_some_and(str::is_empty) {
            return Err(invalid());
        }
        Ok(Self {
            function: function.map(Arc::from),
            identifier: identifier.into(),
            offset,
            reference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_display_and_parse() {
        let loc = MemoryLocation::local("main", "s").with_added_offset(8).unwrap();
        assert_eq!(loc.to_string(), "main::s/8");
        assert_eq!("main::s/8".parse::<MemoryLocation>().unwrap(), loc);

        let g = MemoryLocation::global("counter");
        assert_eq!(g.to_string(), "counter");
        assert_eq!("counter".parse::<MemoryLocation>().unwrap(), g);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("::x".parse::<MemoryLocation>().is_err());
        assert!("main::".parse::<MemoryLocation>().is_err());
        assert!("x/abc".parse::<MemoryLocation>().is_err());
    }

    #[test]
    fn test_ordering_groups_sub_objects() {
        let s = MemoryLocation::local("main", "s");
        let s0 = s.with_added_offset(0).unwrap();
        let s4 = s.with_added_offset(4).unwrap();
        let t = MemoryLocation::local("main", "t");
        let g = MemoryLocation::global("z");
        let mut all = vec![t.clone(), s4.clone(), g.clone(), s0.clone()];
        all.sort();
        assert_eq!(all, vec![g, s0, s4, t]);
    }

    #[test]
    fn test_owner() {
        let s4 = MemoryLocation::local("main", "s").with_added_offset(4).unwrap();
        assert_eq!(s4.owner(), MemoryLocation::local("main", "s"));
        assert!(s4.belongs_to(&MemoryLocation::local("main", "s")));
        assert!(!s4.belongs_to(&MemoryLocation::local("f", "s")));
    }

    #[test]
    fn test_added_offset_overflow() {
        let s = MemoryLocation::local("main", "s");
        let last = s.with_added_offset(u64::MAX).unwrap();
        assert_eq!(last.with_added_offset(0), Some(last.clone()));
        assert_eq!(last.with_added_offset(1), None);
        assert_eq!(s.with_added_offset(8).unwrap().with_added_offset(u64::MAX - 7), None);
    }
}
