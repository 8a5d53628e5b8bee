//! String-keyed property queries on a state.
//!
//! ```
//! use value_analysis::state::ValueState;
//! use value_analysis::value::Value;
//!
//! let mut state = ValueState::new();
//! state.modify_property("setvalue(main::x:=5)").unwrap();
//! assert!(state.check_property("contains(main::x)").unwrap());
//! assert!(state.check_property("main::x==5").unwrap());
//! assert_eq!(state.evaluate_property("main::x").unwrap(), Value::int(5));
//! state.modify_property("deletevalues(main::x)").unwrap();
//! assert!(state.is_empty());
//! ```

use num_bigint::BigInt;

use crate::cast::cast_to_float;
use crate::error::AnalysisError;
use crate::location::MemoryLocation;
use crate::number::Number;
use crate::state::ValueState;
use crate::types::Type;
use crate::value::Value;

fn invalid(message: impl Into<String>) -> AnalysisError {
    AnalysisError::InvalidQuery(message.into())
}

/// `name(argument)` with surrounding whitespace removed.
fn call<'q>(text: &'q str, name: &str) -> Option<&'q str> {
    text.strip_prefix(name)?.trim_start().strip_prefix('(')?.strip_suffix(')').map(str::trim)
}

fn parse_location(text: &str) -> Result<MemoryLocation, AnalysisError> {
    text.trim().parse()
}

/// `true`, `false`, `null`, an integer or a decimal number.
fn parse_literal(text: &str) -> Result<Value, AnalysisError> {
    let text = text.trim();
    match text {
        "true" => return Ok(Value::Boolean(true)),
        "false" => return Ok(Value::Boolean(false)),
        "null" => return Ok(Value::Null),
        _ => {}
    }
    if let Ok(v) = text.parse::<BigInt>() {
        return Ok(Value::Numeric(Number::from_bigint(v)));
    }
    text.parse::<f64>()
        .map(Value::double)
        .map_err(|_| invalid(format!("invalid literal '{}'", text)))
}

/// The literal as a value of a location of type `ty`.
fn literal_for(literal: Value, ty: &Type) -> Value {
    match (ty, &literal) {
        (Type::Float(kind), Value::Numeric(n)) => cast_to_float(n, *kind),
        _ => literal,
    }
}

impl ValueState {
    /// `contains(name)` or `name==literal`.
    pub fn check_property(&self, property: &str) -> Result<bool, AnalysisError> {
        let property = property.trim();
        if let Some(name) = call(property, "contains") {
            return Ok(self.contains(&parse_location(name)?));
        }
        if let Some((name, literal)) = property.split_once("==") {
            let location = parse_location(name)?;
            let literal = parse_literal(literal)?;
            return Ok(match self.get(&location) {
                Some(entry) => entry.value == literal_for(literal, &entry.ty),
                None => false,
            });
        }
        Err(invalid(format!("unsupported property '{}'", property)))
    }

    /// The value of `name`.
    pub fn evaluate_property(&self, property: &str) -> Result<Value, AnalysisError> {
        let location = parse_location(property)?;
        self.value_of(&location)
            .cloned()
            .ok_or_else(|| invalid(format!("{} is not tracked", location)))
    }

    /// Applies `;`-separated `deletevalues(name)` and `setvalue(name:=literal)` commands.
    pub fn modify_property(&mut self, modification: &str) -> Result<(), AnalysisError> {
        for statement in modification.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(name) = call(statement, "deletevalues") {
                let location = parse_location(name)?;
                if self.forget(&location).is_none() {
                    log::debug!("deletevalues: {} was not tracked", location);
                }
            } else if let Some(assignment) = call(statement, "setvalue") {
                let (name, literal) = assignment
                    .split_once(":=")
                    .ok_or_else(|| invalid(format!("expected 'name:=value' in '{}'", statement)))?;
                let location = parse_location(name)?;
                let literal = parse_literal(literal)?;
                let ty = match (self.type_of(&location), &literal) {
                    (Some(ty), _) => ty.clone(),
                    (None, Value::Boolean(_)) => Type::Bool,
                    (None, Value::Null) => Type::Null,
                    (None, Value::Numeric(n)) if n.is_float_kind() => Type::double(),
                    (None, _) => Type::int(),
                };
                let value = literal_for(literal, &ty);
                self.assign(location, value, ty);
            } else {
                return Err(invalid(format!("unsupported modification '{}'", statement)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn x() -> MemoryLocation {
        MemoryLocation::local("main", "x")
    }

    #[test]
    fn test_check_property() {
        let mut s = ValueState::new();
        s.assign(x(), Value::int(5), Type::int());
        s.assign(MemoryLocation::global("f"), Value::float(0.5), Type::float());
        assert!(s.check_property("contains(main::x)").unwrap());
        assert!(!s.check_property("contains(y)").unwrap());
        assert!(s.check_property("main::x == 5").unwrap());
        assert!(!s.check_property("main::x==6").unwrap());
        assert!(s.check_property("f==0.5").unwrap());
        assert!(!s.check_property("y==0").unwrap());
    }

    #[test]
    fn test_invalid_queries() {
        let s = ValueState::new();
        assert!(matches!(s.check_property("x > 3"), Err(AnalysisError::InvalidQuery(_))));
        assert!(matches!(s.check_property("x==abc"), Err(AnalysisError::InvalidQuery(_))));
        assert!(matches!(s.evaluate_property("x"), Err(AnalysisError::InvalidQuery(_))));
        let mut s = ValueState::new();
        assert!(s.modify_property("setvalue(x=1)").is_err());
        assert!(s.modify_property("reset()").is_err());
    }

    #[test]
    fn test_modify_property() {
        let mut s = ValueState::new();
        s.assign(MemoryLocation::global("c"), Value::int(1), Type::uchar());
        s.modify_property("setvalue(c:=7); setvalue(b:=true); setvalue(d:=1.5)").unwrap();
        assert_eq!(s.type_of(&MemoryLocation::global("c")), Some(&Type::uchar()));
        assert_eq!(s.evaluate_property("c").unwrap(), Value::int(7));
        assert_eq!(s.evaluate_property("b").unwrap(), Value::Boolean(true));
        assert_eq!(s.evaluate_property("d").unwrap(), Value::double(1.5));
        s.modify_property("deletevalues(c);deletevalues(b)").unwrap();
        assert_eq!(s.size(), 1);
    }
}
