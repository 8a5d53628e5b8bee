//! What to store when an assigned value cannot be computed.

use std::fmt;
use std::sync::Arc;

use crate::evaluator::ExpressionEvaluator;
use crate::location::MemoryLocation;
use crate::state::ValueState;
use crate::types::Type;
use crate::value::Value;

pub trait UnknownValueHandler: fmt::Debug + Send + Sync {
    /// Records in `state` that `location` (of type `ty`) holds an unknown value.
    fn handle(&self, location: MemoryLocation, ty: &Type, state: &mut ValueState, evaluator: &ExpressionEvaluator<'_>);
}

/// Forgets the location.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardUnknown;

impl UnknownValueHandler for DiscardUnknown {
    fn handle(&self, location: MemoryLocation, _ty: &Type, state: &mut ValueState, _evaluator: &ExpressionEvaluator<'_>) {
        log::trace!("Forgetting {}", location);
        state.forget(&location);
    }
}

/// Binds the location to a fresh symbolic identifier.
///
/// Falls back to forgetting when the evaluator has no symbolic factory or the
/// type cannot be stored.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymbolicUnknown;

impl UnknownValueHandler for SymbolicUnknown {
    fn handle(&self, location: MemoryLocation, ty: &Type, state: &mut ValueState, evaluator: &ExpressionEvaluator<'_>) {
        match evaluator.symbolic_factory() {
            Some(factory) if ty.is_scalar() => {
                let fresh = factory.fresh_identifier(Some(&location), ty);
                log::trace!("Binding {} to fresh symbol {}", location, fresh);
                state.assign(location, Value::Symbolic(Arc::new(fresh)), ty.clone());
            }
            _ => DiscardUnknown.handle(location, ty, state, evaluator),
        }
    }
}
