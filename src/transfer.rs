//! The transfer relation: one CFA edge applied to one state.
//!
//! The predecessor is never modified. Expressions are evaluated against the
//! predecessor and the writes go to a private copy which becomes the
//! successor, so a `ValueState` handed out once stays valid for every reader.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::arithmetic::Flavor;
use crate::ast::{CExpr, JExpr};
use crate::cast::{cast_c, cast_java};
use crate::cfa::{CfaEdge, Declaration, EdgeKind, Expr, Initializer, Parameter, Statement};
use crate::classification::VariableClassification;
use crate::config::ValueAnalysisConfig;
use crate::error::AnalysisError;
use crate::evaluator::{ExpressionEvaluator, JavaTarget};
use crate::location::MemoryLocation;
use crate::machine::MachineModel;
use crate::narrowing::AssumeNarrowing;
use crate::precision::ValuePrecision;
use crate::state::ValueState;
use crate::symbolic::{ExpressionFactory, SymbolicFactory};
use crate::types::{CompositeKind, Type};
use crate::unknown::{DiscardUnknown, SymbolicUnknown, UnknownValueHandler};
use crate::value::Value;

/// Identifier of the slot holding a function's return value.
pub const RETURN_VARIABLE: &str = "__retval__";

/// Location of the return value of `function`.
pub fn return_location(function: &str) -> MemoryLocation {
    MemoryLocation::local(function, RETURN_VARIABLE)
}

/// A write the transfer relation could not resolve by itself.
///
/// A strengthening pass with alias or runtime-type information applies these
/// to the successor later.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MissingInformation {
    /// `*p = value`, `p->f = value` or `p[i] = value`.
    PointerAssignment { lhs: CExpr, value: Value, ty: Type },
    /// `o.f = value` for an instance field.
    FieldAssignment { lhs: JExpr, value: Value, ty: Type },
}

#[derive(Debug, Clone)]
pub struct TransferOutcome {
    /// `None` when the edge cannot be taken from the predecessor.
    pub successor: Option<ValueState>,
    /// A pointer was dereferenced on the edge.
    pub missing_pointer: bool,
    /// An instance field was accessed on the edge.
    pub missing_field_access: bool,
    pub pending: Vec<MissingInformation>,
}

impl TransferOutcome {
    pub fn is_feasible(&self) -> bool {
        self.successor.is_some()
    }
}

/// Monotonic counters, shared by every thread using the relation.
#[derive(Debug, Default)]
pub struct TransferStatistics {
    edges: AtomicUsize,
    narrowed_assumes: AtomicUsize,
    infeasible_assumes: AtomicUsize,
    unknown_values: AtomicUsize,
}

impl TransferStatistics {
    pub fn edges(&self) -> usize {
        self.edges.load(Ordering::Relaxed)
    }

    /// Undecided assume edges that produced at least one value.
    pub fn narrowed_assumes(&self) -> usize {
        self.narrowed_assumes.load(Ordering::Relaxed)
    }

    pub fn infeasible_assumes(&self) -> usize {
        self.infeasible_assumes.load(Ordering::Relaxed)
    }

    /// Writes handed to the unknown-value handler.
    pub fn unknown_values(&self) -> usize {
        self.unknown_values.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct ValueTransferRelation {
    config: ValueAnalysisConfig,
    machine: MachineModel,
    classification: Option<Arc<dyn VariableClassification>>,
    unknown_handler: Box<dyn UnknownValueHandler>,
    factory: Arc<dyn SymbolicFactory>,
    stats: TransferStatistics,
}

impl ValueTransferRelation {
    pub fn new(config: ValueAnalysisConfig, machine: MachineModel) -> Self {
        let unknown_handler: Box<dyn UnknownValueHandler> = if config.symbolic_values {
            Box::new(SymbolicUnknown)
        } else {
            Box::new(DiscardUnknown)
        };
        Self {
            config,
            machine,
            classification: None,
            unknown_handler,
            factory: Arc::new(ExpressionFactory::new()),
            stats: TransferStatistics::default(),
        }
    }

    pub fn with_classification(self, classification: Arc<dyn VariableClassification>) -> Self {
        Self {
            classification: Some(classification),
            ..self
        }
    }

    pub fn with_unknown_handler(self, unknown_handler: Box<dyn UnknownValueHandler>) -> Self {
        Self { unknown_handler, ..self }
    }

    pub fn with_symbolic_factory(self, factory: Arc<dyn SymbolicFactory>) -> Self {
        Self { factory, ..self }
    }

    pub fn config(&self) -> &ValueAnalysisConfig {
        &self.config
    }

    pub fn machine(&self) -> &MachineModel {
        &self.machine
    }

    pub fn statistics(&self) -> &TransferStatistics {
        &self.stats
    }

    fn evaluator<'s>(&'s self, state: &'s ValueState) -> ExpressionEvaluator<'s> {
        let evaluator = ExpressionEvaluator::new(state, &self.machine);
        if self.config.symbolic_values {
            evaluator.with_symbolic(self.factory.as_ref())
        } else {
            evaluator
        }
    }

    /// The successor of `state` along `edge`.
    pub fn get_successor(
        &self,
        state: &ValueState,
        precision: &ValuePrecision,
        edge: &CfaEdge,
    ) -> Result<TransferOutcome, AnalysisError> {
        self.stats.edges.fetch_add(1, Ordering::Relaxed);
        log::trace!("Transfer along {}", edge);
        let mut transfer = EdgeTransfer {
            relation: self,
            evaluator: self.evaluator(state),
            precision,
            edge,
            successor: state.clone(),
            pending: Vec::new(),
        };
        let feasible = transfer.apply()?;
        Ok(TransferOutcome {
            missing_pointer: transfer.evaluator.missing_pointer(),
            missing_field_access: transfer.evaluator.missing_field_access(),
            successor: feasible.then_some(transfer.successor),
            pending: transfer.pending,
        })
    }
}

/// State of one `get_successor` call.
struct EdgeTransfer<'r> {
    relation: &'r ValueTransferRelation,
    evaluator: ExpressionEvaluator<'r>,
    precision: &'r ValuePrecision,
    edge: &'r CfaEdge,
    successor: ValueState,
    pending: Vec<MissingInformation>,
}

impl<'r> EdgeTransfer<'r> {
    fn machine(&self) -> &'r MachineModel {
        &self.relation.machine
    }

    fn unrecognized(&self, message: impl Into<String>) -> AnalysisError {
        AnalysisError::unrecognized(message, &self.edge.location)
    }

    /// Applies the edge; `false` when the successor is infeasible.
    fn apply(&mut self) -> Result<bool, AnalysisError> {
        let edge = self.edge;
        match &edge.kind {
            EdgeKind::Blank => {
                // Falling off the end of a function: its frame dies here.
                if edge.successor.function_exit {
                    self.successor.drop_frame(&edge.predecessor.function);
                }
                Ok(true)
            }
            EdgeKind::Declaration(declaration) => self.declaration(declaration),
            EdgeKind::Statement(Statement::Assignment { lhs, rhs }) => match (lhs, rhs) {
                (Expr::C(lhs), Expr::C(rhs)) => {
                    let value = self.evaluator.evaluate_c(rhs);
                    self.write_c(lhs, Some(rhs), value)?;
                    Ok(true)
                }
                (Expr::Java(lhs), Expr::Java(rhs)) => self.assign_java(lhs, rhs),
                _ => Err(self.unrecognized(format!("assignment mixes languages: {} = {}", lhs, rhs))),
            },
            EdgeKind::Statement(Statement::Expression(expr)) => match expr {
                Expr::C(e) => {
                    self.evaluator.evaluate_c(e);
                    Ok(true)
                }
                Expr::Java(e) => Ok(self.evaluate_java(e).is_some()),
            },
            EdgeKind::Assume { condition, truth } => Ok(self.assume(condition, *truth)),
            EdgeKind::FunctionCall {
                callee,
                parameters,
                arguments,
                variadic,
            } => self.function_call(callee, parameters, arguments, *variadic),
            EdgeKind::Return {
                function,
                expression,
                return_type,
            } => self.return_statement(function, expression.as_ref(), return_type),
            EdgeKind::FunctionReturn {
                callee,
                assign_to,
                return_type,
            } => {
                let retval = return_location(callee);
                let returned = self.evaluator.state().get(&retval).cloned();
                self.successor.drop_frame(callee);
                match assign_to {
                    Some(target) => self.assign_returned(target, &retval, returned.map(|e| e.value), return_type),
                    None => Ok(true),
                }
            }
            EdgeKind::Summary {
                callee,
                assign_to,
                result,
            } => {
                log::trace!("Applying summary of {}", callee);
                match assign_to {
                    Some(target) => {
                        let value = result.clone().unwrap_or(Value::Unknown);
                        let ty = target.ty();
                        self.write_value(target, value, &ty)
                    }
                    None => Ok(true),
                }
            }
            EdgeKind::Exit => {
                self.successor.drop_frame(&edge.predecessor.function);
                Ok(true)
            }
        }
    }

    /// Writes `value` to `location`, or lets the unknown-value handler decide.
    fn store(&mut self, location: MemoryLocation, value: Value, ty: &Type) {
        if value.is_unknown() {
            self.relation.stats.unknown_values.fetch_add(1, Ordering::Relaxed);
            self.relation
                .unknown_handler
                .handle(location, ty, &mut self.successor, &self.evaluator);
        } else {
            self.successor.assign(location, value, ty.clone());
        }
    }

    /// Stores into the sub-object of `base` at `offset`; an offset past `u64` addresses nothing.
    fn store_leaf(&mut self, base: &MemoryLocation, offset: u64, value: Value, ty: &Type) {
        match base.with_added_offset(offset) {
            Some(location) => self.store(location, value, ty),
            None => log::debug!("Offset {} past {} is not addressable", offset, base),
        }
    }

    /// Stores the arrays created while evaluating the edge.
    fn commit_allocations(&mut self) {
        for (id, object) in self.evaluator.take_allocations() {
            self.successor.allocate_array(id, object);
        }
    }

    fn evaluate_java(&self, expr: &JExpr) -> Option<Value> {
        match self.evaluator.evaluate_java(expr) {
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!("{} at {}, edge is infeasible", e, self.edge.location);
                None
            }
        }
    }

    /// Writes a value computed elsewhere (a summary or a returned value) to a target of either language.
    fn write_value(&mut self, target: &Expr, value: Value, ty: &Type) -> Result<bool, AnalysisError> {
        match target {
            Expr::C(lhs) => {
                let value = cast_c(&value, ty, self.machine());
                self.write_c(lhs, None, value)?;
                Ok(true)
            }
            Expr::Java(lhs) => self.write_java(lhs, java_convert(&value, ty)),
        }
    }

    // Declarations

    fn declaration(&mut self, declaration: &Declaration) -> Result<bool, AnalysisError> {
        let ty = &declaration.ty;
        if !ty.is_tracked() && !ty.is_aggregate() {
            return Ok(true);
        }
        let location = declaration.var.location();
        let global = declaration.is_global();
        let first = declaration.initializer.as_ref().and_then(first_expression);

        match declaration.flavor {
            Flavor::C => {
                if ty.is_aggregate() {
                    return self.declare_c_aggregate(declaration, &location);
                }
                let value = match first {
                    Some(Expr::C(e)) => cast_c(&self.evaluator.evaluate_c(e), ty, self.machine()),
                    Some(other) => return Err(self.unrecognized(format!("C declaration initialised by {}", other))),
                    None if global && self.relation.config.initialize_globals => Value::c_zero(ty),
                    // `= {}`
                    None if declaration.initializer.is_some() => Value::c_zero(ty),
                    None => Value::Unknown,
                };
                self.store(location, value, ty);
            }
            Flavor::Java => {
                let value = match first {
                    Some(Expr::Java(e)) => match self.evaluate_java(e) {
                        Some(v) => java_convert(&v, ty),
                        None => return Ok(false),
                    },
                    Some(other) => return Err(self.unrecognized(format!("Java declaration initialised by {}", other))),
                    None if global => Value::java_default(ty),
                    None => Value::Unknown,
                };
                self.commit_allocations();
                self.store(location, value, ty);
            }
        }
        Ok(true)
    }

    fn declare_c_aggregate(&mut self, declaration: &Declaration, location: &MemoryLocation) -> Result<bool, AnalysisError> {
        let ty = &declaration.ty;
        let leaves = match self.machine().leaf_offsets(ty) {
            Some(leaves) => leaves,
            None => {
                self.successor.retain(|l, _| !l.belongs_to(location));
                return Ok(true);
            }
        };
        match &declaration.initializer {
            None => {
                let zero = declaration.is_global() && self.relation.config.initialize_globals;
                for (offset, leaf_ty) in leaves {
                    let value = if zero { Value::c_zero(&leaf_ty) } else { Value::Unknown };
                    self.store_leaf(location, offset, value, &leaf_ty);
                }
            }
            Some(Initializer::Expression(Expr::C(source))) => {
                let source = self.evaluator.location_of_c(source);
                self.copy_aggregate(location, source.as_ref(), ty);
            }
            Some(Initializer::List(items)) => {
                let mut values = Vec::new();
                self.flatten_initializer(ty, items, 0, &mut values)?;
                for (offset, leaf_ty) in leaves {
                    let value = match values.iter().rev().find(|(o, _)| *o == offset) {
                        Some((_, v)) => cast_c(v, &leaf_ty, self.machine()),
                        None => Value::c_zero(&leaf_ty),
                    };
                    self.store_leaf(location, offset, value, &leaf_ty);
                }
            }
            Some(Initializer::Expression(other)) => {
                return Err(self.unrecognized(format!("C aggregate initialised by {}", other)));
            }
        }
        Ok(true)
    }

    /// Values of the scalar sub-objects named by an initializer list, by byte offset.
    fn flatten_initializer(
        &self,
        ty: &Type,
        items: &[Initializer],
        base: u64,
        out: &mut Vec<(u64, Value)>,
    ) -> Result<(), AnalysisError> {
        let machine = self.machine();
        let slots: Vec<(u64, Type)> = match ty {
            Type::Array { element, .. } => {
                let size = machine
                    .size_of(element)
                    .ok_or_else(|| self.unrecognized(format!("initializer for {} of unknown size", ty)))?;
                (0..items.len() as u64)
                    .map_while(|i| Some((base.checked_add(i.checked_mul(size)?)?, (**element).clone())))
                    .collect()
            }
            Type::Composite(c) => {
                let members = match c.kind {
                    CompositeKind::Struct => &c.members[..],
                    CompositeKind::Union => &c.members[..c.members.len().min(1)],
                };
                members
                    .iter()
                    .filter_map(|m| Some((base.checked_add(machine.field_offset(c, &m.name)?)?, m.ty.clone())))
                    .collect()
            }
            _ => vec![(base, ty.clone())],
        };
        for ((offset, slot_ty), item) in slots.into_iter().zip(items) {
            match item {
                Initializer::List(inner) if slot_ty.is_aggregate() => {
                    self.flatten_initializer(&slot_ty, inner, offset, out)?;
                }
                Initializer::List(_) => {
                    if let Some(Expr::C(e)) = first_expression(item) {
                        out.push((offset, self.evaluator.evaluate_c(e)));
                    }
                }
                Initializer::Expression(Expr::C(e)) if slot_ty.is_aggregate() => {
                    let source = self.evaluator.location_of_c(e);
                    for (leaf, leaf_ty) in machine.leaf_offsets(&slot_ty).unwrap_or_default() {
                        let value = source
                            .as_ref()
                            .and_then(|s| s.with_added_offset(leaf))
                            .and_then(|l| self.evaluator.state().value_of(&l))
                            .cloned()
                            .unwrap_or(Value::Unknown);
                        if let Some(at) = offset.checked_add(leaf) {
                            out.push((at, cast_c(&value, &leaf_ty, machine)));
                        }
                    }
                }
                Initializer::Expression(Expr::C(e)) => out.push((offset, self.evaluator.evaluate_c(e))),
                Initializer::Expression(other) => {
                    return Err(self.unrecognized(format!("C initializer item {}", other)));
                }
            }
        }
        Ok(())
    }

    /// Copies every scalar sub-object of `source` (read in the predecessor) to `target`.
    fn copy_aggregate(&mut self, target: &MemoryLocation, source: Option<&MemoryLocation>, ty: &Type) {
        let leaves = match self.machine().leaf_offsets(ty) {
            Some(leaves) => leaves,
            None => {
                self.successor.retain(|l, _| !l.belongs_to(target));
                return;
            }
        };
        for (offset, leaf_ty) in leaves {
            let value = source
                .and_then(|s| s.with_added_offset(offset))
                .and_then(|l| self.evaluator.state().value_of(&l))
                .cloned()
                .unwrap_or(Value::Unknown);
            self.store_leaf(target, offset, value, &leaf_ty);
        }
    }

    // Assignments

    /// Writes `value` (already evaluated from `rhs`, if any) to the C lvalue `lhs`.
    fn write_c(&mut self, lhs: &CExpr, rhs: Option<&CExpr>, value: Value) -> Result<(), AnalysisError> {
        if !matches!(
            lhs,
            CExpr::Variable { .. } | CExpr::Field { .. } | CExpr::Subscript { .. } | CExpr::Deref { .. }
        ) {
            return Err(self.unrecognized(format!("{} is not assignable", lhs)));
        }
        let ty = lhs.ty().clone();
        let target = self.evaluator.location_of_c(lhs);

        if ty.is_aggregate() {
            match target {
                Some(target) => {
                    let source = rhs.and_then(|r| self.evaluator.location_of_c(r));
                    self.copy_aggregate(&target, source.as_ref(), &ty);
                }
                None => self.unresolved_c_target(lhs, Value::Unknown, &ty),
            }
            return Ok(());
        }
        if !ty.is_tracked() {
            return Ok(());
        }
        let value = cast_c(&value, &ty, self.machine());
        match target {
            Some(location) => self.store(location, value, &ty),
            None => self.unresolved_c_target(lhs, value, &ty),
        }
        Ok(())
    }

    /// An lvalue without a location: an unknown index into a tracked
    /// variable (which is then forgotten entirely) or a write through a pointer.
    fn unresolved_c_target(&mut self, lhs: &CExpr, value: Value, ty: &Type) {
        match root_variable(lhs) {
            Some(root) => {
                log::debug!("Cannot resolve {}, forgetting {}", lhs, root);
                self.successor.retain(|l, _| !l.belongs_to(&root));
            }
            None => self.pending.push(MissingInformation::PointerAssignment {
                lhs: lhs.clone(),
                value,
                ty: ty.clone(),
            }),
        }
    }

    fn assign_java(&mut self, lhs: &JExpr, rhs: &JExpr) -> Result<bool, AnalysisError> {
        let value = match self.evaluate_java(rhs) {
            Some(v) => v,
            None => return Ok(false),
        };
        self.write_java(lhs, java_convert(&value, &lhs.ty()))
    }

    fn write_java(&mut self, lhs: &JExpr, value: Value) -> Result<bool, AnalysisError> {
        let ty = lhs.ty();
        let target = match self.evaluator.java_target(lhs) {
            Ok(target) => target,
            Err(e) => {
                log::debug!("{} at {}, edge is infeasible", e, self.edge.location);
                return Ok(false);
            }
        };
        self.commit_allocations();
        match target {
            Some(JavaTarget::Location(location)) => self.store(location, value, &ty),
            Some(JavaTarget::ArrayElement(id, index)) => {
                if !self.successor.set_array_element(id, index, value) {
                    log::debug!("Write to {}[{}] out of bounds, ignored", id, index);
                }
            }
            None => match lhs {
                JExpr::Subscript { array, .. } => {
                    if let Ok(Value::Array(id)) = self.evaluator.evaluate_java(array) {
                        log::debug!("Unknown index into {}, forgetting its elements", id);
                        self.successor.forget_array_elements(id);
                    }
                }
                JExpr::InstanceField { .. } => self.pending.push(MissingInformation::FieldAssignment {
                    lhs: lhs.clone(),
                    value,
                    ty,
                }),
                other => return Err(self.unrecognized(format!("{} is not assignable", other))),
            },
        }
        Ok(true)
    }

    // Assumptions

    fn assume(&mut self, condition: &Expr, truth: bool) -> bool {
        let relation = self.relation;
        let stats = &relation.stats;
        let value = match condition {
            Expr::C(e) => self.evaluator.evaluate_c(e),
            Expr::Java(e) => match self.evaluate_java(e) {
                Some(v) => v,
                None => {
                    stats.infeasible_assumes.fetch_add(1, Ordering::Relaxed);
                    return false;
                }
            },
        };
        match value.truth() {
            Some(t) if t == truth => true,
            Some(_) => {
                log::debug!("Assume {} is infeasible", self.edge);
                stats.infeasible_assumes.fetch_add(1, Ordering::Relaxed);
                false
            }
            None => {
                let facts = AssumeNarrowing::new(
                    &self.evaluator,
                    self.precision,
                    &self.edge.successor,
                    &relation.config,
                    relation.classification.as_deref(),
                )
                .narrow(condition, truth);
                if !facts.is_empty() {
                    stats.narrowed_assumes.fetch_add(1, Ordering::Relaxed);
                }
                for fact in facts {
                    self.successor.assign(fact.location, fact.value, fact.ty);
                }
                true
            }
        }
    }

    // Calls

    fn function_call(
        &mut self,
        callee: &str,
        parameters: &[Parameter],
        arguments: &[Expr],
        variadic: bool,
    ) -> Result<bool, AnalysisError> {
        let count_ok = if variadic {
            arguments.len() >= parameters.len()
        } else {
            arguments.len() == parameters.len()
        };
        if !count_ok {
            return Err(self.unrecognized(format!(
                "{} takes {} parameters but is called with {} arguments",
                callee,
                parameters.len(),
                arguments.len()
            )));
        }
        for (parameter, argument) in parameters.iter().zip(arguments) {
            let location = MemoryLocation::local(callee, parameter.name.clone());
            let ty = &parameter.ty;
            match argument {
                Expr::C(e) if ty.is_aggregate() => {
                    let source = self.evaluator.location_of_c(e);
                    self.copy_aggregate(&location, source.as_ref(), ty);
                }
                Expr::C(e) => {
                    let value = cast_c(&self.evaluator.evaluate_c(e), ty, self.machine());
                    self.store(location, value, ty);
                }
                Expr::Java(e) => {
                    let value = match self.evaluate_java(e) {
                        Some(v) => java_convert(&v, ty),
                        None => return Ok(false),
                    };
                    self.commit_allocations();
                    self.store(location, value, ty);
                }
            }
        }
        Ok(true)
    }

    fn return_statement(&mut self, function: &str, expression: Option<&Expr>, return_type: &Type) -> Result<bool, AnalysisError> {
        let retval = return_location(function);
        match expression {
            None => {
                self.successor.retain(|l, _| !l.belongs_to(&retval));
            }
            Some(Expr::C(e)) if return_type.is_aggregate() => {
                let source = self.evaluator.location_of_c(e);
                self.copy_aggregate(&retval, source.as_ref(), return_type);
            }
            Some(Expr::C(e)) => {
                let value = cast_c(&self.evaluator.evaluate_c(e), return_type, self.machine());
                self.store(retval, value, return_type);
            }
            Some(Expr::Java(e)) => {
                let value = match self.evaluate_java(e) {
                    Some(v) => java_convert(&v, return_type),
                    None => return Ok(false),
                };
                self.commit_allocations();
                self.store(retval, value, return_type);
            }
        }
        Ok(true)
    }

    /// Stores the callee's return value into the call site's target.
    fn assign_returned(
        &mut self,
        target: &Expr,
        retval: &MemoryLocation,
        returned: Option<Value>,
        return_type: &Type,
    ) -> Result<bool, AnalysisError> {
        match target {
            Expr::C(lhs) if return_type.is_aggregate() => {
                match self.evaluator.location_of_c(lhs) {
                    Some(location) => self.copy_aggregate(&location, Some(retval), return_type),
                    None => self.unresolved_c_target(lhs, Value::Unknown, return_type),
                }
                Ok(true)
            }
            _ => {
                let ty = target.ty();
                self.write_value(target, returned.unwrap_or(Value::Unknown), &ty)
            }
        }
    }
}

/// First expression of a possibly nested initializer list.
fn first_expression(init: &Initializer) -> Option<&Expr> {
    match init {
        Initializer::Expression(e) => Some(e),
        Initializer::List(items) => items.first().and_then(first_expression),
    }
}

/// The variable an array or member access is rooted in, when no pointer is involved.
fn root_variable(expr: &CExpr) -> Option<MemoryLocation> {
    match expr {
        CExpr::Variable { var, .. } => Some(var.location()),
        CExpr::Field { owner, deref: false, .. } => root_variable(owner),
        CExpr::Subscript { array, .. } if matches!(array.ty(), Type::Array { .. }) => root_variable(array),
        _ => None,
    }
}

/// Assignment conversion of a Java value to a primitive target type.
fn java_convert(value: &Value, ty: &Type) -> Value {
    match ty {
        Type::Int(_) | Type::Float(_) => cast_java(value, ty),
        _ => value.clone(),
    }
}
