//! Analysis options.
//!
//! # Examples
//!
//! ```
//! use value_analysis::config::{AbstractionPoints, ValueAnalysisConfig};
//!
//! let config = ValueAnalysisConfig {
//!     abstraction: AbstractionPoints::LoopHeads,
//!     path_threshold: Some(10),
//!     ..ValueAnalysisConfig::default()
//! };
//! assert!(!config.symbolic_values);
//! ```

use std::sync::Arc;

use regex::Regex;

use crate::cfa::CfaNode;
use crate::classification::VariableClassification;
use crate::error::AnalysisError;
use crate::precision::{AllowList, PrecisionFilter, Thresholds, ValuePrecision};

/// Nodes at which the precision is applied to the state.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum AbstractionPoints {
    /// After every edge.
    #[default]
    Always,
    LoopHeads,
    LoopHeadsAndFunctionBoundaries,
    /// Never abstract (thresholds still apply).
    Never,
}

impl AbstractionPoints {
    pub fn is_abstraction_point(self, node: &CfaNode) -> bool {
        match self {
            AbstractionPoints::Always => true,
            AbstractionPoints::LoopHeads => node.loop_head,
            AbstractionPoints::LoopHeadsAndFunctionBoundaries => {
                node.loop_head || node.function_entry || node.function_exit
            }
            AbstractionPoints::Never => false,
        }
    }
}

/// Options of the transfer relation and the precision adjustment.
#[derive(Debug, Clone)]
pub struct ValueAnalysisConfig {
    /// Represent unknown values by symbolic identifiers instead of dropping them (default: false)
    pub symbolic_values: bool,
    /// On `x != 0` for a boolean variable `x`, conclude `x == 1` (default: true)
    pub optimize_boolean_variables: bool,
    /// Zero-initialise C globals declared without initializer (default: true)
    pub initialize_globals: bool,
    /// Narrow variables seen through casts, when the casts are invertible (default: true)
    pub narrow_through_casts: bool,
    /// Where the precision is applied (default: `Always`)
    pub abstraction: AbstractionPoints,
    /// Forget a variable at a node once it took more than this many distinct
    /// values there (default: off)
    pub reached_set_threshold: Option<usize>,
    /// Forget a variable once it was assigned more than this many times along
    /// the current path (default: off)
    pub path_threshold: Option<usize>,
}

impl Default for ValueAnalysisConfig {
    fn default() -> Self {
        Self {
            symbolic_values: false,
            optimize_boolean_variables: true,
            initialize_globals: true,
            narrow_through_casts: true,
            abstraction: AbstractionPoints::Always,
            reached_set_threshold: None,
            path_threshold: None,
        }
    }
}

/// Shape of the allow-list at the start of the analysis.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum InitialAllowList {
    /// Track everything until the first refinement.
    #[default]
    Full,
    /// One set of variables, valid at every node.
    Scoped,
    /// Variables per node.
    Localized,
}

/// Static filters of the precision.
#[derive(Debug, Clone)]
pub struct PrecisionConfig {
    /// Variables whose qualified name matches are never tracked (default: none)
    pub blacklist: Option<String>,
    /// Track variables classified as boolean (default: true)
    pub track_boolean: bool,
    /// Track variables only compared for equality (default: true)
    pub track_int_equal: bool,
    /// Track variables only added and compared (default: true)
    pub track_int_add: bool,
    /// Track variables in none of the classes above (default: true)
    pub track_other: bool,
    /// Allow-list shape (default: `Full`)
    pub initial: InitialAllowList,
}

impl Default for PrecisionConfig {
    fn default() -> Self {
        Self {
            blacklist: None,
            track_boolean: true,
            track_int_equal: true,
            track_int_add: true,
            track_other: true,
            initial: InitialAllowList::Full,
        }
    }
}

impl ValueAnalysisConfig {
    /// The precision the analysis starts with.
    pub fn initial_precision(
        &self,
        precision: &PrecisionConfig,
        classification: Option<Arc<dyn VariableClassification>>,
    ) -> Result<Arc<ValuePrecision>, AnalysisError> {
        let blacklist = match &precision.blacklist {
            Some(pattern) => Some(Regex::new(pattern).map_err(|e| AnalysisError::InvalidPrecision {
                line: 0,
                message: format!("invalid blacklist pattern: {}", e),
            })?),
            None => None,
        };
        let filter = PrecisionFilter {
            blacklist,
            classification,
            track_boolean: precision.track_boolean,
            track_int_equal: precision.track_int_equal,
            track_int_add: precision.track_int_add,
            track_other: precision.track_other,
        };
        let allow_list = match precision.initial {
            InitialAllowList::Full => AllowList::Full,
            InitialAllowList::Scoped => AllowList::scoped_empty(),
            InitialAllowList::Localized => AllowList::localized_empty(),
        };
        let thresholds = Thresholds {
            reached_set: self.reached_set_threshold,
            path: self.path_threshold,
        };
        Ok(Arc::new(ValuePrecision::new(allow_list, filter, thresholds)))
    }
}
