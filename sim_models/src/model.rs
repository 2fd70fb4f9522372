/**
 * @file model.rs
 * @date 19/10/2026
 * @brief Execution contract shared by every black-box model
 */
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A value attached to a cell by the circuit description.
#[derive(Debug, Clone, PartialEq)]
pub enum Metadata {
    Uint(u64),
    Sint(i64),
    String(String),
    Double(f64),
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metadata::Uint(value) => write!(f, "{value}"),
            Metadata::Sint(value) => write!(f, "{value}"),
            Metadata::String(value) => write!(f, "{value:?}"),
            Metadata::Double(value) => write!(f, "{value}"),
        }
    }
}

pub type MetadataMap = BTreeMap<String, Metadata>;

/// Two-phase, edge driven state update.
///
/// Within one half clock period the kernel calls [`Model::evaluate`] until
/// the whole circuit settles, then [`Model::commit`] exactly once. Evaluation
/// reads the committed state and the inputs and only writes the pending
/// state, so any number of evaluations of the same inputs yield the same
/// pending state.
pub trait Model {
    fn name(&self) -> &str;

    /// Recompute the pending state and outputs. Returns whether an output
    /// would change on commit.
    fn evaluate(&mut self) -> bool;

    /// Make the pending state current. Returns whether anything changed.
    fn commit(&mut self) -> bool;

    /// Power-on state, applied before the first clock tick.
    fn reset(&mut self);
}

/// Construction as requested by the circuit description.
pub trait ModelFactory: Model + Sized {
    fn create(name: &str, parameters: &MetadataMap, attributes: &MetadataMap) -> Self;
}

/// A model shared between its owner and the kernel.
pub type ModelRef<T> = Rc<RefCell<T>>;

pub(crate) fn log_unused_metadata(name: &str, parameters: &MetadataMap, attributes: &MetadataMap) {
    for (key, value) in parameters {
        log::debug!("{name}: ignoring parameter {key} = {value}");
    }
    for (key, value) in attributes {
        log::trace!("{name}: ignoring attribute {key} = {value}");
    }
}
