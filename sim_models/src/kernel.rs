//! A minimal settle/commit loop.
//!
//! This is a stand-in for the simulation kernel that normally steps the
//! generated circuit. Models are attached as shared handles; the circuit side
//! is represented by a propagation callback that copies signals between
//! models (and any logic of the caller) and reports whether it changed
//! anything.

use crate::common::MAX_SETTLE_ITERATIONS;
use crate::model::{Model, ModelRef};
use std::cell::RefCell;
use std::rc::Rc;

/// Outcome of one half step.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Settle {
    /// Evaluation rounds run before the circuit stopped changing.
    pub iterations: usize,
    pub converged: bool,
    /// Whether any model reported a change on commit.
    pub committed: bool,
}

pub struct Kernel {
    models: Vec<Rc<RefCell<dyn Model>>>,
    half_steps: u64,
    max_settle: usize,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel {
    pub fn new() -> Self {
        Self {
            models: Vec::new(),
            half_steps: 0,
            max_settle: MAX_SETTLE_ITERATIONS,
        }
    }

    pub fn with_settle_limit(mut self, max_settle: usize) -> Self {
        assert!(max_settle > 0);
        self.max_settle = max_settle;
        self
    }

    /// Track a model. The caller keeps its own handle for configuration.
    pub fn attach<T>(&mut self, model: &ModelRef<T>)
    where
        T: Model + 'static,
    {
        self.models.push(model.clone());
    }

    pub fn half_steps(&self) -> u64 {
        self.half_steps
    }

    pub fn reset(&mut self) {
        for model in self.models.iter() {
            model.borrow_mut().reset();
        }
        self.half_steps = 0;
    }

    /// Advance one half clock period: settle, then commit every model once.
    pub fn step<F>(&mut self, mut propagate: F) -> Settle
    where
        F: FnMut() -> bool,
    {
        let mut settle = Settle::default();

        while settle.iterations < self.max_settle {
            settle.iterations += 1;

            let mut changed = propagate();
            for model in self.models.iter() {
                changed |= model.borrow_mut().evaluate();
            }

            if !changed {
                settle.converged = true;
                break;
            }
        }

        if !settle.converged {
            log::warn!(
                "Half step {} did not settle after {} rounds",
                self.half_steps,
                settle.iterations
            );
        }

        for model in self.models.iter() {
            settle.committed |= model.borrow_mut().commit();
        }

        self.half_steps += 1;
        settle
    }
}
