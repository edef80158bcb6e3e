use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::step::Step;

/// Run history: one [`Step`] per completed tempering position, index 0 being
/// the initial ensemble.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepList {
    steps: Vec<Step>,
}

impl StepList {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the step for the next tempering position.
    pub fn add_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Removes the step at `index`, or the last one when `index` is `None`.
    pub fn pop_step(&mut self, index: Option<usize>) -> Option<Step> {
        match index {
            None => self.steps.pop(),
            Some(index) if index < self.steps.len() => Some(self.steps.remove(index)),
            Some(_) => None,
        }
    }

    /// Drops trailing steps so that at most `len` remain.
    pub fn trim(&mut self, len: usize) {
        self.steps.truncate(len);
    }

    /// Number of recorded positions.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True when nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step at `index`, if recorded.
    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Most recent step.
    pub fn last(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// Iterates over steps in schedule order.
    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }

    /// Marginal likelihood estimate: the product over steps of each step's
    /// unnormalised weight sum.
    pub fn compute_bayes_evidence(&self) -> f64 {
        self.steps
            .iter()
            .map(Step::unnormalized_weight_sum)
            .product()
    }

    /// Logarithm of [`StepList::compute_bayes_evidence`], summed from each
    /// step's log weight sum so that neither a single step nor a long
    /// schedule underflows.
    pub fn log_bayes_evidence(&self) -> f64 {
        self.steps
            .iter()
            .map(Step::log_unnormalized_weight_sum)
            .sum()
    }
}

impl Index<usize> for StepList {
    type Output = Step;

    fn index(&self, index: usize) -> &Step {
        &self.steps[index]
    }
}

impl FromIterator<Step> for StepList {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for StepList {
    type Item = Step;
    type IntoIter = std::vec::IntoIter<Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

impl<'a> IntoIterator for &'a StepList {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
