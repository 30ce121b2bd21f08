//! Collision-free parameter names for merged statements

use crate::tokenizer::PLACEHOLDER_MARKER;

/// Hands out `p0`, `p1`, ... for one accumulated batch.
///
/// Names are never reused while the batch is live; the counter only goes
/// back to zero when the batch is flushed and a new one starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterRenamer {
    stem: String,
    counter: usize,
}

impl ParameterRenamer {
    pub fn new(stem: impl Into<String>) -> Self {
        Self {
            stem: stem.into(),
            counter: 0,
        }
    }

    /// Allocate the next parameter name (without placeholder marker)
    pub fn next_name(&mut self) -> String {
        let name = format!("{}{}", self.stem, self.counter);
        self.counter += 1;
        name
    }

    /// Number of names handed out so far
    pub fn issued(&self) -> usize {
        self.counter
    }
}

/// Placeholder text binding the parameter `name`
pub fn placeholder(name: &str) -> String {
    format!("{PLACEHOLDER_MARKER}{name}")
}
