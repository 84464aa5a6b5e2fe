use crate::error::StackError;
use crate::value::Value;
use std::collections::HashMap;

/// Independent LIFO lanes of values, keyed by name.
///
/// Lanes are created on first push. Popping or peeking a lane that was never
/// pushed to, or has been drained, is an [`StackError::Empty`].
#[derive(Debug, Default)]
pub struct MultiStack {
    lanes: HashMap<String, Vec<Value>>,
}

impl MultiStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, lane: &str, value: Value) {
        match self.lanes.get_mut(lane) {
            Some(values) => values.push(value),
            None => {
                self.lanes.insert(lane.to_string(), vec![value]);
            }
        }
    }

    pub fn pop(&mut self, lane: &str) -> Result<Value, StackError> {
        self.lanes
            .get_mut(lane)
            .and_then(Vec::pop)
            .ok_or_else(|| empty(lane))
    }

    pub fn peek(&self, lane: &str) -> Result<&Value, StackError> {
        self.lanes
            .get(lane)
            .and_then(|values| values.last())
            .ok_or_else(|| empty(lane))
    }

    pub fn is_empty(&self, lane: &str) -> bool {
        self.lanes.get(lane).map_or(true, Vec::is_empty)
    }

    pub fn len(&self, lane: &str) -> usize {
        self.lanes.get(lane).map_or(0, Vec::len)
    }

    /// Empties a lane and returns its values bottom first.
    pub fn drain(&mut self, lane: &str) -> Vec<Value> {
        self.lanes
            .get_mut(lane)
            .map(std::mem::take)
            .unwrap_or_default()
    }
}

fn empty(lane: &str) -> StackError {
    StackError::Empty {
        lane: lane.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lanes_are_independent() {
        let mut stack = MultiStack::new();
        stack.push("a", Value::from(1));
        stack.push("b", Value::from(2));
        stack.push("a", Value::from(3));

        assert_eq!(stack.peek("a").unwrap(), &Value::from(3));
        assert_eq!(stack.len("a"), 2);
        assert_eq!(stack.pop("b").unwrap(), Value::from(2));
        assert!(stack.is_empty("b"));
        assert_eq!(stack.pop("a").unwrap(), Value::from(3));
        assert_eq!(stack.pop("a").unwrap(), Value::from(1));
    }

    #[test]
    fn absent_or_drained_lane_is_empty() {
        let mut stack = MultiStack::new();
        assert_eq!(stack.pop("missing"), Err(StackError::Empty { lane: "missing".into() }));
        assert!(stack.peek("missing").is_err());

        stack.push("x", Value::Null);
        stack.pop("x").unwrap();
        assert!(matches!(stack.pop("x"), Err(StackError::Empty { .. })));
    }

    #[test]
    fn drain_returns_bottom_first() {
        let mut stack = MultiStack::new();
        stack.push("echo", Value::from("a"));
        stack.push("echo", Value::from("b"));
        assert_eq!(stack.drain("echo"), vec![Value::from("a"), Value::from("b")]);
        assert!(stack.is_empty("echo"));
        assert!(stack.drain("never").is_empty());
    }
}
