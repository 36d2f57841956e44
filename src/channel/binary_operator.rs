//! `BinaryOperator`: folds each update batch through an associative reducer.

use std::sync::Arc;

use serde_json::Value;

use super::{check_batch_types, Channel};
use crate::error::EngineError;
use crate::value::ValueType;

/// User-supplied associative reducer `(T, T) -> T`. May fail (e.g. a
/// type-checked numeric add receiving incompatible operands).
pub type Reducer = Arc<dyn Fn(Value, Value) -> Result<Value, String> + Send + Sync>;

/// Reduces each batch left-to-right through `reducer`, seeded with the
/// channel's current value (or the batch's first element if empty).
#[derive(Clone)]
pub struct BinaryOperator {
    name: String,
    value_type: ValueType,
    reducer: Reducer,
    value: Option<Value>,
    version: u64,
}

impl BinaryOperator {
    pub fn new(name: impl Into<String>, value_type: ValueType, reducer: Reducer) -> Self {
        Self {
            name: name.into(),
            value_type,
            reducer,
            value: None,
            version: 0,
        }
    }
}

impl Channel for BinaryOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn value_type(&self) -> ValueType {
        self.value_type
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn update(&mut self, batch: &[Value]) -> Result<bool, EngineError> {
        if batch.is_empty() {
            return Ok(false);
        }
        if let Err(i) = check_batch_types(self.value_type, batch) {
            return Err(EngineError::invalid_update(
                &self.name,
                format!(
                    "element {i} is not assignable to declared type '{}'",
                    self.value_type.name()
                ),
            ));
        }

        let mut iter = batch.iter().cloned();
        let mut acc = match self.value.clone() {
            Some(v) => v,
            None => iter.next().expect("batch is non-empty"),
        };
        for next in iter {
            acc = (self.reducer)(acc, next).map_err(|reason| {
                EngineError::invalid_update(&self.name, format!("reducer failed: {reason}"))
            })?;
        }

        let changed = self.value.as_ref() != Some(&acc);
        self.value = Some(acc);
        if changed {
            self.version += 1;
        }
        Ok(changed)
    }

    fn get(&mut self) -> Result<Value, EngineError> {
        self.value
            .clone()
            .ok_or_else(|| EngineError::empty_channel(&self.name))
    }

    fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    fn clear(&mut self) {
        self.value = None;
        self.version += 1;
    }

    fn checkpoint(&self) -> Result<Value, EngineError> {
        // Checkpointable when empty: Null is a distinguishable sentinel
        // the reducer never otherwise produces from non-null inputs of a
        // declared type, since `accepts` already rejects null-typed batches
        // unless value_type is Null/Any.
        Ok(self.value.clone().unwrap_or(Value::Null))
    }

    fn from_checkpoint(&self, state: &Value) -> Result<Box<dyn Channel>, EngineError> {
        let value = if state.is_null() { None } else { Some(state.clone()) };
        Ok(Box::new(Self {
            name: self.name.clone(),
            value_type: self.value_type,
            reducer: self.reducer.clone(),
            value,
            version: 0,
        }))
    }

    fn copy(&self) -> Box<dyn Channel> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sum_reducer() -> Reducer {
        Arc::new(|a, b| {
            let (a, b) = (
                a.as_i64().ok_or("left operand not a number")?,
                b.as_i64().ok_or("right operand not a number")?,
            );
            Ok(json!(a + b))
        })
    }

    /// **Scenario**: fold a batch left-to-right, seeded with current value.
    #[test]
    fn folds_batch_seeded_with_current_value() {
        let mut c = BinaryOperator::new("acc", ValueType::Number, sum_reducer());
        c.update(&[json!(1), json!(2), json!(3)]).unwrap();
        assert_eq!(c.get().unwrap(), json!(6));
        c.update(&[json!(4)]).unwrap();
        assert_eq!(c.get().unwrap(), json!(10));
    }

    /// **Scenario**: first update seeds from the batch's first element (no prior value).
    #[test]
    fn first_update_seeds_from_batch() {
        let mut c = BinaryOperator::new("acc", ValueType::Number, sum_reducer());
        c.update(&[json!(5)]).unwrap();
        assert_eq!(c.get().unwrap(), json!(5));
    }

    /// **Scenario**: reducer failure surfaces as InvalidUpdate.
    #[test]
    fn reducer_failure_is_invalid_update() {
        let mut c = BinaryOperator::new("acc", ValueType::Any, sum_reducer());
        let err = c.update(&[json!(1), json!("not a number")]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidUpdate { .. }));
    }

    /// **Scenario**: checkpoint/restore round-trips the accumulated value.
    #[test]
    fn checkpoint_round_trip() {
        let mut c = BinaryOperator::new("acc", ValueType::Number, sum_reducer());
        c.update(&[json!(1), json!(2)]).unwrap();
        let state = c.checkpoint().unwrap();
        let mut restored = c.from_checkpoint(&state).unwrap();
        assert_eq!(restored.get().unwrap(), json!(3));
    }

    /// **Scenario**: an empty BinaryOperator is checkpointable as Null.
    #[test]
    fn empty_is_checkpointable_as_null() {
        let c = BinaryOperator::new("acc", ValueType::Number, sum_reducer());
        assert_eq!(c.checkpoint().unwrap(), Value::Null);
    }

    /// **P2**: copy() is independent of subsequent updates.
    #[test]
    fn copy_is_independent() {
        let mut c = BinaryOperator::new("acc", ValueType::Number, sum_reducer());
        c.update(&[json!(1)]).unwrap();
        let mut c2 = c.copy();
        c.update(&[json!(10)]).unwrap();
        assert_eq!(c2.get().unwrap(), json!(1));
    }
}
