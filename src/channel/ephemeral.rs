//! `Ephemeral`: consume-on-read channel for one-shot signals.

use serde_json::Value;

use super::{check_batch_types, Channel};
use crate::error::EngineError;
use crate::value::ValueType;

/// Stores the latest non-null write; the first `get()` after a write clears it.
pub struct Ephemeral {
    name: String,
    value_type: ValueType,
    value: Option<Value>,
    version: u64,
}

impl Ephemeral {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            value: None,
            version: 0,
        }
    }
}

impl Channel for Ephemeral {
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
        if let Err(i) = check_batch_types(self.value_type, batch) {
            return Err(EngineError::invalid_update(
                &self.name,
                format!(
                    "element {i} is not assignable to declared type '{}'",
                    self.value_type.name()
                ),
            ));
        }
        let Some(last_non_null) = batch.iter().rev().find(|v| !v.is_null()) else {
            return Ok(false);
        };
        let changed = self.value.as_ref() != Some(last_non_null);
        self.value = Some(last_non_null.clone());
        self.version += 1;
        Ok(changed)
    }

    fn get(&mut self) -> Result<Value, EngineError> {
        match self.value.take() {
            Some(v) => Ok(v),
            None => Err(EngineError::empty_channel(&self.name)),
        }
    }

    fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    fn clear(&mut self) {
        self.value = None;
        self.version += 1;
    }

    fn checkpoint(&self) -> Result<Value, EngineError> {
        self.value
            .clone()
            .ok_or_else(|| EngineError::empty_channel(&self.name))
    }

    fn from_checkpoint(&self, state: &Value) -> Result<Box<dyn Channel>, EngineError> {
        Ok(Box::new(Self {
            name: self.name.clone(),
            value_type: self.value_type,
            value: Some(state.clone()),
            version: 0,
        }))
    }

    fn copy(&self) -> Box<dyn Channel> {
        Box::new(Self {
            name: self.name.clone(),
            value_type: self.value_type,
            value: self.value.clone(),
            version: self.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// **Scenario**: the first read after a write returns the value, then empties.
    #[test]
    fn consume_on_read() {
        let mut c = Ephemeral::new("sig", ValueType::String);
        c.update(&[json!("go")]).unwrap();
        assert_eq!(c.get().unwrap(), json!("go"));
        assert!(c.is_empty());
        assert!(matches!(c.get().unwrap_err(), EngineError::EmptyChannel { .. }));
    }

    /// **Scenario**: within a batch, only the last non-null element is kept.
    #[test]
    fn keeps_last_non_null_element() {
        let mut c = Ephemeral::new("sig", ValueType::String);
        c.update(&[json!("a"), Value::Null, json!("b")]).unwrap();
        assert_eq!(c.get().unwrap(), json!("b"));
    }

    /// **P2**: copy() is independent; copying after a write does not consume the original.
    #[test]
    fn copy_is_independent_and_does_not_consume() {
        let mut c = Ephemeral::new("sig", ValueType::String);
        c.update(&[json!("go")]).unwrap();
        let mut c2 = c.copy();
        assert_eq!(c2.get().unwrap(), json!("go"));
        assert_eq!(c.get().unwrap(), json!("go"));
    }

    /// **Scenario**: checkpoint on empty fails with EmptyChannel (not checkpointable when empty).
    #[test]
    fn checkpoint_on_empty_fails() {
        let c = Ephemeral::new("sig", ValueType::String);
        assert!(matches!(
            c.checkpoint().unwrap_err(),
            EngineError::EmptyChannel { .. }
        ));
    }
}
