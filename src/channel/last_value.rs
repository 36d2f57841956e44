//! `LastValue`: at most one non-null element per batch, replaces prior value.

use serde_json::Value;

use super::{check_batch_types, Channel};
use crate::error::EngineError;
use crate::value::ValueType;

/// Overwrite-on-update channel. Rejects batches with more than one non-null
/// element; a pure-null batch is a no-op.
pub struct LastValue {
    name: String,
    value_type: ValueType,
    value: Option<Value>,
    version: u64,
}

impl LastValue {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            value: None,
            version: 0,
        }
    }
}

impl Channel for LastValue {
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

        let non_null: Vec<&Value> = batch.iter().filter(|v| !v.is_null()).collect();
        if non_null.len() > 1 {
            return Err(EngineError::invalid_update(
                &self.name,
                format!(
                    "LastValue accepts at most one non-null element per batch, got multiple ({})",
                    non_null.len()
                ),
            ));
        }
        let Some(new_value) = non_null.into_iter().next() else {
            // Pure-null (or empty) batch: not updated.
            return Ok(false);
        };

        let changed = self.value.as_ref() != Some(new_value);
        self.value = Some(new_value.clone());
        self.version += 1;
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
