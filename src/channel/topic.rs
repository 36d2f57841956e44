//! `Topic`: pub-sub list channel with accumulate and dedup variants.

use serde_json::Value;

use super::{check_batch_types, Channel};
use crate::error::EngineError;
use crate::value::ValueType;

/// List-valued channel. `accumulate=true` concatenates each batch onto the
/// existing list; `accumulate=false` replaces it with the latest batch.
/// `unique=true` additionally deduplicates while preserving first-seen order.
pub struct Topic {
    name: String,
    value_type: ValueType,
    accumulate: bool,
    unique: bool,
    values: Vec<Value>,
    has_value: bool,
    version: u64,
}

impl Topic {
    pub fn new(name: impl Into<String>, value_type: ValueType, accumulate: bool, unique: bool) -> Self {
        Self {
            name: name.into(),
            value_type,
            accumulate,
            unique,
            values: Vec::new(),
            has_value: false,
            version: 0,
        }
    }

    fn dedup_preserving_order(values: Vec<Value>) -> Vec<Value> {
        let mut seen = Vec::new();
        let mut out = Vec::new();
        for v in values {
            if !seen.contains(&v) {
                seen.push(v.clone());
                out.push(v);
            }
        }
        out
    }
}

impl Channel for Topic {
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

        let before = self.values.clone();

        if self.accumulate {
            self.values.extend(batch.iter().cloned());
        } else {
            self.values = batch.to_vec();
        }
        if self.unique {
            self.values = Self::dedup_preserving_order(std::mem::take(&mut self.values));
        }
        self.has_value = true;

        let changed = self.values != before;
        if changed {
            self.version += 1;
        }
        Ok(changed)
    }

    fn get(&mut self) -> Result<Value, EngineError> {
        if !self.has_value {
            return Err(EngineError::empty_channel(&self.name));
        }
        Ok(Value::Array(self.values.clone()))
    }

    fn is_empty(&self) -> bool {
        !self.has_value
    }

    fn clear(&mut self) {
        self.values.clear();
        self.has_value = false;
        self.version += 1;
    }

    fn checkpoint(&self) -> Result<Value, EngineError> {
        // Checkpointable when empty. `has_value` is persisted alongside the
        // list rather than inferred from its length, since `update(&[])` on
        // an accumulate topic reaches `has_value=true, values=[]` — a state
        // indistinguishable from "never written" if only the list survived
        // the round-trip (P1, §8).
        Ok(serde_json::json!({
            "values": self.values,
            "has_value": self.has_value,
        }))
    }

    fn from_checkpoint(&self, state: &Value) -> Result<Box<dyn Channel>, EngineError> {
        let bad_state = || {
            EngineError::checkpoint(format!(
                "Topic checkpoint state for '{}' must be a {{values, has_value}} object",
                self.name
            ))
        };
        let values = state
            .get("values")
            .and_then(Value::as_array)
            .ok_or_else(bad_state)?
            .clone();
        let has_value = state
            .get("has_value")
            .and_then(Value::as_bool)
            .ok_or_else(bad_state)?;
        Ok(Box::new(Self {
            name: self.name.clone(),
            value_type: self.value_type,
            accumulate: self.accumulate,
            unique: self.unique,
            has_value,
            values,
            version: 0,
        }))
    }

    fn copy(&self) -> Box<dyn Channel> {
        Box::new(Self {
            name: self.name.clone(),
            value_type: self.value_type,
            accumulate: self.accumulate,
            unique: self.unique,
            values: self.values.clone(),
            has_value: self.has_value,
            version: self.version,
        })
    }
}
