//! Channels: typed value containers with a prescribed update semantics.
//!
//! Four variants share one object-safe `Channel` trait (`Box<dyn Channel>`)
//! instead of a virtual inheritance tree (see SPEC_FULL.md §9/REDESIGN FLAGS):
//! [`LastValue`], [`Topic`], [`BinaryOperator`], [`Ephemeral`].

mod binary_operator;
mod ephemeral;
mod last_value;
mod topic;

pub use binary_operator::{BinaryOperator, Reducer};
pub use ephemeral::Ephemeral;
pub use last_value::LastValue;
pub use topic::Topic;

use serde_json::Value;

use crate::error::EngineError;
use crate::value::ValueType;

/// Uniform contract across all channel variants (SPEC_FULL.md §4.1).
///
/// Implementations are not required to be `Clone` (checkpoint/copy already
/// cover the two cases that matter), but must be safe to share across the
/// fire phase's concurrent reads, hence `Send + Sync`.
pub trait Channel: Send + Sync {
    /// The channel's name, fixed at construction.
    fn name(&self) -> &str;

    /// The declared element type, used to validate every `update` batch.
    fn value_type(&self) -> ValueType;

    /// Monotonic version counter, incremented on every committed change
    /// (including `clear()`).
    fn version(&self) -> u64;

    /// Applies an ordered batch of proposed values. Returns `Ok(true)` iff
    /// the channel's observable state changed.
    fn update(&mut self, batch: &[Value]) -> Result<bool, EngineError>;

    /// Returns the current value, or `EmptyChannel` if nothing is stored.
    /// `Ephemeral` additionally clears itself on a successful read.
    fn get(&mut self) -> Result<Value, EngineError>;

    /// True if the channel has never been updated since construction/clear,
    /// or (for `Ephemeral`) has already been consumed.
    fn is_empty(&self) -> bool;

    /// Resets to empty, preserving identity and element type. Increments
    /// the version.
    fn clear(&mut self);

    /// Serializable state sufficient to reconstruct equivalent contents via
    /// `from_checkpoint`. Fails with `EmptyChannel` unless the variant
    /// declares itself checkpointable-when-empty.
    fn checkpoint(&self) -> Result<Value, EngineError>;

    /// Builds a NEW channel of the same variant/name/type from `state`,
    /// leaving `self` untouched.
    fn from_checkpoint(&self, state: &Value) -> Result<Box<dyn Channel>, EngineError>;

    /// Deep-copies the channel: new instance, equal observable state.
    fn copy(&self) -> Box<dyn Channel>;
}

/// Shared helper: does `value_type` accept every non-null element of `batch`?
/// Returns the first offending value's index on failure.
pub(crate) fn check_batch_types(value_type: ValueType, batch: &[Value]) -> Result<(), usize> {
    for (i, v) in batch.iter().enumerate() {
        if !value_type.accepts(v) {
            return Err(i);
        }
    }
    Ok(())
}
