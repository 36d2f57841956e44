//! The graph: channels, nodes, and the subscriber index the scheduler walks
//! (SPEC_FULL.md §4.3).

mod builder;
mod validate;

pub use builder::GraphBuilder;
pub use validate::{validate, ValidationResult};

use std::collections::HashMap;

use crate::channel::Channel;
use crate::node::Node;

/// A built, validated (or validatable) graph: the static description the
/// scheduler executes supersteps against.
pub struct Graph {
    pub(crate) name: String,
    pub(crate) nodes: HashMap<String, Node>,
    pub(crate) channels: HashMap<String, Box<dyn Channel>>,
    pub(crate) input_channels: Vec<String>,
    pub(crate) output_channels: Vec<String>,
    pub(crate) halt_channel: Option<String>,
    /// channel name -> names of nodes subscribing to it, precomputed at build time.
    pub(crate) subscribers: HashMap<String, Vec<String>>,
}

impl Graph {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &String> {
        self.channels.keys()
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn input_channels(&self) -> &[String] {
        &self.input_channels
    }

    pub fn output_channels(&self) -> &[String] {
        &self.output_channels
    }

    pub fn halt_channel(&self) -> Option<&str> {
        self.halt_channel.as_deref()
    }

    /// Nodes subscribing to `channel`, in no particular order (the scheduler
    /// re-sorts into a `BTreeSet` before firing).
    pub fn subscribers_of(&self, channel: &str) -> &[String] {
        self.subscribers
            .get(channel)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// A fully independent copy of every channel, used to seed a scheduler
    /// run (or to fork execution from a checkpoint) without aliasing state.
    pub fn deep_copy_channels(&self) -> HashMap<String, Box<dyn Channel>> {
        self.channels
            .iter()
            .map(|(name, chan)| (name.clone(), chan.copy()))
            .collect()
    }
}
