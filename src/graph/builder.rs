//! `GraphBuilder`: fluent graph assembly, mirroring this codebase's
//! `StateGraph` builder (add_node/add_edge/compile).

use std::collections::HashMap;

use crate::channel::{Channel, LastValue};
use crate::error::EngineError;
use crate::node::Node;
use crate::value::ValueType;

use super::{validate, Graph};

/// Fluent builder for a `Graph`. Channels and nodes may be added in any
/// order; `build()` computes the subscriber index and runs the validator.
#[derive(Default)]
pub struct GraphBuilder {
    name: String,
    nodes: HashMap<String, Node>,
    channels: HashMap<String, Box<dyn Channel>>,
    input_channels: Vec<String>,
    output_channels: Vec<String>,
    halt_channel: Option<String>,
    auto_create_channels: bool,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_channel(mut self, channel: Box<dyn Channel>) -> Self {
        self.channels.insert(channel.name().to_string(), channel);
        self
    }

    pub fn add_node(mut self, node: Node) -> Self {
        self.nodes.insert(node.name().to_string(), node);
        self
    }

    pub fn add_input_channel(mut self, channel: impl Into<String>) -> Self {
        self.input_channels.push(channel.into());
        self
    }

    pub fn add_output_channel(mut self, channel: impl Into<String>) -> Self {
        self.output_channels.push(channel.into());
        self
    }

    /// Designates a boolean-ish channel whose truthy value halts the run
    /// even if other channels remain pending.
    pub fn with_halt_channel(mut self, channel: impl Into<String>) -> Self {
        self.halt_channel = Some(channel.into());
        self
    }

    /// When enabled, any channel name referenced by a node's subscribe/read/
    /// write set (or by an input/output/halt declaration) but never added via
    /// `add_channel` is synthesized as a `LastValue<Any>` channel instead of
    /// failing validation (SPEC_FULL.md §9).
    pub fn with_auto_create_channels(mut self, enabled: bool) -> Self {
        self.auto_create_channels = enabled;
        self
    }

    /// Builds and validates the graph, failing on any validation error
    /// (warnings, e.g. detected cycles, do not block the build).
    pub fn build(mut self) -> Result<Graph, EngineError> {
        if self.auto_create_channels {
            self.materialize_referenced_channels();
        }

        let mut subscribers: HashMap<String, Vec<String>> = HashMap::new();
        for node in self.nodes.values() {
            for channel in node.subscribe() {
                subscribers
                    .entry(channel.clone())
                    .or_default()
                    .push(node.name().to_string());
            }
        }

        let graph = Graph {
            name: self.name,
            nodes: self.nodes,
            channels: self.channels,
            input_channels: self.input_channels,
            output_channels: self.output_channels,
            halt_channel: self.halt_channel,
            subscribers,
        };

        let result = validate(&graph);
        if !result.errors.is_empty() {
            return Err(EngineError::graph_validation(result.errors));
        }
        Ok(graph)
    }

    fn materialize_referenced_channels(&mut self) {
        let mut referenced: Vec<String> = Vec::new();
        for node in self.nodes.values() {
            referenced.extend(node.subscribe().iter().cloned());
            referenced.extend(node.read_set().iter().cloned());
            referenced.extend(node.write_set().iter().cloned());
        }
        referenced.extend(self.input_channels.iter().cloned());
        referenced.extend(self.output_channels.iter().cloned());
        referenced.extend(self.halt_channel.iter().cloned());

        for name in referenced {
            self.channels
                .entry(name.clone())
                .or_insert_with(|| Box::new(LastValue::new(name, ValueType::Any)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::LastValue;
    use crate::node::{NodeInput, NodeOutput};
    use crate::value::ValueType;

    /// **Scenario**: a minimal valid graph builds successfully.
    #[test]
    fn builds_minimal_valid_graph() {
        let graph = GraphBuilder::new("g")
            .add_channel(Box::new(LastValue::new("input", ValueType::String)))
            .add_channel(Box::new(LastValue::new("output", ValueType::String)))
            .add_node(Node::new(
                "process",
                vec!["input".into()],
                vec!["input".into()],
                vec!["output".into()],
                |input: NodeInput| async move { Ok(NodeOutput::Single(input.as_single().unwrap().clone())) },
            ))
            .add_input_channel("input")
            .add_output_channel("output")
            .build();
        assert!(graph.is_ok());
    }

    /// **Scenario**: a node subscribing to an undeclared channel fails validation.
    #[test]
    fn build_fails_on_undeclared_channel() {
        let result = GraphBuilder::new("g")
            .add_node(Node::new(
                "process",
                vec!["missing".into()],
                vec!["missing".into()],
                vec![],
                |input: NodeInput| async move { Ok(NodeOutput::Single(input.as_single().unwrap().clone())) },
            ))
            .build();
        assert!(matches!(
            result.unwrap_err(),
            EngineError::GraphValidation { .. }
        ));
    }

    /// **Scenario**: with auto-create enabled, a node referencing an
    /// undeclared channel gets a synthesized `LastValue<Any>` instead of
    /// failing validation.
    #[test]
    fn auto_create_channels_materializes_missing_channel() {
        let graph = GraphBuilder::new("g")
            .add_node(Node::new(
                "process",
                vec!["missing".into()],
                vec!["missing".into()],
                vec!["missing_out".into()],
                |input: NodeInput| async move { Ok(NodeOutput::Single(input.as_single().unwrap().clone())) },
            ))
            .with_auto_create_channels(true)
            .build()
            .unwrap();
        assert!(graph.has_channel("missing"));
        assert!(graph.has_channel("missing_out"));
    }
}
