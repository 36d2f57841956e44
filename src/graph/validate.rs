//! Structural graph validation, run by `GraphBuilder::build`.

use std::collections::{HashMap, HashSet};

use super::Graph;

/// Errors block `build()`; warnings (e.g. a detected cycle) are informational
/// since cyclic graphs are a normal Pregel shape, not a defect.
#[derive(Debug, Default, Clone)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the five structural checks named in SPEC_FULL.md §4.3:
/// 1. no orphan nodes (empty subscribe set)
/// 2. every channel a node references (subscribe/read/write) exists
/// 3. every declared output channel has a writer
/// 4. every declared input channel exists and has at least one subscriber
/// 5. cycles among nodes are reported as warnings, not errors
pub fn validate(graph: &Graph) -> ValidationResult {
    let mut result = ValidationResult::default();

    for node in graph.nodes() {
        if node.subscribe().is_empty() {
            result
                .errors
                .push(format!("node '{}' is an orphan: empty subscribe set", node.name()));
        }
        for channel in node
            .subscribe()
            .iter()
            .chain(node.read_set())
            .chain(node.write_set())
        {
            if !graph.has_channel(channel) {
                result.errors.push(format!(
                    "node '{}' references undeclared channel '{}'",
                    node.name(),
                    channel
                ));
            }
        }
    }

    let mut written: HashSet<&str> = HashSet::new();
    for node in graph.nodes() {
        for channel in node.write_set() {
            written.insert(channel.as_str());
        }
    }
    let input_channels: HashSet<&str> = graph.input_channels().iter().map(String::as_str).collect();
    for output in graph.output_channels() {
        if !graph.has_channel(output) {
            result
                .errors
                .push(format!("declared output channel '{output}' does not exist"));
        } else if !written.contains(output.as_str()) && !input_channels.contains(output.as_str()) {
            result
                .errors
                .push(format!("declared output channel '{output}' has no writer"));
        }
    }

    for input in graph.input_channels() {
        if !graph.has_channel(input) {
            result
                .errors
                .push(format!("declared input channel '{input}' does not exist"));
        } else if graph.subscribers_of(input).is_empty() {
            result
                .errors
                .push(format!("declared input channel '{input}' has no subscribers"));
        }
    }

    if let Some(halt) = graph.halt_channel() {
        if !graph.has_channel(halt) {
            result
                .errors
                .push(format!("halt channel '{halt}' does not exist"));
        }
    }

    if result.errors.is_empty() {
        if let Some(cycle) = find_cycle(graph) {
            result
                .warnings
                .push(format!("graph contains a cycle: {}", cycle.join(" -> ")));
        }
    }

    result
}

/// node -> node edges via shared channels (A writes X, B subscribes to X).
fn build_node_graph(graph: &Graph) -> HashMap<&str, Vec<&str>> {
    let mut channel_to_writers: HashMap<&str, Vec<&str>> = HashMap::new();
    for node in graph.nodes() {
        for channel in node.write_set() {
            channel_to_writers
                .entry(channel.as_str())
                .or_default()
                .push(node.name());
        }
    }

    let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
    for node in graph.nodes() {
        let entry = edges.entry(node.name()).or_default();
        for channel in node.subscribe() {
            if let Some(writers) = channel_to_writers.get(channel.as_str()) {
                for writer in writers {
                    entry.push(writer);
                }
            }
        }
    }
    edges
}

fn find_cycle(graph: &Graph) -> Option<Vec<String>> {
    let edges = build_node_graph(graph);
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = Vec::new();
    let mut on_stack: HashSet<&str> = HashSet::new();

    for &start in edges.keys() {
        if visited.contains(start) {
            continue;
        }
        if let Some(cycle) = dfs(start, &edges, &mut visited, &mut stack, &mut on_stack) {
            return Some(cycle.into_iter().map(String::from).collect());
        }
    }
    None
}

fn dfs<'a>(
    node: &'a str,
    edges: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    stack: &mut Vec<&'a str>,
    on_stack: &mut HashSet<&'a str>,
) -> Option<Vec<&'a str>> {
    visited.insert(node);
    stack.push(node);
    on_stack.insert(node);

    if let Some(next_nodes) = edges.get(node) {
        for &next in next_nodes {
            if on_stack.contains(next) {
                let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                let mut cycle: Vec<&str> = stack[start..].to_vec();
                cycle.push(next);
                return Some(cycle);
            }
            if !visited.contains(next) {
                if let Some(cycle) = dfs(next, edges, visited, stack, on_stack) {
                    return Some(cycle);
                }
            }
        }
    }

    stack.pop();
    on_stack.remove(node);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::LastValue;
    use crate::graph::GraphBuilder;
    use crate::node::{NodeInput, NodeOutput};
    use crate::value::ValueType;

    fn passthrough(name: &str, subscribe: &str, write: &str) -> crate::node::Node {
        crate::node::Node::new(
            name.to_string(),
            vec![subscribe.to_string()],
            vec![subscribe.to_string()],
            vec![write.to_string()],
            |input: NodeInput| async move { Ok(NodeOutput::Single(input.as_single().unwrap().clone())) },
        )
    }

    /// **Scenario**: an output channel with no writer is flagged.
    #[test]
    fn unreachable_output_is_an_error() {
        let mut builder = GraphBuilder::new("g")
            .add_channel(Box::new(LastValue::new("input", ValueType::String)))
            .add_channel(Box::new(LastValue::new("orphan_output", ValueType::String)))
            .add_node(passthrough("n", "input", "input"))
            .add_input_channel("input");
        builder = builder.add_output_channel("orphan_output");
        let result = builder.build();
        assert!(result.is_err());
    }

    /// **Scenario**: an output channel that is also an input channel (echoed
    /// through with no writer) is not flagged, per the "echoed through"
    /// exception to output reachability.
    #[test]
    fn input_echoed_as_output_is_not_an_error() {
        let result = GraphBuilder::new("g")
            .add_channel(Box::new(LastValue::new("input", ValueType::String)))
            .add_channel(Box::new(LastValue::new("other", ValueType::String)))
            .add_node(passthrough("n", "input", "other"))
            .add_input_channel("input")
            .add_output_channel("input")
            .build();
        assert!(result.is_ok(), "{:?}", result.err());
    }

    /// **Scenario**: a two-node cycle is reported as a warning, not an error.
    #[test]
    fn cycle_is_a_warning_not_an_error() {
        let graph = GraphBuilder::new("g")
            .add_channel(Box::new(LastValue::new("a", ValueType::String)))
            .add_channel(Box::new(LastValue::new("b", ValueType::String)))
            .add_node(crate::node::Node::new(
                "n1",
                vec!["a".into()],
                vec!["a".into()],
                vec!["b".into()],
                |input: NodeInput| async move { Ok(NodeOutput::Single(input.as_single().unwrap().clone())) },
            ))
            .add_node(crate::node::Node::new(
                "n2",
                vec!["b".into()],
                vec!["b".into()],
                vec!["a".into()],
                |input: NodeInput| async move { Ok(NodeOutput::Single(input.as_single().unwrap().clone())) },
            ))
            .build()
            .expect("cycles are not build errors");
        let result = validate(&graph);
        assert!(result.is_valid());
        assert!(!result.warnings.is_empty());
    }
}
