//! Ready-made selectors and properties for the common matching shapes.

use super::property::{FactoryError, Property};
use super::selector::{NodeRef, Selector};
use crate::graph::{Attributes, Graph, NodeId};
use serde_json::json;
use std::collections::HashSet;

/// Grows a connected region of nodes whose op is in a fixed set.
///
/// Regions smaller than `min_size` are rejected.
#[derive(Debug, Clone)]
pub struct OpSetSelector {
    ops: HashSet<String>,
    min_size: usize,
}

impl OpSetSelector {
    pub fn new<I, S>(ops: I, min_size: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { ops: ops.into_iter().map(Into::into).collect(), min_size }
    }
}

impl Selector for OpSetSelector {
    fn select(&mut self, node: NodeRef<'_>) -> bool {
        self.ops.contains(node.op())
    }

    fn select_input(&mut self, _node: NodeRef<'_>, producer: NodeRef<'_>) -> bool {
        self.ops.contains(producer.op())
    }

    fn select_output(&mut self, _node: NodeRef<'_>, consumer: NodeRef<'_>) -> bool {
        self.ops.contains(consumer.op())
    }

    fn filter(&mut self, candidates: &[NodeRef<'_>]) -> Vec<NodeId> {
        if candidates.len() < self.min_size {
            return Vec::new();
        }
        candidates.iter().map(NodeRef::id).collect()
    }
}

/// Matches a linear sequence of ops, one forward hop at a time.
///
/// Seeds on the first op of the pattern; each admitted node must consume the
/// previously admitted one. Only complete matches survive the filter.
#[derive(Debug, Clone)]
pub struct ChainSelector {
    pattern: Vec<String>,
    tail: Option<NodeId>,
    matched: usize,
}

impl ChainSelector {
    pub fn new<I, S>(pattern: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { pattern: pattern.into_iter().map(Into::into).collect(), tail: None, matched: 0 }
    }
}

impl Selector for ChainSelector {
    fn select(&mut self, node: NodeRef<'_>) -> bool {
        if self.pattern.first().map(String::as_str) != Some(node.op()) {
            return false;
        }
        self.tail = Some(node.id());
        self.matched = 1;
        true
    }

    fn select_input(&mut self, _node: NodeRef<'_>, _producer: NodeRef<'_>) -> bool {
        false
    }

    fn select_output(&mut self, node: NodeRef<'_>, consumer: NodeRef<'_>) -> bool {
        let extends_tail = self.tail == Some(node.id())
            && self.pattern.get(self.matched).map(String::as_str) == Some(consumer.op());
        if extends_tail {
            self.tail = Some(consumer.id());
            self.matched += 1;
        }
        extends_tail
    }

    fn filter(&mut self, candidates: &[NodeRef<'_>]) -> Vec<NodeId> {
        if self.matched < self.pattern.len() {
            return Vec::new();
        }
        candidates.iter().map(NodeRef::id).collect()
    }

    fn reset(&mut self) {
        self.tail = None;
        self.matched = 0;
    }
}

/// Describes the absorbed graph: its ops in execution order and its arity.
pub fn summarize(subgraph: &Graph) -> Result<Attributes, FactoryError> {
    let order = subgraph
        .topological_order()
        .map_err(|e| FactoryError::new(format!("subgraph is not a DAG: {}", e)))?;
    let ops: Vec<&str> = order
        .iter()
        .filter_map(|&id| subgraph.node(id))
        .map(|n| n.op.as_str())
        .collect();

    let mut attrs = Attributes::new();
    attrs.insert("ops".into(), json!(ops));
    attrs.insert("num_nodes".into(), json!(subgraph.node_count()));
    attrs.insert("num_inputs".into(), json!(subgraph.num_inputs()));
    attrs.insert("num_outputs".into(), json!(subgraph.outputs().len()));
    Ok(attrs)
}

/// Fuses every connected region of the listed ops.
#[derive(Debug, Clone)]
pub struct OpSetProperty {
    name: String,
    ops: Vec<String>,
    min_size: usize,
}

impl OpSetProperty {
    pub fn new<I, S>(name: impl Into<String>, ops: I, min_size: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { name: name.into(), ops: ops.into_iter().map(Into::into).collect(), min_size }
    }
}

impl Property for OpSetProperty {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_selector(&self) -> Box<dyn Selector> {
        Box::new(OpSetSelector::new(self.ops.iter().cloned(), self.min_size))
    }

    fn create_node(&self, subgraph: &Graph, ordinal: usize) -> Result<Attributes, FactoryError> {
        let mut attrs = summarize(subgraph)?;
        attrs.insert("label".into(), json!(format!("{}{}", self.name, ordinal)));
        Ok(attrs)
    }
}

/// Fuses every occurrence of a linear op sequence.
#[derive(Debug, Clone)]
pub struct ChainProperty {
    name: String,
    pattern: Vec<String>,
}

impl ChainProperty {
    pub fn new<I, S>(name: impl Into<String>, pattern: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { name: name.into(), pattern: pattern.into_iter().map(Into::into).collect() }
    }
}

impl Property for ChainProperty {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_selector(&self) -> Box<dyn Selector> {
        Box::new(ChainSelector::new(self.pattern.iter().cloned()))
    }

    fn create_node(&self, subgraph: &Graph, ordinal: usize) -> Result<Attributes, FactoryError> {
        let mut attrs = summarize(subgraph)?;
        attrs.insert("label".into(), json!(format!("{}{}", self.name, ordinal)));
        Ok(attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ValueRef;
    use rstest::rstest;

    fn chain_graph(ops: &[&str]) -> Graph {
        let mut g = Graph::new();
        let mut prev = g.add_input();
        for op in ops {
            let id = g.add_node(op, &[prev], 1).unwrap();
            prev = ValueRef::output(id, 0);
        }
        g.add_output(prev).unwrap();
        g
    }

    fn run(selector: &mut dyn Selector, g: &Graph) -> Option<Vec<NodeId>> {
        let order = g.topological_order().unwrap();
        let seed = order.iter().copied().find(|&id| selector.select(NodeRef::new(id, g.node(id).unwrap())))?;
        let mut members = vec![seed];
        let mut tail = seed;
        while let Some(&next) = g.consumers(tail).first() {
            let admitted = selector.select_output(NodeRef::new(tail, g.node(tail).unwrap()), NodeRef::new(next, g.node(next).unwrap()));
            if !admitted {
                break;
            }
            members.push(next);
            tail = next;
        }
        let views: Vec<_> = members.iter().map(|&id| NodeRef::new(id, g.node(id).unwrap())).collect();
        let kept = selector.filter(&views);
        (!kept.is_empty()).then_some(kept)
    }

    #[rstest]
    #[case(&["conv", "relu"], &["conv", "relu"], Some(2))]
    #[case(&["conv", "relu", "pool"], &["conv", "relu"], Some(2))]
    #[case(&["conv", "bn", "relu"], &["conv", "relu"], None)]
    #[case(&["conv"], &["conv", "relu"], None)]
    #[case(&["relu", "conv", "relu"], &["conv", "relu"], Some(2))]
    fn test_chain_selector_matches(#[case] graph_ops: &[&str], #[case] pattern: &[&str], #[case] expected: Option<usize>) {
        let g = chain_graph(graph_ops);
        let mut sel = ChainSelector::new(pattern.iter().copied());
        assert_eq!(run(&mut sel, &g).map(|m| m.len()), expected);
    }

    #[test]
    fn test_chain_selector_reset_clears_progress() {
        let g = chain_graph(&["a", "b"]);
        let ids = g.topological_order().unwrap();
        let mut sel = ChainSelector::new(["a", "b"]);
        assert!(sel.select(NodeRef::new(ids[0], g.node(ids[0]).unwrap())));
        sel.reset();
        // Without a seed nothing can be extended.
        assert!(!sel.select_output(NodeRef::new(ids[0], g.node(ids[0]).unwrap()), NodeRef::new(ids[1], g.node(ids[1]).unwrap())));
    }

    #[test]
    fn test_op_set_filter_enforces_min_size() {
        let g = chain_graph(&["add"]);
        let id = g.topological_order().unwrap()[0];
        let views = [NodeRef::new(id, g.node(id).unwrap())];

        assert!(OpSetSelector::new(["add"], 2).filter(&views).is_empty());
        assert_eq!(OpSetSelector::new(["add"], 1).filter(&views), vec![id]);
    }

    #[test]
    fn test_summarize_lists_ops_in_order() {
        let g = chain_graph(&["conv", "relu"]);
        let attrs = summarize(&g).unwrap();
        assert_eq!(attrs["ops"], json!(["conv", "relu"]));
        assert_eq!(attrs["num_inputs"], json!(1));
        assert_eq!(attrs["num_outputs"], json!(1));
    }
}
