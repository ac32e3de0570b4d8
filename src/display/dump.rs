use crate::graph::{Graph, Node, NodeId, ValueRef};
use std::fmt::Write;

const INDENT: &str = "  ";

/// Renders `graph` as indented text, nested graphs included.
///
/// Nodes are listed in execution order. A graph that fails to sort is still
/// printed, in id order, with a marker line.
pub fn format_graph(graph: &Graph) -> String {
    let mut out = String::new();
    write_graph(&mut out, graph, 0);
    out
}

fn write_graph(out: &mut String, graph: &Graph, depth: usize) {
    let pad = INDENT.repeat(depth);
    let params: Vec<String> = (0..graph.num_inputs()).map(|k| ValueRef::Input(k).to_string()).collect();
    let _ = writeln!(out, "{}graph({}) {{", pad, params.join(", "));

    let order = match graph.topological_order() {
        Ok(order) => order,
        Err(e) => {
            let _ = writeln!(out, "{}{}# unordered: {}", pad, INDENT, e);
            graph.node_ids()
        }
    };
    for id in order {
        if let Some(node) = graph.node(id) {
            write_node(out, id, node, depth + 1);
        }
    }

    let _ = writeln!(out, "{}{}return ({})", pad, INDENT, join(graph.outputs()));
    let _ = writeln!(out, "{}}}", pad);
}

fn write_node(out: &mut String, id: NodeId, node: &Node, depth: usize) {
    let pad = INDENT.repeat(depth);
    let _ = write!(
        out,
        "{}{} = {} '{}'({}) -> {}",
        pad,
        id,
        node.op,
        node.name,
        join(node.inputs()),
        node.num_outputs()
    );
    if !node.attrs.is_empty() {
        // BTreeMap keeps keys sorted, so the rendering is stable.
        let attrs = serde_json::to_string(&node.attrs).unwrap_or_else(|_| "<unprintable>".into());
        let _ = write!(out, " {}", attrs);
    }
    let _ = writeln!(out);

    if let Some(sub) = node.subgraph() {
        write_graph(out, sub, depth + 1);
    }
}

fn join(values: &[ValueRef]) -> String {
    values.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subgraph::builtin::ChainProperty;
    use crate::subgraph::Surgeon;

    #[test]
    fn test_flat_graph() {
        let mut g = Graph::new();
        let x = g.add_input();
        let a = g.add_node("relu", &[x], 1).unwrap();
        g.add_output(ValueRef::output(a, 0)).unwrap();

        let expected = "graph(%in0) {\n  %n0 = relu 'relu'(%in0) -> 1\n  return (%n0:0)\n}\n";
        assert_eq!(format_graph(&g), expected);
    }

    #[test]
    fn test_nested_graph_is_indented() {
        let mut g = Graph::new();
        let x = g.add_input();
        let a = g.add_node("A", &[x], 1).unwrap();
        let b = g.add_node("B", &[ValueRef::output(a, 0)], 1).unwrap();
        g.add_output(ValueRef::output(b, 0)).unwrap();

        let fused = Surgeon::new(&mut g).extract(&[a, b], &ChainProperty::new("ab", ["A", "B"]), 0).unwrap();
        let text = format_graph(&g);

        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[1].starts_with(&format!("  {} = _subgraph 'ab_subgraph0'(%in0) -> 1 {{", fused)));
        assert!(lines[1].contains(r#""label":"ab0""#));
        assert_eq!(lines[2], "    graph(%in0) {");
        assert_eq!(lines[3], "      %n0 = A 'A'(%in0) -> 1");
        assert_eq!(lines[4], "      %n1 = B 'B'(%n0:0) -> 1");
        assert_eq!(lines[5], "      return (%n1:0)");
        assert_eq!(lines[6], "    }");
        assert_eq!(lines.last(), Some(&"}"));
    }
}
