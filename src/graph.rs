use std::collections::HashMap;

use anyhow::{Result, bail};

use crate::dsl::{Node, ShaderGraph};
use crate::generator::error::GeneratorError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Order nodes so every node comes after all nodes feeding its input pins.
///
/// Depth-first post-order over the producers of each node's incoming links, starting from
/// the nodes in list order. Nodes without any link are left out. Walks an explicit stack, so
/// deep graphs cannot overflow, and a back edge fails with [`GeneratorError::CycleDetected`].
pub fn topo_sort(graph: &ShaderGraph) -> Result<Vec<&Node>> {
    let index: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut deps: Vec<Vec<usize>> = vec![Vec::new(); graph.nodes.len()];
    let mut linked = vec![false; graph.nodes.len()];
    for l in &graph.links {
        let Some(&from) = index.get(l.from.node_id.as_str()) else {
            bail!(GeneratorError::MissingNode {
                node: l.from.node_id.clone()
            });
        };
        let Some(&to) = index.get(l.to.node_id.as_str()) else {
            bail!(GeneratorError::MissingNode {
                node: l.to.node_id.clone()
            });
        };
        deps[to].push(from);
        linked[from] = true;
        linked[to] = true;
    }

    let mut marks = vec![Mark::Unvisited; graph.nodes.len()];
    let mut order: Vec<&Node> = Vec::with_capacity(graph.nodes.len());

    for start in 0..graph.nodes.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        marks[start] = Mark::InProgress;
        // (node, next dependency to visit)
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        while let Some(frame) = stack.last_mut() {
            let (node, cursor) = *frame;
            if let Some(&dep) = deps[node].get(cursor) {
                frame.1 += 1;
                match marks[dep] {
                    Mark::Unvisited => {
                        marks[dep] = Mark::InProgress;
                        stack.push((dep, 0));
                    }
                    Mark::InProgress => bail!(GeneratorError::CycleDetected {
                        node: graph.nodes[dep].id.clone()
                    }),
                    Mark::Done => {}
                }
            } else {
                stack.pop();
                marks[node] = Mark::Done;
                if linked[node] {
                    order.push(&graph.nodes[node]);
                }
            }
        }
    }

    Ok(order)
}
