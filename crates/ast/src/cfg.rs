use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::Direction;

use crate::block::BlockTable;

/// Role of a warp edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Fallthrough into the next block.
    Flow,
    /// Unconditional jump.
    Jump,
    /// Backward jump closing a loop.
    LoopBack,
    /// Taken when the condition holds.
    True,
    /// Taken when the condition fails.
    False,
    /// Into a loop body.
    Body,
    /// Past the end of a loop.
    WayOut,
}

/// Control flow graph over blocks. Node `i` is block `i`.
pub type WarpGraph = DiGraph<usize, EdgeKind>;

/// Build the graph induced by the blocks' warps.
pub fn warp_graph(blocks: &BlockTable) -> WarpGraph {
    let mut graph = WarpGraph::with_capacity(blocks.len(), blocks.len() * 2);
    for block in blocks {
        graph.add_node(block.index);
    }
    for block in blocks {
        for (kind, address) in block.warp.targets() {
            if let Some(target) = blocks.index_of(address) {
                graph.add_edge(NodeIndex::new(block.index), NodeIndex::new(target), kind);
            }
        }
    }
    graph
}

/// Blocks that cannot be reached from the entry block.
pub fn unreachable_blocks(graph: &WarpGraph) -> Vec<usize> {
    if graph.node_count() == 0 {
        return Vec::new();
    }
    let mut seen = vec![false; graph.node_count()];
    let mut dfs = Dfs::new(graph, NodeIndex::new(0));
    while let Some(node) = dfs.next(graph) {
        seen[node.index()] = true;
    }
    (0..seen.len()).filter(|&index| !seen[index]).collect()
}

/// Predecessor blocks of `index` with the kind of each incoming edge.
pub fn predecessors(graph: &WarpGraph, index: usize) -> Vec<(usize, EdgeKind)> {
    graph
        .edges_directed(NodeIndex::new(index), Direction::Incoming)
        .map(|edge| (edge.source().index(), *edge.weight()))
        .collect()
}
