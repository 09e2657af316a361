//! Graph builder and graph-level verification (§4.3, §4.6's `G`/`L`).
//!
//! Grounded in `backend_rewrite/graph.py::build_graph` and
//! `backend_rewrite/verify.py::find_cycle`/`verify_graph`, reimplemented over
//! `petgraph::graph::DiGraph` rather than networkx or a hand-rolled
//! topological sort, since the CP scheduler needs dense node indices anyway.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use taskloom_core::{calendar, Edge, InputTask, Notification, TaskloomError};

/// A directed task graph: nodes are `InputTask`, edges carry `{weight,
/// slack, critical}`. `index_by_name` lets callers look a task up by name
/// without a linear scan.
#[derive(Debug)]
pub struct TaskGraph {
    pub graph: DiGraph<InputTask, Edge>,
    pub index_by_name: HashMap<String, NodeIndex>,
}

impl TaskGraph {
    pub fn node(&self, name: &str) -> Option<NodeIndex> {
        self.index_by_name.get(name).copied()
    }

    pub fn task(&self, idx: NodeIndex) -> &InputTask {
        &self.graph[idx]
    }
}

/// Assembles a graph from a flat task list. Edges whose target is not a
/// known task name are dangling: emit a WARN notification naming the
/// reference and drop the edge, never alias it to a lookalike.
#[tracing::instrument(skip_all, fields(tasks = tasks.len()))]
pub fn build_graph(tasks: Vec<InputTask>, notifications: &mut Vec<Notification>) -> TaskGraph {
    let mut graph = DiGraph::new();
    let mut index_by_name = HashMap::new();

    let nexts: Vec<(String, Vec<String>)> = tasks
        .iter()
        .map(|t| (t.name.clone(), t.next.clone()))
        .collect();
    let weights: HashMap<String, i64> = tasks
        .iter()
        .map(|t| (t.name.clone(), t.estimate.unwrap_or(0)))
        .collect();

    for task in tasks {
        let name = task.name.clone();
        let idx = graph.add_node(task);
        index_by_name.insert(name, idx);
    }

    for (from_name, next_names) in nexts {
        let Some(&from_idx) = index_by_name.get(&from_name) else {
            continue;
        };
        for to_name in next_names {
            match index_by_name.get(&to_name) {
                Some(&to_idx) => {
                    let weight = weights.get(&from_name).copied().unwrap_or(0);
                    graph.add_edge(
                        from_idx,
                        to_idx,
                        Edge {
                            weight,
                            slack: 0,
                            critical: false,
                        },
                    );
                }
                None => {
                    notifications.push(Notification::warn(format!(
                        "task {from_name} names unknown dependency {to_name}, dropping the edge"
                    )));
                }
            }
        }
    }

    TaskGraph {
        graph,
        index_by_name,
    }
}

/// Detects a cycle via DFS, returning the full list of offending edges (not
/// just a single back edge) so `TaskloomError::CycleDetected` can report the
/// whole loop.
fn find_cycle(graph: &DiGraph<InputTask, Edge>) -> Option<Vec<(NodeIndex, NodeIndex)>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut color = vec![Color::White; graph.node_count()];
    let mut parent_edge: HashMap<NodeIndex, NodeIndex> = HashMap::new();

    for start in graph.node_indices() {
        if color[start.index()] != Color::White {
            continue;
        }
        let mut stack = vec![(start, graph.neighbors(start).collect::<Vec<_>>().into_iter())];
        color[start.index()] = Color::Gray;
        while let Some((node, neighbors)) = stack.last_mut() {
            let node = *node;
            match neighbors.next() {
                Some(next) => {
                    match color[next.index()] {
                        Color::White => {
                            parent_edge.insert(next, node);
                            color[next.index()] = Color::Gray;
                            stack.push((next, graph.neighbors(next).collect::<Vec<_>>().into_iter()));
                        }
                        Color::Gray => {
                            // Back edge: reconstruct the cycle from `next` up to `node`.
                            let mut edges = vec![(node, next)];
                            let mut cur = node;
                            while cur != next {
                                let prev = parent_edge[&cur];
                                edges.push((prev, cur));
                                cur = prev;
                            }
                            edges.reverse();
                            return Some(edges);
                        }
                        Color::Black => {}
                    }
                }
                None => {
                    color[node.index()] = Color::Black;
                    stack.pop();
                }
            }
        }
    }
    None
}

/// Every ancestor (transitive predecessor) of `start`, breadth-first, along
/// with the parent pointers needed to reconstruct the chain back to `start`.
fn ancestors_bfs(
    graph: &DiGraph<InputTask, Edge>,
    start: NodeIndex,
) -> HashMap<NodeIndex, NodeIndex> {
    let mut parent = HashMap::new();
    let mut queue = std::collections::VecDeque::new();
    let mut seen = std::collections::HashSet::new();
    seen.insert(start);
    queue.push_back(start);
    while let Some(node) = queue.pop_front() {
        for pred in graph.neighbors_directed(node, Direction::Incoming) {
            if seen.insert(pred) {
                parent.insert(pred, node);
                queue.push_back(pred);
            }
        }
    }
    parent
}

/// Graph-level verification (§4.3), run twice per scheduling attempt: once
/// on the pre-expansion graph, once on the post-expansion graph.
#[tracing::instrument(skip_all)]
pub fn verify_graph(tg: &TaskGraph) -> Result<(), TaskloomError> {
    if let Some(edges) = find_cycle(&tg.graph) {
        let named = edges
            .into_iter()
            .map(|(u, v)| (tg.graph[u].name.clone(), tg.graph[v].name.clone()))
            .collect();
        return Err(TaskloomError::CycleDetected { edges: named });
    }

    for edge in tg.graph.edge_indices() {
        let (u, v) = tg.graph.edge_endpoints(edge).unwrap();
        let (task_u, task_v) = (&tg.graph[u], &tg.graph[v]);
        if let (Some(end_u), Some(start_v)) = (task_u.end_date, task_v.start_date) {
            if start_v < end_u {
                return Err(TaskloomError::BadDates {
                    task: task_v.name.clone(),
                    reason: format!(
                        "start_date {start_v} precedes predecessor {}'s end_date {end_u}",
                        task_u.name
                    ),
                });
            }
        }
    }

    for node in tg.graph.node_indices() {
        let task = &tg.graph[node];
        if task.status != taskloom_core::Status::InProgress {
            continue;
        }
        let parent = ancestors_bfs(&tg.graph, node);
        let violating = parent
            .keys()
            .find(|&&ancestor| !tg.graph[ancestor].status.satisfies_in_progress_ancestor());
        if let Some(&ancestor) = violating {
            // Walk from the offending ancestor back toward `node` via the
            // BFS parent pointers, then reverse so the chain reads
            // task <- ... <- ancestor, matching the error's display order.
            let mut chain = Vec::new();
            let mut cur = ancestor;
            while cur != node {
                chain.push(tg.graph[cur].name.clone());
                cur = parent[&cur];
            }
            chain.push(task.name.clone());
            chain.reverse();
            return Err(TaskloomError::InProgressWithIncompleteAncestor {
                task: task.name.clone(),
                ancestors: chain,
            });
        }
    }

    Ok(())
}
