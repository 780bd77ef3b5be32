use crate::map::{OccupancyMap, TileGrid};
use crate::pathfinding::astar;
use crate::pathfinding::graph::{NavigationGraph, NodeId};
use glam::IVec2;
use log::trace;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

// ============================================================================
// Route cache
// ============================================================================

/// Memoized node-level routes, keyed by (start, end) node pair. Entries are
/// ordered edge traversals, written once and never mutated; edge costs are
/// symmetric, so inserting a route also caches its synthesized reverse.
/// Cleared only when the whole graph is rebuilt.
#[derive(Default)]
pub struct RouteCache {
    entries: HashMap<(NodeId, NodeId), Vec<(NodeId, NodeId)>>,
    misses: u32,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, start: NodeId, end: NodeId) -> Option<&Vec<(NodeId, NodeId)>> {
        self.entries.get(&(start, end))
    }

    pub fn insert(&mut self, start: NodeId, end: NodeId, route: Vec<(NodeId, NodeId)>) {
        let reversed: Vec<(NodeId, NodeId)> =
            route.iter().rev().map(|&(a, b)| (b, a)).collect();
        self.entries.insert((end, start), reversed);
        self.entries.insert((start, end), route);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of Dijkstra runs so far; the HUD surfaces this and tests use
    /// it to verify that repeat queries stay cached.
    pub fn misses(&self) -> u32 {
        self.misses
    }

    fn note_miss(&mut self) {
        self.misses += 1;
    }
}

// ============================================================================
// Node-level search
// ============================================================================

#[derive(Copy, Clone, PartialEq, Eq)]
struct QueueEntry {
    cost: u32,
    node: NodeId,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap; node id breaks cost ties so equal-cost
        // routes resolve the same way on every run.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.0.cmp(&self.node.0))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Dijkstra over the checkpoint adjacency using cumulative edge cost, no
/// heuristic. Re-inserts improved nodes and skips stale pops (lazy
/// deletion) instead of decrease-key. Returns the route as ordered edge
/// traversals, or None when the nodes are in different components.
fn node_route(
    graph: &NavigationGraph,
    start: NodeId,
    end: NodeId,
) -> Option<Vec<(NodeId, NodeId)>> {
    let mut dist: HashMap<NodeId, u32> = HashMap::new();
    let mut prev: HashMap<NodeId, NodeId> = HashMap::new();
    let mut heap = BinaryHeap::new();

    dist.insert(start, 0);
    heap.push(QueueEntry { cost: 0, node: start });

    while let Some(QueueEntry { cost, node }) = heap.pop() {
        if cost > *dist.get(&node).unwrap_or(&u32::MAX) {
            continue; // stale entry
        }
        if node == end {
            break;
        }
        for edge in graph.neighbors(node) {
            let next = cost + edge.cost;
            if next < *dist.get(&edge.to).unwrap_or(&u32::MAX) {
                dist.insert(edge.to, next);
                prev.insert(edge.to, node);
                heap.push(QueueEntry { cost: next, node: edge.to });
            }
        }
    }

    if !dist.contains_key(&end) {
        return None;
    }
    let mut route = Vec::new();
    let mut curr = end;
    while curr != start {
        let parent = *prev.get(&curr)?;
        route.push((parent, curr));
        curr = parent;
    }
    route.reverse();
    Some(route)
}

// ============================================================================
// Planning
// ============================================================================

/// Plans a long-distance path through the checkpoint network: snap both
/// endpoints to their nearest node, find (or recall) the node-level route,
/// then stitch boundary grid paths and the route's pre-computed edge paths
/// into one tile list.
///
/// Empty result means the plan failed closed — fewer than two nodes, both
/// endpoints snapping to the same node (use plain A* for short hops), no
/// route between components, or any stitched segment being unreachable.
/// Partial paths are never returned.
pub fn plan_path_with_checkpoints(
    start: IVec2,
    target: IVec2,
    grid: &TileGrid,
    occupancy: Option<&OccupancyMap>,
    graph: &mut NavigationGraph,
) -> Vec<IVec2> {
    if graph.node_count() < 2 {
        return Vec::new();
    }
    let (snap_start, snap_end) = match (graph.nearest_node(start), graph.nearest_node(target)) {
        (Some(s), Some(e)) => (s, e),
        _ => return Vec::new(),
    };
    if snap_start == snap_end {
        return Vec::new();
    }

    let route = match graph.route_cache.get(snap_start, snap_end) {
        Some(cached) => cached.clone(),
        None => {
            graph.route_cache.note_miss();
            trace!("route cache miss: {:?} -> {:?}", snap_start, snap_end);
            match node_route(graph, snap_start, snap_end) {
                Some(found) => {
                    graph.route_cache.insert(snap_start, snap_end, found.clone());
                    found
                }
                None => return Vec::new(),
            }
        }
    };

    // Approach segment honors the current occupancy snapshot; the cached
    // edge paths were computed occupancy-free at build time.
    let approach = astar::find_path(start, graph.node(snap_start).pos, grid, occupancy);
    if approach.is_empty() {
        return Vec::new();
    }
    let mut full = approach;

    for &(from, to) in &route {
        match graph.edge_path(from, to) {
            Some(segment) => append_deduped(&mut full, segment),
            None => return Vec::new(),
        }
    }

    let exit = astar::find_path(graph.node(snap_end).pos, target, grid, occupancy);
    if exit.is_empty() {
        return Vec::new();
    }
    append_deduped(&mut full, &exit);
    full
}

/// Concatenates a segment, dropping its first tile when it repeats the
/// boundary tile already emitted.
fn append_deduped(full: &mut Vec<IVec2>, segment: &[IVec2]) {
    if let (Some(last), Some(first)) = (full.last(), segment.first()) {
        if last == first {
            full.extend_from_slice(&segment[1..]);
            return;
        }
    }
    full.extend_from_slice(segment);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NavConfig;
    use crate::map::testgrid::grid;
    use crate::map::{Tile, TileKind};
    use crate::pathfinding::graph::testmap;

    fn winding_network() -> (TileGrid, NavigationGraph) {
        let (g, factories) = testmap::winding_street_map();
        let graph = NavigationGraph::build(&g, &factories, NavConfig::default());
        (g, graph)
    }

    #[test]
    fn plan_crosses_the_map_on_passable_tiles() {
        let (g, mut graph) = winding_network();
        let start = IVec2::new(0, 0);
        let target = IVec2::new(39, 39);
        let path = plan_path_with_checkpoints(start, target, &g, None, &mut graph);
        assert!(!path.is_empty());
        assert_eq!(path[0], start);
        assert_eq!(*path.last().unwrap(), target);
        for pos in &path {
            assert!(g.is_passable(*pos), "impassable tile {pos:?} in plan");
        }
        // Stitched segments share no duplicated boundary tiles.
        for pair in path.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn repeat_plans_are_identical_and_run_dijkstra_once() {
        let (g, mut graph) = winding_network();
        let start = IVec2::new(0, 0);
        let target = IVec2::new(39, 39);
        let first = plan_path_with_checkpoints(start, target, &g, None, &mut graph);
        let second = plan_path_with_checkpoints(start, target, &g, None, &mut graph);
        assert_eq!(first, second);
        assert_eq!(graph.route_cache.misses(), 1);

        // The reverse direction was cached alongside the forward route.
        let back = plan_path_with_checkpoints(target, start, &g, None, &mut graph);
        assert!(!back.is_empty());
        assert_eq!(graph.route_cache.misses(), 1);
    }

    #[test]
    fn endpoints_snapping_to_one_node_return_empty() {
        let (g, mut graph) = winding_network();
        // Both points sit in the same corner pocket, nearest to the same
        // base node; the caller should use plain A* instead.
        let path =
            plan_path_with_checkpoints(IVec2::new(0, 0), IVec2::new(0, 1), &g, None, &mut graph);
        assert!(path.is_empty());
    }

    #[test]
    fn degenerate_graphs_return_empty() {
        let g = grid(&["....", "....", "...."]);
        let mut graph = NavigationGraph::build(&g, &[], NavConfig::default());
        assert_eq!(graph.node_count(), 0);
        let path =
            plan_path_with_checkpoints(IVec2::new(0, 0), IVec2::new(3, 2), &g, None, &mut graph);
        assert!(path.is_empty());
    }

    #[test]
    fn disconnected_components_return_empty() {
        let g = testmap::split_crossings_map();
        let mut graph = NavigationGraph::build(&g, &[], NavConfig::default());
        assert_eq!(graph.node_count(), 2);
        let path =
            plan_path_with_checkpoints(IVec2::new(0, 2), IVec2::new(89, 2), &g, None, &mut graph);
        assert!(path.is_empty());
    }

    #[test]
    fn unreachable_boundary_segment_fails_the_whole_plan() {
        let (mut g, factories) = testmap::winding_street_map();
        // A one-tile island in the middle of the water.
        g.set(IVec2::new(20, 20), Tile::new(TileKind::Land));
        let mut graph = NavigationGraph::build(&g, &factories, NavConfig::default());
        let path = plan_path_with_checkpoints(
            IVec2::new(20, 20),
            IVec2::new(0, 0),
            &g,
            None,
            &mut graph,
        );
        assert!(path.is_empty());
    }

    #[test]
    fn cache_reset_clears_instrumentation() {
        let (g, mut graph) = winding_network();
        plan_path_with_checkpoints(IVec2::new(0, 0), IVec2::new(39, 39), &g, None, &mut graph);
        assert!(!graph.route_cache.is_empty());
        graph.route_cache.clear();
        assert!(graph.route_cache.is_empty());
        assert_eq!(graph.route_cache.misses(), 0);
    }
}
