use crate::config::NavConfig;
use crate::map::{Factory, TileGrid};
use crate::pathfinding::astar::{self, DIRS};
use crate::pathfinding::planner::RouteCache;
use glam::IVec2;
use log::{debug, info, warn};
use std::collections::VecDeque;

// ============================================================================
// Data Structures
// ============================================================================

/// Index into the node list of one graph instance. Ids are stable for the
/// life of that instance; a map rebuild allocates a fresh graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Base,
    Ore,
    Street,
}

/// A checkpoint: a strategically placed tile used as a long-distance
/// routing waypoint.
#[derive(Clone, Debug)]
pub struct PathNode {
    pub id: NodeId,
    pub pos: IVec2,
    pub kind: NodeKind,
    pub label: String,
}

/// Directed edge with its own pre-computed tile path (both endpoints
/// included, so `path.len() >= 2`). The opposite direction is a separate
/// entry in the target node's adjacency list.
#[derive(Clone, Debug)]
pub struct GraphEdge {
    pub to: NodeId,
    pub cost: u32,
    pub path: Vec<IVec2>,
}

/// The checkpoint network for one map: nodes, adjacency (edges with their
/// tile paths) and the route cache. Owned by game state and discarded
/// wholesale when the map regenerates; nothing in here mutates during play
/// except the cache.
pub struct NavigationGraph {
    pub nodes: Vec<PathNode>,
    pub adjacency: Vec<Vec<GraphEdge>>,
    pub route_cache: RouteCache,
    pub config: NavConfig,
}

// ============================================================================
// Construction
// ============================================================================

impl NavigationGraph {
    pub fn empty(config: NavConfig) -> Self {
        Self {
            nodes: Vec::new(),
            adjacency: Vec::new(),
            route_cache: RouteCache::new(),
            config,
        }
    }

    /// Full build pipeline: extract nodes from factories, ore clusters and
    /// street intersections, connect nearest neighbors, then repair
    /// connectivity. Runs once per map generation.
    pub fn build(grid: &TileGrid, factories: &[Factory], config: NavConfig) -> Self {
        let mut graph = Self::empty(config);

        graph.collect_base_nodes(grid, factories);
        graph.collect_ore_nodes(grid);
        graph.collect_street_nodes(grid);

        graph.adjacency = vec![Vec::new(); graph.nodes.len()];
        graph.connect_nodes(grid);
        graph.repair_connectivity(grid);

        info!(
            "checkpoint network built: {} nodes, {} directed edges",
            graph.nodes.len(),
            graph.adjacency.iter().map(Vec::len).sum::<usize>()
        );
        graph
    }

    /// Adds a node unless another node already sits within the dedup
    /// radius. Bases are collected first, then ore, then streets, so the
    /// more important kind wins a spacing conflict.
    fn add_node(&mut self, pos: IVec2, kind: NodeKind, label: String) -> Option<NodeId> {
        let r2 = self.config.node_dedup_radius * self.config.node_dedup_radius;
        if self
            .nodes
            .iter()
            .any(|n| ((n.pos - pos).length_squared() as f32) < r2)
        {
            return None;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(PathNode { id, pos, kind, label });
        Some(id)
    }

    // ------------------------------------------------------------------
    // Node extraction
    // ------------------------------------------------------------------

    fn collect_base_nodes(&mut self, grid: &TileGrid, factories: &[Factory]) {
        for (i, factory) in factories.iter().enumerate() {
            match base_access_tile(grid, factory, &self.config) {
                Some(pos) => {
                    self.add_node(pos, NodeKind::Base, format!("base-{i}"));
                }
                None => warn!("factory {i} at ({}, {}) has no access tile", factory.x, factory.y),
            }
        }
    }

    /// One node per contiguous ore cluster (4-directional, seed crystals
    /// excluded), placed at the rounded centroid. Harvesters path toward
    /// these, so the node is nudged to a passable orthogonal neighbor when
    /// the centroid itself cannot be walked on.
    fn collect_ore_nodes(&mut self, grid: &TileGrid) {
        let mut visited = vec![false; (grid.width * grid.height).max(0) as usize];
        let idx = |p: IVec2| (p.y * grid.width + p.x) as usize;

        for y in 0..grid.height {
            for x in 0..grid.width {
                let seed = IVec2::new(x, y);
                if visited[idx(seed)] || !is_harvestable(grid, seed) {
                    continue;
                }

                // Flood fill the cluster.
                let mut queue = VecDeque::from([seed]);
                visited[idx(seed)] = true;
                let mut sum = IVec2::ZERO;
                let mut count = 0;
                while let Some(pos) = queue.pop_front() {
                    sum += pos;
                    count += 1;
                    for dir in DIRS {
                        let next = pos + dir;
                        if grid.in_bounds(next) && !visited[idx(next)] && is_harvestable(grid, next)
                        {
                            visited[idx(next)] = true;
                            queue.push_back(next);
                        }
                    }
                }

                let centroid = IVec2::new(
                    (sum.x as f32 / count as f32).round() as i32,
                    (sum.y as f32 / count as f32).round() as i32,
                );
                let pos = if grid.is_passable(centroid) {
                    centroid
                } else {
                    DIRS.iter()
                        .map(|d| centroid + *d)
                        .find(|p| grid.is_passable(*p))
                        .unwrap_or(centroid)
                };
                self.add_node(pos, NodeKind::Ore, format!("ore-{}-{}", pos.x, pos.y));
            }
        }
    }

    /// Street tiles that are true intersections or corners: at least three
    /// orthogonal street neighbors, or exactly two that form a turn.
    /// Straight runs produce no nodes.
    fn collect_street_nodes(&mut self, grid: &TileGrid) {
        for y in 0..grid.height {
            for x in 0..grid.width {
                let pos = IVec2::new(x, y);
                if !grid.is_street(pos) {
                    continue;
                }
                let mut horizontal = 0;
                let mut vertical = 0;
                for dir in DIRS {
                    if grid.is_street(pos + dir) {
                        if dir.y == 0 {
                            horizontal += 1;
                        } else {
                            vertical += 1;
                        }
                    }
                }
                let total = horizontal + vertical;
                if total >= 3 || (horizontal == 1 && vertical == 1) {
                    self.add_node(pos, NodeKind::Street, format!("street-{x}-{y}"));
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Edge building
    // ------------------------------------------------------------------

    /// Per node: walk the other nodes nearest-first, attach occupancy-free
    /// A* connections within the distance threshold, stop at the fan-out
    /// cap. Candidate order is (distance, id), so identical input yields an
    /// identical edge set.
    fn connect_nodes(&mut self, grid: &TileGrid) {
        let n = self.nodes.len();
        let max_d2 = self.config.edge_distance * self.config.edge_distance;
        for i in 0..n {
            let mut candidates: Vec<(i32, usize)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| ((self.nodes[j].pos - self.nodes[i].pos).length_squared(), j))
                .collect();
            candidates.sort_unstable();

            for (d2, j) in candidates {
                if self.adjacency[i].len() >= self.config.max_edges_per_node {
                    break;
                }
                if d2 as f32 > max_d2 {
                    break; // sorted ascending, nothing closer follows
                }
                if self.has_edge(i, j) {
                    continue;
                }
                self.try_connect(i, j, grid);
            }
        }
    }

    /// Attempts a tile-path connection and records it in both directions,
    /// each with its own stored path. Cost is the tile-path length.
    fn try_connect(&mut self, a: usize, b: usize, grid: &TileGrid) -> bool {
        let path = astar::find_path(self.nodes[a].pos, self.nodes[b].pos, grid, None);
        if path.len() < 2 {
            return false;
        }
        let cost = path.len() as u32;
        let mut reverse = path.clone();
        reverse.reverse();
        self.adjacency[a].push(GraphEdge { to: NodeId(b), cost, path });
        self.adjacency[b].push(GraphEdge { to: NodeId(a), cost, path: reverse });
        true
    }

    /// Reconnects components that the distance-capped pass left behind:
    /// BFS from node 0, then hook each unreached node to the nearest
    /// reached one, first within twice the base threshold, then with no
    /// limit at all. Nodes that still fail (terrain truly disconnected)
    /// stay in the list with no edges and fail any route through them.
    fn repair_connectivity(&mut self, grid: &TileGrid) {
        if self.nodes.len() < 2 {
            return;
        }
        let widened_d2 = (2.0 * self.config.edge_distance).powi(2);

        loop {
            let reached = self.reach_from(NodeId(0));
            let unreached: Vec<usize> =
                (0..self.nodes.len()).filter(|&i| !reached[i]).collect();
            if unreached.is_empty() {
                return;
            }

            let mut repaired = false;
            'search: for &u in &unreached {
                let mut candidates: Vec<(i32, usize)> = (0..self.nodes.len())
                    .filter(|&r| reached[r])
                    .map(|r| ((self.nodes[r].pos - self.nodes[u].pos).length_squared(), r))
                    .collect();
                candidates.sort_unstable();

                for &(d2, r) in &candidates {
                    if d2 as f32 > widened_d2 {
                        break;
                    }
                    if self.try_connect(u, r, grid) {
                        debug!("repair: linked node {u} to {r} within widened range");
                        repaired = true;
                        break 'search;
                    }
                }
                for &(d2, r) in &candidates {
                    if (d2 as f32) <= widened_d2 {
                        continue; // already attempted above
                    }
                    if self.try_connect(u, r, grid) {
                        debug!("repair: linked node {u} to {r} without range limit");
                        repaired = true;
                        break 'search;
                    }
                }
            }

            if !repaired {
                warn!(
                    "{} node(s) remain isolated after connectivity repair",
                    unreached.len()
                );
                return;
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &PathNode {
        &self.nodes[id.0]
    }

    pub fn neighbors(&self, id: NodeId) -> &[GraphEdge] {
        &self.adjacency[id.0]
    }

    pub fn has_edge(&self, from: usize, to: usize) -> bool {
        self.adjacency[from].iter().any(|e| e.to.0 == to)
    }

    pub fn edge_path(&self, from: NodeId, to: NodeId) -> Option<&[IVec2]> {
        self.adjacency
            .get(from.0)?
            .iter()
            .find(|e| e.to == to)
            .map(|e| e.path.as_slice())
    }

    /// Nearest node by Euclidean distance, lowest id on ties.
    pub fn nearest_node(&self, pos: IVec2) -> Option<NodeId> {
        self.nodes
            .iter()
            .min_by_key(|n| ((n.pos - pos).length_squared(), n.id.0))
            .map(|n| n.id)
    }

    /// BFS reachability over the adjacency, used by the repair pass and by
    /// diagnostics.
    pub fn reach_from(&self, root: NodeId) -> Vec<bool> {
        let mut seen = vec![false; self.nodes.len()];
        if root.0 >= self.nodes.len() {
            return seen;
        }
        let mut queue = VecDeque::from([root.0]);
        seen[root.0] = true;
        while let Some(i) = queue.pop_front() {
            for edge in &self.adjacency[i] {
                if !seen[edge.to.0] {
                    seen[edge.to.0] = true;
                    queue.push_back(edge.to.0);
                }
            }
        }
        seen
    }
}

fn is_harvestable(grid: &TileGrid, pos: IVec2) -> bool {
    matches!(grid.get(pos), Some(t) if t.ore && !t.seed_crystal)
}

/// Access point for a factory: the nearest passable street tile within the
/// configured border of the footprint, else the nearest passable tile of
/// any kind in rings of growing radius.
fn base_access_tile(grid: &TileGrid, factory: &Factory, config: &NavConfig) -> Option<IVec2> {
    let center = factory.location().tile_center();

    let nearest = |border: i32, want_street: bool| -> Option<IVec2> {
        let mut best: Option<(i32, IVec2)> = None;
        for y in (factory.y - border)..(factory.y + factory.height + border) {
            for x in (factory.x - border)..(factory.x + factory.width + border) {
                let pos = IVec2::new(x, y);
                if factory.contains(pos) || !grid.is_passable(pos) {
                    continue;
                }
                if want_street && !grid.is_street(pos) {
                    continue;
                }
                let d2 = (pos - center).length_squared();
                let better = match best {
                    Some((bd, bp)) => (d2, (pos.y, pos.x)) < (bd, (bp.y, bp.x)),
                    None => true,
                };
                if better {
                    best = Some((d2, pos));
                }
            }
        }
        best.map(|(_, pos)| pos)
    };

    if let Some(pos) = nearest(config.base_street_border, true) {
        return Some(pos);
    }
    for radius in 1..=config.base_fallback_radius {
        if let Some(pos) = nearest(radius, false) {
            return Some(pos);
        }
    }
    None
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod testmap {
    use super::*;
    use crate::map::{Tile, TileKind};

    /// 40x40 water map: two factories in opposite corners on small land
    /// pockets, joined only by a winding width-1 street.
    pub fn winding_street_map() -> (TileGrid, Vec<Factory>) {
        let mut grid = TileGrid::new(40, 40, Tile::new(TileKind::Water));
        let land = Tile::new(TileKind::Land);
        let street = Tile::new(TileKind::Street);
        let building = Tile::new(TileKind::Building);

        for y in 0..=4 {
            for x in 0..=4 {
                grid.set(IVec2::new(x, y), land);
            }
        }
        for y in 34..40 {
            for x in 34..40 {
                grid.set(IVec2::new(x, y), land);
            }
        }
        // Street: east along row 2, then south down column 36.
        for x in 3..=36 {
            grid.set(IVec2::new(x, 2), street);
        }
        for y in 2..=35 {
            grid.set(IVec2::new(36, y), street);
        }

        let factories = vec![
            Factory { x: 1, y: 1, width: 2, height: 2, owner: "player".into() },
            Factory { x: 36, y: 36, width: 2, height: 2, owner: "enemy".into() },
        ];
        for f in &factories {
            for y in f.y..f.y + f.height {
                for x in f.x..f.x + f.width {
                    grid.set(IVec2::new(x, y), building);
                }
            }
        }
        (grid, factories)
    }

    /// Two street crossings far apart on open land; the gap exceeds the
    /// base edge threshold so only the repair pass can join them.
    pub fn distant_crossings_map() -> TileGrid {
        let mut grid = TileGrid::new(90, 5, Tile::new(TileKind::Land));
        let street = Tile::new(TileKind::Street);
        for cx in [2, 80] {
            grid.set(IVec2::new(cx, 2), street);
            grid.set(IVec2::new(cx - 1, 2), street);
            grid.set(IVec2::new(cx + 1, 2), street);
            grid.set(IVec2::new(cx, 1), street);
            grid.set(IVec2::new(cx, 3), street);
        }
        grid
    }

    /// Same two crossings, but a water wall makes the right one
    /// unreachable for good.
    pub fn split_crossings_map() -> TileGrid {
        let mut grid = distant_crossings_map();
        let water = Tile::new(TileKind::Water);
        for y in 0..5 {
            grid.set(IVec2::new(40, y), water);
        }
        grid
    }
}
