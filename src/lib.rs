//! Navigation core for the RTS simulation: blocking-aware grid A*, the
//! per-map checkpoint network, and the hierarchical route planner. The JS
//! host owns map generation, unit simulation and rendering; this crate only
//! answers "how do I get from here to there".

mod config;
mod map;
mod pathfinding;

pub use config::NavConfig;
pub use map::{Factory, Location, OccupancyMap, Tile, TileGrid, TileKind, Unit};
pub use pathfinding::astar::find_path;
pub use pathfinding::graph::{GraphEdge, NavigationGraph, NodeId, NodeKind, PathNode};
pub use pathfinding::planner::{plan_path_with_checkpoints, RouteCache};

use glam::IVec2;
use wasm_bindgen::prelude::*;

/// Wasm facade. Owns the current map's grid, occupancy snapshot and
/// checkpoint network; the host drives it with the same JSON bundles the
/// simulation already broadcasts each tick.
#[wasm_bindgen]
pub struct Navigation {
    grid: TileGrid,
    occupancy: OccupancyMap,
    graph: NavigationGraph,
    config: NavConfig,
}

#[wasm_bindgen]
impl Navigation {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Navigation {
        // Panic hook for readable errors in the browser console.
        console_error_panic_hook::set_once();

        Navigation {
            grid: TileGrid::empty(),
            occupancy: OccupancyMap::new(0, 0),
            graph: NavigationGraph::empty(NavConfig::default()),
            config: NavConfig::default(),
        }
    }

    /// Overrides the default tuning constants (JSON object, camelCase
    /// keys). Takes effect on the next `build_network` call.
    pub fn configure(&mut self, config_json: &str) {
        self.config = serde_json::from_str(config_json).unwrap_or_default();
    }

    /// Loads a freshly generated map (`grid[y][x]` tile descriptors).
    /// Discards the previous graph and route cache: topology changes always
    /// rebuild wholesale, there is no incremental update path.
    pub fn load_map(&mut self, grid: JsValue) {
        let rows: Vec<Vec<Tile>> = serde_wasm_bindgen::from_value(grid).unwrap_or_default();
        self.grid = TileGrid::from_rows(rows);
        self.occupancy = OccupancyMap::new(self.grid.width, self.grid.height);
        self.graph = NavigationGraph::empty(self.config);
    }

    /// Builds the checkpoint network for the current map from the factory
    /// list. Returns the node count so the host can sanity-check the build.
    pub fn build_network(&mut self, factories_json: &str) -> usize {
        let factories: Vec<Factory> = serde_json::from_str(factories_json).unwrap_or_default();
        self.graph = NavigationGraph::build(&self.grid, &factories, self.config);
        self.graph.node_count()
    }

    /// Rebuilds the occupancy snapshot from the current unit list.
    pub fn set_units(&mut self, units_json: &str) {
        let units: Vec<Unit> = serde_json::from_str(units_json).unwrap_or_default();
        self.occupancy = OccupancyMap::build(&units, &self.grid);
    }

    /// Direct grid search. Returns a flat `[x0, y0, x1, y1, ...]` buffer;
    /// empty means unreachable, the unit simply does not move this tick.
    pub fn find_path(&self, sx: i32, sy: i32, ex: i32, ey: i32, use_occupancy: bool) -> JsValue {
        let occupancy = use_occupancy.then_some(&self.occupancy);
        let path = pathfinding::astar::find_path(
            IVec2::new(sx, sy),
            IVec2::new(ex, ey),
            &self.grid,
            occupancy,
        );
        flatten(&path)
    }

    /// Hierarchical plan over the checkpoint network, same encoding as
    /// `find_path`.
    pub fn plan_path(&mut self, sx: i32, sy: i32, ex: i32, ey: i32) -> JsValue {
        let path = plan_path_with_checkpoints(
            IVec2::new(sx, sy),
            IVec2::new(ex, ey),
            &self.grid,
            Some(&self.occupancy),
            &mut self.graph,
        );
        flatten(&path)
    }

    /// Checkpoint positions for the debug overlay, flat `[x, y, ...]`.
    pub fn node_positions(&self) -> JsValue {
        let flat: Vec<i32> = self
            .graph
            .nodes
            .iter()
            .flat_map(|n| [n.pos.x, n.pos.y])
            .collect();
        serde_wasm_bindgen::to_value(&flat).unwrap_or(JsValue::NULL)
    }

    /// Dijkstra runs since the last rebuild; flat on a warmed-up cache.
    pub fn cache_misses(&self) -> u32 {
        self.graph.route_cache.misses()
    }
}

fn flatten(path: &[IVec2]) -> JsValue {
    let flat: Vec<i32> = path.iter().flat_map(|p| [p.x, p.y]).collect();
    serde_wasm_bindgen::to_value(&flat).unwrap_or(JsValue::NULL)
}
