use serde::Deserialize;

/// Tuning knobs for checkpoint graph construction.
///
/// The defaults are the values the game ships with; hosts running larger
/// maps scale `edge_distance` up rather than editing code. The repair pass
/// widens its search to `2 * edge_distance` before going unlimited.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NavConfig {
    /// Minimum Euclidean spacing between two graph nodes, in tiles.
    pub node_dedup_radius: f32,
    /// Maximum Euclidean distance at which two nodes are considered for a
    /// direct edge during the normal build pass.
    pub edge_distance: f32,
    /// Per-node fan-out cap during edge building.
    pub max_edges_per_node: usize,
    /// Width of the border around a factory footprint scanned for a street
    /// access tile.
    pub base_street_border: i32,
    /// Largest fallback ring searched for any passable tile when a factory
    /// has no street access.
    pub base_fallback_radius: i32,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            node_dedup_radius: 2.0,
            edge_distance: 40.0,
            max_edges_per_node: 6,
            base_street_border: 3,
            base_fallback_radius: 4,
        }
    }
}
