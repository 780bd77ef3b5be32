use glam::IVec2;
use serde::{Deserialize, Serialize};

// ============================================================================
// Tile descriptors (owned by the map generator, read-only here)
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileKind {
    Land,
    Street,
    Water,
    Rock,
    Ore,
    Building,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Tile {
    #[serde(rename = "type")]
    pub kind: TileKind,
    #[serde(default)]
    pub ore: bool,
    #[serde(default, rename = "seedCrystal")]
    pub seed_crystal: bool,
}

impl Tile {
    pub fn new(kind: TileKind) -> Self {
        Self {
            kind,
            ore: kind == TileKind::Ore,
            seed_crystal: false,
        }
    }
}

/// Row-major tile grid. The JS host sends `grid[y][x]`, which
/// `from_rows` flattens.
#[derive(Clone)]
pub struct TileGrid {
    pub width: i32,
    pub height: i32,
    tiles: Vec<Tile>,
}

impl TileGrid {
    pub fn new(width: i32, height: i32, fill: Tile) -> Self {
        Self {
            width,
            height,
            tiles: vec![fill; (width * height).max(0) as usize],
        }
    }

    pub fn empty() -> Self {
        Self::new(0, 0, Tile::new(TileKind::Land))
    }

    /// Builds a grid from nested rows; ragged input is truncated to the
    /// first row's width.
    pub fn from_rows(rows: Vec<Vec<Tile>>) -> Self {
        let height = rows.len() as i32;
        let width = rows.first().map_or(0, |r| r.len()) as i32;
        let mut grid = Self::new(width, height, Tile::new(TileKind::Land));
        for (y, row) in rows.into_iter().enumerate() {
            for (x, tile) in row.into_iter().take(width as usize).enumerate() {
                grid.tiles[y * width as usize + x] = tile;
            }
        }
        grid
    }

    pub fn in_bounds(&self, pos: IVec2) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    pub fn get(&self, pos: IVec2) -> Option<&Tile> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some(&self.tiles[(pos.y * self.width + pos.x) as usize])
    }

    pub fn set(&mut self, pos: IVec2, tile: Tile) {
        if self.in_bounds(pos) {
            self.tiles[(pos.y * self.width + pos.x) as usize] = tile;
        }
    }

    /// Water, rock and building tiles are hard blockers; everything else
    /// (land, street, ore) can be walked on.
    pub fn is_passable(&self, pos: IVec2) -> bool {
        match self.get(pos) {
            Some(tile) => !matches!(
                tile.kind,
                TileKind::Water | TileKind::Rock | TileKind::Building
            ),
            None => false,
        }
    }

    pub fn is_street(&self, pos: IVec2) -> bool {
        matches!(self.get(pos), Some(t) if t.kind == TileKind::Street)
    }
}

// ============================================================================
// Locations
// ============================================================================

/// A point of interest on the map: either a single tile or a building
/// footprint. Everything that enters the pathfinder goes through
/// `tile_center` first, so there is exactly one coordinate convention
/// downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    Tile { x: i32, y: i32 },
    AreaRect { x: i32, y: i32, w: i32, h: i32 },
}

impl Location {
    pub fn tile_center(&self) -> IVec2 {
        match *self {
            Location::Tile { x, y } => IVec2::new(x, y),
            Location::AreaRect { x, y, w, h } => IVec2::new(x + w / 2, y + h / 2),
        }
    }
}

/// Factory descriptor as delivered by the building layer. Only consumed at
/// graph-build time.
#[derive(Clone, Debug, Deserialize)]
pub struct Factory {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub owner: String,
}

impl Factory {
    pub fn location(&self) -> Location {
        Location::AreaRect {
            x: self.x,
            y: self.y,
            w: self.width,
            h: self.height,
        }
    }

    pub fn contains(&self, pos: IVec2) -> bool {
        pos.x >= self.x
            && pos.x < self.x + self.width
            && pos.y >= self.y
            && pos.y < self.y + self.height
    }
}

/// The slice of a unit the navigation layer cares about. Extra simulation
/// fields in the JSON payload are ignored.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Unit {
    #[serde(rename = "tileX")]
    pub tile_x: i32,
    #[serde(rename = "tileY")]
    pub tile_y: i32,
}

// ============================================================================
// Occupancy
// ============================================================================

/// Per-tile "a unit currently stands here" snapshot. Ephemeral: rebuilt
/// from the unit list each planning cycle, never stored across ticks.
#[derive(Clone)]
pub struct OccupancyMap {
    pub width: i32,
    pub height: i32,
    occupied: Vec<bool>,
}

impl OccupancyMap {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            occupied: vec![false; (width * height).max(0) as usize],
        }
    }

    /// Marks each unit's tile. Units reporting coordinates outside the grid
    /// are skipped rather than clamped onto a border tile.
    pub fn build(units: &[Unit], grid: &TileGrid) -> Self {
        let mut map = Self::new(grid.width, grid.height);
        for unit in units {
            map.set(IVec2::new(unit.tile_x, unit.tile_y), true);
        }
        map
    }

    pub fn set(&mut self, pos: IVec2, value: bool) {
        if pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height {
            self.occupied[(pos.y * self.width + pos.x) as usize] = value;
        }
    }

    /// Out-of-bounds queries read as free; bounds rejection is the
    /// pathfinder's job.
    pub fn is_occupied(&self, pos: IVec2) -> bool {
        if pos.x < 0 || pos.x >= self.width || pos.y < 0 || pos.y >= self.height {
            return false;
        }
        self.occupied[(pos.y * self.width + pos.x) as usize]
    }
}

// ============================================================================
// Test helpers
// ============================================================================


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passability_by_kind() {
        let grid = testgrid::grid(&["..w", "rbs", "o.x"]);
        assert!(grid.is_passable(IVec2::new(0, 0)));
        assert!(grid.is_passable(IVec2::new(2, 1))); // street
        assert!(grid.is_passable(IVec2::new(0, 2))); // ore
        assert!(grid.is_passable(IVec2::new(2, 2))); // seed crystal is still ore terrain
        assert!(!grid.is_passable(IVec2::new(2, 0))); // water
        assert!(!grid.is_passable(IVec2::new(0, 1))); // rock
        assert!(!grid.is_passable(IVec2::new(1, 1))); // building
        assert!(!grid.is_passable(IVec2::new(-1, 0)));
        assert!(!grid.is_passable(IVec2::new(3, 0)));
    }

    #[test]
    fn occupancy_builder_marks_unit_tiles() {
        let grid = testgrid::grid(&["....", "....", "...."]);
        let units = [
            Unit { tile_x: 1, tile_y: 2 },
            Unit { tile_x: 3, tile_y: 0 },
        ];
        let occ = OccupancyMap::build(&units, &grid);
        assert!(occ.is_occupied(IVec2::new(1, 2)));
        assert!(occ.is_occupied(IVec2::new(3, 0)));
        assert!(!occ.is_occupied(IVec2::new(0, 0)));
    }

    #[test]
    fn occupancy_builder_ignores_out_of_range_units() {
        let grid = testgrid::grid(&["..", ".."]);
        let units = [
            Unit { tile_x: -1, tile_y: 0 },
            Unit { tile_x: 5, tile_y: 5 },
            Unit { tile_x: 1, tile_y: 1 },
        ];
        let occ = OccupancyMap::build(&units, &grid);
        assert!(occ.is_occupied(IVec2::new(1, 1)));
        // Nothing leaked onto a border tile.
        assert!(!occ.is_occupied(IVec2::new(0, 0)));
        assert!(!occ.is_occupied(IVec2::new(1, 0)));
        assert!(!occ.is_occupied(IVec2::new(0, 1)));
    }

    #[test]
    fn area_rect_converts_to_tile_center() {
        let loc = Location::AreaRect { x: 4, y: 4, w: 2, h: 2 };
        assert_eq!(loc.tile_center(), IVec2::new(5, 5));
        let tile = Location::Tile { x: 7, y: 3 };
        assert_eq!(tile.tile_center(), IVec2::new(7, 3));
    }

    #[test]
    fn tile_descriptor_parses_camel_case_json() {
        let tile: Tile =
            serde_json::from_str(r#"{"type":"ore","ore":true,"seedCrystal":true}"#).unwrap();
        assert_eq!(tile.kind, TileKind::Ore);
        assert!(tile.seed_crystal);
        let plain: Tile = serde_json::from_str(r#"{"type":"land"}"#).unwrap();
        assert_eq!(plain.kind, TileKind::Land);
        assert!(!plain.ore);
    }
}
