use crate::map::{OccupancyMap, TileGrid};
use glam::IVec2;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

pub const DIRS: [IVec2; 4] = [
    IVec2::new(0, -1),
    IVec2::new(0, 1),
    IVec2::new(-1, 0),
    IVec2::new(1, 0),
];

/// Frontier entry. Ordered on `f` with `h` as secondary key, so equally
/// priced tiles pop in a reproducible goal-first order.
#[derive(Copy, Clone, PartialEq, Eq)]
struct State {
    f: u32,
    h: u32,
    pos: IVec2,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so reverse for min-heap behavior.
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| (other.pos.y, other.pos.x).cmp(&(self.pos.y, self.pos.x)))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn manhattan(a: IVec2, b: IVec2) -> u32 {
    ((a.x - b.x).abs() + (a.y - b.y).abs()) as u32
}

/// Shortest tile path from `start` to `end`, both endpoints included.
/// Returns an empty vec when no path exists; that is the only failure
/// signal, callers treat empty as "cannot move now".
///
/// Water, rock and building tiles never pass. With an occupancy map, a tile
/// holding a unit also blocks, except when it is the destination itself —
/// the mover is expected to arrive as the occupant leaves.
///
/// A closed tile is never reopened, even if a cheaper route to it turns up
/// later. Step cost is uniform, so the result stays optimal on real maps,
/// and the rest of the game is tuned to the movement this produces.
pub fn find_path(
    start: IVec2,
    end: IVec2,
    grid: &TileGrid,
    occupancy: Option<&OccupancyMap>,
) -> Vec<IVec2> {
    if !grid.is_passable(start) || !grid.is_passable(end) {
        return Vec::new();
    }
    if start == end {
        return vec![start];
    }

    let mut open = BinaryHeap::new();
    let mut closed: HashSet<IVec2> = HashSet::new();
    let mut came_from: HashMap<IVec2, IVec2> = HashMap::new();
    let mut g_score: HashMap<IVec2, u32> = HashMap::new();

    let start_h = manhattan(start, end);
    g_score.insert(start, 0);
    open.push(State { f: start_h, h: start_h, pos: start });

    while let Some(State { pos, .. }) = open.pop() {
        if pos == end {
            return reconstruct(&came_from, pos);
        }
        // Stale heap entry for an already-closed tile.
        if !closed.insert(pos) {
            continue;
        }

        let g = g_score[&pos];
        for dir in DIRS {
            let next = pos + dir;
            if closed.contains(&next) || !grid.is_passable(next) {
                continue;
            }
            if let Some(occ) = occupancy {
                if occ.is_occupied(next) && next != end {
                    continue;
                }
            }

            let tentative = g + 1;
            if matches!(g_score.get(&next), Some(&known) if known <= tentative) {
                continue;
            }
            g_score.insert(next, tentative);
            came_from.insert(next, pos);
            let h = manhattan(next, end);
            open.push(State { f: tentative + h, h, pos: next });
        }
    }

    Vec::new()
}

fn reconstruct(came_from: &HashMap<IVec2, IVec2>, goal: IVec2) -> Vec<IVec2> {
    let mut path = vec![goal];
    let mut curr = goal;
    while let Some(&prev) = came_from.get(&curr) {
        path.push(prev);
        curr = prev;
    }
    path.reverse();
    path
}
