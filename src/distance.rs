use crate::error::Result;
use crate::grid::{Coord, HexGrid};
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Кольца BFS вокруг `start`: расстояние в шагах → клетки ровно на этом расстоянии
///
/// Каждая клетка попадает только в одно кольцо — с минимальным расстоянием.
/// Расстояния, до которых не дошли (сетка кончилась), в результате отсутствуют;
/// `start` всегда лежит в кольце 0.
pub fn rings(
    grid: &HexGrid,
    start: Coord,
    max_distance: usize,
) -> Result<BTreeMap<usize, Vec<Coord>>> {
    grid.neighbors(start)?;

    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([(start, 0usize)]);
    let mut by_distance: BTreeMap<usize, Vec<Coord>> = BTreeMap::new();

    while let Some((current, distance)) = queue.pop_front() {
        by_distance.entry(distance).or_default().push(current);

        if distance < max_distance {
            for n in grid.neighbors_unchecked(current) {
                if visited.insert(n) {
                    queue.push_back((n, distance + 1));
                }
            }
        }
    }

    Ok(by_distance)
}
