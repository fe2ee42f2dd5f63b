use crate::biome::percentile;
use crate::config::RiverSettings;
use crate::error::{MapError, Result};
use crate::grid::{Coord, HexGrid};
use log::{debug, info};
use petgraph::graphmap::DiGraphMap;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{BTreeSet, HashSet};

/// Направленный сегмент реки: вода течёт из первой клетки во вторую (строго ниже)
pub type Segment = (Coord, Coord);

/// Речная сеть — объединение сегментов всех рек без повторов
#[derive(Debug, Clone, Default)]
pub struct RiverNetwork {
    segments: Vec<Segment>,
    index: HashSet<Segment>,
    seeds: Vec<Coord>,
    max_depth: usize,
}

impl RiverNetwork {
    fn push(&mut self, segment: Segment, depth: usize) {
        if self.index.insert(segment) {
            self.segments.push(segment);
        }
        self.max_depth = self.max_depth.max(depth);
    }

    /// Добавляет сегменты другой сети, пропуская уже известные
    pub fn merge(&mut self, other: RiverNetwork) {
        for segment in other.segments {
            if self.index.insert(segment) {
                self.segments.push(segment);
            }
        }
        self.seeds.extend(other.seeds);
        self.max_depth = self.max_depth.max(other.max_depth);
    }

    /// Сегменты в порядке генерации
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Истоки, от которых действительно трассировались реки (в порядке выбора)
    ///
    /// В отличие от [`RiverNetwork::sources`] сюда попадает и исток, оказавшийся
    /// на русле другой реки или в локальном минимуме.
    #[must_use]
    pub fn seeds(&self) -> &[Coord] {
        &self.seeds
    }

    /// Наибольшее число сегментов от истока до любой клетки сети
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Истоки: клетки, в которые не впадает ни один сегмент
    #[must_use]
    pub fn sources(&self) -> Vec<Coord> {
        let targets: HashSet<Coord> = self.segments.iter().map(|&(_, to)| to).collect();
        self.segments
            .iter()
            .map(|&(from, _)| from)
            .filter(|c| !targets.contains(c))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Устья: клетки, из которых не вытекает ни один сегмент
    #[must_use]
    pub fn mouths(&self) -> Vec<Coord> {
        let origins: HashSet<Coord> = self.segments.iter().map(|&(from, _)| from).collect();
        self.segments
            .iter()
            .map(|&(_, to)| to)
            .filter(|c| !origins.contains(c))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    #[must_use]
    pub fn to_graph(&self) -> DiGraphMap<Coord, ()> {
        DiGraphMap::from_edges(self.segments.iter().copied())
    }

    /// Отмечает оба конца каждого сегмента как клетки реки
    pub fn apply_to(&self, grid: &mut HexGrid) -> Result<()> {
        for &(from, to) in &self.segments {
            grid.mark_river(from)?;
            grid.mark_river(to)?;
        }
        Ok(())
    }
}

/// Кадр явного стека трассировки
enum Frame {
    /// Спуститься из клетки
    Visit {
        at: Coord,
        probability: f64,
        depth: usize,
    },
    /// Решить судьбу оставшихся спусков клетки `from` после основного русла
    Branches {
        from: Coord,
        pending: Vec<Coord>,
        probability: f64,
        depth: usize,
    },
}

/// Прокладывает реку с ответвлениями от `start` вниз по склону
///
/// Основное русло всегда идёт в самого низкого из строго более низких
/// непосещённых соседей (при равенстве — первого в порядке [`HexGrid::neighbors`]).
/// Каждый остальной спуск становится ответвлением с вероятностью `branch_probability`;
/// внутри ответвления вероятность умножается на `branch_decay`.
///
/// Обход идёт в том же порядке, что и рекурсивный спуск (сначала основное русло
/// целиком, затем ответвления), но на явном стеке. Посещённые клетки в `visited`
/// не посещаются повторно, поэтому у каждой клетки не больше одного входящего сегмента.
pub fn trace_river<R: Rng + ?Sized>(
    grid: &HexGrid,
    start: Coord,
    branch_probability: f64,
    branch_decay: f64,
    visited: &mut HashSet<Coord>,
    rng: &mut R,
) -> Result<RiverNetwork> {
    grid.elevation(start)?;
    for (name, value) in [
        ("branch_probability", branch_probability),
        ("branch_decay", branch_decay),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(MapError::InvalidConfiguration(format!(
                "{name} должна лежать в [0, 1], получено {value}"
            )));
        }
    }

    let elevations = grid.elevations();
    let height_of = |c: Coord| elevations[grid.index_unchecked(c)];

    let mut network = RiverNetwork::default();
    let mut stack = vec![Frame::Visit {
        at: start,
        probability: branch_probability,
        depth: 0,
    }];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Visit {
                at,
                probability,
                depth,
            } => {
                if !visited.insert(at) {
                    continue;
                }
                let here = height_of(at);
                let mut downhill: Vec<Coord> = grid
                    .neighbors_unchecked(at)
                    .into_iter()
                    .filter(|&n| height_of(n) < here && !visited.contains(&n))
                    .collect();

                // Локальный минимум — река заканчивается
                let Some(primary_pos) = downhill
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| height_of(**a).total_cmp(&height_of(**b)))
                    .map(|(pos, _)| pos)
                else {
                    continue;
                };
                let primary = downhill.remove(primary_pos);
                network.push((at, primary), depth + 1);

                if !downhill.is_empty() {
                    downhill.reverse();
                    stack.push(Frame::Branches {
                        from: at,
                        pending: downhill,
                        probability,
                        depth,
                    });
                }
                stack.push(Frame::Visit {
                    at: primary,
                    probability,
                    depth: depth + 1,
                });
            }
            Frame::Branches {
                from,
                mut pending,
                probability,
                depth,
            } => {
                let Some(next) = pending.pop() else {
                    continue;
                };
                if !pending.is_empty() {
                    stack.push(Frame::Branches {
                        from,
                        pending,
                        probability,
                        depth,
                    });
                }
                // Жребий бросается всегда, даже если клетку уже заняло основное русло
                if rng.gen_bool(probability) && !visited.contains(&next) {
                    network.push((from, next), depth + 1);
                    stack.push(Frame::Visit {
                        at: next,
                        probability: probability * branch_decay,
                        depth: depth + 1,
                    });
                }
            }
        }
    }

    Ok(network)
}

/// Строит речную сеть от случайных высоких истоков
///
/// Истоки выбираются среди клеток леса и гор выше перцентиля
/// `high_point_percentile`; их количество `max(min_rivers, high_points / seed_divisor)`.
/// Соседи выбранного истока помечаются как занятые, чтобы следующий исток
/// не оказался вплотную.
pub fn generate_rivers<R: Rng + ?Sized>(
    grid: &HexGrid,
    settings: &RiverSettings,
    rng: &mut R,
) -> Result<RiverNetwork> {
    if settings.seed_divisor == 0 {
        return Err(MapError::InvalidConfiguration(
            "seed_divisor должен быть положительным".into(),
        ));
    }

    let threshold = percentile(grid.elevations(), settings.high_point_percentile);
    let high_points: Vec<Coord> = grid
        .coords()
        .filter(|&c| {
            let idx = grid.index_unchecked(c);
            grid.biomes()[idx].is_highland() && grid.elevations()[idx] > threshold
        })
        .collect();

    let river_count = settings
        .min_rivers
        .max(high_points.len() / settings.seed_divisor);
    info!(
        "Генерация {river_count} рек из {} высоких точек (порог {threshold:.2})",
        high_points.len()
    );

    let mut used: HashSet<Coord> = HashSet::new();
    let mut network = RiverNetwork::default();

    for _ in 0..river_count {
        let available: Vec<Coord> = high_points
            .iter()
            .copied()
            .filter(|c| !used.contains(c))
            .collect();
        let Some(&start) = available.choose(rng) else {
            break;
        };

        used.insert(start);
        used.extend(grid.neighbors_unchecked(start));

        let mut visited = HashSet::new();
        let river = trace_river(
            grid,
            start,
            settings.branch_probability,
            settings.branch_decay,
            &mut visited,
            rng,
        )?;
        debug!("исток {start:?}: {} сегментов", river.len());
        network.merge(river);
        network.seeds.push(start);
    }

    Ok(network)
}

/// Самый длинный строго нисходящий путь от `start` (включая саму клетку)
///
/// Клетки обрабатываются от низких к высоким, так что длина пути у всех более
/// низких соседей уже известна. При равной длине выбирается первый сосед.
pub fn longest_descent(grid: &HexGrid, start: Coord) -> Result<Vec<Coord>> {
    grid.elevation(start)?;
    let elevations = grid.elevations();

    let mut order: Vec<usize> = (0..elevations.len()).collect();
    order.sort_by(|&a, &b| elevations[a].total_cmp(&elevations[b]));

    let mut length = vec![1usize; elevations.len()];
    let mut next: Vec<Option<usize>> = vec![None; elevations.len()];

    for &idx in &order {
        for n in grid.neighbors_unchecked(grid.coord_at(idx)) {
            let nidx = grid.index_unchecked(n);
            if elevations[nidx] < elevations[idx] && length[nidx] + 1 > length[idx] {
                length[idx] = length[nidx] + 1;
                next[idx] = Some(nidx);
            }
        }
    }

    let mut path = vec![start];
    let mut current = grid.index_unchecked(start);
    while let Some(n) = next[current] {
        path.push(grid.coord_at(n));
        current = n;
    }
    Ok(path)
}
