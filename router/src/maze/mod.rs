mod distance;

pub use distance::DestinationDistance;

use crate::control::AutorouteControl;
use crate::engine::AutorouteEngine;
use crate::error::AutorouteError;
use crate::rooms::{DoorId, RoomId, RoomKind, TRACE_TOLERANCE};
use pcb_common::db::core::ItemKind;
use pcb_common::db::indices::ItemId;
use pcb_common::geom::{FloatLine, FloatPoint, IntBox, TileShape};
use pcb_common::util::config::AngleRestriction;
use priority_queue::PriorityQueue;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, HashMap};

/// Something the search can pass through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Expandable {
    Door(DoorId),
    /// Drill `index` of a drill page.
    Drill { page: usize, index: usize },
    /// The drills of a page reachable from one room.
    DrillPage { page: usize, room: RoomId },
}

/// An expandable object together with its section number. Drill sections
/// are layers counted from the first drill layer.
pub type SectionKey = (Expandable, usize);

/// Cost of passing through an already ripped obstacle room.
const ALREADY_RIPPED_COSTS: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Cost(f64);

impl Eq for Cost {}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Clone, Debug)]
struct SearchElement {
    backtrack: Option<SectionKey>,
    expansion_value: f64,
    sorting_value: f64,
    /// Where the trace enters the section.
    shape_entry: FloatLine,
    layer: usize,
    /// Room on the far side of the section.
    next_room: Option<RoomId>,
    from_room: Option<RoomId>,
    /// Leaving `from_room` rips up its item.
    room_ripped: bool,
}

/// One step of a found connection, ordered from the start.
#[derive(Clone, Debug)]
pub struct BacktrackElement {
    pub object: Expandable,
    pub section: usize,
    pub layer: usize,
    pub next_room: Option<RoomId>,
    pub from_room: Option<RoomId>,
    pub shape_entry: FloatLine,
}

#[derive(Clone, Debug)]
pub struct MazeResult {
    /// From the start target door to the destination target door.
    pub backtrack: Vec<BacktrackElement>,
    /// Items whose obstacle rooms the connection passes through.
    pub ripped: BTreeSet<ItemId>,
}

/// Outcome of one maze search.
#[derive(Clone, Debug)]
pub enum MazeOutcome {
    Found(MazeResult),
    /// The frontier ran empty or the search was stopped. `ripped` holds the
    /// items whose obstacle rooms the search entered so far.
    NotFound { ripped: BTreeSet<ItemId>, stopped: bool },
}

impl MazeOutcome {
    pub fn found(self) -> Option<MazeResult> {
        match self {
            MazeOutcome::Found(result) => Some(result),
            MazeOutcome::NotFound { .. } => None,
        }
    }
}

/// Runs the maze search from the `start` to the `dest` items of the
/// current net.
pub fn find_connection(
    engine: &mut AutorouteEngine,
    ctrl: &AutorouteControl,
    start: &BTreeSet<ItemId>,
    dest: &BTreeSet<ItemId>,
) -> Result<MazeOutcome, AutorouteError> {
    let mut search = MazeSearch {
        engine,
        ctrl,
        queue: PriorityQueue::new(),
        pending: HashMap::new(),
        occupied: HashMap::new(),
        destination_distance: DestinationDistance::new(ctrl),
    };
    let stopped = match search.init(start, dest).and_then(|()| search.occupy_next_element()) {
        Ok(Some(key)) => return Ok(MazeOutcome::Found(search.backtrack(key))),
        Ok(None) => false,
        Err(AutorouteError::Stopped) => true,
        Err(e) => return Err(e),
    };
    Ok(MazeOutcome::NotFound {
        ripped: search.entered_obstacles(),
        stopped,
    })
}

struct MazeSearch<'a> {
    engine: &'a mut AutorouteEngine,
    ctrl: &'a AutorouteControl,
    queue: PriorityQueue<SectionKey, Reverse<Cost>>,
    pending: HashMap<SectionKey, SearchElement>,
    occupied: HashMap<SectionKey, SearchElement>,
    destination_distance: DestinationDistance,
}

impl MazeSearch<'_> {
    fn init(&mut self, start: &BTreeSet<ItemId>, dest: &BTreeSet<ItemId>) -> Result<(), AutorouteError> {
        for item in dest {
            self.engine.item_info.set_start_info(*item, false);
        }
        for item in start {
            self.engine.item_info.set_start_info(*item, true);
        }
        self.engine.refresh_target_doors();

        for id in dest {
            let Some(item) = self.engine.board.item(*id) else {
                continue;
            };
            for tile in 0..item.tile_count() {
                let shape = self.engine.board.tree_shape(item, tile).bounding_box();
                self.destination_distance.join(&shape, item.tile_layer(tile));
            }
        }

        let geometry = self.engine.geometry();
        let board_shape = geometry.convert(&TileShape::Box(self.engine.board.bounding_box));
        let mut start_rooms: BTreeSet<RoomId> = self
            .engine
            .graph
            .doors()
            .filter_map(|(_, door)| {
                let (item, _) = door.target()?;
                (self.engine.item_info.start_info(item) == Some(true)).then_some(door.rooms().0)
            })
            .collect();
        for id in start {
            let Some(item) = self.engine.board.item(*id) else {
                continue;
            };
            let tiles: Vec<(usize, TileShape)> = (0..item.tile_count())
                .map(|tile| (item.tile_layer(tile), item.tile_shape(tile)))
                .filter(|(layer, _)| self.ctrl.layer_active[*layer])
                .collect();
            for (layer, shape) in tiles {
                let contained = geometry.convert(&shape);
                let incomplete = self.engine.add_incomplete_room(board_shape.clone(), layer, contained);
                start_rooms.extend(self.engine.complete_expansion_room(incomplete, self.ctrl)?);
            }
        }

        for room in start_rooms {
            let Some(r) = self.engine.graph.room(room) else {
                continue;
            };
            let layer = r.layer;
            let room_shape = r.shape.clone();
            let doors = r.doors.clone();
            for door in doors {
                let Some(d) = self.engine.graph.door(door) else {
                    continue;
                };
                let Some((item, tile)) = d.target() else {
                    continue;
                };
                if self.engine.item_info.start_info(item) != Some(true) {
                    continue;
                }
                let connection = self
                    .engine
                    .board
                    .item(item)
                    .map(|i| i.tile_shape(tile).intersection(&room_shape))
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| d.shape.clone());
                let centre = connection.centre_of_gravity();
                let element = SearchElement {
                    backtrack: None,
                    expansion_value: 0.0,
                    sorting_value: self.destination_distance.calculate(centre, layer),
                    shape_entry: FloatLine::point(centre),
                    layer,
                    next_room: Some(room),
                    from_room: None,
                    room_ripped: false,
                };
                self.push((Expandable::Door(door), 0), element);
            }
        }
        Ok(())
    }

    fn push(&mut self, key: SectionKey, element: SearchElement) {
        if self.occupied.contains_key(&key) {
            return;
        }
        if let Some(existing) = self.pending.get(&key) {
            if existing.sorting_value <= element.sorting_value {
                return;
            }
        }
        self.queue.push(key, Reverse(Cost(element.sorting_value)));
        self.pending.insert(key, element);
    }

    /// Expands the cheapest frontier elements until a destination door is
    /// occupied or the frontier runs empty.
    fn occupy_next_element(&mut self) -> Result<Option<SectionKey>, AutorouteError> {
        loop {
            if self.engine.is_stop_requested() {
                return Err(AutorouteError::Stopped);
            }
            let Some((key, _)) = self.queue.pop() else {
                return Ok(None);
            };
            let Some(element) = self.pending.remove(&key) else {
                continue;
            };
            self.engine.count_expansion();
            self.occupied.insert(key, element.clone());

            match key.0 {
                Expandable::DrillPage { page, room } => {
                    self.expand_to_drills_of_page(page, room, &element)?;
                    continue;
                }
                Expandable::Door(door) => {
                    if self.is_destination_door(door) {
                        return Ok(Some(key));
                    }
                }
                Expandable::Drill { page, index } => {
                    let from_drill = matches!(element.backtrack, Some((Expandable::Drill { .. }, _)));
                    if !from_drill {
                        self.expand_to_other_layers(page, index, key, &element)?;
                        continue;
                    }
                }
            }
            if let Some(room) = element.next_room {
                self.expand_to_room_doors(room, key, &element)?;
            }
        }
    }

    fn is_destination_door(&self, door: DoorId) -> bool {
        self.engine
            .graph
            .door(door)
            .and_then(|d| d.target())
            .is_some_and(|(item, _)| self.engine.item_info.start_info(item) == Some(false))
    }

    fn is_obstacle_room(&self, room: Option<RoomId>) -> bool {
        room.and_then(|r| self.engine.graph.room(r))
            .is_some_and(|r| r.is_obstacle())
    }

    fn expand_to_room_doors(
        &mut self,
        room: RoomId,
        key: SectionKey,
        element: &SearchElement,
    ) -> Result<(), AutorouteError> {
        let Some(r) = self.engine.graph.room(room) else {
            return Ok(());
        };
        let layer = r.layer;
        if !self.ctrl.layer_active[layer] {
            return Ok(());
        }
        let chw = self.ctrl.compensated_trace_half_width[layer];
        let entry_door = match key.0 {
            Expandable::Door(door) => Some(door),
            _ => None,
        };
        let from_door_small = entry_door.is_some_and(|d| self.door_is_small(d, 2 * chw));

        self.engine.complete_neighbour_rooms(room, self.ctrl)?;

        let Some(r) = self.engine.graph.room(room) else {
            return Ok(());
        };
        let is_obstacle = r.is_obstacle();
        let doors = r.doors.clone();
        let leaving_obstacle = self.is_obstacle_room(element.from_room);
        let thick = self.room_is_thick(room, element.shape_entry.middle());

        let ripup_costs = if is_obstacle {
            let costs = self.check_ripup(room, element);
            if !self.ctrl.ripup_allowed || costs < 0.0 {
                return Ok(());
            }
            costs
        } else {
            0.0
        };

        if !from_door_small || leaving_obstacle {
            self.expand_to_target_doors(room, &doors, entry_door, key, element, ripup_costs);
        }
        if !is_obstacle && from_door_small && !leaving_obstacle {
            return Ok(());
        }

        let mut expanded = false;
        for door in doors {
            if Some(door) == entry_door {
                continue;
            }
            if self.engine.graph.door(door).is_none_or(|d| d.is_target()) {
                continue;
            }
            expanded |= self.expand_to_door(door, room, layer, key, element, ripup_costs, thick);
        }

        let from_drill = matches!(key.0, Expandable::Drill { .. });
        if self.ctrl.vias_allowed && !is_obstacle && !from_drill && (expanded || thick) {
            let bounds = self
                .engine
                .graph
                .room(room)
                .map(|r| r.shape.bounding_box())
                .unwrap_or(IntBox::EMPTY);
            for page in self.engine.drill_pages.overlapping_pages(&bounds) {
                self.expand_to_drill_page(page, room, layer, key, element);
            }
        }
        Ok(())
    }

    /// A door too narrow for a trace of the given width.
    fn door_is_small(&self, door: DoorId, trace_width: i64) -> bool {
        let graph = &self.engine.graph;
        let Some(d) = graph.door(door) else {
            return false;
        };
        let (first, second) = d.rooms();
        let Some(second) = second else {
            return false;
        };
        let both_free = [first, second]
            .iter()
            .all(|r| graph.room(*r).is_some_and(|r| r.is_free_space()));
        if d.dimension != 1 && !both_free {
            return false;
        }
        let length = match self.ctrl.angle_restriction {
            AngleRestriction::NinetyDegree => d.shape.bounding_box().max_width() as f64,
            AngleRestriction::FortyFiveDegree => d.shape.bounding_octagon().max_width(),
            AngleRestriction::None => d.segment().length(),
        };
        length < trace_width as f64
    }

    /// A room a trace can cross near `entry` without hitting its border.
    fn room_is_thick(&self, room: RoomId, entry: FloatPoint) -> bool {
        let Some(r) = self.engine.graph.room(room) else {
            return false;
        };
        let chw = self.ctrl.compensated_trace_half_width[r.layer];
        match r.kind {
            RoomKind::Obstacle { item, .. } => {
                let Some(item) = self.engine.board.item(item) else {
                    return false;
                };
                match item.kind {
                    ItemKind::Trace { half_width, .. } => {
                        half_width + self.engine.board.compensation(item) >= chw
                    }
                    _ => r.shape.min_width() >= 2.0 * chw as f64,
                }
            }
            _ => {
                r.shape.min_width() >= 2.0 * chw as f64
                    && second_nearest_border_distance(&r.shape, entry) > (chw + TRACE_TOLERANCE) as f64
            }
        }
    }

    fn expand_to_target_doors(
        &mut self,
        room: RoomId,
        doors: &[DoorId],
        entry_door: Option<DoorId>,
        key: SectionKey,
        element: &SearchElement,
        add_costs: f64,
    ) {
        let Some(r) = self.engine.graph.room(room) else {
            return;
        };
        let layer = r.layer;
        let room_shape = r.shape.clone();
        let costs = self.ctrl.trace_costs[layer];
        let entry = element.shape_entry.middle();
        for &door in doors {
            if Some(door) == entry_door || !self.is_destination_door(door) {
                continue;
            }
            let Some(d) = self.engine.graph.door(door) else {
                continue;
            };
            let Some((item, tile)) = d.target() else {
                continue;
            };
            let target = self
                .engine
                .board
                .item(item)
                .map(|i| i.tile_shape(tile).intersection(&room_shape))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| d.shape.clone());
            let point = target.nearest_point(entry);
            let value = element.expansion_value
                + add_costs
                + point.weighted_distance(entry, costs.horizontal, costs.vertical);
            self.push(
                (Expandable::Door(door), 0),
                SearchElement {
                    backtrack: Some(key),
                    expansion_value: value,
                    sorting_value: value,
                    shape_entry: FloatLine::point(point),
                    layer,
                    next_room: None,
                    from_room: Some(room),
                    room_ripped: add_costs > 0.0,
                },
            );
        }
    }

    /// Ripup cost of passing through an obstacle room, negative if the item
    /// may not be ripped.
    fn check_ripup(&self, room: RoomId, element: &SearchElement) -> f64 {
        let Some((item, _)) = self.engine.graph.room(room).and_then(|r| r.obstacle_item()) else {
            return -1.0;
        };
        let Some(board_item) = self.engine.board.item(item) else {
            return -1.0;
        };
        if !board_item.is_routable() {
            return -1.0;
        }
        let from_same_item = element
            .from_room
            .and_then(|r| self.engine.graph.room(r))
            .and_then(|r| r.obstacle_item())
            .is_some_and(|(other, _)| other == item);
        if from_same_item {
            return ALREADY_RIPPED_COSTS;
        }
        let factor = match board_item.kind {
            ItemKind::Trace { half_width, .. } => half_width,
            ItemKind::Via { diameter, .. } => diameter / 2,
            _ => 1,
        };
        (self.ctrl.ripup_costs * factor as f64).round().max(1.0)
    }

    #[allow(clippy::too_many_arguments)]
    fn expand_to_door(
        &mut self,
        door: DoorId,
        room: RoomId,
        layer: usize,
        key: SectionKey,
        element: &SearchElement,
        add_costs: f64,
        thick: bool,
    ) -> bool {
        let graph = &self.engine.graph;
        let Some(d) = graph.door(door) else {
            return false;
        };
        let Some(next_room) = d.other_room(room) else {
            return false;
        };
        let hw = self.ctrl.trace_half_width[layer];
        let chw = self.ctrl.compensated_trace_half_width[layer];
        let sections = graph.section_segments(door, hw, (chw + TRACE_TOLERANCE) as f64);
        let between_free = d.dimension == 1
            && [room, next_room]
                .iter()
                .all(|r| graph.room(*r).is_some_and(|r| r.is_free_space()));
        let next_shape = graph.room(next_room).map(|r| r.shape.clone());

        let mut expanded = false;
        for (section, segment) in sections.iter().enumerate() {
            let key_to = (Expandable::Door(door), section);
            if self.occupied.contains_key(&key_to) {
                continue;
            }
            let entry = if thick {
                if between_free && sections.len() == 1 {
                    if let Some(next_shape) = &next_shape {
                        let narrow = next_shape.min_width() < 2.0 * chw as f64
                            || second_nearest_border_distance(next_shape, segment.middle())
                                <= (chw + TRACE_TOLERANCE) as f64;
                        if narrow {
                            continue;
                        }
                    }
                }
                *segment
            } else {
                match segment.segment_projection(&element.shape_entry) {
                    Some(projection) => projection,
                    None => continue,
                }
            };
            self.expand_to_door_section(key_to, entry, room, next_room, layer, key, element, add_costs);
            expanded = true;
        }
        expanded
    }

    #[allow(clippy::too_many_arguments)]
    fn expand_to_door_section(
        &mut self,
        key_to: SectionKey,
        entry: FloatLine,
        room: RoomId,
        next_room: RoomId,
        layer: usize,
        key: SectionKey,
        element: &SearchElement,
        add_costs: f64,
    ) {
        let costs = self.ctrl.trace_costs[layer];
        let value = element.expansion_value
            + add_costs
            + entry
                .middle()
                .weighted_distance(element.shape_entry.middle(), costs.horizontal, costs.vertical);
        let sorting_value = value + self.destination_distance.calculate(entry.middle(), layer);
        self.push(
            key_to,
            SearchElement {
                backtrack: Some(key),
                expansion_value: value,
                sorting_value,
                shape_entry: entry,
                layer,
                next_room: Some(next_room),
                from_room: Some(room),
                room_ripped: add_costs > 0.0,
            },
        );
    }

    fn expand_to_drill_page(&mut self, page: usize, room: RoomId, layer: usize, key: SectionKey, element: &SearchElement) {
        let key_to = (Expandable::DrillPage { page, room }, 0);
        if self.occupied.contains_key(&key_to) {
            return;
        }
        let Some(page_shape) = self.engine.drill_pages.page(page).map(|p| p.shape) else {
            return;
        };
        let costs = self.ctrl.trace_costs[layer];
        let entry = element.shape_entry.middle();
        let nearest = page_shape.nearest_point(entry);
        let value = element.expansion_value + self.ctrl.min_normal_via_cost;
        let sorting_value = value
            + nearest.weighted_distance(entry, costs.horizontal, costs.vertical)
            + self.destination_distance.calculate(nearest, layer);
        self.push(
            key_to,
            SearchElement {
                backtrack: Some(key),
                expansion_value: value,
                sorting_value,
                shape_entry: element.shape_entry,
                layer,
                next_room: Some(room),
                from_room: Some(room),
                room_ripped: false,
            },
        );
    }

    fn expand_to_drills_of_page(
        &mut self,
        page: usize,
        room: RoomId,
        element: &SearchElement,
    ) -> Result<(), AutorouteError> {
        let drills = self.engine.page_drills(page, self.ctrl)?;
        let layer = element.layer;
        let costs = self.ctrl.trace_costs[layer];
        let entry = element.shape_entry.middle();
        for (index, drill) in drills.iter().enumerate() {
            if drill.room(layer) != Some(room) {
                continue;
            }
            let key_to = (Expandable::Drill { page, index }, layer - drill.first_layer);
            if self.occupied.contains_key(&key_to) {
                continue;
            }
            let location = drill.location.to_float();
            let value = element.expansion_value + location.weighted_distance(entry, costs.horizontal, costs.vertical);
            let sorting_value = value + self.destination_distance.calculate(location, layer);
            self.push(
                key_to,
                SearchElement {
                    // the page itself is no step of the connection
                    backtrack: element.backtrack,
                    expansion_value: value,
                    sorting_value,
                    shape_entry: FloatLine::point(location),
                    layer,
                    next_room: None,
                    from_room: Some(room),
                    room_ripped: false,
                },
            );
        }
        Ok(())
    }

    fn expand_to_other_layers(
        &mut self,
        page: usize,
        index: usize,
        key: SectionKey,
        element: &SearchElement,
    ) -> Result<(), AutorouteError> {
        let drills = self.engine.page_drills(page, self.ctrl)?;
        let Some(drill) = drills.get(index) else {
            return Ok(());
        };
        let location = drill.location.to_float();
        let from_layer = element.layer;
        for to_layer in drill.first_layer..=drill.last_layer {
            if to_layer == from_layer || !self.ctrl.layer_active[to_layer] {
                continue;
            }
            let key_to = (Expandable::Drill { page, index }, to_layer - drill.first_layer);
            if self.occupied.contains_key(&key_to) {
                continue;
            }
            let Some(room) = drill.room(to_layer) else {
                continue;
            };
            if self.engine.graph.room(room).is_none() {
                continue;
            }
            let value = element.expansion_value + self.ctrl.add_via_costs[from_layer][to_layer];
            let sorting_value = value + self.destination_distance.calculate(location, to_layer);
            self.push(
                key_to,
                SearchElement {
                    backtrack: Some(key),
                    expansion_value: value,
                    sorting_value,
                    shape_entry: FloatLine::point(location),
                    layer: to_layer,
                    next_room: Some(room),
                    from_room: None,
                    room_ripped: false,
                },
            );
        }
        Ok(())
    }

    /// Items of the obstacle rooms reached by occupied elements.
    fn entered_obstacles(&self) -> BTreeSet<ItemId> {
        self.occupied
            .values()
            .filter_map(|element| element.next_room)
            .filter_map(|room| self.engine.graph.room(room)?.obstacle_item())
            .map(|(item, _)| item)
            .collect()
    }

    /// Follows the backtrack references from the occupied destination door
    /// back to the start.
    fn backtrack(&self, destination: SectionKey) -> MazeResult {
        let mut chain = Vec::new();
        let mut ripped = BTreeSet::new();
        let mut current = Some(destination);
        while let Some(key) = current {
            let Some(element) = self.occupied.get(&key) else {
                self.engine.anomaly(format_args!("backtrack reaches unoccupied {key:?}"));
                break;
            };
            if element.room_ripped {
                let item = element
                    .from_room
                    .and_then(|r| self.engine.graph.room(r))
                    .and_then(|r| r.obstacle_item());
                if let Some((item, _)) = item {
                    ripped.insert(item);
                }
            }
            chain.push(BacktrackElement {
                object: key.0,
                section: key.1,
                layer: element.layer,
                next_room: element.next_room,
                from_room: element.from_room,
                shape_entry: element.shape_entry,
            });
            if chain.len() > self.occupied.len() {
                self.engine.anomaly(format_args!("backtrack of {destination:?} is cyclic"));
                break;
            }
            current = element.backtrack;
        }
        chain.reverse();
        MazeResult {
            backtrack: chain,
            ripped,
        }
    }
}

/// Distance from `p` to the second nearest border segment of `shape`.
pub(crate) fn second_nearest_border_distance(shape: &TileShape, p: FloatPoint) -> f64 {
    let mut distances: Vec<f64> = (0..shape.border_line_count())
        .map(|i| shape.border_segment(i))
        .filter(|s| s.length() > 0.0)
        .map(|s| s.segment_distance(p))
        .collect();
    distances.sort_by(f64::total_cmp);
    distances.get(1).copied().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcb_common::db::core::{Board, FixedState, add_rect_pin, test_board};
    use pcb_common::util::config::AutorouteConfig;
    use rstest::rstest;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn search(board: Board, config: AutorouteConfig) -> (AutorouteEngine, AutorouteControl, Option<MazeResult>) {
        let net = board.net_id("A").unwrap();
        let ctrl = AutorouteControl::new(&board, net, &config);
        let start = BTreeSet::from([ItemId::new(0)]);
        let dest = BTreeSet::from([ItemId::new(1)]);
        let mut engine = AutorouteEngine::new(board, &config);
        engine.init_connection(net, Arc::new(AtomicBool::new(false)), None);
        let found = find_connection(&mut engine, &ctrl, &start, &dest).unwrap().found();
        (engine, ctrl, found)
    }

    #[test]
    fn second_nearest_border_of_a_box() {
        let shape = TileShape::Box(IntBox::new(0, 0, 100, 40));
        let d = second_nearest_border_distance(&shape, FloatPoint::new(0.0, 20.0));
        assert!((d - 20.0).abs() < 1e-9);
    }

    #[rstest]
    #[case(AngleRestriction::NinetyDegree)]
    #[case(AngleRestriction::FortyFiveDegree)]
    #[case(AngleRestriction::None)]
    fn finds_a_path_between_two_pins(#[case] restriction: AngleRestriction) {
        let mut board = test_board(1000, 1000);
        let net = board.add_net("A");
        add_rect_pin(&mut board, "a", net, IntBox::new(80, 480, 120, 520), (0, 0)).unwrap();
        add_rect_pin(&mut board, "b", net, IntBox::new(880, 480, 920, 520), (0, 0)).unwrap();
        let config = AutorouteConfig {
            angle_restriction: restriction,
            ..AutorouteConfig::default()
        };
        let (engine, _, found) = search(board, config);
        let found = found.unwrap();
        assert!(found.ripped.is_empty());
        assert!(found.backtrack.len() >= 2);
        let first = &found.backtrack[0];
        let last = found.backtrack.last().unwrap();
        assert!(first.from_room.is_none());
        let Expandable::Door(door) = last.object else {
            panic!("connection must end at a door");
        };
        assert_eq!(engine.graph().door(door).unwrap().target().unwrap().0, ItemId::new(1));
        assert!(engine.graph().doors_are_mutual());
    }

    #[test]
    fn blocked_destination_is_not_found() {
        let mut board = test_board(1000, 1000);
        let net = board.add_net("A");
        add_rect_pin(&mut board, "a", net, IntBox::new(80, 480, 120, 520), (0, 0)).unwrap();
        add_rect_pin(&mut board, "b", net, IntBox::new(880, 480, 920, 520), (0, 0)).unwrap();
        let wall = ItemKind::Keepout {
            shape: TileShape::Box(IntBox::new(480, 0, 520, 1000)),
            first_layer: 0,
            last_layer: 1,
        };
        board.add_item(wall, Vec::new(), FixedState::SystemFixed, 0).unwrap();
        let (_, _, found) = search(board, AutorouteConfig::default());
        assert!(found.is_none());
    }

    #[test]
    fn failed_search_reports_the_entered_obstacles() {
        let mut board = test_board(1000, 1000);
        let net = board.add_net("A");
        let other = board.add_net("B");
        add_rect_pin(&mut board, "a", net, IntBox::new(80, 480, 120, 520), (0, 0)).unwrap();
        add_rect_pin(&mut board, "b", net, IntBox::new(880, 480, 920, 520), (0, 0)).unwrap();
        for rect in [
            IntBox::new(480, 0, 520, 460),
            IntBox::new(480, 540, 520, 1000),
            IntBox::new(700, 0, 740, 1000),
        ] {
            let wall = ItemKind::Keepout {
                shape: TileShape::Box(rect),
                first_layer: 0,
                last_layer: 1,
            };
            board.add_item(wall, Vec::new(), FixedState::SystemFixed, 0).unwrap();
        }
        let via = ItemKind::Via {
            centre: pcb_common::geom::IntPoint::new(500, 500),
            diameter: 60,
            first_layer: 0,
            last_layer: 1,
        };
        let via = board.add_item(via, vec![other], FixedState::Unfixed, 0).unwrap();
        let config = AutorouteConfig {
            ripup_allowed: true,
            vias_allowed: false,
            ..AutorouteConfig::default()
        };
        let ctrl = AutorouteControl::new(&board, net, &config);
        let mut engine = AutorouteEngine::new(board, &config);
        engine.init_connection(net, Arc::new(AtomicBool::new(false)), None);
        let outcome = find_connection(
            &mut engine,
            &ctrl,
            &BTreeSet::from([ItemId::new(0)]),
            &BTreeSet::from([ItemId::new(1)]),
        )
        .unwrap();
        let MazeOutcome::NotFound { ripped, stopped } = outcome else {
            panic!("the wall behind the via blocks every path");
        };
        assert!(!stopped);
        assert_eq!(ripped, BTreeSet::from([via]));
        assert!(engine.board().item(via).is_some());
    }

    #[test]
    fn vias_lead_to_the_other_layer() {
        let mut board = test_board(1000, 1000);
        let net = board.add_net("A");
        add_rect_pin(&mut board, "a", net, IntBox::new(80, 480, 120, 520), (0, 0)).unwrap();
        add_rect_pin(&mut board, "b", net, IntBox::new(880, 480, 920, 520), (1, 1)).unwrap();
        let (engine, _, found) = search(board, AutorouteConfig::default());
        let found = found.unwrap();
        assert!(found
            .backtrack
            .iter()
            .any(|e| matches!(e.object, Expandable::Drill { .. })));
        assert_eq!(found.backtrack.last().unwrap().layer, 1);
        assert!(engine.validate());
    }
}
