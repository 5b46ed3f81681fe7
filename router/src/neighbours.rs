use crate::control::AutorouteControl;
use crate::engine::AutorouteEngine;
use crate::error::AutorouteError;
use crate::rooms::{DoorKind, ExpansionDoor, ExpansionRoom, RoomId, RoomKind};
use crate::search_tree::TreeObject;
use pcb_common::db::core::BoardError;
use pcb_common::db::indices::{ItemId, NetId};
use pcb_common::geom::{FloatLine, FloatPoint, IntPoint, Line, Simplex, TileShape};

/// Uncovered pieces of a room side shorter than this are ignored.
const MIN_GAP: f64 = 0.5;

/// An enlarged room must gain at least this much area.
const MIN_AREA_GAIN: f64 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NeighbourKind {
    /// Touches a side and gets a boundary door.
    Door,
    /// Touches a side of an obstacle room without a door.
    Cover,
    Target { item: ItemId, tile: usize },
    /// Overlaps an obstacle room of the same net.
    Overlap,
}

#[derive(Clone, Debug)]
struct Neighbour {
    object: TreeObject,
    shape: TileShape,
    kind: NeighbourKind,
    /// Touched side with the covered interval, measured from the side's first corner.
    side: Option<(usize, f64, f64)>,
}

impl Neighbour {
    fn covers(&self, side: usize) -> bool {
        matches!(self.kind, NeighbourKind::Door | NeighbourKind::Cover)
            && self.side.is_some_and(|(s, _, _)| s == side)
    }
}

fn side_param(border: &FloatLine, p: FloatPoint) -> f64 {
    let d = border.b - border.a;
    let len = d.length();
    if len == 0.0 {
        return 0.0;
    }
    ((p - border.a).scalar_product(d) / len).clamp(0.0, len)
}

fn point_along(border: &FloatLine, param: f64) -> FloatPoint {
    let len = border.length();
    if len == 0.0 {
        return border.a;
    }
    let t = param / len;
    FloatPoint::new(
        border.a.x + t * (border.b.x - border.a.x),
        border.a.y + t * (border.b.y - border.a.y),
    )
}

/// The side of `shape` touched by the 1-dimensional `common` part and the
/// interval it covers there.
fn touching_interval(shape: &TileShape, common: &TileShape) -> Option<(usize, f64, f64)> {
    let segment = common.diagonal_corner_segment()?;
    let side = shape.touching_side(&segment)?;
    let border = shape.border_segment(side);
    let a = side_param(&border, segment.a);
    let b = side_param(&border, segment.b);
    Some((side, a.min(b), a.max(b)))
}

fn sort_neighbours(neighbours: &mut [Neighbour]) {
    neighbours.sort_by(|a, b| {
        let key = |n: &Neighbour| n.side.map_or((usize::MAX, 0.0), |(s, from, _)| (s, from));
        let (sa, fa) = key(a);
        let (sb, fb) = key(b);
        sa.cmp(&sb).then(fa.total_cmp(&fb))
    });
}

impl AutorouteEngine {
    fn room_shape(&self, room: RoomId) -> Result<(TileShape, usize), AutorouteError> {
        let r = self.graph.room(room).ok_or(AutorouteError::MissingRoom(room))?;
        Ok((r.shape.clone(), r.layer))
    }

    fn on_board_border(&self, segment: &FloatLine) -> bool {
        TileShape::Box(self.board.bounding_box)
            .touching_side(segment)
            .is_some()
    }

    /// Finds the neighbours of a new complete room and creates its doors.
    /// Sides without any neighbour are pushed outwards first; the rest of
    /// each side not covered by a neighbour gets an incomplete room.
    pub(crate) fn calculate_doors(&mut self, room: RoomId, ctrl: &AutorouteControl) -> Result<(), AutorouteError> {
        let net = self.current_net()?;
        let mut iterations = 0;
        let (shape, layer, neighbours) = loop {
            let (shape, layer) = self.room_shape(room)?;
            let neighbours = self.free_room_neighbours(room, &shape, layer, net);
            let free_sides = self.sides_without_neighbours(&shape, &neighbours);
            if free_sides.is_empty() {
                break (shape, layer, neighbours);
            }
            if iterations >= ctrl.max_enlarge_iterations {
                log::warn!("{room:?} still has free sides after {iterations} enlargements");
                break (shape, layer, neighbours);
            }
            iterations += 1;
            let enlarged = free_sides
                .into_iter()
                .any(|side| self.enlarge_room(room, &shape, layer, side, net));
            if !enlarged {
                break (shape, layer, neighbours);
            }
        };
        self.add_neighbour_doors(room, &neighbours)?;
        self.add_gap_rooms(room, &shape, layer, &neighbours);
        Ok(())
    }

    fn free_room_neighbours(&self, room: RoomId, shape: &TileShape, layer: usize, net: NetId) -> Vec<Neighbour> {
        let mut result = Vec::new();
        for entry in self.tree.overlapping_entries(shape, layer) {
            if entry.object == TreeObject::Room(room) {
                continue;
            }
            let common = shape.intersection(&entry.shape);
            let dimension = common.dimension();
            if let TreeObject::Item { item, tile } = entry.object {
                let Some(board_item) = self.board.item(item) else {
                    continue;
                };
                if !board_item.is_trace_obstacle(net) {
                    if dimension >= 1 && self.item_info.start_info(item).is_some() {
                        result.push(Neighbour {
                            object: entry.object,
                            shape: common,
                            kind: NeighbourKind::Target { item, tile },
                            side: None,
                        });
                    }
                    continue;
                }
            }
            match dimension {
                2 => self.anomaly(format_args!(
                    "{room:?} overlaps {:?} on layer {layer}",
                    entry.object
                )),
                1 => match touching_interval(shape, &common) {
                    Some(side) => result.push(Neighbour {
                        object: entry.object,
                        shape: common,
                        kind: NeighbourKind::Door,
                        side: Some(side),
                    }),
                    None => self.anomaly(format_args!(
                        "{:?} touches no side of {room:?}",
                        entry.object
                    )),
                },
                _ => {}
            }
        }
        sort_neighbours(&mut result);
        result
    }

    fn sides_without_neighbours(&self, shape: &TileShape, neighbours: &[Neighbour]) -> Vec<usize> {
        (0..shape.border_line_count())
            .filter(|&side| {
                let border = shape.border_segment(side);
                border.length() > MIN_GAP
                    && !self.on_board_border(&border)
                    && !neighbours.iter().any(|n| n.covers(side))
            })
            .collect()
    }

    /// Tries to replace the room by a larger one without the border line
    /// `side`. Fails if the larger shape would split.
    fn enlarge_room(&mut self, room: RoomId, shape: &TileShape, layer: usize, side: usize, net: NetId) -> bool {
        let candidate = self.tree.geometry().remove_border_line(shape, side);
        let mut pieces = self.tree.complete_shape(
            &self.board,
            &candidate,
            layer,
            shape,
            net,
            Some(TreeObject::Room(room)),
        );
        if pieces.len() != 1 {
            return false;
        }
        let piece = pieces.remove(0);
        if piece.shape.area() <= shape.area() + MIN_AREA_GAIN {
            return false;
        }
        self.tree.remove_room(room, layer);
        if let Some(r) = self.graph.room_mut(room) {
            r.shape = piece.shape.clone();
            if let RoomKind::Complete { net_dependent, .. } = &mut r.kind {
                *net_dependent = piece.net_dependent;
            }
        }
        self.tree.insert_room(room, layer, piece.shape);
        true
    }

    /// The obstacle room of an item tile, created on first use.
    pub(crate) fn obstacle_room(&mut self, item: ItemId, tile: usize) -> Result<RoomId, AutorouteError> {
        if let Some(room) = self.item_info.obstacle_room(item, tile) {
            if self.graph.room(room).is_some() {
                return Ok(room);
            }
        }
        let board_item = self.board.item(item).ok_or(BoardError::UnknownItem(item))?;
        let layer = board_item.tile_layer(tile);
        let shape = self
            .tree
            .item_shape(item, tile, layer)
            .cloned()
            .ok_or(BoardError::UnknownItem(item))?;
        let room = self.graph.add_room(ExpansionRoom::obstacle(shape, layer, item, tile));
        self.item_info.set_obstacle_room(item, tile, room);
        Ok(room)
    }

    fn add_neighbour_doors(&mut self, room: RoomId, neighbours: &[Neighbour]) -> Result<(), AutorouteError> {
        for n in neighbours {
            match n.kind {
                NeighbourKind::Door | NeighbourKind::Overlap => {
                    let other = match n.object {
                        TreeObject::Room(other) => other,
                        TreeObject::Item { item, tile } => self.obstacle_room(item, tile)?,
                    };
                    if other == room || self.graph.door_between(room, other).is_some() {
                        continue;
                    }
                    let kind = if n.kind == NeighbourKind::Door {
                        DoorKind::Boundary {
                            first: room,
                            second: other,
                        }
                    } else {
                        DoorKind::Overlap {
                            first: room,
                            second: other,
                        }
                    };
                    self.graph.add_door(ExpansionDoor::new(n.shape.clone(), kind));
                }
                NeighbourKind::Target { item, tile } => {
                    if self.graph.target_door(room, item, tile).is_none() {
                        self.graph.add_door(ExpansionDoor::new(
                            n.shape.clone(),
                            DoorKind::Target { room, item, tile },
                        ));
                    }
                }
                NeighbourKind::Cover => {}
            }
        }
        Ok(())
    }

    fn add_gap_rooms(&mut self, room: RoomId, shape: &TileShape, layer: usize, neighbours: &[Neighbour]) {
        for side in 0..shape.border_line_count() {
            let border = shape.border_segment(side);
            let len = border.length();
            if len <= MIN_GAP || self.on_board_border(&border) {
                continue;
            }
            let mut intervals: Vec<(f64, f64)> = neighbours
                .iter()
                .filter(|n| n.covers(side))
                .filter_map(|n| n.side.map(|(_, from, to)| (from, to)))
                .collect();
            intervals.sort_by(|a, b| a.0.total_cmp(&b.0));
            let mut covered = 0.0_f64;
            for (from, to) in intervals {
                if from > covered + MIN_GAP {
                    self.add_gap_room(room, shape, layer, side, covered, from);
                }
                covered = covered.max(to);
            }
            if len > covered + MIN_GAP {
                self.add_gap_room(room, shape, layer, side, covered, len);
            }
        }
    }

    /// Creates an incomplete room beyond the part `from..to` of a side,
    /// connected to `room` by a door on that part.
    fn add_gap_room(&mut self, room: RoomId, shape: &TileShape, layer: usize, side: usize, from: f64, to: f64) {
        let line = shape.border_line(side);
        let border = shape.border_segment(side);
        let p0 = point_along(&border, from).round();
        let p1 = point_along(&border, to).round();
        let d = line.direction();
        let lines = [
            line,
            line.opposite(),
            Line::from_direction(p0, IntPoint::new(d.y, -d.x)),
            Line::from_direction(p1, IntPoint::new(-d.y, d.x)),
        ];
        let geometry = self.tree.geometry();
        let contained = geometry.convert(&TileShape::Simplex(Simplex::from_lines(&lines)));
        if contained.is_empty() {
            return;
        }
        let board_shape = geometry.convert(&TileShape::Box(self.board.bounding_box));
        let candidate = geometry.half_plane(&line.opposite()).intersection(&board_shape);
        let incomplete = self.add_incomplete_room(candidate, layer, contained.clone());
        self.graph.add_door(ExpansionDoor::new(
            contained,
            DoorKind::Boundary {
                first: room,
                second: incomplete,
            },
        ));
    }

    /// Doors of an obstacle room: boundary doors to the touching complete
    /// rooms, overlap doors to the obstacle rooms it may be ripped together
    /// with and incomplete rooms for the free parts of its border.
    pub(crate) fn calculate_obstacle_doors(&mut self, room: RoomId) -> Result<(), AutorouteError> {
        let r = self.graph.room(room).ok_or(AutorouteError::MissingRoom(room))?;
        let Some((item, tile)) = r.obstacle_item() else {
            return Ok(());
        };
        let shape = r.shape.clone();
        let layer = r.layer;

        let mut neighbours = Vec::new();
        for entry in self.tree.overlapping_entries(&shape, layer) {
            if entry.object == (TreeObject::Item { item, tile }) {
                continue;
            }
            let common = shape.intersection(&entry.shape);
            let dimension = common.dimension();
            let kind = match (entry.object, dimension) {
                (TreeObject::Room(_), 1) => NeighbourKind::Door,
                (TreeObject::Room(other), 2) => {
                    self.anomaly(format_args!("{other:?} overlaps obstacle {room:?}"));
                    continue;
                }
                (TreeObject::Item { .. }, 1) => NeighbourKind::Cover,
                (TreeObject::Item { item: other, tile: other_tile }, 2) => {
                    if self.overlap_connectable(item, tile, other, other_tile) {
                        neighbours.push(Neighbour {
                            object: entry.object,
                            shape: common,
                            kind: NeighbourKind::Overlap,
                            side: None,
                        });
                    }
                    continue;
                }
                _ => continue,
            };
            if let Some(side) = touching_interval(&shape, &common) {
                neighbours.push(Neighbour {
                    object: entry.object,
                    shape: common,
                    kind,
                    side: Some(side),
                });
            }
        }
        sort_neighbours(&mut neighbours);

        self.add_neighbour_doors(room, &neighbours)?;
        self.add_gap_rooms(room, &shape, layer, &neighbours);
        if let Some(RoomKind::Obstacle { doors_calculated, .. }) = self.graph.room_mut(room).map(|r| &mut r.kind) {
            *doors_calculated = true;
        }
        Ok(())
    }

    /// Rebuilds the target doors of the existing complete rooms for the items
    /// flagged as start or destination of the current connection.
    pub(crate) fn refresh_target_doors(&mut self) {
        if self.graph.room_count() == 0 {
            return;
        }
        let old: Vec<_> = self
            .graph
            .doors()
            .filter(|(_, d)| d.is_target())
            .map(|(id, _)| id)
            .collect();
        for door in old {
            self.graph.remove_door(door);
        }
        let flagged: Vec<ItemId> = self
            .board
            .items()
            .filter(|i| self.item_info.start_info(i.id).is_some())
            .map(|i| i.id)
            .collect();
        for item in flagged {
            let Some(board_item) = self.board.item(item) else {
                continue;
            };
            let tiles: Vec<(usize, usize, TileShape)> = (0..board_item.tile_count())
                .filter_map(|tile| {
                    let layer = board_item.tile_layer(tile);
                    let shape = self.tree.item_shape(item, tile, layer)?.clone();
                    Some((tile, layer, shape))
                })
                .collect();
            for (tile, layer, shape) in tiles {
                for entry in self.tree.overlapping_entries(&shape, layer) {
                    let TreeObject::Room(room) = entry.object else {
                        continue;
                    };
                    let common = entry.shape.intersection(&shape);
                    if common.dimension() >= 1 {
                        self.graph
                            .add_door(ExpansionDoor::new(common, DoorKind::Target { room, item, tile }));
                    }
                }
            }
        }
    }

    /// Overlapping tiles may be ripped up together if they belong to the same
    /// net, or are consecutive tiles of one trace.
    fn overlap_connectable(&self, item: ItemId, tile: usize, other: ItemId, other_tile: usize) -> bool {
        let (Some(a), Some(b)) = (self.board.item(item), self.board.item(other)) else {
            return false;
        };
        if item == other {
            a.is_trace() && tile.abs_diff(other_tile) == 1
        } else {
            a.shares_net(b)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcb_common::db::core::{Board, FixedState, ItemKind, test_board};
    use pcb_common::geom::{EPSILON, IntBox};
    use pcb_common::util::config::{AngleRestriction, AutorouteConfig};
    use rstest::rstest;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn engine_for(board: Board, restriction: AngleRestriction, max_enlarge: usize) -> (AutorouteEngine, AutorouteControl) {
        let config = AutorouteConfig {
            angle_restriction: restriction,
            max_enlarge_iterations: max_enlarge,
            ..AutorouteConfig::default()
        };
        let net = board.net_id("A").unwrap();
        let ctrl = AutorouteControl::new(&board, net, &config);
        let mut engine = AutorouteEngine::new(board, &config);
        engine.init_connection(net, Arc::new(AtomicBool::new(false)), None);
        (engine, ctrl)
    }

    fn obstacle_board() -> Board {
        let mut board = test_board(1000, 1000);
        board.add_net("A");
        let other = board.add_net("B");
        for (x, y) in [(200, 300), (600, 200), (450, 650)] {
            let keepout = ItemKind::Keepout {
                shape: TileShape::Box(IntBox::new(x, y, x + 150, y + 100)),
                first_layer: 0,
                last_layer: 0,
            };
            board.add_item(keepout, Vec::new(), FixedState::SystemFixed, 0).unwrap();
        }
        let trace = ItemKind::Trace {
            corners: vec![IntPoint::new(100, 850), IntPoint::new(400, 850), IntPoint::new(550, 950)],
            half_width: 10,
            layer: 0,
        };
        board.add_item(trace, vec![other], FixedState::Unfixed, 0).unwrap();
        board
    }

    fn start_room(engine: &mut AutorouteEngine, ctrl: &AutorouteControl, at: IntPoint) -> Vec<RoomId> {
        let geometry = engine.geometry();
        let board_shape = geometry.convert(&TileShape::Box(engine.board().bounding_box));
        let contained = geometry.convert(&TileShape::Box(IntBox::from_point(at)));
        let room = engine.add_incomplete_room(board_shape, 0, contained);
        engine.complete_expansion_room(room, ctrl).unwrap()
    }

    /// Completes the rooms reachable from `rooms` up to `limit` rooms.
    fn flood(engine: &mut AutorouteEngine, ctrl: &AutorouteControl, rooms: Vec<RoomId>, limit: usize) {
        let mut queue = rooms;
        let mut done = 0;
        while let Some(room) = queue.pop() {
            if done >= limit || engine.graph().room(room).is_none() {
                continue;
            }
            done += 1;
            engine.complete_neighbour_rooms(room, ctrl).unwrap();
            let next: Vec<RoomId> = engine.graph().room(room).unwrap().doors
                .iter()
                .filter_map(|d| engine.graph().door(*d)?.other_room(room))
                .filter(|r| engine.graph().room(*r).is_some_and(|r| r.is_complete()))
                .collect();
            queue.extend(next);
        }
    }

    #[rstest]
    #[case(AngleRestriction::NinetyDegree)]
    #[case(AngleRestriction::FortyFiveDegree)]
    #[case(AngleRestriction::None)]
    fn room_graph_stays_consistent(#[case] restriction: AngleRestriction) {
        let (mut engine, ctrl) = engine_for(obstacle_board(), restriction, 32);
        let rooms = start_room(&mut engine, &ctrl, IntPoint::new(50, 50));
        assert!(!rooms.is_empty());
        flood(&mut engine, &ctrl, rooms, 30);
        assert!(engine.graph().doors_are_mutual());
        assert!(engine.validate());
    }

    #[rstest]
    #[case(AngleRestriction::NinetyDegree)]
    #[case(AngleRestriction::FortyFiveDegree)]
    #[case(AngleRestriction::None)]
    fn doors_cover_every_inner_side(#[case] restriction: AngleRestriction) {
        let (mut engine, ctrl) = engine_for(obstacle_board(), restriction, 32);
        let rooms = start_room(&mut engine, &ctrl, IntPoint::new(50, 50));
        flood(&mut engine, &ctrl, rooms, 10);

        let graph = engine.graph();
        for (id, room) in graph.rooms().filter(|(_, r)| r.is_complete()) {
            for side in 0..room.shape.border_line_count() {
                let border = room.shape.border_segment(side);
                if border.length() <= MIN_GAP || engine.on_board_border(&border) {
                    continue;
                }
                let mut intervals: Vec<(f64, f64)> = room
                    .doors
                    .iter()
                    .filter_map(|d| graph.door(*d))
                    .filter(|d| !d.is_target() && d.dimension == 1)
                    .filter_map(|d| touching_interval(&room.shape, &d.shape))
                    .filter(|(s, _, _)| *s == side)
                    .map(|(_, from, to)| (from, to))
                    .collect();
                intervals.sort_by(|a, b| a.0.total_cmp(&b.0));
                let mut covered = 0.0_f64;
                for (from, to) in intervals {
                    assert!(from <= covered + 1.5, "{id:?} side {side} uncovered at {covered}");
                    covered = covered.max(to);
                }
                assert!(covered + 1.5 >= border.length(), "{id:?} side {side} uncovered at the end");
            }
        }
    }

    #[test]
    fn free_sides_are_enlarged_to_the_board() {
        let mut board = test_board(1000, 1000);
        board.add_net("A");
        let (mut engine, ctrl) = engine_for(board, AngleRestriction::NinetyDegree, 32);
        let small = TileShape::Box(IntBox::new(0, 0, 100, 100));
        let contained = TileShape::Box(IntBox::from_point(IntPoint::new(50, 50)));
        let room = engine.add_incomplete_room(small, 0, contained);
        let rooms = engine.complete_expansion_room(room, &ctrl).unwrap();
        assert_eq!(rooms.len(), 1);
        let shape = &engine.graph().room(rooms[0]).unwrap().shape;
        assert!((shape.area() - 1_000_000.0).abs() < EPSILON);
        assert!(engine.graph().room(rooms[0]).unwrap().doors.is_empty());
    }

    #[test]
    fn enlargement_stops_at_the_iteration_cap() {
        let mut board = test_board(1000, 1000);
        board.add_net("A");
        let (mut engine, ctrl) = engine_for(board, AngleRestriction::NinetyDegree, 1);
        let small = TileShape::Box(IntBox::new(0, 0, 100, 100));
        let contained = TileShape::Box(IntBox::from_point(IntPoint::new(50, 50)));
        let room = engine.add_incomplete_room(small, 0, contained);
        let rooms = engine.complete_expansion_room(room, &ctrl).unwrap();
        let complete = engine.graph().room(rooms[0]).unwrap();
        assert_eq!(complete.shape.bounding_box(), IntBox::new(0, 0, 1000, 100));
        assert_eq!(complete.doors.len(), 1);
        assert!(engine.graph().rooms().any(|(_, r)| r.is_incomplete()));
    }

    #[rstest]
    #[case(AngleRestriction::FortyFiveDegree)]
    #[case(AngleRestriction::None)]
    fn enlargement_terminates_for_sloped_shapes(#[case] restriction: AngleRestriction) {
        let mut board = test_board(1000, 1000);
        board.add_net("A");
        let (mut engine, ctrl) = engine_for(board, restriction, 32);
        let geometry = engine.geometry();
        let small = geometry.convert(&TileShape::Box(IntBox::new(0, 0, 100, 100)));
        let contained = geometry.convert(&TileShape::Box(IntBox::from_point(IntPoint::new(50, 50))));
        let room = engine.add_incomplete_room(small, 0, contained);
        let rooms = engine.complete_expansion_room(room, &ctrl).unwrap();
        assert_eq!(rooms.len(), 1);
        assert!(engine.graph().room(rooms[0]).unwrap().shape.area() > 10_000.0);
        assert!(engine.graph().doors_are_mutual());
    }

    #[test]
    fn obstacle_rooms_get_doors_once() {
        let mut board = test_board(1000, 1000);
        board.add_net("A");
        let keepout = ItemKind::Keepout {
            shape: TileShape::Box(IntBox::new(400, 400, 600, 600)),
            first_layer: 0,
            last_layer: 0,
        };
        let item = board.add_item(keepout, Vec::new(), FixedState::SystemFixed, 0).unwrap();
        let (mut engine, ctrl) = engine_for(board, AngleRestriction::NinetyDegree, 32);
        let rooms = start_room(&mut engine, &ctrl, IntPoint::new(100, 500));
        let obstacle = engine.item_info.obstacle_room(item, 0).unwrap();
        assert_eq!(engine.graph().room(obstacle).unwrap().doors.len(), 1);

        engine.complete_neighbour_rooms(obstacle, &ctrl).unwrap();
        let room = engine.graph().room(obstacle).unwrap();
        assert!(matches!(room.kind, RoomKind::Obstacle { doors_calculated: true, .. }));
        let doors = room.doors.len();
        assert!(doors >= 4);
        assert!(engine.graph().door_between(rooms[0], obstacle).is_some());

        engine.complete_neighbour_rooms(obstacle, &ctrl).unwrap();
        assert_eq!(engine.graph().room(obstacle).unwrap().doors.len(), doors);
        assert!(engine.graph().doors_are_mutual());
    }
}
