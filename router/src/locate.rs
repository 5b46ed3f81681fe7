use crate::control::AutorouteControl;
use crate::engine::AutorouteEngine;
use crate::error::AutorouteError;
use crate::maze::{BacktrackElement, Expandable, MazeResult, second_nearest_border_distance};
use crate::rooms::{DoorId, RoomId, TRACE_TOLERANCE};
use pcb_common::db::indices::ItemId;
use pcb_common::geom::{FloatPoint, IntPoint, TileShape};
use pcb_common::util::config::AngleRestriction;
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocatedTrace {
    pub layer: usize,
    pub corners: Vec<IntPoint>,
}

/// Trace corners and via locations of a found connection, ready for insertion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocatedConnection {
    pub traces: Vec<LocatedTrace>,
    pub vias: Vec<IntPoint>,
}

/// Turns the rooms and doors of a maze result into trace corners.
pub fn locate_connection(
    engine: &AutorouteEngine,
    ctrl: &AutorouteControl,
    found: &MazeResult,
) -> Result<LocatedConnection, AutorouteError> {
    let locator = Locator {
        engine,
        ctrl,
        ripped: &found.ripped,
    };
    locator.locate(&found.backtrack)
}

struct Locator<'a> {
    engine: &'a AutorouteEngine,
    ctrl: &'a AutorouteControl,
    ripped: &'a BTreeSet<ItemId>,
}

impl Locator<'_> {
    fn locate(&self, chain: &[BacktrackElement]) -> Result<LocatedConnection, AutorouteError> {
        if chain.len() < 2 {
            return Err(AutorouteError::InvalidBacktrack(chain.len()));
        }
        let first = &chain[0];
        let (Expandable::Door(start_door), Some(start_room)) = (first.object, first.next_room) else {
            return Err(AutorouteError::InvalidBacktrack(0));
        };
        let mut current = self.start_point(start_door, start_room)?;
        let mut layer = first.layer;
        let mut corners = vec![current];
        let mut result = LocatedConnection::default();

        let mut i = 0;
        while i + 1 < chain.len() {
            let element = &chain[i];
            let room = element.next_room.ok_or(AutorouteError::InvalidBacktrack(i))?;
            self.enter_room(&mut corners, &mut current, room, element, layer);
            let next = &chain[i + 1];
            match next.object {
                Expandable::Drill { page, index } => {
                    let location = self.drill_location(page, index, i + 1)?;
                    self.move_to_target(&mut corners, &mut current, room, location, layer);
                    self.push_trace(&mut result, layer, std::mem::take(&mut corners));
                    result.vias.push(location);
                    let after = chain.get(i + 2).ok_or(AutorouteError::InvalidBacktrack(i + 2))?;
                    if after.object != next.object {
                        return Err(AutorouteError::InvalidBacktrack(i + 2));
                    }
                    layer = after.layer;
                    current = location;
                    corners.push(location);
                    i += 2;
                }
                Expandable::Door(door) if self.is_target(door) => {
                    let target = self.destination_point(door, room, current)?;
                    self.move_to_target(&mut corners, &mut current, room, target, layer);
                    self.push_trace(&mut result, layer, corners);
                    return Ok(result);
                }
                Expandable::Door(door) => {
                    self.pass_door(&mut corners, &mut current, room, door, next);
                    i += 1;
                }
                Expandable::DrillPage { .. } => return Err(AutorouteError::InvalidBacktrack(i + 1)),
            }
        }
        Err(AutorouteError::Locate("connection does not end at a destination".to_string()))
    }

    fn is_target(&self, door: DoorId) -> bool {
        self.engine.graph.door(door).is_some_and(|d| d.is_target())
    }

    fn start_point(&self, door: DoorId, room: RoomId) -> Result<IntPoint, AutorouteError> {
        let d = self.engine.graph.door(door).ok_or(AutorouteError::MissingDoor(door))?;
        let r = self.engine.graph.room(room).ok_or(AutorouteError::MissingRoom(room))?;
        let connection = d
            .target()
            .and_then(|(item, tile)| self.engine.board.item(item).map(|i| i.tile_shape(tile)))
            .map(|shape| shape.intersection(&r.shape))
            .filter(|shape| !shape.is_empty())
            .unwrap_or_else(|| d.shape.clone());
        Ok(connection.centre_of_gravity().round())
    }

    fn destination_point(&self, door: DoorId, room: RoomId, current: IntPoint) -> Result<IntPoint, AutorouteError> {
        let d = self.engine.graph.door(door).ok_or(AutorouteError::MissingDoor(door))?;
        let r = self.engine.graph.room(room).ok_or(AutorouteError::MissingRoom(room))?;
        let chw = self.ctrl.compensated_trace_half_width[r.layer];
        let tile_shape = d
            .target()
            .and_then(|(item, tile)| self.engine.board.item(item).map(|i| i.tile_shape(tile)));
        let Some(tile_shape) = tile_shape else {
            return Ok(d.shape.centre_of_gravity().round());
        };
        let inside = tile_shape.intersection(&r.shape.offset(-chw));
        let target = if inside.dimension() == 2 {
            inside
        } else {
            let common = tile_shape.intersection(&r.shape);
            if common.is_empty() { d.shape.clone() } else { common }
        };
        Ok(target.nearest_point(current.to_float()).round())
    }

    fn drill_location(&self, page: usize, index: usize, position: usize) -> Result<IntPoint, AutorouteError> {
        self.engine
            .drill_pages
            .drills(page, self.ctrl.net)
            .and_then(|drills| drills.get(index))
            .map(|drill| drill.location)
            .ok_or(AutorouteError::InvalidBacktrack(position))
    }

    fn shrink_offset(&self, room: RoomId, layer: usize) -> i64 {
        let chw = self.ctrl.compensated_trace_half_width[layer];
        let obstacle = self.engine.graph.room(room).is_some_and(|r| r.is_obstacle());
        if obstacle { chw } else { chw + TRACE_TOLERANCE }
    }

    /// Moves the current point into the room shrunk by the trace width.
    fn enter_room(
        &self,
        corners: &mut Vec<IntPoint>,
        current: &mut IntPoint,
        room: RoomId,
        entry: &BacktrackElement,
        layer: usize,
    ) {
        let Some(shrunk) = self.shrunk_room(room) else {
            return;
        };
        if shrunk.is_empty() || shrunk.contains_point(current.to_float()) {
            return;
        }
        let to = shrunk.nearest_point(current.to_float()).round();
        let horizontal_first = match entry.object {
            Expandable::Door(door) => self
                .engine
                .graph
                .door(door)
                .is_none_or(|d| horizontal_first_from_door(&d.shape, *current, to)),
            _ => true,
        };
        let points = self.bend(layer, *current, to, horizontal_first);
        self.extend(corners, current, points);
    }

    fn shrunk_room(&self, room: RoomId) -> Option<TileShape> {
        let r = self.engine.graph.room(room)?;
        Some(r.shape.offset(-self.shrink_offset(room, r.layer)))
    }

    /// Crosses `door` from `room` into the room of `next`. The trace runs
    /// perpendicular through the door section, between points in front of the
    /// door inside both shrunk rooms. Falls back to the section and door
    /// middles when a nearer crossing would violate the clearance.
    fn pass_door(
        &self,
        corners: &mut Vec<IntPoint>,
        current: &mut IntPoint,
        room: RoomId,
        door: DoorId,
        next: &BacktrackElement,
    ) {
        let graph = &self.engine.graph;
        let Some(d) = graph.door(door) else {
            return;
        };
        let layer = next.layer;
        let hw = self.ctrl.trace_half_width[layer];
        let chw = self.ctrl.compensated_trace_half_width[layer];
        let from = current.to_float();

        if d.dimension == 2 {
            let shrunk = d.shape.offset(-chw);
            let point = if shrunk.is_empty() {
                d.shape.centre_of_gravity()
            } else {
                shrunk.nearest_point(from)
            };
            let to = point.round();
            let points = self.bend(layer, *current, to, horizontal_first_to_door(&d.shape, *current, to));
            self.extend(corners, current, points);
            return;
        }

        let sections = graph.section_segments(door, hw, (chw + TRACE_TOLERANCE) as f64);
        let section = match sections.get(next.section) {
            Some(section) => *section,
            None => {
                self.engine
                    .anomaly(format_args!("{door:?} has no section {}", next.section));
                match sections.last() {
                    Some(section) => *section,
                    None => d.segment(),
                }
            }
        };
        let mut candidates = Vec::with_capacity(3);
        let nearest = section.nearest_segment_point(from);
        let next_shape = next.next_room.and_then(|r| graph.room(r)).map(|r| &r.shape);
        let cramped = next_shape
            .is_some_and(|shape| second_nearest_border_distance(shape, nearest) < (chw + TRACE_TOLERANCE) as f64);
        if !cramped {
            candidates.push(nearest);
        }
        candidates.push(section.middle());
        candidates.push(d.segment().middle());

        let mut fallback = None;
        for point in candidates {
            let points = self.door_crossing(layer, *current, room, next.next_room, &d.shape, point);
            if self.path_is_clear(layer, *current, &points) {
                self.extend(corners, current, points);
                return;
            }
            fallback.get_or_insert(points);
        }
        if let Some(points) = fallback {
            self.extend(corners, current, points);
        }
    }

    /// Corners from `from` over the door point `point` into the next room.
    fn door_crossing(
        &self,
        layer: usize,
        from: IntPoint,
        room: RoomId,
        next_room: Option<RoomId>,
        door_shape: &TileShape,
        point: FloatPoint,
    ) -> Vec<IntPoint> {
        let base = point.round();
        let depth = (self.ctrl.compensated_trace_half_width[layer] + TRACE_TOLERANCE + 1) as f64;
        let inward = self
            .engine
            .graph
            .room(room)
            .map(|r| r.shape.centre_of_gravity())
            .and_then(|centre| door_normal(door_shape, point, centre, depth));
        let Some(inward) = inward else {
            return self.bend(layer, from, base, horizontal_first_to_door(door_shape, from, base));
        };

        let in_front = |room: Option<RoomId>, candidate: IntPoint| -> IntPoint {
            let Some(shrunk) = room.and_then(|r| self.shrunk_room(r)) else {
                return candidate;
            };
            if shrunk.is_empty() || shrunk.contains_point(candidate.to_float()) {
                candidate
            } else {
                shrunk.nearest_point(point).round()
            }
        };
        let before = in_front(Some(room), base + inward);
        let after = in_front(next_room, base - inward);

        let mut points = self.bend(layer, from, before, horizontal_first_to_door(door_shape, from, before));
        let last = points.last().copied().unwrap_or(from);
        points.extend(self.bend(layer, last, after, horizontal_first_from_door(door_shape, last, after)));
        points
    }

    /// Goes to a via location or destination point, bending inside the room.
    fn move_to_target(&self, corners: &mut Vec<IntPoint>, current: &mut IntPoint, room: RoomId, target: IntPoint, layer: usize) {
        let mut horizontal_first = true;
        if let Some(corner) = additional_corner(self.ctrl.angle_restriction, *current, target, true) {
            horizontal_first = self
                .engine
                .graph
                .room(room)
                .is_some_and(|r| r.shape.contains_point(corner.to_float()));
        }
        let points = self.bend(layer, *current, target, horizontal_first);
        self.extend(corners, current, points);
    }

    /// Legal corners from `from` to `to`. Prefers the bend given by
    /// `horizontal_first` and takes the other one if only that keeps the
    /// clearance.
    fn bend(&self, layer: usize, from: IntPoint, to: IntPoint, horizontal_first: bool) -> Vec<IntPoint> {
        if from == to {
            return Vec::new();
        }
        let restriction = self.ctrl.angle_restriction;
        let Some(preferred) = additional_corner(restriction, from, to, horizontal_first) else {
            return vec![to];
        };
        let clear = |corner: IntPoint| self.segment_is_clear(layer, from, corner) && self.segment_is_clear(layer, corner, to);
        if !clear(preferred) {
            if let Some(other) = additional_corner(restriction, from, to, !horizontal_first) {
                if clear(other) {
                    return vec![other, to];
                }
            }
        }
        vec![preferred, to]
    }

    fn extend(&self, corners: &mut Vec<IntPoint>, current: &mut IntPoint, points: Vec<IntPoint>) {
        if let Some(last) = points.last() {
            *current = *last;
        }
        corners.extend(points);
    }

    fn path_is_clear(&self, layer: usize, from: IntPoint, points: &[IntPoint]) -> bool {
        let mut a = from;
        for &b in points {
            if a != b && !self.segment_is_clear(layer, a, b) {
                return false;
            }
            a = b;
        }
        true
    }

    fn push_trace(&self, result: &mut LocatedConnection, layer: usize, corners: Vec<IntPoint>) {
        let mut corners = remove_redundant_corners(corners);
        if self.ctrl.angle_restriction == AngleRestriction::None {
            corners = remove_redundant_corners(self.straighten(layer, &corners));
        }
        if corners.len() >= 2 {
            result.traces.push(LocatedTrace { layer, corners });
        }
    }

    /// Skips corners where a direct segment keeps the clearance.
    fn straighten(&self, layer: usize, corners: &[IntPoint]) -> Vec<IntPoint> {
        let Some(&first) = corners.first() else {
            return Vec::new();
        };
        let mut result = vec![first];
        let mut i = 0;
        while i + 1 < corners.len() {
            let mut j = corners.len() - 1;
            while j > i + 1 && !self.segment_is_clear(layer, corners[i], corners[j]) {
                j -= 1;
            }
            result.push(corners[j]);
            i = j;
        }
        result
    }

    fn segment_is_clear(&self, layer: usize, a: IntPoint, b: IntPoint) -> bool {
        let board = &self.engine.board;
        let trace = TileShape::segment(a, b, self.ctrl.trace_half_width[layer]);
        if !TileShape::Box(board.bounding_box).contains_shape(&trace) {
            return false;
        }
        let shape = trace.offset(board.rules.compensation(self.ctrl.trace_clearance_class));
        board.overlapping_tiles(&shape, layer).into_iter().all(|(id, tile)| {
            match board.item(id) {
                Some(item) if !self.ripped.contains(&id) && item.is_trace_obstacle(self.ctrl.net) => {
                    !board.tree_shape(item, tile).overlaps(&shape)
                }
                _ => true,
            }
        })
    }
}

/// The corner between `from` and `to` making both segments legal under the
/// angle restriction. With `horizontal_first` the first segment is the one
/// with the larger horizontal part.
fn additional_corner(restriction: AngleRestriction, from: IntPoint, to: IntPoint, horizontal_first: bool) -> Option<IntPoint> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    match restriction {
        AngleRestriction::NinetyDegree => {
            if dx == 0 || dy == 0 {
                None
            } else if horizontal_first {
                Some(IntPoint::new(to.x, from.y))
            } else {
                Some(IntPoint::new(from.x, to.y))
            }
        }
        AngleRestriction::FortyFiveDegree => {
            if dx == 0 || dy == 0 || dx.abs() == dy.abs() {
                return None;
            }
            if dx.abs() > dy.abs() {
                let diagonal = dy.abs() * dx.signum();
                if horizontal_first {
                    Some(IntPoint::new(to.x - diagonal, from.y))
                } else {
                    Some(IntPoint::new(from.x + diagonal, to.y))
                }
            } else {
                let diagonal = dx.abs() * dy.signum();
                if horizontal_first {
                    Some(IntPoint::new(to.x, from.y + diagonal))
                } else {
                    Some(IntPoint::new(from.x, to.y - diagonal))
                }
            }
        }
        AngleRestriction::None => None,
    }
}

/// Integer vector of at least `depth` length perpendicular to the door,
/// pointing from `point` towards `centre`. Axis parallel and diagonal
/// normals stay exact so the crossing keeps the angle restriction.
fn door_normal(door_shape: &TileShape, point: FloatPoint, centre: FloatPoint, depth: f64) -> Option<IntPoint> {
    let segment = door_shape.diagonal_corner_segment()?;
    let dir = segment.b - segment.a;
    let len = dir.length();
    if len < 1.0 {
        return None;
    }
    let mut normal = FloatPoint::new(-dir.y / len, dir.x / len);
    if normal.scalar_product(centre - point) < 0.0 {
        normal = -normal;
    }
    let sign = |v: f64| if v < 0.0 { -1 } else { 1 };
    let (ax, ay) = (normal.x.abs(), normal.y.abs());
    let vector = if ay < 1e-6 {
        IntPoint::new(sign(normal.x) * depth.ceil() as i64, 0)
    } else if ax < 1e-6 {
        IntPoint::new(0, sign(normal.y) * depth.ceil() as i64)
    } else if (ax - ay).abs() < 1e-6 {
        let k = (depth / std::f64::consts::SQRT_2).ceil() as i64;
        IntPoint::new(sign(normal.x) * k, sign(normal.y) * k)
    } else {
        (normal * (depth + 1.0)).round()
    };
    Some(vector)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DoorDirection {
    Area { tall: bool },
    Vertical,
    Horizontal,
    Rising,
    Falling,
}

fn door_direction(shape: &TileShape) -> DoorDirection {
    let bounds = shape.bounding_box();
    if shape.dimension() != 1 {
        return DoorDirection::Area {
            tall: bounds.height() >= bounds.width(),
        };
    }
    let Some(segment) = shape.diagonal_corner_segment() else {
        return DoorDirection::Area { tall: true };
    };
    let half = 0.5 * (segment.b.x - segment.a.x).abs().max((segment.b.y - segment.a.y).abs());
    if (bounds.width() as f64) <= half {
        DoorDirection::Vertical
    } else if (bounds.height() as f64) <= half {
        DoorDirection::Horizontal
    } else {
        let (left, right) = if segment.a.x <= segment.b.x {
            (segment.a, segment.b)
        } else {
            (segment.b, segment.a)
        };
        if left.y < right.y { DoorDirection::Rising } else { DoorDirection::Falling }
    }
}

fn same_sign(d: IntPoint) -> bool {
    d.x.signum() == d.y.signum()
}

/// Leaving a door, the trace starts across the door line.
fn horizontal_first_from_door(shape: &TileShape, from: IntPoint, to: IntPoint) -> bool {
    let d = to - from;
    match door_direction(shape) {
        DoorDirection::Area { tall } => tall,
        DoorDirection::Vertical => true,
        DoorDirection::Horizontal => false,
        DoorDirection::Rising => {
            if same_sign(d) { d.x.abs() > d.y.abs() } else { d.x.abs() < d.y.abs() }
        }
        DoorDirection::Falling => {
            if same_sign(d) { d.x.abs() < d.y.abs() } else { d.x.abs() > d.y.abs() }
        }
    }
}

/// Approaching a door, the trace ends across the door line.
fn horizontal_first_to_door(shape: &TileShape, from: IntPoint, to: IntPoint) -> bool {
    match door_direction(shape) {
        DoorDirection::Area { tall } => !tall,
        DoorDirection::Vertical => false,
        DoorDirection::Horizontal => true,
        DoorDirection::Rising | DoorDirection::Falling => !horizontal_first_from_door(shape, from, to),
    }
}

/// Drops repeated corners and corners in the middle of a straight line.
fn remove_redundant_corners(corners: Vec<IntPoint>) -> Vec<IntPoint> {
    let mut result: Vec<IntPoint> = Vec::with_capacity(corners.len());
    for corner in corners {
        if result.last() == Some(&corner) {
            continue;
        }
        while result.len() >= 2 {
            let a = result[result.len() - 2];
            let b = result[result.len() - 1];
            if (b - a).determinant(corner - b) != 0 {
                break;
            }
            result.pop();
        }
        if result.last() != Some(&corner) {
            result.push(corner);
        }
    }
    result
}
