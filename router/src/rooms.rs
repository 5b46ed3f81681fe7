use pcb_common::db::indices::ItemId;
use pcb_common::geom::{FloatLine, TileShape};

pcb_common::define_index!(RoomId);
pcb_common::define_index!(DoorId);

/// Slack added to the trace half width when placing traces inside rooms and doors.
pub const TRACE_TOLERANCE: i64 = 1;

#[derive(Clone, Debug)]
pub enum RoomKind {
    /// Free space whose final shape is not yet resolved. The contained shape
    /// must stay inside every room completed from it.
    Incomplete { contained: TileShape },
    /// Free space bounded by obstacles of the routed net.
    Complete { id_no: usize, net_dependent: bool },
    /// The tree shape of one tile of a board item.
    Obstacle {
        item: ItemId,
        tile: usize,
        doors_calculated: bool,
    },
}

#[derive(Clone, Debug)]
pub struct ExpansionRoom {
    pub shape: TileShape,
    pub layer: usize,
    pub doors: Vec<DoorId>,
    pub kind: RoomKind,
}

impl ExpansionRoom {
    pub fn incomplete(shape: TileShape, layer: usize, contained: TileShape) -> Self {
        Self {
            shape,
            layer,
            doors: Vec::new(),
            kind: RoomKind::Incomplete { contained },
        }
    }

    pub fn obstacle(shape: TileShape, layer: usize, item: ItemId, tile: usize) -> Self {
        Self {
            shape,
            layer,
            doors: Vec::new(),
            kind: RoomKind::Obstacle {
                item,
                tile,
                doors_calculated: false,
            },
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.kind, RoomKind::Complete { .. })
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self.kind, RoomKind::Incomplete { .. })
    }

    pub fn is_obstacle(&self) -> bool {
        matches!(self.kind, RoomKind::Obstacle { .. })
    }

    pub fn is_free_space(&self) -> bool {
        !self.is_obstacle()
    }

    pub fn obstacle_item(&self) -> Option<(ItemId, usize)> {
        match self.kind {
            RoomKind::Obstacle { item, tile, .. } => Some((item, tile)),
            _ => None,
        }
    }

    pub fn is_net_dependent(&self) -> bool {
        matches!(
            self.kind,
            RoomKind::Complete {
                net_dependent: true,
                ..
            }
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DoorKind {
    /// 1-dimensional common border of two rooms.
    Boundary { first: RoomId, second: RoomId },
    /// 2-dimensional common part of two obstacle rooms of the same net.
    Overlap { first: RoomId, second: RoomId },
    /// A complete free room reaching a tile of an item to connect.
    Target {
        room: RoomId,
        item: ItemId,
        tile: usize,
    },
}

#[derive(Clone, Debug)]
pub struct ExpansionDoor {
    pub shape: TileShape,
    pub dimension: i32,
    pub kind: DoorKind,
}

impl ExpansionDoor {
    pub fn new(shape: TileShape, kind: DoorKind) -> Self {
        let dimension = shape.dimension();
        Self {
            shape,
            dimension,
            kind,
        }
    }

    pub fn rooms(&self) -> (RoomId, Option<RoomId>) {
        match self.kind {
            DoorKind::Boundary { first, second } | DoorKind::Overlap { first, second } => {
                (first, Some(second))
            }
            DoorKind::Target { room, .. } => (room, None),
        }
    }

    pub fn other_room(&self, room: RoomId) -> Option<RoomId> {
        match self.kind {
            DoorKind::Boundary { first, second } | DoorKind::Overlap { first, second } => {
                if first == room {
                    Some(second)
                } else if second == room {
                    Some(first)
                } else {
                    None
                }
            }
            DoorKind::Target { .. } => None,
        }
    }

    pub fn connects(&self, room: RoomId) -> bool {
        let (first, second) = self.rooms();
        first == room || second == Some(room)
    }

    pub fn target(&self) -> Option<(ItemId, usize)> {
        match self.kind {
            DoorKind::Target { item, tile, .. } => Some((item, tile)),
            _ => None,
        }
    }

    pub fn is_target(&self) -> bool {
        self.target().is_some()
    }

    /// Segment between the two farthest corners of the door shape.
    pub fn segment(&self) -> FloatLine {
        self.shape
            .diagonal_corner_segment()
            .unwrap_or_else(|| FloatLine::point(self.shape.centre_of_gravity()))
    }
}

/// Arena of rooms and doors. Rooms reference doors and doors reference rooms
/// by id; ids are never reused within a session.
#[derive(Default)]
pub struct RoomGraph {
    rooms: Vec<Option<ExpansionRoom>>,
    doors: Vec<Option<ExpansionDoor>>,
    next_id_no: usize,
}

impl RoomGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room(&self, id: RoomId) -> Option<&ExpansionRoom> {
        self.rooms.get(id.index()).and_then(|r| r.as_ref())
    }

    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut ExpansionRoom> {
        self.rooms.get_mut(id.index()).and_then(|r| r.as_mut())
    }

    pub fn door(&self, id: DoorId) -> Option<&ExpansionDoor> {
        self.doors.get(id.index()).and_then(|d| d.as_ref())
    }

    pub fn rooms(&self) -> impl Iterator<Item = (RoomId, &ExpansionRoom)> {
        self.rooms
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().map(|r| (RoomId::new(i), r)))
    }

    pub fn doors(&self) -> impl Iterator<Item = (DoorId, &ExpansionDoor)> {
        self.doors
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.as_ref().map(|d| (DoorId::new(i), d)))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.iter().flatten().count()
    }

    pub fn next_id_no(&mut self) -> usize {
        self.next_id_no += 1;
        self.next_id_no
    }

    pub fn add_room(&mut self, room: ExpansionRoom) -> RoomId {
        self.rooms.push(Some(room));
        RoomId::new(self.rooms.len() - 1)
    }

    /// Registers `door` with the rooms it connects.
    pub fn add_door(&mut self, door: ExpansionDoor) -> DoorId {
        let id = DoorId::new(self.doors.len());
        let (first, second) = door.rooms();
        self.doors.push(Some(door));
        for room in std::iter::once(first).chain(second) {
            if let Some(room) = self.room_mut(room) {
                room.doors.push(id);
            }
        }
        id
    }

    /// The non target door between `a` and `b`, if any.
    pub fn door_between(&self, a: RoomId, b: RoomId) -> Option<DoorId> {
        let room = self.room(a)?;
        room.doors.iter().copied().find(|d| {
            self.door(*d)
                .is_some_and(|door| door.other_room(a) == Some(b))
        })
    }

    pub fn target_door(&self, room: RoomId, item: ItemId, tile: usize) -> Option<DoorId> {
        self.room(room)?.doors.iter().copied().find(|d| {
            self.door(*d)
                .and_then(|door| door.target())
                .is_some_and(|t| t == (item, tile))
        })
    }

    pub fn remove_door(&mut self, id: DoorId) -> Option<ExpansionDoor> {
        let door = self.doors.get_mut(id.index()).and_then(|d| d.take())?;
        let (first, second) = door.rooms();
        for room in std::iter::once(first).chain(second) {
            if let Some(room) = self.room_mut(room) {
                room.doors.retain(|d| *d != id);
            }
        }
        Some(door)
    }

    /// Removes the room and all doors it takes part in.
    pub fn remove_room(&mut self, id: RoomId) -> Option<ExpansionRoom> {
        let doors = self.room(id)?.doors.clone();
        for door in doors {
            self.remove_door(door);
        }
        self.rooms.get_mut(id.index()).and_then(|r| r.take())
    }

    pub fn clear(&mut self) {
        self.rooms.clear();
        self.doors.clear();
        self.next_id_no = 0;
    }

    /// Number of search sections of a door for traces of the given half width.
    /// Only 1-dimensional doors between two free rooms are divided.
    pub fn section_count(&self, door: DoorId, half_width: i64) -> usize {
        let Some(d) = self.door(door) else {
            return 1;
        };
        if d.dimension != 1 || !self.connects_free_rooms(d) || half_width <= 0 {
            return 1;
        }
        (d.segment().length() / (10 * half_width) as f64) as usize + 1
    }

    /// Section segments of the door line shrunk by `offset` at both ends.
    /// A 2-dimensional door has one section at its centre.
    pub fn section_segments(&self, door: DoorId, half_width: i64, offset: f64) -> Vec<FloatLine> {
        let Some(d) = self.door(door) else {
            return Vec::new();
        };
        if d.dimension == 2 {
            return vec![FloatLine::point(d.shape.centre_of_gravity())];
        }
        let count = self.section_count(door, half_width);
        d.segment()
            .shrink_segment(offset)
            .divide_segment_into_sections(count)
    }

    fn connects_free_rooms(&self, door: &ExpansionDoor) -> bool {
        match door.rooms() {
            (first, Some(second)) => [first, second]
                .iter()
                .all(|r| self.room(*r).is_some_and(|room| room.is_free_space())),
            _ => false,
        }
    }

    /// Checks that every door is listed by exactly the rooms it connects.
    pub fn doors_are_mutual(&self) -> bool {
        for (id, door) in self.doors() {
            let (first, second) = door.rooms();
            for room in std::iter::once(first).chain(second) {
                if !self.room(room).is_some_and(|r| r.doors.contains(&id)) {
                    return false;
                }
            }
        }
        self.rooms().all(|(room_id, room)| {
            room.doors
                .iter()
                .all(|d| self.door(*d).is_some_and(|door| door.connects(room_id)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcb_common::geom::{IntBox, IntPoint};

    fn complete(graph: &mut RoomGraph, b: IntBox) -> RoomId {
        let id_no = graph.next_id_no();
        graph.add_room(ExpansionRoom {
            shape: TileShape::Box(b),
            layer: 0,
            doors: Vec::new(),
            kind: RoomKind::Complete {
                id_no,
                net_dependent: false,
            },
        })
    }

    #[test]
    fn doors_are_registered_on_both_sides() {
        let mut graph = RoomGraph::new();
        let a = complete(&mut graph, IntBox::new(0, 0, 100, 100));
        let b = complete(&mut graph, IntBox::new(100, 0, 200, 100));
        let shape = TileShape::Box(IntBox::new(100, 0, 100, 100));
        let door = graph.add_door(ExpansionDoor::new(shape, DoorKind::Boundary { first: a, second: b }));
        assert_eq!(graph.door_between(a, b), Some(door));
        assert_eq!(graph.door_between(b, a), Some(door));
        assert!(graph.doors_are_mutual());

        graph.remove_room(b);
        assert!(graph.room(a).unwrap().doors.is_empty());
        assert!(graph.door(door).is_none());
        assert!(graph.doors_are_mutual());
    }

    #[test]
    fn long_doors_between_free_rooms_are_split() {
        let mut graph = RoomGraph::new();
        let a = complete(&mut graph, IntBox::new(0, 0, 1000, 1000));
        let b = complete(&mut graph, IntBox::new(1000, 0, 2000, 1000));
        let shape = TileShape::Box(IntBox::new(1000, 0, 1000, 1000));
        let door = graph.add_door(ExpansionDoor::new(shape, DoorKind::Boundary { first: a, second: b }));
        assert_eq!(graph.section_count(door, 10), 11);
        let sections = graph.section_segments(door, 10, 0.0);
        assert_eq!(sections.len(), 11);
        assert!(sections[0].a.approx_eq(IntPoint::new(1000, 0).to_float(), 1e-9)
            || sections[0].a.approx_eq(IntPoint::new(1000, 1000).to_float(), 1e-9));

        let obstacle = graph.add_room(ExpansionRoom::obstacle(
            TileShape::Box(IntBox::new(2000, 0, 2100, 100)),
            0,
            ItemId::new(0),
            0,
        ));
        let shape = TileShape::Box(IntBox::new(2000, 0, 2000, 100));
        let door = graph.add_door(ExpansionDoor::new(
            shape,
            DoorKind::Boundary {
                first: b,
                second: obstacle,
            },
        ));
        assert_eq!(graph.section_count(door, 1), 1);
    }

    #[test]
    fn target_doors_have_no_other_room() {
        let mut graph = RoomGraph::new();
        let a = complete(&mut graph, IntBox::new(0, 0, 100, 100));
        let shape = TileShape::Box(IntBox::new(10, 10, 20, 20));
        let door = graph.add_door(ExpansionDoor::new(
            shape,
            DoorKind::Target {
                room: a,
                item: ItemId::new(3),
                tile: 0,
            },
        ));
        let d = graph.door(door).unwrap();
        assert_eq!(d.other_room(a), None);
        assert_eq!(d.dimension, 2);
        assert_eq!(graph.target_door(a, ItemId::new(3), 0), Some(door));
        assert_eq!(graph.door_between(a, a), None);
    }
}
