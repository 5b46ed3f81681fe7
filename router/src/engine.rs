use crate::control::AutorouteControl;
use crate::drill::DrillPageArray;
use crate::error::AutorouteError;
use crate::geometry::{self, TileGeometry};
use crate::item_info::ItemInfoMap;
use crate::maze::MazeOutcome;
use crate::rooms::{DoorKind, ExpansionDoor, ExpansionRoom, RoomGraph, RoomId, RoomKind};
use crate::search_tree::{SearchTree, TreeObject};
use crate::{insert, locate, maze};
use pcb_common::db::core::{Board, BoardError, Item, ItemKind};
use pcb_common::db::indices::{ItemId, NetId};
use pcb_common::geom::{IntBox, TileShape};
use pcb_common::util::config::{AutorouteConfig, TestLevel};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutorouteResult {
    AlreadyConnected,
    Routed,
    NotRouted,
    InsertError,
}

/// Owns the board during routing together with the expansion room graph,
/// the search tree and the drill pages of the current net.
pub struct AutorouteEngine {
    pub(crate) board: Board,
    pub(crate) config: AutorouteConfig,
    pub(crate) tree: SearchTree,
    pub(crate) graph: RoomGraph,
    pub(crate) item_info: ItemInfoMap,
    pub(crate) drill_pages: DrillPageArray,
    net: Option<NetId>,
    stop: Arc<AtomicBool>,
    deadline: Option<Instant>,
    expansions: usize,
}

impl AutorouteEngine {
    pub fn new(board: Board, config: &AutorouteConfig) -> Self {
        let geometry = geometry::for_restriction(config.angle_restriction);
        let tree = SearchTree::new(&board, geometry);
        let page_width = (5 * board.rules.via_diameter).max(config.min_drill_page_width);
        let drill_pages = DrillPageArray::new(board.bounding_box, page_width);
        Self {
            board,
            config: config.clone(),
            tree,
            graph: RoomGraph::new(),
            item_info: ItemInfoMap::new(),
            drill_pages,
            net: None,
            stop: Arc::new(AtomicBool::new(false)),
            deadline: None,
            expansions: 0,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn into_board(self) -> Board {
        self.board
    }

    pub fn config(&self) -> &AutorouteConfig {
        &self.config
    }

    pub fn graph(&self) -> &RoomGraph {
        &self.graph
    }

    pub fn search_tree(&self) -> &SearchTree {
        &self.tree
    }

    pub fn geometry(&self) -> &'static dyn TileGeometry {
        self.tree.geometry()
    }

    pub fn net_no(&self) -> Option<NetId> {
        self.net
    }

    pub(crate) fn current_net(&self) -> Result<NetId, AutorouteError> {
        self.net.ok_or(AutorouteError::NoNet)
    }

    /// Prepares the engine for connections of `net`. With a maintained
    /// database the rooms depending on the previous net are dropped, together
    /// with the rooms next to the items of the new net.
    pub fn init_connection(&mut self, net: NetId, stop: Arc<AtomicBool>, time_limit: Option<Duration>) {
        if self.net != Some(net) {
            if self.config.maintain_database {
                let dependent: Vec<RoomId> = self
                    .graph
                    .rooms()
                    .filter(|(_, room)| room.is_net_dependent())
                    .map(|(id, _)| id)
                    .collect();
                for room in dependent {
                    self.remove_complete_room(room);
                }
                for item in self.board.items_of_net(net) {
                    self.remove_obstacle_rooms(item);
                }
            } else {
                self.clear();
            }
            self.drill_pages.invalidate_all();
        }
        self.net = Some(net);
        self.stop = stop;
        self.deadline = time_limit.map(|limit| Instant::now() + limit);
    }

    /// True once the stop flag is raised, the time limit has passed or the
    /// current search used up its expansion budget.
    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
            || self.config.max_expansions.is_some_and(|max| self.expansions >= max)
    }

    pub(crate) fn count_expansion(&mut self) {
        self.expansions += 1;
    }

    /// Connects the `start` items to the `dest` items of the current net.
    /// Items ripped up on the way are removed from the board together with
    /// the rest of their connections and added to `ripped`; the caller
    /// reroutes them later. A failed search adds the rip-up candidates it
    /// met without removing them.
    pub fn autoroute_connection(
        &mut self,
        start: &BTreeSet<ItemId>,
        dest: &BTreeSet<ItemId>,
        ctrl: &AutorouteControl,
        ripped: &mut BTreeSet<ItemId>,
    ) -> AutorouteResult {
        self.expansions = 0;
        let result = self.route_connection(start, dest, ctrl, ripped);
        self.item_info.clear_start_info();
        if !self.config.maintain_database {
            self.clear();
        }
        result
    }

    fn route_connection(
        &mut self,
        start: &BTreeSet<ItemId>,
        dest: &BTreeSet<ItemId>,
        ctrl: &AutorouteControl,
        ripped: &mut BTreeSet<ItemId>,
    ) -> AutorouteResult {
        if start.is_empty() || dest.is_empty() {
            log::warn!("connection of net {:?} has no start or destination items", ctrl.net);
            return AutorouteResult::NotRouted;
        }
        let connected = start
            .iter()
            .any(|s| !self.board.connected_set(*s).is_disjoint(dest));
        if connected {
            return AutorouteResult::AlreadyConnected;
        }

        let found = match maze::find_connection(self, ctrl, start, dest) {
            Ok(MazeOutcome::Found(found)) => found,
            Ok(MazeOutcome::NotFound { ripped: candidates, stopped }) => {
                if stopped {
                    log::info!("autoroute of net {:?} stopped", ctrl.net);
                } else {
                    log::debug!("no connection found for net {:?}", ctrl.net);
                }
                ripped.extend(candidates);
                return AutorouteResult::NotRouted;
            }
            Err(e) => {
                log::error!("maze search of net {:?} failed: {e}", ctrl.net);
                return AutorouteResult::NotRouted;
            }
        };

        let located = match locate::locate_connection(self, ctrl, &found) {
            Ok(located) => located,
            Err(e) => {
                log::warn!("{e}");
                return AutorouteResult::NotRouted;
            }
        };

        self.rip_up(&found.ripped, ripped);

        match insert::insert_connection(self, ctrl, &located) {
            Ok(items) => {
                log::debug!("net {:?} routed with {} new items", ctrl.net, items.len());
                AutorouteResult::Routed
            }
            Err(e) => {
                log::warn!("inserting the route of net {:?} failed: {e}", ctrl.net);
                AutorouteResult::InsertError
            }
        }
    }

    /// Removes the connections of the ripped items, then the trace tails
    /// left behind on their nets.
    fn rip_up(&mut self, items: &BTreeSet<ItemId>, ripped: &mut BTreeSet<ItemId>) {
        let mut nets = BTreeSet::new();
        let connections: BTreeSet<ItemId> = items
            .iter()
            .flat_map(|item| self.board.connection_items(*item))
            .collect();
        for item in connections {
            match self.remove_board_item(item) {
                Ok(removed) => {
                    nets.extend(removed.nets.iter().copied());
                    ripped.insert(item);
                }
                Err(e) => log::warn!("ripping {item:?} failed: {e}"),
            }
        }
        for net in nets {
            loop {
                let tails = self.board.trace_tails(net);
                if tails.is_empty() {
                    break;
                }
                let mut removed = false;
                for tail in tails {
                    if self.remove_board_item(tail).is_ok() {
                        ripped.insert(tail);
                        removed = true;
                    }
                }
                if !removed {
                    break;
                }
            }
        }
    }

    /// Adds routed geometry to the board and keeps the room database in sync.
    pub fn insert_item(
        &mut self,
        kind: ItemKind,
        nets: Vec<NetId>,
        clearance_class: usize,
    ) -> Result<ItemId, BoardError> {
        let id = self.board.insert_checked(kind, nets, clearance_class)?;
        self.item_inserted(id);
        Ok(id)
    }

    pub fn remove_board_item(&mut self, id: ItemId) -> Result<Item, BoardError> {
        let item = self.board.remove_item(id)?;
        self.item_removed(&item);
        Ok(item)
    }

    /// Hook for an item added to the board.
    pub fn item_inserted(&mut self, id: ItemId) {
        let Some(item) = self.board.item(id) else {
            return;
        };
        self.tree.insert_item(&self.board, item);
        let tiles: Vec<(usize, TileShape)> = (0..item.tile_count())
            .filter_map(|tile| {
                let layer = item.tile_layer(tile);
                Some((layer, self.tree.item_shape(id, tile, layer)?.clone()))
            })
            .collect();
        for (layer, shape) in tiles {
            self.drill_pages.invalidate(&shape.bounding_box());
            if !self.config.maintain_database {
                continue;
            }
            let rooms: Vec<RoomId> = self
                .tree
                .overlapping_entries(&shape, layer)
                .into_iter()
                .filter(|e| e.shape.overlaps(&shape))
                .filter_map(|e| match e.object {
                    TreeObject::Room(room) => Some(room),
                    TreeObject::Item { .. } => None,
                })
                .collect();
            for room in rooms {
                self.remove_complete_room(room);
            }
        }
    }

    /// Hook for an item removed from the board.
    pub fn item_removed(&mut self, item: &Item) {
        self.tree.remove_item(item);
        for tile in 0..item.tile_count() {
            self.drill_pages
                .invalidate(&self.board.tree_shape(item, tile).bounding_box());
        }
        self.remove_obstacle_rooms(item.id);
    }

    /// Drops the obstacle rooms of `item`. With a maintained database the
    /// complete rooms bounded by them are dropped as well, so they can grow
    /// into the freed space.
    fn remove_obstacle_rooms(&mut self, item: ItemId) {
        for obstacle in self.item_info.invalidate(item) {
            let Some(room) = self.graph.room(obstacle) else {
                continue;
            };
            let neighbours: Vec<RoomId> = room
                .doors
                .iter()
                .filter_map(|d| self.graph.door(*d)?.other_room(obstacle))
                .filter(|r| self.graph.room(*r).is_some_and(|r| r.is_complete()))
                .collect();
            self.graph.remove_room(obstacle);
            if self.config.maintain_database {
                for neighbour in neighbours {
                    self.remove_complete_room(neighbour);
                }
            }
        }
    }

    pub fn add_incomplete_room(&mut self, shape: TileShape, layer: usize, contained: TileShape) -> RoomId {
        self.graph.add_room(ExpansionRoom::incomplete(shape, layer, contained))
    }

    pub(crate) fn add_complete_room(&mut self, shape: TileShape, layer: usize, net_dependent: bool) -> RoomId {
        let id_no = self.graph.next_id_no();
        let room = self.graph.add_room(ExpansionRoom {
            shape: shape.clone(),
            layer,
            doors: Vec::new(),
            kind: RoomKind::Complete { id_no, net_dependent },
        });
        self.tree.insert_room(room, layer, shape);
        room
    }

    /// Replaces an incomplete room by complete rooms covering its contained
    /// shape and calculates their doors.
    pub fn complete_expansion_room(
        &mut self,
        room: RoomId,
        ctrl: &AutorouteControl,
    ) -> Result<Vec<RoomId>, AutorouteError> {
        if self.is_stop_requested() {
            return Err(AutorouteError::Stopped);
        }
        let net = self.current_net()?;
        let incomplete = self
            .graph
            .remove_room(room)
            .ok_or(AutorouteError::MissingRoom(room))?;
        let RoomKind::Incomplete { contained } = incomplete.kind else {
            self.anomaly(format_args!("{room:?} is not an incomplete room"));
            return Ok(Vec::new());
        };
        let layer = incomplete.layer;

        let mut pending = vec![(incomplete.shape, contained)];
        let mut result = Vec::new();
        while let Some((shape, contained)) = pending.pop() {
            let mut pieces = self
                .tree
                .complete_shape(&self.board, &shape, layer, &contained, net, None)
                .into_iter();
            let Some(first) = pieces.next() else {
                continue;
            };
            let id = self.add_complete_room(first.shape, layer, first.net_dependent);
            self.calculate_doors(id, ctrl)?;
            result.push(id);
            pending.extend(pieces.map(|p| (p.shape, p.contained)));
        }
        Ok(result)
    }

    /// Makes every neighbour of `room` complete, calculating the doors of an
    /// obstacle room on first use.
    pub fn complete_neighbour_rooms(&mut self, room: RoomId, ctrl: &AutorouteControl) -> Result<(), AutorouteError> {
        let needs_doors = matches!(
            self.graph.room(room).map(|r| &r.kind),
            Some(RoomKind::Obstacle {
                doors_calculated: false,
                ..
            })
        );
        if needs_doors {
            self.calculate_obstacle_doors(room)?;
        }
        let Some(current) = self.graph.room(room) else {
            return Err(AutorouteError::MissingRoom(room));
        };
        let incomplete: Vec<RoomId> = current
            .doors
            .iter()
            .filter_map(|d| self.graph.door(*d)?.other_room(room))
            .filter(|r| self.graph.room(*r).is_some_and(|r| r.is_incomplete()))
            .collect();
        for neighbour in incomplete {
            if self.graph.room(neighbour).is_some() {
                self.complete_expansion_room(neighbour, ctrl)?;
            }
        }
        Ok(())
    }

    /// Removes a complete room. Each free neighbour gets an incomplete room in
    /// its place, entered through the old door.
    pub fn remove_complete_room(&mut self, room: RoomId) {
        let Some(removed) = self.graph.room(room) else {
            return;
        };
        if !removed.is_complete() {
            return;
        }
        let shape = removed.shape.clone();
        let layer = removed.layer;
        let neighbours: Vec<(RoomId, TileShape)> = removed
            .doors
            .iter()
            .filter_map(|d| self.graph.door(*d))
            .filter(|door| door.dimension == 1)
            .filter_map(|door| Some((door.other_room(room)?, door.shape.clone())))
            .filter(|(r, _)| self.graph.room(*r).is_some_and(|r| !r.is_incomplete()))
            .collect();

        self.tree.remove_room(room, layer);
        self.graph.remove_room(room);
        for (neighbour, door_shape) in neighbours {
            let incomplete = self.add_incomplete_room(shape.clone(), layer, door_shape.clone());
            self.graph.add_door(ExpansionDoor::new(
                door_shape,
                DoorKind::Boundary {
                    first: neighbour,
                    second: incomplete,
                },
            ));
        }
        self.drill_pages.invalidate(&shape.bounding_box());
    }

    /// Drops all rooms, doors and routing annotations.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.tree.remove_all_rooms();
        self.item_info.clear();
        self.drill_pages.invalidate_all();
    }

    pub fn invalidate_drill_pages(&mut self, shape: &IntBox) {
        self.drill_pages.invalidate(shape);
    }

    pub(crate) fn anomaly(&self, args: fmt::Arguments<'_>) {
        if self.config.test_level >= TestLevel::Warnings {
            log::warn!("{args}");
        } else {
            log::debug!("{args}");
        }
    }

    /// Shapes of the complete rooms by layer, for debug output.
    pub fn room_shapes(&self) -> Vec<(usize, TileShape)> {
        self.graph
            .rooms()
            .filter(|(_, room)| room.is_complete())
            .map(|(_, room)| (room.layer, room.shape.clone()))
            .collect()
    }

    /// Checks the room database: doors are mutual, complete rooms keep out of
    /// the trace obstacles of the current net and do not overlap each other.
    pub fn validate(&self) -> bool {
        let mut ok = self.graph.doors_are_mutual();
        if !ok {
            log::warn!("door lists of the room graph are not mutual");
        }
        let Some(net) = self.net else {
            return ok;
        };
        for (id, room) in self.graph.rooms().filter(|(_, r)| r.is_complete()) {
            for entry in self.tree.overlapping_entries(&room.shape, room.layer) {
                if !entry.shape.overlaps(&room.shape) {
                    continue;
                }
                let conflict = match entry.object {
                    TreeObject::Room(other) => other != id,
                    TreeObject::Item { item, .. } => self
                        .board
                        .item(item)
                        .is_some_and(|item| item.is_trace_obstacle(net)),
                };
                if conflict {
                    log::warn!("{id:?} overlaps {:?} on layer {}", entry.object, room.layer);
                    ok = false;
                }
            }
        }
        ok
    }
}
