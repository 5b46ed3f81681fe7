use crate::geometry::TileGeometry;
use crate::rooms::RoomId;
use pcb_common::db::core::{Board, Item};
use pcb_common::db::indices::{ItemId, NetId};
use pcb_common::geom::rtree::SpatialIndex;
use pcb_common::geom::{EPSILON, TileShape};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TreeObject {
    Item { item: ItemId, tile: usize },
    Room(RoomId),
}

#[derive(Clone, Debug)]
pub struct TreeEntry {
    pub object: TreeObject,
    pub shape: TileShape,
}

/// A free room candidate after restraining it against the obstacles.
#[derive(Clone, Debug)]
pub struct CompletedShape {
    pub shape: TileShape,
    pub contained: TileShape,
    /// Set if a same net item overlaps the shape, so another net may not reuse it.
    pub net_dependent: bool,
}

const ROOM_KEY: u64 = 1 << 63;

fn item_key(item: ItemId, tile: usize) -> u64 {
    ((item.0 as u64) << 32) | tile as u64
}

fn room_key(room: RoomId) -> u64 {
    ROOM_KEY | room.0 as u64
}

/// Item tiles and complete free rooms per layer, stored in the shape
/// representation of the routing angle restriction.
pub struct SearchTree {
    geometry: &'static dyn TileGeometry,
    layers: Vec<SpatialIndex<TreeEntry>>,
}

impl SearchTree {
    pub fn new(board: &Board, geometry: &'static dyn TileGeometry) -> Self {
        let mut tree = Self {
            geometry,
            layers: (0..board.layer_count()).map(|_| SpatialIndex::new()).collect(),
        };
        for item in board.items() {
            tree.insert_item(board, item);
        }
        tree
    }

    pub fn geometry(&self) -> &'static dyn TileGeometry {
        self.geometry
    }

    pub fn insert_item(&mut self, board: &Board, item: &Item) {
        for tile in 0..item.tile_count() {
            let layer = item.tile_layer(tile);
            let shape = self.geometry.convert(&board.tree_shape(item, tile));
            if let Some(index) = self.layers.get_mut(layer) {
                let bounds = shape.bounding_box();
                let object = TreeObject::Item { item: item.id, tile };
                index.insert(item_key(item.id, tile), bounds, TreeEntry { object, shape });
            }
        }
    }

    pub fn remove_item(&mut self, item: &Item) {
        for tile in 0..item.tile_count() {
            if let Some(index) = self.layers.get_mut(item.tile_layer(tile)) {
                index.remove(item_key(item.id, tile));
            }
        }
    }

    /// Tree shape of an item tile as stored in the tree.
    pub fn item_shape(&self, item: ItemId, tile: usize, layer: usize) -> Option<&TileShape> {
        self.layers
            .get(layer)?
            .get(item_key(item, tile))
            .map(|entry| &entry.shape)
    }

    pub fn insert_room(&mut self, room: RoomId, layer: usize, shape: TileShape) {
        if let Some(index) = self.layers.get_mut(layer) {
            let bounds = shape.bounding_box();
            index.insert(
                room_key(room),
                bounds,
                TreeEntry {
                    object: TreeObject::Room(room),
                    shape,
                },
            );
        }
    }

    pub fn remove_room(&mut self, room: RoomId, layer: usize) {
        if let Some(index) = self.layers.get_mut(layer) {
            index.remove(room_key(room));
        }
    }

    pub fn remove_all_rooms(&mut self) {
        for index in &mut self.layers {
            let rooms: Vec<u64> = index
                .iter()
                .map(|(key, _)| key)
                .filter(|key| key & ROOM_KEY != 0)
                .collect();
            for key in rooms {
                index.remove(key);
            }
        }
    }

    pub fn room_count(&self) -> usize {
        self.layers
            .iter()
            .map(|index| index.iter().filter(|(key, _)| key & ROOM_KEY != 0).count())
            .sum()
    }

    /// Entries on `layer` having at least one point in common with `shape`.
    pub fn overlapping_entries(&self, shape: &TileShape, layer: usize) -> Vec<TreeEntry> {
        let Some(index) = self.layers.get(layer) else {
            return Vec::new();
        };
        if shape.is_empty() {
            return Vec::new();
        }
        index
            .query(&shape.bounding_box())
            .into_iter()
            .filter(|(_, entry)| entry.shape.intersects(shape))
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    /// Restrains the candidate shape of an incomplete room on `layer` against
    /// the trace obstacles of `net` and the complete rooms in the tree. Every
    /// returned piece is 2-dimensional and contains a part of `contained`.
    pub fn complete_shape(
        &self,
        board: &Board,
        candidate: &TileShape,
        layer: usize,
        contained: &TileShape,
        net: NetId,
        ignore: Option<TreeObject>,
    ) -> Vec<CompletedShape> {
        let board_shape = self.geometry.convert(&TileShape::Box(board.bounding_box));
        let start = candidate.intersection(&board_shape);
        let contained = contained.intersection(&start);
        if start.dimension() < 2 || contained.is_empty() {
            return Vec::new();
        }

        let entries = self.overlapping_entries(&start, layer);
        let centre = contained.centre_of_gravity();
        let mut obstacles: Vec<(f64, &TreeEntry)> = entries
            .iter()
            .filter(|e| Some(e.object) != ignore)
            .filter(|e| match e.object {
                TreeObject::Item { item, .. } => board
                    .item(item)
                    .is_some_and(|item| item.is_trace_obstacle(net)),
                TreeObject::Room(_) => true,
            })
            .map(|e| (e.shape.nearest_point(centre).distance_square(centre), e))
            .collect();
        obstacles.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.object.cmp(&b.1.object)));

        let mut pieces = vec![(start, contained)];
        for (_, obstacle) in obstacles {
            let mut next = Vec::with_capacity(pieces.len());
            for (shape, contained) in pieces {
                next.extend(self.restrain(shape, contained, &obstacle.shape));
            }
            pieces = next;
            if pieces.is_empty() {
                break;
            }
        }

        pieces
            .into_iter()
            .filter(|(shape, _)| shape.dimension() == 2)
            .map(|(shape, contained)| {
                let net_dependent = entries.iter().any(|e| match e.object {
                    TreeObject::Item { item, .. } => {
                        board.item(item).is_some_and(|i| !i.is_trace_obstacle(net))
                            && e.shape.overlaps(&shape)
                    }
                    TreeObject::Room(_) => false,
                });
                CompletedShape {
                    shape,
                    contained,
                    net_dependent,
                }
            })
            .collect()
    }

    fn restrain(
        &self,
        shape: TileShape,
        contained: TileShape,
        obstacle: &TileShape,
    ) -> Vec<(TileShape, TileShape)> {
        if !shape.overlaps(obstacle) {
            return vec![(shape, contained)];
        }
        let contained_corners = contained.corners();
        let line_count = obstacle.border_line_count();

        let mut best: Option<(f64, TileShape)> = None;
        for i in 0..line_count {
            let line = obstacle.border_line(i);
            let outside = contained_corners
                .iter()
                .all(|p| line.signed_distance(*p) <= EPSILON);
            if !outside {
                continue;
            }
            let piece = shape.intersection(&self.geometry.half_plane(&line.opposite()));
            let area = piece.area();
            if best.as_ref().is_none_or(|(best_area, _)| area > *best_area) {
                best = Some((area, piece));
            }
        }
        if let Some((_, piece)) = best {
            if piece.dimension() < 2 {
                return Vec::new();
            }
            return vec![(piece, contained)];
        }

        // The contained shape crosses the obstacle, split the rest of the shape.
        if contained.dimension() < 1 {
            return Vec::new();
        }
        let mut result = Vec::new();
        let mut remaining = shape;
        for i in 0..line_count {
            let line = obstacle.border_line(i);
            let piece = remaining.intersection(&self.geometry.half_plane(&line.opposite()));
            if piece.dimension() == 2 {
                let piece_contained = contained.intersection(&piece);
                if !piece_contained.is_empty() {
                    result.push((piece, piece_contained));
                }
            }
            remaining = remaining.intersection(&self.geometry.half_plane(&line));
            if remaining.dimension() < 2 {
                break;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::for_restriction;
    use pcb_common::db::core::{FixedState, ItemKind, add_rect_pin, test_board};
    use pcb_common::geom::{FloatPoint, IntBox};
    use pcb_common::util::config::AngleRestriction;
    use rstest::rstest;

    fn keepout(board: &mut Board, rect: IntBox) -> ItemId {
        let kind = ItemKind::Keepout {
            shape: TileShape::Box(rect),
            first_layer: 0,
            last_layer: 1,
        };
        board.add_item(kind, Vec::new(), FixedState::SystemFixed, 0).unwrap()
    }

    #[rstest]
    #[case(AngleRestriction::NinetyDegree)]
    #[case(AngleRestriction::FortyFiveDegree)]
    #[case(AngleRestriction::None)]
    fn free_board_completes_to_its_outline(#[case] restriction: AngleRestriction) {
        let mut board = test_board(1000, 800);
        let net = board.add_net("A");
        let tree = SearchTree::new(&board, for_restriction(restriction));
        let point = TileShape::Box(IntBox::new(500, 400, 500, 400));
        let pieces = tree.complete_shape(&board, &TileShape::Box(IntBox::CRIT), 0, &point, net, None);
        assert_eq!(pieces.len(), 1);
        assert!((pieces[0].shape.area() - 800_000.0).abs() < 1.0);
        assert!(!pieces[0].net_dependent);
    }

    #[rstest]
    #[case(AngleRestriction::NinetyDegree)]
    #[case(AngleRestriction::FortyFiveDegree)]
    #[case(AngleRestriction::None)]
    fn obstacle_cuts_away_the_largest_free_half(#[case] restriction: AngleRestriction) {
        let mut board = test_board(1000, 1000);
        let net = board.add_net("A");
        keepout(&mut board, IntBox::new(600, 0, 700, 1000));
        let tree = SearchTree::new(&board, for_restriction(restriction));
        let point = TileShape::Box(IntBox::new(200, 500, 200, 500));
        let pieces = tree.complete_shape(&board, &TileShape::Box(IntBox::CRIT), 0, &point, net, None);
        assert_eq!(pieces.len(), 1);
        let b = pieces[0].shape.bounding_box();
        // keepout tree shape starts at 590
        assert_eq!(b, IntBox::new(0, 0, 590, 1000));
    }

    #[test]
    fn contained_crossing_an_obstacle_splits_the_candidate() {
        let mut board = test_board(1000, 1000);
        let net = board.add_net("A");
        keepout(&mut board, IntBox::new(450, 450, 550, 550));
        let tree = SearchTree::new(&board, for_restriction(AngleRestriction::NinetyDegree));
        let contained = TileShape::Box(IntBox::new(100, 500, 900, 500));
        let pieces = tree.complete_shape(&board, &TileShape::Box(IntBox::CRIT), 0, &contained, net, None);
        assert!(pieces.len() >= 2);
        for piece in &pieces {
            let keepout_tree = TileShape::Box(IntBox::new(440, 440, 560, 560));
            assert!(!piece.shape.overlaps(&keepout_tree));
            assert!(piece.shape.contains_shape(&piece.contained));
        }
        for (i, a) in pieces.iter().enumerate() {
            for b in &pieces[i + 1..] {
                assert!(!a.shape.overlaps(&b.shape));
            }
        }
        let covered = |p: FloatPoint| pieces.iter().any(|piece| piece.shape.contains_point(p));
        assert!(covered(FloatPoint::new(100.0, 500.0)));
        assert!(covered(FloatPoint::new(900.0, 500.0)));
    }

    #[test]
    fn same_net_items_make_rooms_net_dependent() {
        let mut board = test_board(1000, 1000);
        let net = board.add_net("A");
        let other = board.add_net("B");
        add_rect_pin(&mut board, "a", net, IntBox::new(100, 100, 200, 200), (0, 0)).unwrap();
        let tree = SearchTree::new(&board, for_restriction(AngleRestriction::FortyFiveDegree));
        let point = TileShape::Box(IntBox::new(500, 500, 500, 500));

        let own = tree.complete_shape(&board, &TileShape::Box(IntBox::CRIT), 0, &point, net, None);
        assert_eq!(own.len(), 1);
        assert!(own[0].net_dependent);
        assert!((own[0].shape.area() - 1_000_000.0).abs() < 1.0);

        let foreign = tree.complete_shape(&board, &TileShape::Box(IntBox::CRIT), 0, &point, other, None);
        assert_eq!(foreign.len(), 1);
        assert!(!foreign[0].net_dependent);
        assert!(foreign[0].shape.area() < 1_000_000.0);
    }

    #[test]
    fn complete_rooms_restrain_new_rooms_unless_ignored() {
        let mut board = test_board(1000, 1000);
        let net = board.add_net("A");
        let mut tree = SearchTree::new(&board, for_restriction(AngleRestriction::NinetyDegree));
        let room = RoomId::new(0);
        tree.insert_room(room, 0, TileShape::Box(IntBox::new(0, 0, 500, 1000)));
        assert_eq!(tree.room_count(), 1);

        let point = TileShape::Box(IntBox::new(800, 500, 800, 500));
        let pieces = tree.complete_shape(&board, &TileShape::Box(IntBox::CRIT), 0, &point, net, None);
        assert_eq!(pieces[0].shape.bounding_box(), IntBox::new(500, 0, 1000, 1000));

        let pieces = tree.complete_shape(
            &board,
            &TileShape::Box(IntBox::CRIT),
            0,
            &point,
            net,
            Some(TreeObject::Room(room)),
        );
        assert_eq!(pieces[0].shape.bounding_box(), IntBox::new(0, 0, 1000, 1000));

        tree.remove_all_rooms();
        assert_eq!(tree.room_count(), 0);
    }

    #[test]
    fn contained_inside_an_obstacle_vanishes() {
        let mut board = test_board(1000, 1000);
        let net = board.add_net("A");
        keepout(&mut board, IntBox::new(400, 400, 600, 600));
        let tree = SearchTree::new(&board, for_restriction(AngleRestriction::NinetyDegree));
        let point = TileShape::Box(IntBox::new(500, 500, 500, 500));
        let pieces = tree.complete_shape(&board, &TileShape::Box(IntBox::CRIT), 0, &point, net, None);
        assert!(pieces.is_empty());
    }
}
