use crate::control::AutorouteControl;
use crate::engine::AutorouteEngine;
use crate::error::AutorouteError;
use crate::rooms::RoomId;
use crate::search_tree::TreeObject;
use pcb_common::db::indices::NetId;
use pcb_common::geom::{IntBox, IntPoint, TileShape};

/// A via location reaching one complete room on each layer it spans.
#[derive(Clone, Debug)]
pub struct ExpansionDrill {
    /// Free area of the page the location was taken from.
    pub shape: IntBox,
    pub location: IntPoint,
    pub first_layer: usize,
    pub last_layer: usize,
    /// Room containing the location, indexed by `layer - first_layer`.
    pub room_arr: Vec<RoomId>,
}

impl ExpansionDrill {
    pub fn room(&self, layer: usize) -> Option<RoomId> {
        if layer < self.first_layer {
            return None;
        }
        self.room_arr.get(layer - self.first_layer).copied()
    }
}

#[derive(Clone, Debug)]
pub struct DrillPage {
    pub shape: IntBox,
    drills: Option<Vec<ExpansionDrill>>,
    net: Option<NetId>,
}

/// Fixed grid of pages over the board. Drills of a page are calculated on
/// first use for a net and dropped when the board changes below the page.
#[derive(Clone, Debug)]
pub struct DrillPageArray {
    bounds: IntBox,
    page_width: i64,
    columns: usize,
    rows: usize,
    pages: Vec<DrillPage>,
}

impl DrillPageArray {
    pub fn new(bounds: IntBox, page_width: i64) -> Self {
        let page_width = page_width.max(1);
        let columns = (bounds.width().max(1) + page_width - 1) / page_width;
        let rows = (bounds.height().max(1) + page_width - 1) / page_width;
        let mut pages = Vec::with_capacity((columns * rows) as usize);
        for row in 0..rows {
            for col in 0..columns {
                let llx = bounds.ll.x + col * page_width;
                let lly = bounds.ll.y + row * page_width;
                pages.push(DrillPage {
                    shape: IntBox::new(
                        llx,
                        lly,
                        (llx + page_width).min(bounds.ur.x),
                        (lly + page_width).min(bounds.ur.y),
                    ),
                    drills: None,
                    net: None,
                });
            }
        }
        Self {
            bounds,
            page_width,
            columns: columns as usize,
            rows: rows as usize,
            pages,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Option<&DrillPage> {
        self.pages.get(index)
    }

    fn column_range(&self, lo: i64, hi: i64, origin: i64, count: usize) -> (usize, usize) {
        let first = ((lo - origin) / self.page_width).clamp(0, count as i64 - 1);
        let last = ((hi - origin) / self.page_width).clamp(0, count as i64 - 1);
        (first as usize, last as usize)
    }

    /// Indices of the pages meeting `shape`.
    pub fn overlapping_pages(&self, shape: &IntBox) -> Vec<usize> {
        if shape.is_empty() || !shape.intersects(&self.bounds) || self.pages.is_empty() {
            return Vec::new();
        }
        let (c0, c1) = self.column_range(shape.ll.x, shape.ur.x, self.bounds.ll.x, self.columns);
        let (r0, r1) = self.column_range(shape.ll.y, shape.ur.y, self.bounds.ll.y, self.rows);
        let mut result = Vec::new();
        for row in r0..=r1 {
            for col in c0..=c1 {
                result.push(row * self.columns + col);
            }
        }
        result
    }

    pub fn invalidate(&mut self, shape: &IntBox) {
        for page in self.overlapping_pages(shape) {
            self.pages[page].drills = None;
        }
    }

    pub fn invalidate_all(&mut self) {
        for page in &mut self.pages {
            page.drills = None;
        }
    }

    /// The drills of a page if they were calculated for `net`.
    pub fn drills(&self, page: usize, net: NetId) -> Option<&[ExpansionDrill]> {
        let page = self.pages.get(page)?;
        if page.net != Some(net) {
            return None;
        }
        page.drills.as_deref()
    }

    fn store(&mut self, page: usize, net: NetId, drills: Vec<ExpansionDrill>) {
        if let Some(page) = self.pages.get_mut(page) {
            page.drills = Some(drills);
            page.net = Some(net);
        }
    }
}

/// Splits `area` into boxes not overlapping any of the `cutouts`.
fn subtract_boxes(area: IntBox, cutouts: &[IntBox]) -> Vec<IntBox> {
    let mut pieces = vec![area];
    for cut in cutouts {
        let mut next = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let common = piece.intersection(cut);
            if common.dimension() < 2 {
                next.push(piece);
                continue;
            }
            if piece.ll.y < common.ll.y {
                next.push(IntBox::new(piece.ll.x, piece.ll.y, piece.ur.x, common.ll.y));
            }
            if common.ur.y < piece.ur.y {
                next.push(IntBox::new(piece.ll.x, common.ur.y, piece.ur.x, piece.ur.y));
            }
            if piece.ll.x < common.ll.x {
                next.push(IntBox::new(piece.ll.x, common.ll.y, common.ll.x, common.ur.y));
            }
            if common.ur.x < piece.ur.x {
                next.push(IntBox::new(common.ur.x, common.ll.y, piece.ur.x, common.ur.y));
            }
        }
        pieces = next;
    }
    pieces.retain(|p| p.dimension() == 2);
    pieces
}

impl AutorouteEngine {
    /// The drills of `page` for the current net, calculated on first use.
    pub(crate) fn page_drills(
        &mut self,
        page: usize,
        ctrl: &AutorouteControl,
    ) -> Result<Vec<ExpansionDrill>, AutorouteError> {
        let net = self.current_net()?;
        if let Some(drills) = self.drill_pages.drills(page, net) {
            return Ok(drills.to_vec());
        }
        let Some(page_shape) = self.drill_pages.page(page).map(|p| p.shape) else {
            return Ok(Vec::new());
        };
        let layer_count = self.board.layer_count();
        let margin = ctrl.via_radius.iter().copied().max().unwrap_or(0);
        let usable = page_shape.intersection(&self.board.bounding_box.offset(-margin));
        let mut drills = Vec::new();
        if usable.dimension() == 2 {
            let mut cutouts = Vec::new();
            for layer in 0..layer_count {
                let reach = TileShape::Box(usable.offset(ctrl.compensated_via_radius[layer]));
                for (id, tile) in self.board.overlapping_tiles(&reach, layer) {
                    let Some(item) = self.board.item(id) else {
                        continue;
                    };
                    if item.is_trace_obstacle(net) {
                        let bounds = self.board.tree_shape(item, tile).bounding_box();
                        cutouts.push(bounds.offset(ctrl.compensated_via_radius[layer]));
                    }
                }
            }
            for piece in subtract_boxes(usable, &cutouts) {
                let location = piece.centre_of_gravity().round();
                let mut room_arr = Vec::with_capacity(layer_count);
                for layer in 0..layer_count {
                    match self.drill_room(location, layer, ctrl)? {
                        Some(room) => room_arr.push(room),
                        None => break,
                    }
                }
                if room_arr.len() == layer_count {
                    drills.push(ExpansionDrill {
                        shape: piece,
                        location,
                        first_layer: 0,
                        last_layer: layer_count - 1,
                        room_arr,
                    });
                }
            }
        }
        log::debug!("drill page {page}: {} drills for net {net:?}", drills.len());
        self.drill_pages.store(page, net, drills.clone());
        Ok(drills)
    }

    /// The single complete room containing `location` on `layer`, completing
    /// one if the location is not yet covered.
    fn drill_room(
        &mut self,
        location: IntPoint,
        layer: usize,
        ctrl: &AutorouteControl,
    ) -> Result<Option<RoomId>, AutorouteError> {
        let point = TileShape::Box(IntBox::from_point(location));
        let containing: Vec<RoomId> = self
            .tree
            .overlapping_entries(&point, layer)
            .into_iter()
            .filter_map(|e| match e.object {
                TreeObject::Room(room) => Some(room),
                TreeObject::Item { .. } => None,
            })
            .collect();
        match containing.len() {
            0 => {}
            1 => return Ok(Some(containing[0])),
            _ => return Ok(None),
        }
        let geometry = self.tree.geometry();
        let board_shape = geometry.convert(&TileShape::Box(self.board.bounding_box));
        let contained = geometry.convert(&point);
        let incomplete = self.add_incomplete_room(board_shape, layer, contained);
        let rooms = self.complete_expansion_room(incomplete, ctrl)?;
        let found: Vec<RoomId> = rooms
            .into_iter()
            .filter(|r| {
                self.graph
                    .room(*r)
                    .is_some_and(|room| room.shape.contains_point(location.to_float()))
            })
            .collect();
        Ok(if found.len() == 1 { Some(found[0]) } else { None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcb_common::db::core::{Board, FixedState, ItemKind, test_board};
    use pcb_common::util::config::{AngleRestriction, AutorouteConfig};
    use rstest::rstest;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn pages_cover_the_board() {
        let pages = DrillPageArray::new(IntBox::new(0, 0, 2500, 1000), 1000);
        assert_eq!(pages.page_count(), 3);
        assert_eq!(pages.page(2).unwrap().shape, IntBox::new(2000, 0, 2500, 1000));
        assert_eq!(pages.overlapping_pages(&IntBox::new(900, 100, 1100, 200)), vec![0, 1]);
        assert!(pages.overlapping_pages(&IntBox::new(3000, 0, 3100, 10)).is_empty());
    }

    #[test]
    fn subtraction_leaves_the_free_area() {
        let pieces = subtract_boxes(IntBox::new(0, 0, 100, 100), &[IntBox::new(40, 40, 60, 60)]);
        let area: f64 = pieces.iter().map(|p| p.area()).sum();
        assert!((area - (10_000.0 - 400.0)).abs() < 1e-9);
        for p in &pieces {
            assert!(p.intersection(&IntBox::new(40, 40, 60, 60)).dimension() < 2);
        }
    }

    fn engine_for(board: Board, restriction: AngleRestriction) -> (AutorouteEngine, AutorouteControl) {
        let config = AutorouteConfig {
            angle_restriction: restriction,
            ..AutorouteConfig::default()
        };
        let net = board.net_id("A").unwrap();
        let ctrl = AutorouteControl::new(&board, net, &config);
        let mut engine = AutorouteEngine::new(board, &config);
        engine.init_connection(net, Arc::new(AtomicBool::new(false)), None);
        (engine, ctrl)
    }

    #[rstest]
    #[case(AngleRestriction::NinetyDegree)]
    #[case(AngleRestriction::FortyFiveDegree)]
    #[case(AngleRestriction::None)]
    fn drills_keep_clear_of_obstacles(#[case] restriction: AngleRestriction) {
        let mut board = test_board(1000, 1000);
        board.add_net("A");
        let keepout = ItemKind::Keepout {
            shape: TileShape::Box(IntBox::new(300, 0, 700, 1000)),
            first_layer: 1,
            last_layer: 1,
        };
        board.add_item(keepout, Vec::new(), FixedState::SystemFixed, 0).unwrap();
        let (mut engine, ctrl) = engine_for(board, restriction);

        let drills = engine.page_drills(0, &ctrl).unwrap();
        assert!(!drills.is_empty());
        let blocked = IntBox::new(290, 0, 710, 1000).offset(ctrl.compensated_via_radius[1]);
        for drill in &drills {
            assert!(!blocked.contains_inside(drill.location.to_float()));
            assert_eq!(drill.room_arr.len(), 2);
            for layer in 0..2 {
                let room = engine.graph.room(drill.room(layer).unwrap()).unwrap();
                assert!(room.shape.contains_point(drill.location.to_float()));
            }
        }
        let cached = engine.page_drills(0, &ctrl).unwrap();
        assert_eq!(cached.len(), drills.len());

        engine.invalidate_drill_pages(&IntBox::new(0, 0, 10, 10));
        assert!(engine.drill_pages.drills(0, ctrl.net).is_none());
    }
}
