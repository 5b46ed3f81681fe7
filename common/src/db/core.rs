use crate::db::indices::*;
use crate::geom::rtree::SpatialIndex;
use crate::geom::simplex::GeometryError;
use crate::geom::{IntBox, IntOctagon, IntPoint, Simplex, TileShape};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerDirection {
    Horizontal,
    Vertical,
    Unknown,
}

#[derive(Clone, Debug)]
pub struct Layer {
    pub name: String,
    pub direction: LayerDirection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedState {
    Unfixed,
    UserFixed,
    SystemFixed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClearanceClass {
    pub name: String,
    pub clearance: i64,
}

#[derive(Clone, Debug)]
pub struct Rules {
    pub clearance_classes: Vec<ClearanceClass>,
    pub trace_half_width: i64,
    pub via_diameter: i64,
}

impl Rules {
    /// Half of the clearance, added to each side of a pair of items.
    pub fn compensation(&self, class: usize) -> i64 {
        self.clearance_classes
            .get(class)
            .map(|c| c.clearance / 2)
            .unwrap_or(0)
    }
}

#[derive(Clone, Debug)]
pub enum ItemKind {
    Pin {
        name: String,
        shape: TileShape,
        first_layer: usize,
        last_layer: usize,
    },
    Via {
        centre: IntPoint,
        diameter: i64,
        first_layer: usize,
        last_layer: usize,
    },
    Trace {
        corners: Vec<IntPoint>,
        half_width: i64,
        layer: usize,
    },
    Keepout {
        shape: TileShape,
        first_layer: usize,
        last_layer: usize,
    },
}

#[derive(Clone, Debug)]
pub struct Item {
    pub id: ItemId,
    pub nets: Vec<NetId>,
    pub fixed: FixedState,
    pub clearance_class: usize,
    pub kind: ItemKind,
}

impl Item {
    pub fn tile_count(&self) -> usize {
        match &self.kind {
            ItemKind::Pin {
                first_layer,
                last_layer,
                ..
            }
            | ItemKind::Via {
                first_layer,
                last_layer,
                ..
            }
            | ItemKind::Keepout {
                first_layer,
                last_layer,
                ..
            } => last_layer + 1 - first_layer,
            ItemKind::Trace { corners, .. } => corners.len().saturating_sub(1),
        }
    }

    pub fn tile_layer(&self, tile: usize) -> usize {
        match &self.kind {
            ItemKind::Pin { first_layer, .. }
            | ItemKind::Via { first_layer, .. }
            | ItemKind::Keepout { first_layer, .. } => first_layer + tile,
            ItemKind::Trace { layer, .. } => *layer,
        }
    }

    pub fn tile_shape(&self, tile: usize) -> TileShape {
        match &self.kind {
            ItemKind::Pin { shape, .. } | ItemKind::Keepout { shape, .. } => shape.clone(),
            ItemKind::Via {
                centre, diameter, ..
            } => TileShape::Octagon(IntOctagon::circle_approx(*centre, diameter / 2)),
            ItemKind::Trace {
                corners,
                half_width,
                ..
            } => TileShape::segment(corners[tile], corners[tile + 1], *half_width),
        }
    }

    pub fn contains_net(&self, net: NetId) -> bool {
        self.nets.contains(&net)
    }

    /// A trace of `net` may not overlap this item.
    pub fn is_trace_obstacle(&self, net: NetId) -> bool {
        !self.contains_net(net)
    }

    pub fn shares_net(&self, other: &Item) -> bool {
        self.nets.iter().any(|n| other.nets.contains(n))
    }

    pub fn is_trace(&self) -> bool {
        matches!(self.kind, ItemKind::Trace { .. })
    }

    pub fn is_via(&self) -> bool {
        matches!(self.kind, ItemKind::Via { .. })
    }

    /// Traces and vias that are not fixed may be ripped up by the router.
    pub fn is_routable(&self) -> bool {
        (self.is_trace() || self.is_via()) && self.fixed == FixedState::Unfixed
    }

    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::Pin { name, .. } => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BoardError {
    #[error("item {0:?} does not exist")]
    UnknownItem(ItemId),
    #[error("layer {0} does not exist")]
    UnknownLayer(usize),
    #[error("net '{0}' is not declared")]
    UnknownNet(String),
    #[error("trace needs at least 2 distinct corners")]
    DegenerateTrace,
    #[error("new item violates the clearance to {other:?} on layer {layer}")]
    ClearanceViolation { layer: usize, other: ItemId },
    #[error("new item leaves the board outline on layer {0}")]
    OutsideBoard(usize),
    #[error(transparent)]
    InvalidShape(#[from] GeometryError),
}

fn tile_key(item: ItemId, tile: usize) -> u64 {
    ((item.0 as u64) << 32) | tile as u64
}

fn key_tile(key: u64) -> (ItemId, usize) {
    (ItemId((key >> 32) as u32), (key & 0xffff_ffff) as usize)
}

pub struct Board {
    pub bounding_box: IntBox,
    pub layers: Vec<Layer>,
    pub rules: Rules,
    pub net_names: Vec<String>,
    items: Vec<Option<Item>>,
    index: Vec<SpatialIndex<()>>,
}

impl Board {
    pub fn new(bounding_box: IntBox, layers: Vec<Layer>, rules: Rules) -> Self {
        let index = layers.iter().map(|_| SpatialIndex::new()).collect();
        Self {
            bounding_box,
            layers,
            rules,
            net_names: Vec::new(),
            items: Vec::new(),
            index,
        }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn add_net(&mut self, name: &str) -> NetId {
        if let Some(pos) = self.net_names.iter().position(|n| n == name) {
            return NetId::new(pos);
        }
        self.net_names.push(name.to_string());
        NetId::new(self.net_names.len() - 1)
    }

    pub fn net_id(&self, name: &str) -> Option<NetId> {
        self.net_names.iter().position(|n| n == name).map(NetId::new)
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.index()).and_then(|i| i.as_ref())
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().flatten()
    }

    pub fn item_count(&self) -> usize {
        self.items.iter().flatten().count()
    }

    pub fn compensation(&self, item: &Item) -> i64 {
        self.rules.compensation(item.clearance_class)
    }

    /// Tile enlarged by half the clearance of the item.
    pub fn tree_shape(&self, item: &Item, tile: usize) -> TileShape {
        item.tile_shape(tile).offset(self.compensation(item))
    }

    fn check_kind(&self, kind: &ItemKind) -> Result<(), BoardError> {
        let layers = self.layer_count();
        match kind {
            ItemKind::Trace { corners, layer, .. } => {
                if *layer >= layers {
                    return Err(BoardError::UnknownLayer(*layer));
                }
                if corners.len() < 2 || corners.windows(2).any(|w| w[0] == w[1]) {
                    return Err(BoardError::DegenerateTrace);
                }
            }
            ItemKind::Pin { last_layer, .. }
            | ItemKind::Via { last_layer, .. }
            | ItemKind::Keepout { last_layer, .. } => {
                if *last_layer >= layers {
                    return Err(BoardError::UnknownLayer(*last_layer));
                }
            }
        }
        Ok(())
    }

    /// Adds an item without clearance validation.
    pub fn add_item(
        &mut self,
        kind: ItemKind,
        nets: Vec<NetId>,
        fixed: FixedState,
        clearance_class: usize,
    ) -> Result<ItemId, BoardError> {
        self.check_kind(&kind)?;
        let id = ItemId::new(self.items.len());
        let item = Item {
            id,
            nets,
            fixed,
            clearance_class,
            kind,
        };
        for tile in 0..item.tile_count() {
            let layer = item.tile_layer(tile);
            let bounds = self.tree_shape(&item, tile).bounding_box();
            self.index[layer].insert(tile_key(id, tile), bounds, ());
        }
        self.items.push(Some(item));
        Ok(id)
    }

    /// Adds routed geometry. Fails without touching the board if the new item
    /// comes closer than the clearance to an item of another net.
    pub fn insert_checked(
        &mut self,
        kind: ItemKind,
        nets: Vec<NetId>,
        clearance_class: usize,
    ) -> Result<ItemId, BoardError> {
        self.check_kind(&kind)?;
        let candidate = Item {
            id: ItemId::new(self.items.len()),
            nets,
            fixed: FixedState::Unfixed,
            clearance_class,
            kind,
        };
        for tile in 0..candidate.tile_count() {
            let layer = candidate.tile_layer(tile);
            let shape = candidate.tile_shape(tile);
            if !TileShape::Box(self.bounding_box).contains_shape(&shape) {
                return Err(BoardError::OutsideBoard(layer));
            }
            let tree_shape = shape.offset(self.compensation(&candidate));
            for other in self.overlapping_tiles(&tree_shape, layer) {
                let (other_id, other_tile) = other;
                let Some(other_item) = self.item(other_id) else {
                    continue;
                };
                if other_item.shares_net(&candidate) {
                    continue;
                }
                if self.tree_shape(other_item, other_tile).overlaps(&tree_shape) {
                    return Err(BoardError::ClearanceViolation {
                        layer,
                        other: other_id,
                    });
                }
            }
        }
        self.add_item(candidate.kind, candidate.nets, candidate.fixed, candidate.clearance_class)
    }

    pub fn remove_item(&mut self, id: ItemId) -> Result<Item, BoardError> {
        let item = self
            .items
            .get_mut(id.index())
            .and_then(|i| i.take())
            .ok_or(BoardError::UnknownItem(id))?;
        for tile in 0..item.tile_count() {
            self.index[item.tile_layer(tile)].remove(tile_key(id, tile));
        }
        Ok(item)
    }

    /// Tiles whose tree shape bounding box meets the bounding box of `shape`.
    pub fn overlapping_tiles(&self, shape: &TileShape, layer: usize) -> Vec<(ItemId, usize)> {
        let Some(index) = self.index.get(layer) else {
            return Vec::new();
        };
        index
            .query(&shape.bounding_box())
            .into_iter()
            .map(|(key, _)| key_tile(key))
            .collect()
    }

    /// Items sharing a net with `id` whose copper touches it on a common layer.
    pub fn contacts(&self, id: ItemId) -> Vec<ItemId> {
        let Some(item) = self.item(id) else {
            return Vec::new();
        };
        let mut result = BTreeSet::new();
        for tile in 0..item.tile_count() {
            let layer = item.tile_layer(tile);
            let shape = item.tile_shape(tile);
            for (other_id, other_tile) in self.overlapping_tiles(&shape, layer) {
                if other_id == id || result.contains(&other_id) {
                    continue;
                }
                let Some(other) = self.item(other_id) else {
                    continue;
                };
                if other.shares_net(item) && other.tile_shape(other_tile).intersects(&shape) {
                    result.insert(other_id);
                }
            }
        }
        result.into_iter().collect()
    }

    /// All items transitively connected to `id` through contacts.
    pub fn connected_set(&self, id: ItemId) -> BTreeSet<ItemId> {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();
        if self.item(id).is_some() {
            visited.insert(id);
            queue.push_back(id);
        }
        while let Some(current) = queue.pop_front() {
            for next in self.contacts(current) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        visited
    }

    /// The routable items of the connection through `id`: traces and vias
    /// reached over other routable items, stopping at pins and fixed items.
    pub fn connection_items(&self, id: ItemId) -> BTreeSet<ItemId> {
        let mut visited = BTreeSet::new();
        if !self.item(id).is_some_and(Item::is_routable) {
            return visited;
        }
        let mut queue = VecDeque::from([id]);
        visited.insert(id);
        while let Some(current) = queue.pop_front() {
            for next in self.contacts(current) {
                if self.item(next).is_some_and(Item::is_routable) && visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        visited
    }

    /// Routable traces of `net` with an end touching nothing of the net, and
    /// routable vias with fewer than two contacts.
    pub fn trace_tails(&self, net: NetId) -> Vec<ItemId> {
        self.items()
            .filter(|item| item.is_routable() && item.contains_net(net))
            .filter(|item| match &item.kind {
                ItemKind::Trace {
                    corners,
                    half_width,
                    layer,
                } => {
                    let ends = [corners.first(), corners.last()];
                    ends.into_iter().flatten().any(|end| {
                        let end_tile = TileShape::segment(*end, *end, *half_width);
                        !self.overlapping_tiles(&end_tile, *layer).into_iter().any(|(other, tile)| {
                            other != item.id
                                && self.item(other).is_some_and(|o| {
                                    o.shares_net(item) && o.tile_shape(tile).intersects(&end_tile)
                                })
                        })
                    })
                }
                _ => self.contacts(item.id).len() < 2,
            })
            .map(|item| item.id)
            .collect()
    }

    pub fn items_of_net(&self, net: NetId) -> Vec<ItemId> {
        self.items()
            .filter(|i| i.contains_net(net))
            .map(|i| i.id)
            .collect()
    }

    /// Groups the items of `net` into connected components, ordered by smallest id.
    pub fn net_components(&self, net: NetId) -> Vec<BTreeSet<ItemId>> {
        let mut seen = BTreeSet::new();
        let mut result = Vec::new();
        for id in self.items_of_net(net) {
            if seen.contains(&id) {
                continue;
            }
            let set = self.connected_set(id);
            seen.extend(set.iter().copied());
            result.push(set);
        }
        result
    }
}

/// Serialized form of a board, read from and written to TOML files.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoardDescription {
    pub outline: [i64; 4],
    pub layers: Vec<LayerDescription>,
    #[serde(default)]
    pub rules: RulesDescription,
    #[serde(default)]
    pub nets: Vec<String>,
    #[serde(default)]
    pub items: Vec<ItemDescription>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayerDescription {
    pub name: String,
    #[serde(default = "default_layer_direction")]
    pub direction: LayerDirection,
}

fn default_layer_direction() -> LayerDirection {
    LayerDirection::Unknown
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RulesDescription {
    #[serde(default = "default_trace_half_width")]
    pub trace_half_width: i64,
    #[serde(default = "default_via_diameter")]
    pub via_diameter: i64,
    #[serde(default = "default_clearance_classes")]
    pub clearance_classes: Vec<ClearanceClass>,
}

impl Default for RulesDescription {
    fn default() -> Self {
        Self {
            trace_half_width: default_trace_half_width(),
            via_diameter: default_via_diameter(),
            clearance_classes: default_clearance_classes(),
        }
    }
}

fn default_trace_half_width() -> i64 {
    125
}

fn default_via_diameter() -> i64 {
    600
}

fn default_clearance_classes() -> Vec<ClearanceClass> {
    vec![ClearanceClass {
        name: "default".to_string(),
        clearance: 200,
    }]
}

fn default_clearance_class() -> usize {
    0
}

fn default_pin_fixed() -> FixedState {
    FixedState::SystemFixed
}

fn default_route_fixed() -> FixedState {
    FixedState::Unfixed
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeDescription {
    Rect { ll: [i64; 2], ur: [i64; 2] },
    Circle { centre: [i64; 2], radius: i64 },
    Polygon { corners: Vec<[i64; 2]> },
}

impl ShapeDescription {
    pub fn to_shape(&self) -> Result<TileShape, GeometryError> {
        Ok(match self {
            ShapeDescription::Rect { ll, ur } => {
                TileShape::Box(IntBox::spanning(IntPoint::new(ll[0], ll[1]), IntPoint::new(ur[0], ur[1])))
            }
            ShapeDescription::Circle { centre, radius } => TileShape::Octagon(
                IntOctagon::circle_approx(IntPoint::new(centre[0], centre[1]), *radius),
            ),
            ShapeDescription::Polygon { corners } => {
                let points: Vec<IntPoint> = corners.iter().map(|c| IntPoint::new(c[0], c[1])).collect();
                TileShape::Simplex(Simplex::from_corners(&points)?)
            }
        })
    }

    fn from_shape(shape: &TileShape) -> Self {
        match shape {
            TileShape::Box(b) => ShapeDescription::Rect {
                ll: [b.ll.x, b.ll.y],
                ur: [b.ur.x, b.ur.y],
            },
            other => ShapeDescription::Polygon {
                corners: other
                    .corners()
                    .into_iter()
                    .map(|p| p.round())
                    .fold(Vec::<[i64; 2]>::new(), |mut acc, p| {
                        if acc.last() != Some(&[p.x, p.y]) && acc.first() != Some(&[p.x, p.y]) {
                            acc.push([p.x, p.y]);
                        }
                        acc
                    }),
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemDescription {
    Pin {
        name: String,
        net: Option<String>,
        shape: ShapeDescription,
        layers: [usize; 2],
        #[serde(default = "default_pin_fixed")]
        fixed: FixedState,
        #[serde(default = "default_clearance_class")]
        clearance_class: usize,
    },
    Via {
        net: Option<String>,
        centre: [i64; 2],
        diameter: Option<i64>,
        #[serde(default = "default_route_fixed")]
        fixed: FixedState,
        #[serde(default = "default_clearance_class")]
        clearance_class: usize,
    },
    Trace {
        net: Option<String>,
        layer: usize,
        corners: Vec<[i64; 2]>,
        half_width: Option<i64>,
        #[serde(default = "default_route_fixed")]
        fixed: FixedState,
        #[serde(default = "default_clearance_class")]
        clearance_class: usize,
    },
    Keepout {
        shape: ShapeDescription,
        layers: [usize; 2],
        #[serde(default = "default_clearance_class")]
        clearance_class: usize,
    },
}

impl Board {
    pub fn from_description(desc: &BoardDescription) -> Result<Board, BoardError> {
        let [llx, lly, urx, ury] = desc.outline;
        let layers = desc
            .layers
            .iter()
            .map(|l| Layer {
                name: l.name.clone(),
                direction: l.direction,
            })
            .collect();
        let rules = Rules {
            clearance_classes: desc.rules.clearance_classes.clone(),
            trace_half_width: desc.rules.trace_half_width,
            via_diameter: desc.rules.via_diameter,
        };
        let mut board = Board::new(IntBox::new(llx, lly, urx, ury), layers, rules);
        for name in &desc.nets {
            board.add_net(name);
        }
        let last_layer = board.layer_count().saturating_sub(1);

        for item in &desc.items {
            let net_of = |net: &Option<String>| -> Result<Vec<NetId>, BoardError> {
                match net {
                    Some(name) => board
                        .net_id(name)
                        .map(|id| vec![id])
                        .ok_or_else(|| BoardError::UnknownNet(name.clone())),
                    None => Ok(Vec::new()),
                }
            };
            let (kind, nets, fixed, class) = match item {
                ItemDescription::Pin {
                    name,
                    net,
                    shape,
                    layers,
                    fixed,
                    clearance_class,
                } => (
                    ItemKind::Pin {
                        name: name.clone(),
                        shape: shape.to_shape()?,
                        first_layer: layers[0].min(layers[1]),
                        last_layer: layers[0].max(layers[1]),
                    },
                    net_of(net)?,
                    *fixed,
                    *clearance_class,
                ),
                ItemDescription::Via {
                    net,
                    centre,
                    diameter,
                    fixed,
                    clearance_class,
                } => (
                    ItemKind::Via {
                        centre: IntPoint::new(centre[0], centre[1]),
                        diameter: diameter.unwrap_or(board.rules.via_diameter),
                        first_layer: 0,
                        last_layer,
                    },
                    net_of(net)?,
                    *fixed,
                    *clearance_class,
                ),
                ItemDescription::Trace {
                    net,
                    layer,
                    corners,
                    half_width,
                    fixed,
                    clearance_class,
                } => (
                    ItemKind::Trace {
                        corners: corners.iter().map(|c| IntPoint::new(c[0], c[1])).collect(),
                        half_width: half_width.unwrap_or(board.rules.trace_half_width),
                        layer: *layer,
                    },
                    net_of(net)?,
                    *fixed,
                    *clearance_class,
                ),
                ItemDescription::Keepout {
                    shape,
                    layers,
                    clearance_class,
                } => (
                    ItemKind::Keepout {
                        shape: shape.to_shape()?,
                        first_layer: layers[0].min(layers[1]),
                        last_layer: layers[0].max(layers[1]),
                    },
                    Vec::new(),
                    FixedState::SystemFixed,
                    *clearance_class,
                ),
            };
            board.add_item(kind, nets, fixed, class)?;
        }
        Ok(board)
    }

    pub fn to_description(&self) -> BoardDescription {
        let net_name = |item: &Item| item.nets.first().map(|n| self.net_names[n.index()].clone());
        let items = self
            .items()
            .map(|item| match &item.kind {
                ItemKind::Pin {
                    name,
                    shape,
                    first_layer,
                    last_layer,
                } => ItemDescription::Pin {
                    name: name.clone(),
                    net: net_name(item),
                    shape: ShapeDescription::from_shape(shape),
                    layers: [*first_layer, *last_layer],
                    fixed: item.fixed,
                    clearance_class: item.clearance_class,
                },
                ItemKind::Via {
                    centre, diameter, ..
                } => ItemDescription::Via {
                    net: net_name(item),
                    centre: [centre.x, centre.y],
                    diameter: Some(*diameter),
                    fixed: item.fixed,
                    clearance_class: item.clearance_class,
                },
                ItemKind::Trace {
                    corners,
                    half_width,
                    layer,
                } => ItemDescription::Trace {
                    net: net_name(item),
                    layer: *layer,
                    corners: corners.iter().map(|c| [c.x, c.y]).collect(),
                    half_width: Some(*half_width),
                    fixed: item.fixed,
                    clearance_class: item.clearance_class,
                },
                ItemKind::Keepout {
                    shape,
                    first_layer,
                    last_layer,
                } => ItemDescription::Keepout {
                    shape: ShapeDescription::from_shape(shape),
                    layers: [*first_layer, *last_layer],
                    clearance_class: item.clearance_class,
                },
            })
            .collect();
        BoardDescription {
            outline: [
                self.bounding_box.ll.x,
                self.bounding_box.ll.y,
                self.bounding_box.ur.x,
                self.bounding_box.ur.y,
            ],
            layers: self
                .layers
                .iter()
                .map(|l| LayerDescription {
                    name: l.name.clone(),
                    direction: l.direction,
                })
                .collect(),
            rules: RulesDescription {
                trace_half_width: self.rules.trace_half_width,
                via_diameter: self.rules.via_diameter,
                clearance_classes: self.rules.clearance_classes.clone(),
            },
            nets: self.net_names.clone(),
            items,
        }
    }
}

/// Two layer board with one clearance class, used by tests across the workspace.
pub fn test_board(width: i64, height: i64) -> Board {
    Board::new(
        IntBox::new(0, 0, width, height),
        vec![
            Layer {
                name: "F.Cu".to_string(),
                direction: LayerDirection::Horizontal,
            },
            Layer {
                name: "B.Cu".to_string(),
                direction: LayerDirection::Vertical,
            },
        ],
        Rules {
            clearance_classes: vec![ClearanceClass {
                name: "default".to_string(),
                clearance: 20,
            }],
            trace_half_width: 10,
            via_diameter: 60,
        },
    )
}

/// Shorthand for adding a rectangular pin in tests and generators.
pub fn add_rect_pin(
    board: &mut Board,
    name: &str,
    net: NetId,
    rect: IntBox,
    layers: (usize, usize),
) -> Result<ItemId, BoardError> {
    let kind = ItemKind::Pin {
        name: name.to_string(),
        shape: TileShape::Box(rect),
        first_layer: layers.0,
        last_layer: layers.1,
    };
    board.add_item(kind, vec![net], FixedState::SystemFixed, 0)
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("bounding_box", &self.bounding_box)
            .field("layers", &self.layers.len())
            .field("items", &self.item_count())
            .finish()
    }
}
