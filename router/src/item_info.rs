use crate::rooms::RoomId;
use pcb_common::db::indices::ItemId;
use std::collections::HashMap;

/// Temporary routing annotation of a board item.
#[derive(Clone, Debug, Default)]
pub struct ItemAutorouteInfo {
    obstacle_rooms: Vec<Option<RoomId>>,
    /// `Some(true)` for start items, `Some(false)` for destination items.
    start_info: Option<bool>,
}

impl ItemAutorouteInfo {
    pub fn obstacle_room(&self, tile: usize) -> Option<RoomId> {
        self.obstacle_rooms.get(tile).copied().flatten()
    }

    pub fn start_info(&self) -> Option<bool> {
        self.start_info
    }
}

#[derive(Default)]
pub struct ItemInfoMap {
    infos: HashMap<ItemId, ItemAutorouteInfo>,
}

impl ItemInfoMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, item: ItemId) -> Option<&ItemAutorouteInfo> {
        self.infos.get(&item)
    }

    pub fn obstacle_room(&self, item: ItemId, tile: usize) -> Option<RoomId> {
        self.infos.get(&item)?.obstacle_room(tile)
    }

    pub fn set_obstacle_room(&mut self, item: ItemId, tile: usize, room: RoomId) {
        let info = self.infos.entry(item).or_default();
        if info.obstacle_rooms.len() <= tile {
            info.obstacle_rooms.resize(tile + 1, None);
        }
        info.obstacle_rooms[tile] = Some(room);
    }

    pub fn start_info(&self, item: ItemId) -> Option<bool> {
        self.infos.get(&item)?.start_info
    }

    pub fn set_start_info(&mut self, item: ItemId, start: bool) {
        self.infos.entry(item).or_default().start_info = Some(start);
    }

    pub fn clear_start_info(&mut self) {
        for info in self.infos.values_mut() {
            info.start_info = None;
        }
    }

    /// Forgets the annotation of `item` and returns its obstacle rooms.
    pub fn invalidate(&mut self, item: ItemId) -> Vec<RoomId> {
        self.infos
            .remove(&item)
            .map(|info| info.obstacle_rooms.into_iter().flatten().collect())
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.infos.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obstacle_rooms_are_indexed_by_tile() {
        let mut infos = ItemInfoMap::new();
        let item = ItemId::new(4);
        infos.set_obstacle_room(item, 2, RoomId::new(9));
        assert_eq!(infos.obstacle_room(item, 2), Some(RoomId::new(9)));
        assert_eq!(infos.obstacle_room(item, 0), None);
        infos.set_start_info(item, false);
        assert_eq!(infos.start_info(item), Some(false));
        assert_eq!(infos.invalidate(item), vec![RoomId::new(9)]);
        assert_eq!(infos.start_info(item), None);
    }
}
