use crate::db::core::Board;
use crate::db::indices::{ItemId, NetId};
use rayon::prelude::*;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Verifies clearance between items of different nets and the connectivity of
/// every net. Returns the collected failures as one message.
pub fn run(board: &Board) -> Result<(), String> {
    log::info!("Starting Board Verification (clearance / connectivity)");

    let (clearance_result, opens_result) =
        rayon::join(|| check_clearance(board), || check_opens(board));

    let mut msgs = Vec::new();

    match clearance_result {
        Err(e) => {
            log::error!("\x1b[31mFAIL\x1b[0m: Clearance Violations Detected");
            log::error!("{}", e);
            msgs.push(e);
        }
        Ok(_) => log::info!("\x1b[32mPASS\x1b[0m: No clearance violations found."),
    }

    match opens_result {
        Err(e) => {
            log::warn!("Unrouted connections remain");
            log::warn!("{}", e);
            msgs.push(e);
        }
        Ok(_) => log::info!("\x1b[32mPASS\x1b[0m: All nets are fully connected."),
    }

    if msgs.is_empty() {
        log::info!("\x1b[32mSUCCESS\x1b[0m: VALID BOARD");
        Ok(())
    } else {
        Err(msgs.join("; "))
    }
}

/// Pairs of items of different nets whose enlarged shapes overlap.
pub fn check_clearance(board: &Board) -> Result<(), String> {
    let items: Vec<ItemId> = board.items().map(|i| i.id).collect();
    let violation = AtomicBool::new(false);
    let first_msg = Mutex::new(String::new());

    items.par_iter().for_each(|&id| {
        let Some(item) = board.item(id) else {
            return;
        };
        for tile in 0..item.tile_count() {
            let layer = item.tile_layer(tile);
            let shape = board.tree_shape(item, tile);
            for (other_id, other_tile) in board.overlapping_tiles(&shape, layer) {
                if other_id <= id {
                    continue;
                }
                let Some(other) = board.item(other_id) else {
                    continue;
                };
                if other.shares_net(item) || (item.nets.is_empty() && other.nets.is_empty()) {
                    continue;
                }
                if board.tree_shape(other, other_tile).overlaps(&shape) {
                    let msg = format!(
                        "CLEARANCE: {:?} vs {:?} on layer '{}'",
                        id, other_id, board.layers[layer].name
                    );
                    if !violation.swap(true, Ordering::Relaxed) {
                        if let Ok(mut guard) = first_msg.lock() {
                            *guard = msg;
                        }
                    }
                    return;
                }
            }
        }
    });

    if violation.load(Ordering::Relaxed) {
        Err(first_msg.into_inner().unwrap_or_default())
    } else {
        Ok(())
    }
}

/// Nets whose items fall apart into more than one connected component.
pub fn check_opens(board: &Board) -> Result<(), String> {
    let open: Vec<String> = (0..board.net_names.len())
        .into_par_iter()
        .filter_map(|n| {
            let components = board.net_components(NetId::new(n)).len();
            (components > 1).then(|| {
                format!(
                    "Net '{}': {} unconnected parts",
                    board.net_names[n], components
                )
            })
        })
        .collect();

    if open.is_empty() {
        Ok(())
    } else {
        Err(open.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::core::{ItemKind, add_rect_pin, test_board};
    use crate::geom::{IntBox, IntPoint};

    #[test]
    fn open_net_is_reported() {
        let mut board = test_board(1000, 1000);
        let net = board.add_net("A");
        add_rect_pin(&mut board, "a", net, IntBox::new(0, 0, 50, 50), (0, 0)).unwrap();
        add_rect_pin(&mut board, "b", net, IntBox::new(500, 0, 550, 50), (0, 0)).unwrap();
        assert!(check_clearance(&board).is_ok());
        assert!(check_opens(&board).is_err());

        let trace = ItemKind::Trace {
            corners: vec![IntPoint::new(25, 25), IntPoint::new(525, 25)],
            half_width: 10,
            layer: 0,
        };
        board.insert_checked(trace, vec![net], 0).unwrap();
        assert!(run(&board).is_ok());
    }

    #[test]
    fn overlapping_nets_fail_clearance() {
        let mut board = test_board(1000, 1000);
        let a = board.add_net("A");
        let b = board.add_net("B");
        add_rect_pin(&mut board, "a", a, IntBox::new(0, 0, 50, 50), (0, 0)).unwrap();
        add_rect_pin(&mut board, "b", b, IntBox::new(55, 0, 100, 50), (0, 0)).unwrap();
        assert!(check_clearance(&board).is_err());
    }
}
