use crate::control::AutorouteControl;
use crate::engine::AutorouteEngine;
use crate::error::AutorouteError;
use crate::locate::LocatedConnection;
use pcb_common::db::core::ItemKind;
use pcb_common::db::indices::ItemId;

/// Inserts the traces and vias of a located connection. Either all items
/// go in or the board is left as it was.
pub fn insert_connection(
    engine: &mut AutorouteEngine,
    ctrl: &AutorouteControl,
    located: &LocatedConnection,
) -> Result<Vec<ItemId>, AutorouteError> {
    let mut inserted = Vec::new();
    let last_layer = ctrl.layer_count.saturating_sub(1);

    let kinds = located
        .traces
        .iter()
        .map(|trace| ItemKind::Trace {
            corners: trace.corners.clone(),
            half_width: ctrl.trace_half_width[trace.layer],
            layer: trace.layer,
        })
        .chain(located.vias.iter().map(|location| ItemKind::Via {
            centre: *location,
            diameter: ctrl.via_diameter,
            first_layer: 0,
            last_layer,
        }));

    for kind in kinds {
        let class = match kind {
            ItemKind::Via { .. } => ctrl.via_clearance_class,
            _ => ctrl.trace_clearance_class,
        };
        match engine.insert_item(kind, vec![ctrl.net], class) {
            Ok(id) => inserted.push(id),
            Err(e) => {
                for id in inserted.into_iter().rev() {
                    if let Err(undo) = engine.remove_board_item(id) {
                        log::error!("rollback of {id:?} failed: {undo}");
                    }
                }
                return Err(e.into());
            }
        }
    }

    if ctrl.remove_unconnected_vias {
        inserted.retain(|id| {
            let dangling = engine
                .board()
                .item(*id)
                .is_some_and(|item| item.is_via() && engine.board().contacts(*id).len() < 2);
            if dangling {
                log::debug!("removing unconnected via {id:?}");
                return engine.remove_board_item(*id).is_err();
            }
            true
        });
    }
    Ok(inserted)
}
