use crate::control::AutorouteControl;
use crate::engine::{AutorouteEngine, AutorouteResult};
use pcb_common::db::core::Board;
use pcb_common::db::indices::{ItemId, NetId};
use pcb_common::util::config::AutorouteConfig;
use pcb_common::util::profiler::ScopedTimer;
use rand::seq::SliceRandom;
use rand::thread_rng;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Counts of one batch run over all nets of a board.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub passes: usize,
    pub routed: usize,
    pub not_routed: usize,
    pub insert_errors: usize,
    pub ripped: usize,
    /// Nets still split into several components after the last pass.
    pub incomplete_nets: Vec<NetId>,
}

/// Nets with more than one connected component.
pub fn open_nets(board: &Board) -> Vec<NetId> {
    (0..board.net_names.len())
        .into_par_iter()
        .map(NetId::new)
        .filter(|net| board.net_components(*net).len() > 1)
        .collect()
}

/// Routes every open net of `board`, repeating passes until all nets are
/// connected, a pass makes no progress, or `stop` is raised. Rip-up is only
/// tried from the second pass on, with costs rising each pass.
pub fn route_board(board: Board, config: &AutorouteConfig, stop: Arc<AtomicBool>) -> (Board, BatchReport) {
    let mut engine = AutorouteEngine::new(board, config);
    let report = route_all(&mut engine, config, stop);
    (engine.into_board(), report)
}

/// Batch run on an existing engine, leaving its room database in place for
/// inspection.
pub fn route_all(engine: &mut AutorouteEngine, config: &AutorouteConfig, stop: Arc<AtomicBool>) -> BatchReport {
    let mut report = BatchReport::default();
    let time_limit = config.time_limit_ms.map(Duration::from_millis);
    let mut rng = thread_rng();

    for pass in 0..config.max_passes {
        let mut nets = open_nets(engine.board());
        if nets.is_empty() {
            log::info!("all nets connected after {pass} passes");
            break;
        }
        let _timer = ScopedTimer::new(format!("autoroute pass {pass}"));
        if pass > 0 {
            nets.shuffle(&mut rng);
        }
        let pass_config = AutorouteConfig {
            ripup_allowed: config.ripup_allowed && pass > 0,
            ripup_costs: config.ripup_costs * pass.max(1) as f64,
            ..config.clone()
        };
        log::info!("pass {pass}: {} open nets", nets.len());

        let mut progress = false;
        let mut ripped: BTreeSet<ItemId> = BTreeSet::new();
        for net in nets {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            engine.init_connection(net, stop.clone(), time_limit);
            let ctrl = AutorouteControl::new(engine.board(), net, &pass_config);
            progress |= route_net(engine, &ctrl, &mut ripped, &mut report);
        }
        report.passes = pass + 1;
        ripped.retain(|item| engine.board().item(*item).is_none());
        report.ripped += ripped.len();
        if !ripped.is_empty() {
            log::info!("pass {pass}: {} items ripped up", ripped.len());
        }
        if stop.load(Ordering::Relaxed) {
            log::info!("autoroute stopped in pass {pass}");
            break;
        }
        if !progress {
            break;
        }
    }

    report.incomplete_nets = open_nets(engine.board());
    log::info!(
        "autoroute finished: {} routed, {} failed, {} nets incomplete",
        report.routed,
        report.not_routed + report.insert_errors,
        report.incomplete_nets.len()
    );
    report
}

/// Connects the components of one net one by one. Returns whether any
/// connection was made.
fn route_net(
    engine: &mut AutorouteEngine,
    ctrl: &AutorouteControl,
    ripped: &mut BTreeSet<ItemId>,
    report: &mut BatchReport,
) -> bool {
    let _timer = ScopedTimer::debug(format!("net {:?}", ctrl.net));
    let mut progress = false;
    loop {
        let components = engine.board().net_components(ctrl.net);
        let Some((start, rest)) = components.split_first() else {
            break;
        };
        if rest.is_empty() {
            break;
        }
        let dest: BTreeSet<ItemId> = rest.iter().flatten().copied().collect();
        match engine.autoroute_connection(start, &dest, ctrl, ripped) {
            AutorouteResult::Routed => {
                report.routed += 1;
                progress = true;
            }
            AutorouteResult::AlreadyConnected => break,
            AutorouteResult::NotRouted => {
                report.not_routed += 1;
                break;
            }
            AutorouteResult::InsertError => {
                report.insert_errors += 1;
                break;
            }
        }
    }
    progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcb_common::db::core::{add_rect_pin, test_board};
    use pcb_common::geom::IntBox;

    fn two_net_board() -> Board {
        let mut board = test_board(1000, 1000);
        let a = board.add_net("A");
        let b = board.add_net("B");
        add_rect_pin(&mut board, "a1", a, IntBox::new(80, 180, 120, 220), (0, 0)).unwrap();
        add_rect_pin(&mut board, "a2", a, IntBox::new(880, 180, 920, 220), (0, 0)).unwrap();
        add_rect_pin(&mut board, "b1", b, IntBox::new(80, 780, 120, 820), (0, 0)).unwrap();
        add_rect_pin(&mut board, "b2", b, IntBox::new(880, 780, 920, 820), (0, 0)).unwrap();
        board
    }

    #[test]
    fn all_nets_get_connected() {
        let board = two_net_board();
        assert_eq!(open_nets(&board).len(), 2);
        let (board, report) = route_board(board, &AutorouteConfig::default(), Arc::new(AtomicBool::new(false)));
        assert_eq!(report.routed, 2);
        assert!(report.incomplete_nets.is_empty());
        assert!(open_nets(&board).is_empty());
        assert!(board.items().filter(|i| i.is_trace()).count() >= 2);
    }

    #[test]
    fn raised_stop_flag_routes_nothing() {
        let stop = Arc::new(AtomicBool::new(false));
        stop.store(true, Ordering::Relaxed);
        let (board, report) = route_board(two_net_board(), &AutorouteConfig::default(), stop);
        assert_eq!(report.routed, 0);
        assert_eq!(report.incomplete_nets.len(), 2);
        assert_eq!(board.item_count(), 4);
    }
}
