use pcb_common::db::core::{Board, FixedState, ItemKind, add_rect_pin, test_board};
use pcb_common::db::indices::ItemId;
use pcb_common::geom::{IntBox, IntPoint, TileShape};
use pcb_common::util::check::check_clearance;
use pcb_common::util::config::{AngleRestriction, AutorouteConfig};
use pcb_common::util::generator::generate_random_board;
use pcb_router::batch::{open_nets, route_board};
use pcb_router::{AutorouteControl, AutorouteEngine, AutorouteResult};
use rstest::rstest;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

struct Routed {
    engine: AutorouteEngine,
    result: AutorouteResult,
    ripped: BTreeSet<ItemId>,
}

/// Routes pin `a` (item 0) to pin `b` (item 1) of net "A".
fn route(board: Board, config: &AutorouteConfig, stop: Arc<AtomicBool>) -> Routed {
    route_between(board, config, "A", (0, 1), stop, None)
}

fn route_between(
    board: Board,
    config: &AutorouteConfig,
    net: &str,
    (start, dest): (usize, usize),
    stop: Arc<AtomicBool>,
    time_limit: Option<Duration>,
) -> Routed {
    let net = board.net_id(net).unwrap();
    let ctrl = AutorouteControl::new(&board, net, config);
    let mut engine = AutorouteEngine::new(board, config);
    engine.init_connection(net, stop, time_limit);
    let mut ripped = BTreeSet::new();
    let result = engine.autoroute_connection(
        &BTreeSet::from([ItemId::new(start)]),
        &BTreeSet::from([ItemId::new(dest)]),
        &ctrl,
        &mut ripped,
    );
    Routed { engine, result, ripped }
}

fn two_pads(a: IntBox, b: IntBox) -> Board {
    let mut board = test_board(1000, 1000);
    let net = board.add_net("A");
    add_rect_pin(&mut board, "a", net, a, (0, 0)).unwrap();
    add_rect_pin(&mut board, "b", net, b, (0, 0)).unwrap();
    board
}

fn keepout(board: &mut Board, rect: IntBox) -> ItemId {
    let kind = ItemKind::Keepout {
        shape: TileShape::Box(rect),
        first_layer: 0,
        last_layer: 1,
    };
    board.add_item(kind, Vec::new(), FixedState::SystemFixed, 0).unwrap()
}

fn traces(board: &Board) -> Vec<(usize, Vec<IntPoint>)> {
    board
        .items()
        .filter_map(|item| match &item.kind {
            ItemKind::Trace { corners, layer, .. } => Some((*layer, corners.clone())),
            _ => None,
        })
        .collect()
}

fn trace(board: &mut Board, net: &str, from: IntPoint, to: IntPoint) -> ItemId {
    let net = board.net_id(net).unwrap();
    let kind = ItemKind::Trace {
        corners: vec![from, to],
        half_width: 10,
        layer: 0,
    };
    board.add_item(kind, vec![net], FixedState::Unfixed, 0).unwrap()
}

/// True if every segment of every trace follows the angle restriction.
fn angles_are_legal(board: &Board, restriction: AngleRestriction) -> bool {
    traces(board).iter().all(|(_, corners)| {
        corners.windows(2).all(|w| {
            let (dx, dy) = ((w[1].x - w[0].x).abs(), (w[1].y - w[0].y).abs());
            match restriction {
                AngleRestriction::NinetyDegree => dx == 0 || dy == 0,
                AngleRestriction::FortyFiveDegree => dx == 0 || dy == 0 || dx == dy,
                AngleRestriction::None => true,
            }
        })
    })
}

#[test]
fn free_angle_route_is_a_straight_trace() {
    let board = two_pads(IntBox::new(80, 480, 120, 520), IntBox::new(880, 480, 920, 520));
    let config = AutorouteConfig {
        angle_restriction: AngleRestriction::None,
        ..AutorouteConfig::default()
    };
    let routed = route(board, &config, Arc::new(AtomicBool::new(false)));
    assert_eq!(routed.result, AutorouteResult::Routed);
    let traces = traces(routed.engine.board());
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0].1.len(), 2);
    assert!(routed.engine.board().connected_set(ItemId::new(0)).contains(&ItemId::new(1)));
}

#[rstest]
#[case(AngleRestriction::NinetyDegree)]
#[case(AngleRestriction::FortyFiveDegree)]
#[case(AngleRestriction::None)]
fn route_goes_around_a_keepout(#[case] restriction: AngleRestriction) {
    let mut board = two_pads(IntBox::new(80, 480, 120, 520), IntBox::new(880, 480, 920, 520));
    let wall = keepout(&mut board, IntBox::new(400, 100, 600, 900));
    let config = AutorouteConfig {
        angle_restriction: restriction,
        vias_allowed: false,
        ..AutorouteConfig::default()
    };
    let routed = route(board, &config, Arc::new(AtomicBool::new(false)));
    assert_eq!(routed.result, AutorouteResult::Routed);

    let board = routed.engine.board();
    let corners: usize = traces(board).iter().map(|(_, c)| c.len()).sum();
    assert!(corners >= 4);
    let wall = board.item(wall).unwrap().tile_shape(0);
    for item in board.items().filter(|i| i.is_trace()) {
        for tile in 0..item.tile_count() {
            assert!(!item.tile_shape(tile).overlaps(&wall));
        }
    }
    assert!(check_clearance(board).is_ok());
    assert!(angles_are_legal(board, restriction));
    assert!(board.connected_set(ItemId::new(0)).contains(&ItemId::new(1)));
}

#[rstest]
#[case(AngleRestriction::NinetyDegree)]
#[case(AngleRestriction::FortyFiveDegree)]
#[case(AngleRestriction::None)]
fn route_passes_a_pin_corner_with_clearance(#[case] restriction: AngleRestriction) {
    let mut board = two_pads(IntBox::new(80, 480, 120, 520), IntBox::new(880, 480, 920, 520));
    let other = board.add_net("B");
    let b1 = add_rect_pin(&mut board, "b1", other, IntBox::new(480, 80, 520, 120), (0, 0)).unwrap();
    let b2 = add_rect_pin(&mut board, "b2", other, IntBox::new(480, 880, 520, 920), (0, 0)).unwrap();
    trace(&mut board, "A", IntPoint::new(100, 500), IntPoint::new(900, 500));
    let config = AutorouteConfig {
        angle_restriction: restriction,
        vias_allowed: false,
        ripup_allowed: false,
        ..AutorouteConfig::default()
    };
    let routed = route_between(
        board,
        &config,
        "B",
        (b1.index(), b2.index()),
        Arc::new(AtomicBool::new(false)),
        None,
    );
    assert_eq!(routed.result, AutorouteResult::Routed);
    let board = routed.engine.board();
    assert!(check_clearance(board).is_ok());
    assert!(angles_are_legal(board, restriction));
    assert!(board.connected_set(b1).contains(&b2));
}

#[test]
fn overlapping_pads_are_already_connected() {
    let board = two_pads(IntBox::new(80, 480, 120, 520), IntBox::new(110, 480, 200, 520));
    let routed = route(board, &AutorouteConfig::default(), Arc::new(AtomicBool::new(false)));
    assert_eq!(routed.result, AutorouteResult::AlreadyConnected);
    assert!(traces(routed.engine.board()).is_empty());
}

#[test]
fn via_in_the_only_gap_is_ripped_up() {
    let mut board = two_pads(IntBox::new(80, 480, 120, 520), IntBox::new(880, 480, 920, 520));
    let other = board.add_net("B");
    keepout(&mut board, IntBox::new(480, 0, 520, 460));
    keepout(&mut board, IntBox::new(480, 540, 520, 1000));
    let via = ItemKind::Via {
        centre: IntPoint::new(500, 500),
        diameter: 60,
        first_layer: 0,
        last_layer: 1,
    };
    let via = board.add_item(via, vec![other], FixedState::Unfixed, 0).unwrap();
    let config = AutorouteConfig {
        angle_restriction: AngleRestriction::FortyFiveDegree,
        ripup_allowed: true,
        vias_allowed: false,
        ..AutorouteConfig::default()
    };
    let routed = route(board, &config, Arc::new(AtomicBool::new(false)));
    assert_eq!(routed.result, AutorouteResult::Routed);
    assert_eq!(routed.ripped, BTreeSet::from([via]));
    assert!(routed.engine.board().item(via).is_none());
    assert!(check_clearance(routed.engine.board()).is_ok());
}

#[test]
fn ripup_takes_the_whole_connection() {
    let mut board = two_pads(IntBox::new(80, 480, 120, 520), IntBox::new(880, 480, 920, 520));
    let other = board.add_net("B");
    keepout(&mut board, IntBox::new(480, 0, 520, 460));
    keepout(&mut board, IntBox::new(480, 540, 520, 1000));
    let via = ItemKind::Via {
        centre: IntPoint::new(500, 500),
        diameter: 60,
        first_layer: 0,
        last_layer: 1,
    };
    let via = board.add_item(via, vec![other], FixedState::Unfixed, 0).unwrap();
    let tail = trace(&mut board, "B", IntPoint::new(500, 500), IntPoint::new(700, 700));
    let config = AutorouteConfig {
        angle_restriction: AngleRestriction::FortyFiveDegree,
        ripup_allowed: true,
        vias_allowed: false,
        ..AutorouteConfig::default()
    };
    let routed = route(board, &config, Arc::new(AtomicBool::new(false)));
    assert_eq!(routed.result, AutorouteResult::Routed);
    assert_eq!(routed.ripped, BTreeSet::from([via, tail]));
    let board = routed.engine.board();
    assert!(board.items_of_net(other).is_empty());
    assert!(check_clearance(board).is_ok());
}

#[test]
fn fixed_via_in_the_only_gap_blocks_the_route() {
    let mut board = two_pads(IntBox::new(80, 480, 120, 520), IntBox::new(880, 480, 920, 520));
    let other = board.add_net("B");
    keepout(&mut board, IntBox::new(480, 0, 520, 460));
    keepout(&mut board, IntBox::new(480, 540, 520, 1000));
    let via = ItemKind::Via {
        centre: IntPoint::new(500, 500),
        diameter: 60,
        first_layer: 0,
        last_layer: 1,
    };
    let via = board.add_item(via, vec![other], FixedState::UserFixed, 0).unwrap();
    let config = AutorouteConfig {
        ripup_allowed: true,
        vias_allowed: false,
        ..AutorouteConfig::default()
    };
    let routed = route(board, &config, Arc::new(AtomicBool::new(false)));
    assert_eq!(routed.result, AutorouteResult::NotRouted);
    assert!(routed.ripped.is_empty());
    assert!(routed.engine.board().item(via).is_some());
}

#[test]
fn stopped_search_leaves_no_rooms() {
    let board = two_pads(IntBox::new(80, 480, 120, 520), IntBox::new(880, 480, 920, 520));
    let stop = Arc::new(AtomicBool::new(false));
    stop.store(true, Ordering::Relaxed);
    let routed = route(board, &AutorouteConfig::default(), stop);
    assert_eq!(routed.result, AutorouteResult::NotRouted);
    assert_eq!(routed.engine.search_tree().room_count(), 0);
    assert!(traces(routed.engine.board()).is_empty());
}

#[rstest]
#[case(Duration::ZERO, AutorouteResult::NotRouted)]
#[case(Duration::from_secs(60), AutorouteResult::Routed)]
fn time_limit_ends_the_search(#[case] limit: Duration, #[case] expected: AutorouteResult) {
    let mut board = two_pads(IntBox::new(80, 480, 120, 520), IntBox::new(880, 480, 920, 520));
    keepout(&mut board, IntBox::new(400, 100, 600, 900));
    let stop = Arc::new(AtomicBool::new(false));
    let routed = route_between(board, &AutorouteConfig::default(), "A", (0, 1), stop, Some(limit));
    assert_eq!(routed.result, expected);
    if expected == AutorouteResult::NotRouted {
        assert_eq!(routed.engine.search_tree().room_count(), 0);
        assert!(traces(routed.engine.board()).is_empty());
    }
}

#[rstest]
#[case(3, AutorouteResult::NotRouted)]
#[case(100_000, AutorouteResult::Routed)]
fn search_stops_after_its_expansion_budget(#[case] budget: usize, #[case] expected: AutorouteResult) {
    let mut board = two_pads(IntBox::new(80, 480, 120, 520), IntBox::new(880, 480, 920, 520));
    keepout(&mut board, IntBox::new(400, 100, 600, 900));
    let config = AutorouteConfig {
        max_expansions: Some(budget),
        ..AutorouteConfig::default()
    };
    let routed = route(board, &config, Arc::new(AtomicBool::new(false)));
    assert_eq!(routed.result, expected);
    if expected == AutorouteResult::NotRouted {
        assert_eq!(routed.engine.search_tree().room_count(), 0);
        assert!(traces(routed.engine.board()).is_empty());
        assert!(routed.ripped.is_empty());
    }
}

#[rstest]
#[case(4, 0)]
#[case(6, 3)]
#[case(8, 6)]
fn batch_routing_keeps_clearance(#[case] nets: usize, #[case] obstacles: usize) {
    let description = generate_random_board(nets, obstacles, 0);
    let board = Board::from_description(&description).unwrap();
    let pins = board.item_count();
    let config = AutorouteConfig {
        max_passes: 2,
        ..AutorouteConfig::default()
    };
    let (board, report) = route_board(board, &config, Arc::new(AtomicBool::new(false)));

    assert!(check_clearance(&board).is_ok());
    assert!(board.item_count() >= pins);
    assert_eq!(report.incomplete_nets, open_nets(&board));
    for item in board.items().filter(|i| i.is_trace()) {
        assert_eq!(item.nets.len(), 1);
        assert!(TileShape::Box(board.bounding_box).contains_shape(&item.tile_shape(0)));
    }
}
