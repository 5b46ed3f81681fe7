use crate::db::core::{
    BoardDescription, ClearanceClass, FixedState, ItemDescription, LayerDescription,
    LayerDirection, RulesDescription, ShapeDescription,
};
use crate::geom::IntBox;
use rand::Rng;

const PIN_SIZE: i64 = 600;
const MIN_OBSTACLE: i64 = 1000;
const MAX_OBSTACLE: i64 = 6000;

/// Random two layer board with `num_nets` two pin nets and `num_obstacles`
/// keepouts. Pins and keepouts never overlap each other.
pub fn generate_random_board(num_nets: usize, num_obstacles: usize, size: i64) -> BoardDescription {
    let mut rng = rand::thread_rng();
    let size = size.max(20 * MAX_OBSTACLE);
    let clearance = 200;

    log::info!(
        "Generating Board: {} nets, {} keepouts, outline {}x{}",
        num_nets,
        num_obstacles,
        size,
        size
    );

    let mut placed: Vec<IntBox> = Vec::new();
    let mut items = Vec::new();
    let margin = 2 * clearance;

    let try_place = |rng: &mut rand::rngs::ThreadRng, w: i64, h: i64, placed: &mut Vec<IntBox>| {
        for _ in 0..100 {
            let x = rng.gen_range(margin..size - w - margin);
            let y = rng.gen_range(margin..size - h - margin);
            let candidate = IntBox::new(x, y, x + w, y + h);
            let blocked = placed
                .iter()
                .any(|b| b.offset(2 * clearance).intersects(&candidate));
            if !blocked {
                placed.push(candidate);
                return Some(candidate);
            }
        }
        None
    };

    for _ in 0..num_obstacles {
        let w = rng.gen_range(MIN_OBSTACLE..MAX_OBSTACLE);
        let h = rng.gen_range(MIN_OBSTACLE..MAX_OBSTACLE);
        let layer = rng.gen_range(0..2);
        if let Some(b) = try_place(&mut rng, w, h, &mut placed) {
            items.push(ItemDescription::Keepout {
                shape: rect(b),
                layers: [layer, layer],
                clearance_class: 0,
            });
        }
    }

    let mut nets = Vec::with_capacity(num_nets);
    for n in 0..num_nets {
        let name = format!("net{}", n);
        for end in ["a", "b"] {
            if let Some(b) = try_place(&mut rng, PIN_SIZE, PIN_SIZE, &mut placed) {
                items.push(ItemDescription::Pin {
                    name: format!("{}_{}", name, end),
                    net: Some(name.clone()),
                    shape: rect(b),
                    layers: [0, 1],
                    fixed: FixedState::SystemFixed,
                    clearance_class: 0,
                });
            }
        }
        nets.push(name);
    }

    BoardDescription {
        outline: [0, 0, size, size],
        layers: vec![
            LayerDescription {
                name: "F.Cu".to_string(),
                direction: LayerDirection::Horizontal,
            },
            LayerDescription {
                name: "B.Cu".to_string(),
                direction: LayerDirection::Vertical,
            },
        ],
        rules: RulesDescription {
            trace_half_width: 125,
            via_diameter: 600,
            clearance_classes: vec![ClearanceClass {
                name: "default".to_string(),
                clearance,
            }],
        },
        nets,
        items,
    }
}

fn rect(b: IntBox) -> ShapeDescription {
    ShapeDescription::Rect {
        ll: [b.ll.x, b.ll.y],
        ur: [b.ur.x, b.ur.y],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::core::Board;
    use crate::util::check;

    #[test]
    fn generated_board_is_clearance_clean() {
        let desc = generate_random_board(5, 10, 0);
        let board = Board::from_description(&desc).unwrap();
        assert_eq!(board.net_names.len(), 5);
        assert!(check::check_clearance(&board).is_ok());
    }
}
