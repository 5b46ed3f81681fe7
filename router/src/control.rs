use pcb_common::db::core::{Board, LayerDirection};
use pcb_common::db::indices::NetId;
use pcb_common::util::config::{AngleRestriction, AutorouteConfig, TestLevel};

/// Cost of one unit of trace length in each axis direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExpansionCostFactor {
    pub horizontal: f64,
    pub vertical: f64,
}

impl ExpansionCostFactor {
    pub fn new(horizontal: f64, vertical: f64) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }
}

/// Parameters of one connection search, derived from the configuration,
/// the board rules and the routed net.
#[derive(Clone, Debug)]
pub struct AutorouteControl {
    pub net: NetId,
    pub layer_count: usize,
    pub trace_half_width: Vec<i64>,
    /// Half width plus the clearance compensation of the trace class.
    pub compensated_trace_half_width: Vec<i64>,
    pub trace_costs: Vec<ExpansionCostFactor>,
    pub layer_active: Vec<bool>,
    pub vias_allowed: bool,
    pub via_diameter: i64,
    pub via_radius: Vec<i64>,
    pub compensated_via_radius: Vec<i64>,
    pub min_normal_via_cost: f64,
    /// Cost above `min_normal_via_cost` for a via from layer `i` to layer `j`.
    pub add_via_costs: Vec<Vec<f64>>,
    pub ripup_allowed: bool,
    pub ripup_costs: f64,
    pub remove_unconnected_vias: bool,
    pub angle_restriction: AngleRestriction,
    pub trace_clearance_class: usize,
    pub via_clearance_class: usize,
    pub max_enlarge_iterations: usize,
    pub test_level: TestLevel,
}

impl AutorouteControl {
    pub fn new(board: &Board, net: NetId, config: &AutorouteConfig) -> Self {
        let layer_count = board.layer_count();
        let trace_clearance_class = 0;
        let via_clearance_class = 0;
        let hw = board.rules.trace_half_width;
        let trace_comp = board.rules.compensation(trace_clearance_class);
        let via_comp = board.rules.compensation(via_clearance_class);
        let via_radius = board.rules.via_diameter / 2;

        let preferred = config.preferred_direction_trace_cost;
        let against = config.against_preferred_direction_trace_cost;
        let trace_costs = board
            .layers
            .iter()
            .map(|layer| match layer.direction {
                LayerDirection::Horizontal => ExpansionCostFactor::new(preferred, against),
                LayerDirection::Vertical => ExpansionCostFactor::new(against, preferred),
                LayerDirection::Unknown => ExpansionCostFactor::new(preferred, preferred),
            })
            .collect();

        let via_radius: Vec<i64> = vec![via_radius; layer_count];
        let max_via_radius = via_radius.iter().copied().max().unwrap_or(0);
        let min_normal_via_cost = (config.via_cost * max_via_radius as f64).max(1.0);
        let add_via_costs = (0..layer_count)
            .map(|from| {
                (0..layer_count)
                    .map(|to| {
                        if from == to {
                            0.0
                        } else {
                            let radius = via_radius[from].max(via_radius[to]);
                            (config.via_cost * radius as f64 - min_normal_via_cost).max(0.0)
                        }
                    })
                    .collect()
            })
            .collect();

        Self {
            net,
            layer_count,
            trace_half_width: vec![hw; layer_count],
            compensated_trace_half_width: vec![hw + trace_comp; layer_count],
            trace_costs,
            layer_active: vec![true; layer_count],
            vias_allowed: config.vias_allowed && layer_count > 1,
            via_diameter: board.rules.via_diameter,
            compensated_via_radius: via_radius.iter().map(|r| r + via_comp).collect(),
            via_radius,
            min_normal_via_cost,
            add_via_costs,
            ripup_allowed: config.ripup_allowed,
            ripup_costs: config.ripup_costs,
            remove_unconnected_vias: config.remove_unconnected_vias,
            angle_restriction: config.angle_restriction,
            trace_clearance_class,
            via_clearance_class,
            max_enlarge_iterations: config.max_enlarge_iterations,
            test_level: config.test_level,
        }
    }

    /// Cheapest trace cost factors over the active layers, used for lower bounds.
    pub fn min_trace_costs(&self) -> ExpansionCostFactor {
        let active = self
            .trace_costs
            .iter()
            .zip(&self.layer_active)
            .filter(|(_, active)| **active)
            .map(|(c, _)| *c);
        active.fold(ExpansionCostFactor::new(f64::MAX, f64::MAX), |acc, c| {
            ExpansionCostFactor::new(acc.horizontal.min(c.horizontal), acc.vertical.min(c.vertical))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcb_common::db::core::test_board;

    #[test]
    fn cost_factors_follow_preferred_direction() {
        let mut board = test_board(1000, 1000);
        let net = board.add_net("A");
        let ctrl = AutorouteControl::new(&board, net, &AutorouteConfig::default());
        assert_eq!(ctrl.trace_costs[0], ExpansionCostFactor::new(1.0, 1.5));
        assert_eq!(ctrl.trace_costs[1], ExpansionCostFactor::new(1.5, 1.0));
        assert_eq!(ctrl.min_trace_costs(), ExpansionCostFactor::new(1.0, 1.0));
    }

    #[test]
    fn widths_include_compensation() {
        let mut board = test_board(1000, 1000);
        let net = board.add_net("A");
        let ctrl = AutorouteControl::new(&board, net, &AutorouteConfig::default());
        assert_eq!(ctrl.trace_half_width, vec![10, 10]);
        assert_eq!(ctrl.compensated_trace_half_width, vec![20, 20]);
        assert_eq!(ctrl.via_radius, vec![30, 30]);
        assert_eq!(ctrl.compensated_via_radius, vec![40, 40]);
        assert_eq!(ctrl.min_normal_via_cost, 1500.0);
        assert_eq!(ctrl.add_via_costs[0][1], 0.0);
    }
}
