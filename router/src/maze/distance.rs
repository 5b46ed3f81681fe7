use crate::control::{AutorouteControl, ExpansionCostFactor};
use pcb_common::geom::{FloatPoint, IntBox};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LayerClass {
    Component,
    Inner,
    Solder,
}

/// Lower bound of the remaining cost from a point to the destination items.
/// Destinations are collected as bounding boxes per class of layer; reaching
/// a box of another class costs at least one via.
#[derive(Clone, Debug)]
pub struct DestinationDistance {
    costs: ExpansionCostFactor,
    via_cost: f64,
    layer_count: usize,
    component_side: IntBox,
    inner: IntBox,
    solder_side: IntBox,
}

impl DestinationDistance {
    pub fn new(ctrl: &AutorouteControl) -> Self {
        Self {
            costs: ctrl.min_trace_costs(),
            via_cost: ctrl.min_normal_via_cost,
            layer_count: ctrl.layer_count,
            component_side: IntBox::EMPTY,
            inner: IntBox::EMPTY,
            solder_side: IntBox::EMPTY,
        }
    }

    fn class(&self, layer: usize) -> LayerClass {
        if layer == 0 {
            LayerClass::Component
        } else if layer + 1 >= self.layer_count {
            LayerClass::Solder
        } else {
            LayerClass::Inner
        }
    }

    pub fn join(&mut self, shape: &IntBox, layer: usize) {
        let target = match self.class(layer) {
            LayerClass::Component => &mut self.component_side,
            LayerClass::Inner => &mut self.inner,
            LayerClass::Solder => &mut self.solder_side,
        };
        *target = target.union(shape);
    }

    pub fn calculate(&self, p: FloatPoint, layer: usize) -> f64 {
        let own = self.class(layer);
        let mut result = f64::MAX;
        for (class, shape) in [
            (LayerClass::Component, &self.component_side),
            (LayerClass::Inner, &self.inner),
            (LayerClass::Solder, &self.solder_side),
        ] {
            if shape.is_empty() {
                continue;
            }
            let mut distance = self.box_distance(p, shape);
            if class != own {
                distance += self.via_cost;
            }
            result = result.min(distance);
        }
        if result == f64::MAX { 0.0 } else { result }
    }

    fn box_distance(&self, p: FloatPoint, shape: &IntBox) -> f64 {
        let dx = (shape.ll.x as f64 - p.x).max(p.x - shape.ur.x as f64).max(0.0);
        let dy = (shape.ll.y as f64 - p.y).max(p.y - shape.ur.y as f64).max(0.0);
        dx * self.costs.horizontal + dy * self.costs.vertical
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcb_common::db::core::test_board;
    use pcb_common::util::config::AutorouteConfig;

    #[test]
    fn distance_counts_a_via_to_other_layers() {
        let mut board = test_board(1000, 1000);
        let net = board.add_net("A");
        let ctrl = AutorouteControl::new(&board, net, &AutorouteConfig::default());
        let mut distance = DestinationDistance::new(&ctrl);
        assert_eq!(distance.calculate(FloatPoint::new(0.0, 0.0), 0), 0.0);

        distance.join(&IntBox::new(100, 100, 200, 200), 1);
        assert_eq!(distance.calculate(FloatPoint::new(150.0, 150.0), 1), 0.0);
        assert_eq!(distance.calculate(FloatPoint::new(0.0, 150.0), 1), 100.0);
        assert_eq!(distance.calculate(FloatPoint::new(0.0, 0.0), 0), 200.0 + 1500.0);
    }
}
