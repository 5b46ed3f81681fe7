use pcb_common::geom::{IntBox, IntOctagon, Line, Simplex, TileShape};
use pcb_common::util::config::AngleRestriction;

/// Shape arithmetic of one routing discipline. Every shape stored in the
/// search tree and every room shape uses the representation of its discipline,
/// so that intersections stay inside that representation.
pub trait TileGeometry: Sync {
    fn restriction(&self) -> AngleRestriction;

    fn convert(&self, shape: &TileShape) -> TileShape;

    /// Half plane on the left of `line`, clipped to the coordinate limits.
    fn half_plane(&self, line: &Line) -> TileShape;

    /// `shape` without border line `no`, extended to the coordinate limits on that side.
    fn remove_border_line(&self, shape: &TileShape, no: usize) -> TileShape;
}

pub struct OrthogonalGeometry;

pub struct FortyFiveDegreeGeometry;

pub struct GeneralGeometry;

impl TileGeometry for OrthogonalGeometry {
    fn restriction(&self) -> AngleRestriction {
        AngleRestriction::NinetyDegree
    }

    fn convert(&self, shape: &TileShape) -> TileShape {
        TileShape::Box(shape.bounding_box())
    }

    fn half_plane(&self, line: &Line) -> TileShape {
        match IntBox::half_plane(line) {
            Some(b) => TileShape::Box(b),
            None => TileShape::Box(Simplex::from_lines(&[*line]).bounding_box()),
        }
    }

    fn remove_border_line(&self, shape: &TileShape, no: usize) -> TileShape {
        TileShape::Box(shape.bounding_box().remove_border_line(no))
    }
}

impl TileGeometry for FortyFiveDegreeGeometry {
    fn restriction(&self) -> AngleRestriction {
        AngleRestriction::FortyFiveDegree
    }

    fn convert(&self, shape: &TileShape) -> TileShape {
        TileShape::Octagon(shape.bounding_octagon())
    }

    fn half_plane(&self, line: &Line) -> TileShape {
        match IntOctagon::half_plane(line) {
            Some(o) => TileShape::Octagon(o),
            None => TileShape::Octagon(Simplex::from_lines(&[*line]).bounding_octagon()),
        }
    }

    fn remove_border_line(&self, shape: &TileShape, no: usize) -> TileShape {
        TileShape::Octagon(shape.bounding_octagon().remove_border_line(no))
    }
}

impl TileGeometry for GeneralGeometry {
    fn restriction(&self) -> AngleRestriction {
        AngleRestriction::None
    }

    fn convert(&self, shape: &TileShape) -> TileShape {
        TileShape::Simplex(shape.to_simplex())
    }

    fn half_plane(&self, line: &Line) -> TileShape {
        TileShape::Simplex(Simplex::from_lines(&[*line]))
    }

    fn remove_border_line(&self, shape: &TileShape, no: usize) -> TileShape {
        TileShape::Simplex(shape.to_simplex().remove_border_line(no))
    }
}

pub fn for_restriction(restriction: AngleRestriction) -> &'static dyn TileGeometry {
    match restriction {
        AngleRestriction::NinetyDegree => &OrthogonalGeometry,
        AngleRestriction::FortyFiveDegree => &FortyFiveDegreeGeometry,
        AngleRestriction::None => &GeneralGeometry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcb_common::geom::IntPoint;

    #[test]
    fn conversions_follow_the_discipline() {
        let via = TileShape::Octagon(IntOctagon::circle_approx(IntPoint::new(0, 0), 10));
        assert_eq!(
            OrthogonalGeometry.convert(&via),
            TileShape::Box(IntBox::new(-10, -10, 10, 10))
        );
        assert!(matches!(FortyFiveDegreeGeometry.convert(&via), TileShape::Octagon(_)));
        let general = GeneralGeometry.convert(&via);
        assert!(matches!(general, TileShape::Simplex(_)));
        assert!((general.area() - via.area()).abs() < 1e-6);
    }

    #[test]
    fn removing_a_border_line_extends_the_shape() {
        let b = TileShape::Box(IntBox::new(0, 0, 10, 10));
        for geometry in [
            for_restriction(AngleRestriction::NinetyDegree),
            for_restriction(AngleRestriction::FortyFiveDegree),
            for_restriction(AngleRestriction::None),
        ] {
            let shape = geometry.convert(&b);
            let right = (0..shape.border_line_count())
                .find(|&i| {
                    let line = shape.border_line(i);
                    line.is_vertical() && line.a.x == 10 && line.direction().y > 0
                })
                .unwrap();
            let enlarged = geometry.remove_border_line(&shape, right);
            assert!(enlarged.area() > shape.area(), "{:?}", geometry.restriction());
            assert!(enlarged.bounding_box().ur.x > 10);
            assert_eq!(enlarged.bounding_box().ur.y, 10);
            assert_eq!(enlarged.bounding_box().ll.x, 0);
        }
    }

    #[test]
    fn half_planes_keep_the_left_side() {
        let line = Line::new(IntPoint::new(0, 0), IntPoint::new(1, 0));
        for restriction in [
            AngleRestriction::NinetyDegree,
            AngleRestriction::FortyFiveDegree,
            AngleRestriction::None,
        ] {
            let half = for_restriction(restriction).half_plane(&line);
            assert_eq!(half.bounding_box().ll.y, 0);
            assert!(half.contains_point(pcb_common::geom::FloatPoint::new(5.0, 5.0)));
        }
    }
}
