/// The four spline representations offered by the crate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SplineFamily {
    Bezier,
    RationalBezier,
    BSpline,
    Nurbs,
}

impl SplineFamily {
    /// Select the family from the rational and knotted flags
    pub fn from_flags(rational: bool, knotted: bool) -> Self {
        match (rational, knotted) {
            (false, false) => SplineFamily::Bezier,
            (true, false) => SplineFamily::RationalBezier,
            (false, true) => SplineFamily::BSpline,
            (true, true) => SplineFamily::Nurbs,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SplineFamily::Bezier => "Bezier",
            SplineFamily::RationalBezier => "RationalBezier",
            SplineFamily::BSpline => "BSpline",
            SplineFamily::Nurbs => "NURBS",
        }
    }

    pub fn is_rational(&self) -> bool {
        matches!(self, SplineFamily::RationalBezier | SplineFamily::Nurbs)
    }

    pub fn has_knot_vectors(&self) -> bool {
        matches!(self, SplineFamily::BSpline | SplineFamily::Nurbs)
    }

    /// Bezier and rational Bezier splines live on the unit box without knots
    pub fn is_bezier_family(&self) -> bool {
        !self.has_knot_vectors()
    }
}

impl std::fmt::Display for SplineFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
