/// Classification of a spatial reference system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialReferenceKind {
    /// Coordinates are planar, usually in meters
    Projected,

    /// Coordinates are longitude/latitude in degrees
    Geographic,

    /// No or unrecognized spatial reference
    Unknown,
}

const PROJECTED_ROOTS: &[&str] = &["PROJCS", "PROJCRS", "PROJECTEDCRS"];
const GEOGRAPHIC_ROOTS: &[&str] = &["GEOGCS", "GEOGCRS", "GEODCRS", "GEOGRAPHICCRS"];

/// A spatial reference system given as well-known text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpatialReference {
    wkt: String,
}

impl SpatialReference {
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self { wkt: wkt.into() }
    }

    pub fn wkt(&self) -> &str {
        &self.wkt
    }

    /// Determines the kind of the reference from the WKT root keyword
    pub fn kind(&self) -> SpatialReferenceKind {
        let root = self
            .wkt
            .trim_start()
            .split(|c: char| c == '[' || c == '(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_uppercase();
        if PROJECTED_ROOTS.contains(&root.as_str()) {
            SpatialReferenceKind::Projected
        } else if GEOGRAPHIC_ROOTS.contains(&root.as_str()) {
            SpatialReferenceKind::Geographic
        } else {
            SpatialReferenceKind::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use assertor::{assert_that, EqualityAssertion};

    use super::{SpatialReference, SpatialReferenceKind};

    #[test]
    fn classify() {
        let utm = SpatialReference::from_wkt(
            r#"PROJCS["WGS 84 / UTM zone 21S",GEOGCS["WGS 84",DATUM["WGS_1984"]],UNIT["metre",1]]"#,
        );
        assert_that!(utm.kind()).is_equal_to(SpatialReferenceKind::Projected);

        let wgs84 = SpatialReference::from_wkt(r#"GEOGCS["WGS 84",DATUM["WGS_1984"]]"#);
        assert_that!(wgs84.kind()).is_equal_to(SpatialReferenceKind::Geographic);

        let wkt2 = SpatialReference::from_wkt(r#"  geogcrs["WGS 84"]"#);
        assert_that!(wkt2.kind()).is_equal_to(SpatialReferenceKind::Geographic);

        assert_that!(SpatialReference::default().kind())
            .is_equal_to(SpatialReferenceKind::Unknown);
        assert_that!(SpatialReference::from_wkt(r#"LOCAL_CS["x"]"#).kind())
            .is_equal_to(SpatialReferenceKind::Unknown);
    }
}
