//! Capability metadata fetched per layer, and the feature-schema types
//! returned by the edit-mode probe.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;

/// A named or referenced style advertised by the capability document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleEntry {
    /// Name used in the map request STYLE parameter. May be empty when the
    /// style is referenced only by href.
    pub name: String,
    /// Human readable title; not always relevant (some servers store tool
    /// versions in it), so name wins for display when present.
    pub title: String,
    /// Whether this style is the one currently applied server-side.
    pub current: bool,
    /// External stylesheet reference, for styles not selectable by name.
    pub href: Option<String>,
}

/// An output format advertised by the capability document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatEntry {
    pub value: String,
    pub current: bool,
}

impl FormatEntry {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            current: false,
        }
    }
}

/// A metadata document link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataLink {
    pub href: String,
    pub format: Option<String>,
}

impl MetadataLink {
    /// Whether this link points at a browser-displayable document.
    pub fn is_html(&self) -> bool {
        self.format
            .as_deref()
            .map(|f| f.eq_ignore_ascii_case("text/html") || f.to_ascii_lowercase().contains("html"))
            .unwrap_or(false)
    }
}

/// Companion feature-service endpoint associated with a rendered layer.
/// Enables query, download and edit actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureServiceBinding {
    pub url: String,
    pub type_name: String,
    pub namespace: Option<String>,
}

/// Capability metadata for one layer, fetched asynchronously by an external
/// collaborator. Transitions absent -> present exactly once per layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub queryable: bool,
    /// Set exactly once by the fetch collaborator when description completes.
    pub described: bool,
    pub styles: Vec<StyleEntry>,
    pub formats: Vec<FormatEntry>,
    /// Bounding boxes keyed by SRS identifier.
    pub bounding_boxes: HashMap<String, BoundingBox>,
    /// Geographic extent in EPSG:4326, if advertised.
    pub lat_lon_bbox: Option<BoundingBox>,
    pub metadata_links: Vec<MetadataLink>,
    /// Present when the layer has an equivalent feature service (or, for a
    /// feature-service layer, its own endpoint).
    pub feature_service: Option<FeatureServiceBinding>,
    /// Whether an equivalent coverage service exists for download.
    pub has_coverage_service: bool,
}

impl CapabilityDescriptor {
    pub fn has_feature_service(&self) -> bool {
        self.feature_service.is_some()
    }

    /// Extent for the given SRS, falling back to nothing (the lat/lon box is
    /// a separate, transformable fallback).
    pub fn bbox_for(&self, srs: &str) -> Option<&BoundingBox> {
        self.bounding_boxes.get(srs)
    }
}

/// Geometry shape categories with an interactive drawing handler, plus the
/// generic catch-all which has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryShape {
    Point,
    Line,
    Polygon,
    /// Untyped gml:Geometry column; editable attributes only.
    Generic,
}

impl GeometryShape {
    /// Whether an interactive drawing tool exists for this shape.
    pub fn has_draw_handler(&self) -> bool {
        !matches!(self, GeometryShape::Generic)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryShape::Point => "point",
            GeometryShape::Line => "line",
            GeometryShape::Polygon => "polygon",
            GeometryShape::Generic => "geometry",
        }
    }
}

/// Shape category plus single/multi flag, as recorded on a layer record
/// after a successful schema probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryInfo {
    pub shape: GeometryShape,
    pub multi: bool,
}

impl GeometryInfo {
    /// Parse a GML property type name such as `gml:MultiPolygonPropertyType`.
    ///
    /// Curve maps to Line and Surface to Polygon (same drawing handler);
    /// bare Geometry is the generic shape with no handler. Anything else is
    /// not a geometry column.
    pub fn from_property_type(type_name: &str) -> Option<Self> {
        let rest = type_name.strip_prefix("gml:")?;
        let rest = rest.strip_suffix("PropertyType")?;
        let (multi, base) = match rest.strip_prefix("Multi") {
            Some(base) => (true, base),
            None => (false, rest),
        };
        let shape = match base {
            "Point" => GeometryShape::Point,
            "LineString" | "Curve" => GeometryShape::Line,
            "Polygon" | "Surface" => GeometryShape::Polygon,
            "Geometry" => GeometryShape::Generic,
            _ => return None,
        };
        Some(Self { shape, multi })
    }
}

/// One attribute column of a feature type, as returned by the schema probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub name: String,
    /// Qualified type name, e.g. "xsd:string" or "gml:PointPropertyType".
    pub type_name: String,
    pub nillable: bool,
}

impl AttributeDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nillable: true,
        }
    }

    pub fn geometry(&self) -> Option<GeometryInfo> {
        GeometryInfo::from_property_type(&self.type_name)
    }
}

/// Result of a feature-type description request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub attributes: Vec<AttributeDescriptor>,
    pub namespace: Option<String>,
    pub protocol_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_parsing_simple_shapes() {
        let info = GeometryInfo::from_property_type("gml:PointPropertyType").unwrap();
        assert_eq!(info.shape, GeometryShape::Point);
        assert!(!info.multi);

        let info = GeometryInfo::from_property_type("gml:LineStringPropertyType").unwrap();
        assert_eq!(info.shape, GeometryShape::Line);

        let info = GeometryInfo::from_property_type("gml:PolygonPropertyType").unwrap();
        assert_eq!(info.shape, GeometryShape::Polygon);
    }

    #[test]
    fn test_geometry_parsing_multi_and_aliases() {
        let info = GeometryInfo::from_property_type("gml:MultiSurfacePropertyType").unwrap();
        assert_eq!(info.shape, GeometryShape::Polygon);
        assert!(info.multi);

        let info = GeometryInfo::from_property_type("gml:CurvePropertyType").unwrap();
        assert_eq!(info.shape, GeometryShape::Line);
        assert!(!info.multi);
    }

    #[test]
    fn test_generic_geometry_has_no_handler() {
        let info = GeometryInfo::from_property_type("gml:GeometryPropertyType").unwrap();
        assert_eq!(info.shape, GeometryShape::Generic);
        assert!(!info.shape.has_draw_handler());
    }

    #[test]
    fn test_non_geometry_types_rejected() {
        assert!(GeometryInfo::from_property_type("xsd:string").is_none());
        assert!(GeometryInfo::from_property_type("gml:CodeType").is_none());
        assert!(GeometryInfo::from_property_type("PointPropertyType").is_none());
    }

    #[test]
    fn test_metadata_link_html_detection() {
        let html = MetadataLink {
            href: "https://example.org/md".into(),
            format: Some("text/html".into()),
        };
        assert!(html.is_html());

        let xml = MetadataLink {
            href: "https://example.org/md.xml".into(),
            format: Some("text/xml".into()),
        };
        assert!(!xml.is_html());

        let unknown = MetadataLink {
            href: "https://example.org/md".into(),
            format: None,
        };
        assert!(!unknown.is_html());
    }

    #[test]
    fn test_bbox_for_lookup() {
        let mut descriptor = CapabilityDescriptor::default();
        descriptor.bounding_boxes.insert(
            "EPSG:2154".to_string(),
            crate::bbox::BoundingBox::new(0.0, 0.0, 10.0, 10.0),
        );
        assert!(descriptor.bbox_for("EPSG:2154").is_some());
        assert!(descriptor.bbox_for("EPSG:3857").is_none());
    }
}
