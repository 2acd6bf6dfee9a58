//! Common types shared across the map-console workspace.

pub mod bbox;
pub mod capability;
pub mod error;
pub mod event;
pub mod layer;

pub use bbox::BoundingBox;
pub use capability::{
    AttributeDescriptor, CapabilityDescriptor, FeatureServiceBinding, FormatEntry, GeometryInfo,
    GeometryShape, MetadataLink, SchemaDescription, StyleEntry,
};
pub use error::{ConsoleError, ConsoleResult};
pub use event::{ConsoleEvent, EventBus};
pub use layer::{Attribution, LayerId, LayerKind, LayerRecord, RenderState};
