pub mod beat_schema;
pub mod catalog;
pub mod chart;
pub mod cleanup;
pub mod document;
pub mod editor;
pub mod error;
pub mod layout;
pub mod pitch;
pub mod render;
pub mod service;

pub use beat_schema::BeatSchema;
pub use catalog::{Catalog, ChordType, Key, KeyNote};
pub use chart::{
    ChartId, ChartTree, Chord, Level, NodeId, SongId, DEFAULT_CHORD_BEATS, DEFAULT_TIME_SIGNATURE, LINE_MAX_MEASURES,
    MAX_TIME_SIGNATURE,
};
pub use cleanup::cleanup;
pub use document::ChartDocument;
pub use editor::{EditIntent, EditOutcome, EditWarning, Editor};
pub use error::*;
pub use layout::GridGeometry;
pub use pitch::{transpose_pitch, PitchClass, Tonality};
pub use render::{render, RenderModel};
pub use service::{ChartService, ChartStore, MemoryStore, ReadRequest};

/// Render a YAML chart document in its own key with the built-in catalog.
/// This is the main entry point for one-off rendering.
pub fn render_chart(source: &str) -> Result<RenderModel, ChartError> {
    let catalog = Catalog::standard();
    let tree = ChartDocument::from_yaml(source)?.into_tree(catalog)?;
    render(&tree, catalog, None, false)
}

/// Render a YAML chart document transposed to the key named by `tone` (e.g. "Bb", "F#")
pub fn render_chart_in(source: &str, tone: &str) -> Result<RenderModel, ChartError> {
    let target = PitchClass::from_name(tone).ok_or_else(|| ChartError::not_found("key", tone))?;
    let catalog = Catalog::standard();
    let tree = ChartDocument::from_yaml(source)?.into_tree(catalog)?;
    render(&tree, catalog, Some(target), false)
}
