//! # Transposition & Layout Engine
//!
//! Derives a flat, render-ready description of a chart for a target key. The
//! engine never mutates the tree: the same tree and target always produce the
//! same model.
//!
//! ## Pipeline
//! 1. **Offset** - with a target tonic, `offset = (target - chart tonic) mod 12`,
//!    always taken upward in [0, 11]; without one, `offset = 0`
//! 2. **Section keys** - each section is spelled in the key with tonic
//!    `chart tonic + key_distance_from_chart + offset` and the chart's tonality
//! 3. **Chords** - `display pitch = pitch + offset`, spelled in the section key,
//!    followed by the chord type's display template and `/bass` when the chord
//!    has an alternative bass
//! 4. **Layout** - every line is a grid row (numbered across the whole chart),
//!    every measure a column within its line, positioned with
//!    [`GridGeometry::BOXED`]
//!
//! `edit_mode` does not affect pitches or layout; it is copied into the model for
//! the renderer to decide whether to show editing affordances.
//!
//! ## Example
//! ```rust
//! use chordchart::{render, Catalog, ChartId, ChartTree, Editor, PitchClass, SongId};
//! use chordchart::editor::ChordRequest;
//!
//! let catalog = Catalog::standard();
//! let editor = Editor::new(catalog);
//! let mut tree = ChartTree::new(ChartId(1), SongId("song".into()), "c-major");
//! let section = editor.append_section(&mut tree, None, 0, None)?.node.unwrap();
//! let line = editor.append_line(&mut tree, section, None)?.node.unwrap();
//! let measure = editor.append_measure(&mut tree, line, None, None)?.node.unwrap();
//! editor.append_chord(&mut tree, measure, ChordRequest {
//!     chord_pitch: 7,
//!     chord_type: "maj",
//!     beats: None,
//!     alternative_bass_pitch: None,
//!     rest: false,
//! }, None)?;
//!
//! let model = render(&tree, catalog, Some(PitchClass::new(2)?), false)?;
//! assert_eq!(model.sections[0].lines[0].measures[0].chords[0].symbol, "A");
//! # Ok::<(), chordchart::ChartError>(())
//! ```

use serde::Serialize;

use crate::catalog::{effective_tonic, Catalog, Key};
use crate::chart::{ChartId, ChartTree, Chord, NodeId, SongId};
use crate::error::ChartError;
use crate::layout::{GridGeometry, Segment};
use crate::pitch::{PitchClass, Tonality};

/// Everything a renderer needs to draw one chart
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderModel {
    pub chart_id: ChartId,
    pub song: SongId,
    /// Key the chart is displayed in
    pub key: KeyView,
    /// Stored base key of the chart
    pub chart_key: KeyView,
    /// Semitones added to every pitch, in [0, 11]
    pub transposition: u8,
    pub edit_mode: bool,
    pub grid: GridGeometry,
    /// Total grid height in pixels
    pub height: u32,
    pub sections: Vec<SectionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyView {
    pub slug: String,
    pub name: String,
    pub tone: String,
    pub tonic: PitchClass,
    pub tonality: Tonality,
}

impl From<&Key> for KeyView {
    fn from(key: &Key) -> Self {
        Self {
            slug: key.slug.clone(),
            name: key.name.clone(),
            tone: key.tone.clone(),
            tonic: key.tonic,
            tonality: key.tonality,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionView {
    pub id: NodeId,
    pub number: u32,
    /// Alt title, or "A Section", "B Section", ...
    pub name: String,
    pub alt_title: Option<String>,
    pub key_distance_from_chart: i32,
    /// Beats per measure
    pub time_signature: u8,
    pub key: KeyView,
    pub first_row: usize,
    pub rows: usize,
    pub y: u32,
    pub height: u32,
    pub lines: Vec<LineView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineView {
    pub id: NodeId,
    pub number: u32,
    pub row: usize,
    pub y: u32,
    pub measures: Vec<MeasureView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureView {
    pub id: NodeId,
    pub number: u32,
    pub column: usize,
    pub x: u32,
    pub y: u32,
    pub beat_schema: String,
    pub guides: Vec<Segment>,
    /// False for the only measure of the only line of a section
    pub removable: bool,
    pub chords: Vec<ChordView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChordView {
    pub id: NodeId,
    pub order: u32,
    /// Rank within the measure, matching the beat schema part it fills
    pub slot: usize,
    pub beats: u8,
    pub rest: bool,
    pub chord_type: String,
    /// Transposed root, absent for rests
    pub display_pitch: Option<PitchClass>,
    pub symbol: String,
}

/// Transposition offset for an optional target tonic, always upward.
pub fn transposition_offset(chart_tonic: PitchClass, target_tonic: Option<PitchClass>) -> u8 {
    target_tonic.map_or(0, |target| target.distance_above(chart_tonic))
}

/// Build the render model of `tree` shown in `target_tonic` (or its own key).
///
/// # Errors
/// - `NotFound` if the chart's key, or a key with the target tonic and the
///   chart's tonality, is not in the catalog
/// - `InternalConsistencyFault` if the catalog cannot spell a chord or the tree
///   references a chord type the catalog lacks
pub fn render(
    tree: &ChartTree,
    catalog: &Catalog,
    target_tonic: Option<PitchClass>,
    edit_mode: bool,
) -> Result<RenderModel, ChartError> {
    let chart_key = catalog.key(&tree.key)?;
    let offset = transposition_offset(chart_key.tonic, target_tonic);
    let display_tonic = chart_key.tonic.transpose(offset as i32);
    let display_key = catalog
        .key_for_tonic(display_tonic, chart_key.tonality)
        .ok_or_else(|| ChartError::not_found("key", format!("{} {}", display_tonic, chart_key.tonality)))?;
    log::debug!(
        "rendering chart {} in {} (offset {}, edit mode {})",
        tree.id,
        display_key.slug,
        offset,
        edit_mode
    );

    let grid = GridGeometry::BOXED;
    let mut row = 0;
    let mut untitled = 0;
    let mut sections = Vec::new();

    for section_id in tree.sections() {
        let section = tree.section(section_id)?;
        let key = catalog.key_with_tonic(
            effective_tonic(chart_key, section).transpose(offset as i32),
            chart_key.tonality,
        )?;

        let name = match &section.alt_title {
            Some(title) => title.clone(),
            None => {
                untitled += 1;
                sequence_name(untitled - 1)
            }
        };

        let line_ids = tree.children_of(section_id);
        let first_row = row;
        let mut lines = Vec::with_capacity(line_ids.len());
        for line_id in &line_ids {
            let measure_ids = tree.children_of(*line_id);
            let only_line = line_ids.len() == 1;
            let y = grid.row_y(row);
            let mut measures = Vec::with_capacity(measure_ids.len());

            for (column, measure_id) in measure_ids.iter().enumerate() {
                let measure = tree.measure(*measure_id)?;
                let chords = tree
                    .children_of(*measure_id)
                    .into_iter()
                    .enumerate()
                    .map(|(slot, chord_id)| {
                        render_chord(tree, catalog, chord_id, slot, key, offset)
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                measures.push(MeasureView {
                    id: *measure_id,
                    number: tree.position(*measure_id).unwrap_or_default(),
                    column,
                    x: grid.column_x(column),
                    y,
                    beat_schema: measure.beat_schema.to_string(),
                    guides: grid.guides(&measure.beat_schema),
                    removable: !(only_line && measure_ids.len() == 1),
                    chords,
                });
            }

            lines.push(LineView {
                id: *line_id,
                number: tree.position(*line_id).unwrap_or_default(),
                row,
                y,
                measures,
            });
            row += 1;
        }

        let rows = row - first_row;
        sections.push(SectionView {
            id: section_id,
            number: tree.position(section_id).unwrap_or_default(),
            name,
            alt_title: section.alt_title.clone(),
            key_distance_from_chart: section.key_distance_from_chart,
            time_signature: section.time_signature,
            key: key.into(),
            first_row,
            rows,
            y: grid.row_y(first_row),
            height: grid.rows_height(rows),
            lines,
        });
    }

    Ok(RenderModel {
        chart_id: tree.id,
        song: tree.song.clone(),
        key: display_key.into(),
        chart_key: chart_key.into(),
        transposition: offset,
        edit_mode,
        grid,
        height: grid.rows_height(row),
        sections,
    })
}

fn render_chord(
    tree: &ChartTree,
    catalog: &Catalog,
    id: NodeId,
    slot: usize,
    key: &Key,
    offset: u8,
) -> Result<ChordView, ChartError> {
    let chord = tree.chord(id)?;
    let (display_pitch, symbol) = if chord.rest {
        (None, String::new())
    } else {
        let pitch = chord.chord_pitch.transpose(offset as i32);
        (Some(pitch), chord_symbol(catalog, chord, key, offset)?)
    };
    Ok(ChordView {
        id,
        order: tree.position(id).unwrap_or_default(),
        slot,
        beats: chord.beats,
        rest: chord.rest,
        chord_type: chord.chord_type.clone(),
        display_pitch,
        symbol,
    })
}

/// Spelled symbol of `chord` transposed by `offset` and spelled in `key`,
/// e.g. "Bbm7/F".
pub fn chord_symbol(catalog: &Catalog, chord: &Chord, key: &Key, offset: u8) -> Result<String, ChartError> {
    let chord_type = catalog.chord_type(&chord.chord_type).map_err(|_| {
        ChartError::internal(format!("chart uses unknown chord type '{}'", chord.chord_type))
    })?;
    let root = catalog.spell(chord.chord_pitch.transpose(offset as i32), key)?;
    let mut symbol = format!("{}{}", root, chord_type.display_template);
    if let Some(bass) = chord.alternative_bass() {
        symbol.push('/');
        symbol.push_str(catalog.spell(bass.transpose(offset as i32), key)?);
    }
    Ok(symbol)
}

/// "A Section", "B Section", ... for sections without an alt title
fn sequence_name(index: usize) -> String {
    if index < 26 {
        format!("{} Section", (b'A' + index as u8) as char)
    } else {
        format!("Section {}", index + 1)
    }
}
