//! # Chart Documents
//!
//! Nested serde form of a chart, used for chart files and for exchanging charts
//! with callers. The arena tree is the working representation; a document is
//! what gets written down.
//!
//! ```yaml
//! id: 1
//! song: blue-bossa
//! key: c-minor
//! sections:
//!   - alt_title: Head
//!     time_signature: 4
//!     lines:
//!       - measures:
//!           - chords:
//!               - { chord_pitch: 0, chord_type: m7 }
//!           - beat_schema: 2-2
//!             chords:
//!               - { chord_pitch: 2, chord_type: m7b5, beats: 2 }
//!               - { chord_pitch: 7, chord_type: "7", beats: 2, alternative_bass_pitch: 11 }
//! ```
//!
//! Positions are implied by list order. A measure without `beat_schema` gets one
//! slot spanning its section's `time_signature`, which defaults to 4. Loading goes
//! through the [`Editor`], so a document is held to the same rules as interactive
//! edits.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::beat_schema::BeatSchema;

use crate::catalog::Catalog;
use crate::chart::{ChartId, ChartTree, NodeId, SongId, DEFAULT_TIME_SIGNATURE};
use crate::editor::{ChordRequest, Editor};
use crate::error::ChartError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDocument {
    pub id: ChartId,
    pub song: SongId,
    /// Key slug, e.g. "bb-major"
    pub key: String,
    #[serde(default)]
    pub sections: Vec<SectionDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_title: Option<String>,
    #[serde(default)]
    pub key_distance_from_chart: i32,
    /// Beats per measure, 1 to 12
    #[serde(default = "default_time_signature")]
    pub time_signature: u8,
    #[serde(default)]
    pub lines: Vec<LineDocument>,
}

impl Default for SectionDocument {
    fn default() -> Self {
        Self {
            alt_title: None,
            key_distance_from_chart: 0,
            time_signature: DEFAULT_TIME_SIGNATURE,
            lines: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineDocument {
    #[serde(default)]
    pub measures: Vec<MeasureDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureDocument {
    /// Absent when the measure is one slot of the section's time signature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beat_schema: Option<String>,
    #[serde(default)]
    pub chords: Vec<ChordDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordDocument {
    pub chord_pitch: i32,
    pub chord_type: String,
    #[serde(default = "default_beats")]
    pub beats: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_bass_pitch: Option<i32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub rest: bool,
}

fn default_time_signature() -> u8 {
    DEFAULT_TIME_SIGNATURE
}

fn default_beats() -> u8 {
    crate::chart::DEFAULT_CHORD_BEATS
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ChartDocument {
    pub fn from_yaml(source: &str) -> Result<Self, ChartError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn to_yaml(&self) -> Result<String, ChartError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_json(source: &str) -> Result<Self, ChartError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn to_json(&self) -> Result<String, ChartError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a chart file; `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ChartError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&source),
            _ => Self::from_yaml(&source),
        }
    }

    /// Build the arena tree, validating every node against `catalog`.
    ///
    /// Soft warnings are logged but do not fail the load; empty lines are kept
    /// so the cleanup pass can see them.
    pub fn into_tree(&self, catalog: &Catalog) -> Result<ChartTree, ChartError> {
        catalog.key(&self.key)?;
        let editor = Editor::new(catalog);
        let mut tree = ChartTree::new(self.id, self.song.clone(), self.key.clone());

        for section in &self.sections {
            let section_id = created(editor.append_section_with_time_signature(
                &mut tree,
                section.alt_title.clone(),
                section.key_distance_from_chart,
                section.time_signature,
                None,
            )?)?;
            for line in &section.lines {
                let line_id = created(editor.append_line(&mut tree, section_id, None)?)?;
                for measure in &line.measures {
                    let measure_id = created(editor.append_measure(
                        &mut tree,
                        line_id,
                        measure.beat_schema.as_deref(),
                        None,
                    )?)?;
                    for chord in &measure.chords {
                        editor.append_chord(
                            &mut tree,
                            measure_id,
                            ChordRequest {
                                chord_pitch: chord.chord_pitch,
                                chord_type: chord.chord_type.as_str(),
                                beats: Some(chord.beats),
                                alternative_bass_pitch: chord.alternative_bass_pitch,
                                rest: chord.rest,
                            },
                            None,
                        )?;
                    }
                }
            }
        }

        log::debug!("loaded chart {} with {} nodes", tree.id, tree.len());
        Ok(tree)
    }

    /// Write `tree` down in sibling order.
    pub fn from_tree(tree: &ChartTree) -> Result<Self, ChartError> {
        let mut sections = Vec::new();
        for section_id in tree.sections() {
            let section = tree.section(section_id)?;
            let plain = BeatSchema::single(section.time_signature)?;
            let mut lines = Vec::new();
            for line_id in tree.children_of(section_id) {
                let mut measures = Vec::new();
                for measure_id in tree.children_of(line_id) {
                    let chords = tree
                        .children_of(measure_id)
                        .into_iter()
                        .map(|chord_id| {
                            let chord = tree.chord(chord_id)?;
                            Ok(ChordDocument {
                                chord_pitch: chord.chord_pitch.value() as i32,
                                chord_type: chord.chord_type.clone(),
                                beats: chord.beats,
                                alternative_bass_pitch: chord.alternative_bass().map(|p| p.value() as i32),
                                rest: chord.rest,
                            })
                        })
                        .collect::<Result<Vec<_>, ChartError>>()?;
                    let schema = &tree.measure(measure_id)?.beat_schema;
                    measures.push(MeasureDocument {
                        beat_schema: (*schema != plain).then(|| schema.to_string()),
                        chords,
                    });
                }
                lines.push(LineDocument { measures });
            }
            sections.push(SectionDocument {
                alt_title: section.alt_title.clone(),
                key_distance_from_chart: section.key_distance_from_chart,
                time_signature: section.time_signature,
                lines,
            });
        }

        Ok(Self {
            id: tree.id,
            song: tree.song.clone(),
            key: tree.key.clone(),
            sections,
        })
    }
}

fn created(outcome: crate::editor::EditOutcome) -> Result<NodeId, ChartError> {
    outcome
        .node
        .ok_or_else(|| ChartError::internal("append did not report the created node"))
}
