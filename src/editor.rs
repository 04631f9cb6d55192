//! # Structural Editor
//!
//! Turns edit intents into chart tree mutations while enforcing the invariants the
//! tree does not check by itself.
//!
//! ## Transactions
//! Every operation runs against a draft copy of the tree. The draft replaces the
//! caller's tree only when the whole operation succeeded and the tree invariants
//! still hold, so a failed edit leaves the chart exactly as it was.
//!
//! ## Validation
//! Hard rejections (the edit is refused):
//! - pitches outside [0, 11] → `InvalidPitch`
//! - `key_distance_from_chart` outside (-11, 11] → `InconsistentOffset`
//! - a section time signature outside [1, 12] → `InvalidTimeSignature`
//! - unknown chord type symbol or node id → `NotFound`
//! - unparsable beat schema → `InvalidBeatSchema`
//! - zero-beat chords → `InvalidBeats`
//! - switching on an alternative bass that has no pitch yet → `MissingBassPitch`
//! - a ninth measure on a line → `CapacityExceeded`
//!
//! Soft warnings (the edit is applied and the warning returned and logged):
//! - the chords of a measure last longer than its beat schema
//! - a measure holds more chords than its beat schema has slots
//!
//! Charts that break the soft rules must stay usable, so they are never rejected.
//!
//! ## Entry Points
//! - [`Editor::apply()`] - dispatch an [`EditIntent`] received from a caller
//! - one method per intent (`append_section`, `append_chord`, `set_chord`, ...)
//!
//! ## Example
//! ```rust
//! use chordchart::{Catalog, ChartId, ChartTree, EditIntent, Editor, SongId};
//!
//! let mut tree = ChartTree::new(ChartId(1), SongId("blue-bossa".into()), "c-minor");
//! let editor = Editor::new(Catalog::standard());
//!
//! let section = editor.apply(&mut tree, &EditIntent::AppendSection {
//!     alt_title: None,
//!     key_distance_from_chart: 0,
//!     time_signature: Some(3),
//!     position: None,
//! })?.node.unwrap();
//! assert_eq!(tree.sections(), vec![section]);
//! assert_eq!(tree.section(section)?.time_signature, 3);
//! # Ok::<(), chordchart::ChartError>(())
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::beat_schema::BeatSchema;
use crate::catalog::Catalog;
use crate::chart::{
    Chord, ChartTree, Level, Line, Measure, NodeData, NodeId, Section, DEFAULT_CHORD_BEATS, DEFAULT_TIME_SIGNATURE,
    MAX_TIME_SIGNATURE,
};
use crate::error::ChartError;
use crate::pitch::PitchClass;

/// An edit request as received from a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum EditIntent {
    AppendSection {
        #[serde(default)]
        alt_title: Option<String>,
        #[serde(default)]
        key_distance_from_chart: i32,
        /// Beats per measure; 4 when absent
        #[serde(default)]
        time_signature: Option<u8>,
        #[serde(default)]
        position: Option<usize>,
    },
    AppendLine {
        section: NodeId,
        #[serde(default)]
        position: Option<usize>,
    },
    AppendMeasure {
        line: NodeId,
        #[serde(default)]
        beat_schema: Option<String>,
        #[serde(default)]
        position: Option<usize>,
    },
    AppendChord {
        measure: NodeId,
        chord_pitch: i32,
        chord_type: String,
        #[serde(default)]
        beats: Option<u8>,
        #[serde(default)]
        alternative_bass_pitch: Option<i32>,
        #[serde(default)]
        rest: bool,
        #[serde(default)]
        position: Option<usize>,
    },
    /// Delete a node of any level with its subtree
    Delete { node: NodeId },
    /// Move a node to a 0-based rank among its siblings
    Reorder { node: NodeId, position: usize },
    SetKeyDistance {
        section: NodeId,
        key_distance_from_chart: i32,
    },
    /// Give a section the key with `tonic`; chords move along only with `transpose_chords`
    SetSectionKey {
        section: NodeId,
        tonic: i32,
        #[serde(default)]
        transpose_chords: bool,
    },
    SetAltTitle {
        section: NodeId,
        alt_title: Option<String>,
    },
    /// Change a section's beats per measure; existing measures keep their schemas
    SetTimeSignature { section: NodeId, time_signature: u8 },
    SetBeatSchema { measure: NodeId, beat_schema: String },
    SetChord {
        chord: NodeId,
        #[serde(default)]
        chord_pitch: Option<i32>,
        #[serde(default)]
        chord_type: Option<String>,
        #[serde(default)]
        beats: Option<u8>,
        #[serde(default)]
        has_alternative_bass: Option<bool>,
        #[serde(default)]
        alternative_bass_pitch: Option<i32>,
        #[serde(default)]
        rest: Option<bool>,
    },
    /// Deep-copy a section; defaults to directly after the original
    CopySection {
        section: NodeId,
        #[serde(default)]
        position: Option<usize>,
    },
    /// Rewrite the chart into the key with `tonic`, moving every chord with it
    TransposeChart { tonic: i32 },
}

/// Non-fatal finding reported alongside a successful edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditWarning {
    BeatsExceedSchema {
        measure: NodeId,
        beats: u32,
        schema_total: u32,
    },
    MoreChordsThanSlots {
        measure: NodeId,
        chords: usize,
        slots: usize,
    },
}

impl fmt::Display for EditWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditWarning::BeatsExceedSchema {
                measure,
                beats,
                schema_total,
            } => write!(
                f,
                "measure {} chords last {} beats but its beat schema holds {}",
                measure, beats, schema_total
            ),
            EditWarning::MoreChordsThanSlots {
                measure,
                chords,
                slots,
            } => write!(
                f,
                "measure {} holds {} chords but its beat schema has {} slots",
                measure, chords, slots
            ),
        }
    }
}

/// Result of a successful edit
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EditOutcome {
    /// The node created or edited, if any
    pub node: Option<NodeId>,
    pub warnings: Vec<EditWarning>,
}

impl EditOutcome {
    fn node(node: NodeId) -> Self {
        Self {
            node: Some(node),
            warnings: Vec::new(),
        }
    }
}

/// Validate a section key offset: greater than -11 and at most 11.
pub fn validate_key_distance(value: i32) -> Result<i32, ChartError> {
    if value > -11 && value <= 11 {
        Ok(value)
    } else {
        Err(ChartError::InconsistentOffset { value })
    }
}

/// Validate a section time signature: 1 to `MAX_TIME_SIGNATURE` beats per measure.
pub fn validate_time_signature(value: u8) -> Result<u8, ChartError> {
    if (1..=MAX_TIME_SIGNATURE).contains(&value) {
        Ok(value)
    } else {
        Err(ChartError::InvalidTimeSignature { value })
    }
}

fn validate_beats(value: u8) -> Result<u8, ChartError> {
    if value == 0 {
        Err(ChartError::InvalidBeats { value })
    } else {
        Ok(value)
    }
}

/// Applies edits against a catalog
pub struct Editor<'a> {
    catalog: &'a Catalog,
}

impl<'a> Editor<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Apply `intent` to `tree` as one transaction.
    pub fn apply(&self, tree: &mut ChartTree, intent: &EditIntent) -> Result<EditOutcome, ChartError> {
        log::debug!("chart {}: applying {:?}", tree.id, intent);
        match intent {
            EditIntent::AppendSection {
                alt_title,
                key_distance_from_chart,
                time_signature,
                position,
            } => self.append_section_with_time_signature(
                tree,
                alt_title.clone(),
                *key_distance_from_chart,
                time_signature.unwrap_or(DEFAULT_TIME_SIGNATURE),
                *position,
            ),
            EditIntent::AppendLine { section, position } => self.append_line(tree, *section, *position),
            EditIntent::AppendMeasure {
                line,
                beat_schema,
                position,
            } => self.append_measure(tree, *line, beat_schema.as_deref(), *position),
            EditIntent::AppendChord {
                measure,
                chord_pitch,
                chord_type,
                beats,
                alternative_bass_pitch,
                rest,
                position,
            } => self.append_chord(
                tree,
                *measure,
                ChordRequest {
                    chord_pitch: *chord_pitch,
                    chord_type: chord_type.as_str(),
                    beats: *beats,
                    alternative_bass_pitch: *alternative_bass_pitch,
                    rest: *rest,
                },
                *position,
            ),
            EditIntent::Delete { node } => self.delete(tree, *node),
            EditIntent::Reorder { node, position } => self.reorder(tree, *node, *position),
            EditIntent::SetKeyDistance {
                section,
                key_distance_from_chart,
            } => self.set_key_distance(tree, *section, *key_distance_from_chart),
            EditIntent::SetSectionKey {
                section,
                tonic,
                transpose_chords,
            } => self.set_section_key(tree, *section, *tonic, *transpose_chords),
            EditIntent::SetAltTitle { section, alt_title } => {
                self.set_alt_title(tree, *section, alt_title.clone())
            }
            EditIntent::SetTimeSignature {
                section,
                time_signature,
            } => self.set_time_signature(tree, *section, *time_signature),
            EditIntent::SetBeatSchema {
                measure,
                beat_schema,
            } => self.set_beat_schema(tree, *measure, beat_schema),
            EditIntent::SetChord {
                chord,
                chord_pitch,
                chord_type,
                beats,
                has_alternative_bass,
                alternative_bass_pitch,
                rest,
            } => self.set_chord(
                tree,
                *chord,
                ChordChanges {
                    chord_pitch: *chord_pitch,
                    chord_type: chord_type.as_deref(),
                    beats: *beats,
                    has_alternative_bass: *has_alternative_bass,
                    alternative_bass_pitch: *alternative_bass_pitch,
                    rest: *rest,
                },
            ),
            EditIntent::CopySection { section, position } => self.copy_section(tree, *section, *position),
            EditIntent::TransposeChart { tonic } => self.transpose_chart(tree, *tonic),
        }
    }

    /// Append a section in 4/4.
    pub fn append_section(
        &self,
        tree: &mut ChartTree,
        alt_title: Option<String>,
        key_distance_from_chart: i32,
        position: Option<usize>,
    ) -> Result<EditOutcome, ChartError> {
        self.append_section_with_time_signature(
            tree,
            alt_title,
            key_distance_from_chart,
            DEFAULT_TIME_SIGNATURE,
            position,
        )
    }

    pub fn append_section_with_time_signature(
        &self,
        tree: &mut ChartTree,
        alt_title: Option<String>,
        key_distance_from_chart: i32,
        time_signature: u8,
        position: Option<usize>,
    ) -> Result<EditOutcome, ChartError> {
        let section = Section {
            alt_title: normalize_title(alt_title),
            key_distance_from_chart: validate_key_distance(key_distance_from_chart)?,
            time_signature: validate_time_signature(time_signature)?,
        };
        transact(tree, |draft| {
            let id = place(draft, NodeId::CHART, NodeData::Section(section), position)?;
            Ok(EditOutcome::node(id))
        })
    }

    pub fn append_line(
        &self,
        tree: &mut ChartTree,
        section: NodeId,
        position: Option<usize>,
    ) -> Result<EditOutcome, ChartError> {
        tree.section(section)?;
        transact(tree, |draft| {
            let id = place(draft, section, NodeData::Line(Line), position)?;
            Ok(EditOutcome::node(id))
        })
    }

    pub fn append_measure(
        &self,
        tree: &mut ChartTree,
        line: NodeId,
        beat_schema: Option<&str>,
        position: Option<usize>,
    ) -> Result<EditOutcome, ChartError> {
        if tree.level_of(line) != Some(Level::Line) {
            return Err(ChartError::not_found("line", line));
        }
        let beat_schema = match beat_schema {
            Some(schema) => BeatSchema::parse(schema)?,
            None => {
                let section = tree
                    .parent_of(line)
                    .ok_or_else(|| ChartError::internal(format!("line {} has no section", line)))?;
                BeatSchema::single(tree.section(section)?.time_signature)?
            }
        };
        transact(tree, |draft| {
            let id = place(draft, line, NodeData::Measure(Measure { beat_schema }), position)?;
            Ok(EditOutcome::node(id))
        })
    }

    pub fn append_chord(
        &self,
        tree: &mut ChartTree,
        measure: NodeId,
        request: ChordRequest<'_>,
        position: Option<usize>,
    ) -> Result<EditOutcome, ChartError> {
        let chord = self.build_chord(&request)?;
        tree.measure(measure)?;
        transact(tree, |draft| {
            let id = place(draft, measure, NodeData::Chord(chord), position)?;
            Ok(EditOutcome {
                node: Some(id),
                warnings: measure_warnings(draft, measure),
            })
        })
    }

    pub fn delete(&self, tree: &mut ChartTree, node: NodeId) -> Result<EditOutcome, ChartError> {
        transact(tree, |draft| {
            draft.delete(node)?;
            Ok(EditOutcome::default())
        })
    }

    pub fn reorder(&self, tree: &mut ChartTree, node: NodeId, position: usize) -> Result<EditOutcome, ChartError> {
        let parent = tree
            .parent_of(node)
            .ok_or_else(|| ChartError::not_found("node", node))?;
        transact(tree, |draft| {
            draft.reorder(parent, node, position)?;
            Ok(EditOutcome::node(node))
        })
    }

    pub fn set_key_distance(
        &self,
        tree: &mut ChartTree,
        section: NodeId,
        key_distance_from_chart: i32,
    ) -> Result<EditOutcome, ChartError> {
        let distance = validate_key_distance(key_distance_from_chart)?;
        transact(tree, |draft| {
            draft.section_mut(section)?.key_distance_from_chart = distance;
            Ok(EditOutcome::node(section))
        })
    }

    /// Set a section's effective key by tonic.
    ///
    /// The offset stored is the upward distance from the chart tonic. With
    /// `transpose_chords` every chord of the section moves by the change in offset;
    /// otherwise chords keep their absolute pitches.
    pub fn set_section_key(
        &self,
        tree: &mut ChartTree,
        section: NodeId,
        tonic: i32,
        transpose_chords: bool,
    ) -> Result<EditOutcome, ChartError> {
        let tonic = PitchClass::new(tonic)?;
        let chart_key = self.catalog.key(&tree.key)?;
        let distance = tonic.distance_above(chart_key.tonic) as i32;
        transact(tree, |draft| {
            let current = draft.section(section)?.key_distance_from_chart;
            draft.section_mut(section)?.key_distance_from_chart = distance;
            if transpose_chords {
                let delta = distance - current;
                for node in draft.descendants(section) {
                    if let Ok(chord) = draft.chord_mut(node) {
                        shift_chord(chord, delta);
                    }
                }
            }
            Ok(EditOutcome::node(section))
        })
    }

    pub fn set_alt_title(
        &self,
        tree: &mut ChartTree,
        section: NodeId,
        alt_title: Option<String>,
    ) -> Result<EditOutcome, ChartError> {
        transact(tree, |draft| {
            draft.section_mut(section)?.alt_title = normalize_title(alt_title);
            Ok(EditOutcome::node(section))
        })
    }

    /// Measures appended afterwards without a schema get one slot of `time_signature` beats.
    pub fn set_time_signature(
        &self,
        tree: &mut ChartTree,
        section: NodeId,
        time_signature: u8,
    ) -> Result<EditOutcome, ChartError> {
        let time_signature = validate_time_signature(time_signature)?;
        transact(tree, |draft| {
            draft.section_mut(section)?.time_signature = time_signature;
            Ok(EditOutcome::node(section))
        })
    }

    pub fn set_beat_schema(
        &self,
        tree: &mut ChartTree,
        measure: NodeId,
        beat_schema: &str,
    ) -> Result<EditOutcome, ChartError> {
        let beat_schema = BeatSchema::parse(beat_schema)?;
        transact(tree, |draft| {
            draft.measure_mut(measure)?.beat_schema = beat_schema;
            Ok(EditOutcome {
                node: Some(measure),
                warnings: measure_warnings(draft, measure),
            })
        })
    }

    pub fn set_chord(
        &self,
        tree: &mut ChartTree,
        chord: NodeId,
        changes: ChordChanges<'_>,
    ) -> Result<EditOutcome, ChartError> {
        let pitch = changes.chord_pitch.map(PitchClass::new).transpose()?;
        let bass = changes.alternative_bass_pitch.map(PitchClass::new).transpose()?;
        let beats = changes.beats.map(validate_beats).transpose()?;
        if let Some(symbol) = changes.chord_type {
            self.catalog.chord_type(symbol)?;
        }
        let measure = tree
            .parent_of(chord)
            .ok_or_else(|| ChartError::not_found("chord", chord))?;

        transact(tree, |draft| {
            let target = draft.chord_mut(chord)?;
            if let Some(pitch) = pitch {
                target.chord_pitch = pitch;
            }
            if let Some(symbol) = changes.chord_type {
                target.chord_type = symbol.to_string();
            }
            if let Some(beats) = beats {
                target.beats = beats;
            }
            if let Some(bass) = bass {
                target.alternative_bass_pitch = bass;
                target.has_alternative_bass = true;
            }
            if let Some(flag) = changes.has_alternative_bass {
                if flag && !target.has_alternative_bass {
                    return Err(ChartError::MissingBassPitch { chord: chord.0 });
                }
                target.has_alternative_bass = flag;
            }
            if let Some(rest) = changes.rest {
                target.rest = rest;
            }
            Ok(EditOutcome {
                node: Some(chord),
                warnings: measure_warnings(draft, measure),
            })
        })
    }

    /// Deep-copy `section` to rank `position`, or right after the original.
    pub fn copy_section(
        &self,
        tree: &mut ChartTree,
        section: NodeId,
        position: Option<usize>,
    ) -> Result<EditOutcome, ChartError> {
        tree.section(section)?;
        let rank = match position {
            Some(rank) => rank,
            None => {
                tree.sections()
                    .iter()
                    .position(|id| *id == section)
                    .unwrap_or(0)
                    + 1
            }
        };
        transact(tree, |draft| {
            let copy = draft.duplicate(section, NodeId::CHART)?;
            draft.reorder(NodeId::CHART, copy, rank)?;
            Ok(EditOutcome::node(copy))
        })
    }

    /// Move the chart's base key to `tonic`, shifting every chord by the same
    /// upward offset. Section offsets are untouched.
    pub fn transpose_chart(&self, tree: &mut ChartTree, tonic: i32) -> Result<EditOutcome, ChartError> {
        let tonic = PitchClass::new(tonic)?;
        let current = self.catalog.key(&tree.key)?;
        let target = self
            .catalog
            .key_for_tonic(tonic, current.tonality)
            .ok_or_else(|| ChartError::not_found("key", format!("{} {}", tonic, current.tonality)))?;
        let offset = tonic.distance_above(current.tonic) as i32;
        let slug = target.slug.clone();

        transact(tree, |draft| {
            let chords: Vec<NodeId> = draft.chords().map(|(id, _)| id).collect();
            for id in chords {
                shift_chord(draft.chord_mut(id)?, offset);
            }
            draft.key = slug;
            Ok(EditOutcome::default())
        })
    }

    fn build_chord(&self, request: &ChordRequest<'_>) -> Result<Chord, ChartError> {
        let pitch = PitchClass::new(request.chord_pitch)?;
        self.catalog.chord_type(request.chord_type)?;
        let mut chord = Chord::new(pitch, request.chord_type);
        chord.beats = validate_beats(request.beats.unwrap_or(DEFAULT_CHORD_BEATS))?;
        if let Some(bass) = request.alternative_bass_pitch {
            chord.alternative_bass_pitch = PitchClass::new(bass)?;
            chord.has_alternative_bass = true;
        }
        chord.rest = request.rest;
        Ok(chord)
    }
}

/// Attributes of a chord to append
#[derive(Debug, Clone, Copy)]
pub struct ChordRequest<'a> {
    pub chord_pitch: i32,
    pub chord_type: &'a str,
    pub beats: Option<u8>,
    pub alternative_bass_pitch: Option<i32>,
    pub rest: bool,
}

/// Attribute changes for an existing chord; `None` leaves a field unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChordChanges<'a> {
    pub chord_pitch: Option<i32>,
    pub chord_type: Option<&'a str>,
    pub beats: Option<u8>,
    pub has_alternative_bass: Option<bool>,
    pub alternative_bass_pitch: Option<i32>,
    pub rest: Option<bool>,
}

/// Run `edit` on a copy of `tree`; commit only if it succeeds and the invariants hold.
fn transact<F>(tree: &mut ChartTree, edit: F) -> Result<EditOutcome, ChartError>
where
    F: FnOnce(&mut ChartTree) -> Result<EditOutcome, ChartError>,
{
    let mut draft = tree.clone();
    let outcome = edit(&mut draft)?;
    draft.check_invariants()?;
    for warning in &outcome.warnings {
        log::warn!("chart {}: {}", draft.id, warning);
    }
    *tree = draft;
    Ok(outcome)
}

fn place(
    tree: &mut ChartTree,
    parent: NodeId,
    data: NodeData,
    position: Option<usize>,
) -> Result<NodeId, ChartError> {
    match position {
        Some(index) => tree.insert_child(parent, data, index),
        None => tree.append_child(parent, data),
    }
}

fn normalize_title(title: Option<String>) -> Option<String> {
    title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn shift_chord(chord: &mut Chord, semitones: i32) {
    chord.chord_pitch = chord.chord_pitch.transpose(semitones);
    chord.alternative_bass_pitch = chord.alternative_bass_pitch.transpose(semitones);
}

/// Soft checks of a measure's chords against its beat schema
pub fn measure_warnings(tree: &ChartTree, measure: NodeId) -> Vec<EditWarning> {
    let Ok(schema) = tree.measure(measure).map(|m| &m.beat_schema) else {
        return Vec::new();
    };
    let chords: Vec<&Chord> = tree
        .children_of(measure)
        .into_iter()
        .filter_map(|id| tree.chord(id).ok())
        .collect();

    let mut warnings = Vec::new();
    let beats: u32 = chords.iter().map(|chord| chord.beats as u32).sum();
    if beats > schema.total() {
        warnings.push(EditWarning::BeatsExceedSchema {
            measure,
            beats,
            schema_total: schema.total(),
        });
    }
    if chords.len() > schema.parts().len() {
        warnings.push(EditWarning::MoreChordsThanSlots {
            measure,
            chords: chords.len(),
            slots: schema.parts().len(),
        });
    }
    warnings
}
