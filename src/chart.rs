//! # Chart Tree
//!
//! The mutable hierarchical chart document.
//!
//! ## Type Hierarchy
//! ```text
//! ChartTree (id, song, key slug)
//!   └── Section (alt_title, key_distance_from_chart)     ordered by `number`
//!         └── Line                                       ordered by `number`
//!               └── Measure (beat_schema)  max 8/line    ordered by `number`
//!                     └── Chord (pitch, type, beats, alternative bass, rest)
//!                                                        ordered by `order`
//! ```
//!
//! ## Storage
//! Every node lives in one arena (`BTreeMap<NodeId, Node>`) owned by the tree.
//! A node refers to its parent by id only; nothing is shared and nothing points
//! back by reference. The chart itself is the implicit root [`NodeId::CHART`].
//! A second map indexes each parent's children by `(position, id)`, so ordered
//! traversal never scans the arena.
//!
//! Each node carries a `position`: the `number` of sections, lines and measures,
//! or the `order` of chords. Positions are unique among siblings and define their
//! order; gaps are allowed (deleting a node never renumbers its siblings).
//!
//! ## Invariants
//! - sibling positions are unique
//! - a line holds at most [`LINE_MAX_MEASURES`] measures
//! - every node's parent exists and sits exactly one level above it
//!
//! Pitches are [`PitchClass`]es, so they are in range by construction.
//!
//! ## Related Modules
//! - `editor` - Validated edit intents on top of these primitives
//! - `cleanup` - Removes empty lines left behind by interrupted edits
//! - `render` - Read-only traversal producing the render model

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::beat_schema::BeatSchema;
use crate::error::ChartError;
use crate::pitch::PitchClass;

/// Maximum number of measures on a single line
pub const LINE_MAX_MEASURES: usize = 8;

/// Default chord duration in beats
pub const DEFAULT_CHORD_BEATS: u8 = 4;

/// Beats per measure of a new section
pub const DEFAULT_TIME_SIGNATURE: u8 = 4;

/// Largest accepted section time signature, in beats per measure
pub const MAX_TIME_SIGNATURE: u8 = 12;

/// Stable identifier of a node within its chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The chart root; never stored in the arena
    pub const CHART: NodeId = NodeId(0);
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartId(pub u32);

impl fmt::Display for ChartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque song identity; only compared for equality
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(pub String);

/// Depth of a node in the chart hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Chart,
    Section,
    Line,
    Measure,
    Chord,
}

impl Level {
    pub fn name(self) -> &'static str {
        match self {
            Level::Chart => "chart",
            Level::Section => "section",
            Level::Line => "line",
            Level::Measure => "measure",
            Level::Chord => "chord",
        }
    }

    pub fn child(self) -> Option<Level> {
        match self {
            Level::Chart => Some(Level::Section),
            Level::Section => Some(Level::Line),
            Level::Line => Some(Level::Measure),
            Level::Measure => Some(Level::Chord),
            Level::Chord => None,
        }
    }

    pub fn parent(self) -> Option<Level> {
        match self {
            Level::Chart => None,
            Level::Section => Some(Level::Chart),
            Level::Line => Some(Level::Section),
            Level::Measure => Some(Level::Line),
            Level::Chord => Some(Level::Measure),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub alt_title: Option<String>,
    /// Signed semitone offset on top of the chart key, in (-11, 11]
    pub key_distance_from_chart: i32,
    /// Beats per measure, in [1, MAX_TIME_SIGNATURE]; new measures default to
    /// one chord slot of this length
    pub time_signature: u8,
}

impl Default for Section {
    fn default() -> Self {
        Self {
            alt_title: None,
            key_distance_from_chart: 0,
            time_signature: DEFAULT_TIME_SIGNATURE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Line;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measure {
    pub beat_schema: BeatSchema,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    pub chord_pitch: PitchClass,
    /// Symbol of a catalog chord type
    pub chord_type: String,
    pub beats: u8,
    pub has_alternative_bass: bool,
    /// Only meaningful when `has_alternative_bass` is set
    pub alternative_bass_pitch: PitchClass,
    pub rest: bool,
}

impl Chord {
    pub fn new(chord_pitch: PitchClass, chord_type: impl Into<String>) -> Self {
        Self {
            chord_pitch,
            chord_type: chord_type.into(),
            beats: DEFAULT_CHORD_BEATS,
            has_alternative_bass: false,
            alternative_bass_pitch: PitchClass::C,
            rest: false,
        }
    }

    pub fn alternative_bass(&self) -> Option<PitchClass> {
        self.has_alternative_bass.then_some(self.alternative_bass_pitch)
    }
}

/// Level-specific payload of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Section(Section),
    Line(Line),
    Measure(Measure),
    Chord(Chord),
}

impl NodeData {
    pub fn level(&self) -> Level {
        match self {
            NodeData::Section(_) => Level::Section,
            NodeData::Line(_) => Level::Line,
            NodeData::Measure(_) => Level::Measure,
            NodeData::Chord(_) => Level::Chord,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub parent: NodeId,
    /// `number` for sections/lines/measures, `order` for chords
    pub position: u32,
    pub data: NodeData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartTree {
    pub id: ChartId,
    pub song: SongId,
    /// Slug of the chart's base key
    pub key: String,
    nodes: BTreeMap<NodeId, Node>,
    children: BTreeMap<NodeId, BTreeSet<(u32, NodeId)>>,
    next_id: u32,
}

impl ChartTree {
    pub fn new(id: ChartId, song: SongId, key: impl Into<String>) -> Self {
        Self {
            id,
            song,
            key: key.into(),
            nodes: BTreeMap::new(),
            children: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn level_of(&self, id: NodeId) -> Option<Level> {
        if id == NodeId::CHART {
            Some(Level::Chart)
        } else {
            self.nodes.get(&id).map(|node| node.data.level())
        }
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, ChartError> {
        self.nodes.get(&id).ok_or_else(|| ChartError::not_found("node", id))
    }

    pub fn section(&self, id: NodeId) -> Result<&Section, ChartError> {
        match self.nodes.get(&id).map(|node| &node.data) {
            Some(NodeData::Section(section)) => Ok(section),
            _ => Err(ChartError::not_found("section", id)),
        }
    }

    pub(crate) fn section_mut(&mut self, id: NodeId) -> Result<&mut Section, ChartError> {
        match self.nodes.get_mut(&id).map(|node| &mut node.data) {
            Some(NodeData::Section(section)) => Ok(section),
            _ => Err(ChartError::not_found("section", id)),
        }
    }

    pub fn measure(&self, id: NodeId) -> Result<&Measure, ChartError> {
        match self.nodes.get(&id).map(|node| &node.data) {
            Some(NodeData::Measure(measure)) => Ok(measure),
            _ => Err(ChartError::not_found("measure", id)),
        }
    }

    pub(crate) fn measure_mut(&mut self, id: NodeId) -> Result<&mut Measure, ChartError> {
        match self.nodes.get_mut(&id).map(|node| &mut node.data) {
            Some(NodeData::Measure(measure)) => Ok(measure),
            _ => Err(ChartError::not_found("measure", id)),
        }
    }

    pub fn chord(&self, id: NodeId) -> Result<&Chord, ChartError> {
        match self.nodes.get(&id).map(|node| &node.data) {
            Some(NodeData::Chord(chord)) => Ok(chord),
            _ => Err(ChartError::not_found("chord", id)),
        }
    }

    pub(crate) fn chord_mut(&mut self, id: NodeId) -> Result<&mut Chord, ChartError> {
        match self.nodes.get_mut(&id).map(|node| &mut node.data) {
            Some(NodeData::Chord(chord)) => Ok(chord),
            _ => Err(ChartError::not_found("chord", id)),
        }
    }

    /// `number` (or `order`) of a node
    pub fn position(&self, id: NodeId) -> Option<u32> {
        self.nodes.get(&id).map(|node| node.position)
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).map(|node| node.parent)
    }

    /// Direct children in ascending position order. Empty for leaves and unknown ids.
    pub fn children_of(&self, parent: NodeId) -> Vec<NodeId> {
        self.children
            .get(&parent)
            .map(|set| set.iter().map(|(_, id)| *id).collect())
            .unwrap_or_default()
    }

    fn child_count(&self, parent: NodeId) -> usize {
        self.children.get(&parent).map_or(0, BTreeSet::len)
    }

    pub fn sections(&self) -> Vec<NodeId> {
        self.children_of(NodeId::CHART)
    }

    /// All nodes below `id` in depth-first pre-order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children_of(id).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children_of(next).into_iter().rev());
        }
        out
    }

    /// Append `data` as the last child of `parent`.
    ///
    /// The new child takes position `max(existing) + 1`, or 1 for the first child.
    ///
    /// # Errors
    /// - `NotFound` if `parent` does not exist
    /// - `InvalidHierarchy` if `data` does not belong one level below `parent`
    /// - `CapacityExceeded` if `parent` is a line already holding
    ///   [`LINE_MAX_MEASURES`] measures
    pub fn append_child(&mut self, parent: NodeId, data: NodeData) -> Result<NodeId, ChartError> {
        let child_level = data.level();
        let parent_level = match self.level_of(parent) {
            Some(level) => level,
            None => {
                let kind = child_level.parent().map_or("node", Level::name);
                return Err(ChartError::not_found(kind, parent));
            }
        };
        if parent_level.child() != Some(child_level) {
            return Err(ChartError::InvalidHierarchy {
                parent: parent_level.name(),
                child: child_level.name(),
            });
        }

        if child_level == Level::Measure && self.child_count(parent) >= LINE_MAX_MEASURES {
            return Err(ChartError::CapacityExceeded {
                line: parent.0,
                max: LINE_MAX_MEASURES,
            });
        }

        let position = self
            .children
            .get(&parent)
            .and_then(|set| set.iter().next_back())
            .map_or(1, |(max, _)| max + 1);

        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                parent,
                position,
                data,
            },
        );
        self.children.entry(parent).or_default().insert((position, id));
        Ok(id)
    }

    /// Append `data` under `parent` and move it to rank `index` (0-based).
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        data: NodeData,
        index: usize,
    ) -> Result<NodeId, ChartError> {
        let id = self.append_child(parent, data)?;
        self.reorder(parent, id, index)?;
        Ok(id)
    }

    /// Move `child` to rank `new_position` (0-based, clamped) among its siblings.
    ///
    /// Siblings are renumbered 1..=n in their new order, so positions stay unique
    /// and agree with rank.
    pub fn reorder(&mut self, parent: NodeId, child: NodeId, new_position: usize) -> Result<(), ChartError> {
        let mut siblings = self.children_of(parent);
        let current = siblings.iter().position(|id| *id == child).ok_or_else(|| {
            let kind = self.level_of(child).map_or("node", Level::name);
            ChartError::not_found(kind, child)
        })?;
        siblings.remove(current);
        siblings.insert(new_position.min(siblings.len()), child);

        let mut index = BTreeSet::new();
        for (rank, id) in siblings.iter().enumerate() {
            let position = rank as u32 + 1;
            if let Some(node) = self.nodes.get_mut(id) {
                node.position = position;
            }
            index.insert((position, *id));
        }
        self.children.insert(parent, index);
        Ok(())
    }

    /// Remove `id` and its whole subtree. Surviving siblings keep their positions.
    pub fn delete(&mut self, id: NodeId) -> Result<(), ChartError> {
        let (parent, position) = match self.nodes.get(&id) {
            Some(node) => (node.parent, node.position),
            None => return Err(ChartError::not_found("node", id)),
        };
        for descendant in self.descendants(id) {
            self.nodes.remove(&descendant);
            self.children.remove(&descendant);
        }
        self.nodes.remove(&id);
        self.children.remove(&id);
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.remove(&(position, id));
            if siblings.is_empty() {
                self.children.remove(&parent);
            }
        }
        Ok(())
    }

    /// Deep-copy the subtree rooted at `source` as the last child of `parent`.
    pub fn duplicate(&mut self, source: NodeId, parent: NodeId) -> Result<NodeId, ChartError> {
        let data = self.node(source)?.data.clone();
        let copy = self.append_child(parent, data)?;
        for child in self.children_of(source) {
            self.duplicate(child, copy)?;
        }
        Ok(copy)
    }

    /// Iterate every chord with its id
    pub fn chords(&self) -> impl Iterator<Item = (NodeId, &Chord)> {
        self.nodes.iter().filter_map(|(id, node)| match &node.data {
            NodeData::Chord(chord) => Some((*id, chord)),
            _ => None,
        })
    }

    /// Check the structural invariants.
    ///
    /// Returns `InternalConsistencyFault` naming the first violation.
    pub fn check_invariants(&self) -> Result<(), ChartError> {
        let mut seen: HashSet<(NodeId, u32)> = HashSet::new();
        for (id, node) in &self.nodes {
            let parent_level = self
                .level_of(node.parent)
                .ok_or_else(|| ChartError::internal(format!("node {} has no parent {}", id, node.parent)))?;
            if parent_level.child() != Some(node.data.level()) {
                return Err(ChartError::internal(format!(
                    "{} {} sits under a {}",
                    node.data.level().name(),
                    id,
                    parent_level.name()
                )));
            }
            if !seen.insert((node.parent, node.position)) {
                return Err(ChartError::internal(format!(
                    "duplicate position {} under node {}",
                    node.position, node.parent
                )));
            }
            let indexed = self
                .children
                .get(&node.parent)
                .is_some_and(|set| set.contains(&(node.position, *id)));
            if !indexed {
                return Err(ChartError::internal(format!(
                    "node {} missing from the child index of {}",
                    id, node.parent
                )));
            }
            if node.data.level() == Level::Line && self.child_count(*id) > LINE_MAX_MEASURES {
                return Err(ChartError::internal(format!(
                    "line {} holds more than {} measures",
                    id, LINE_MAX_MEASURES
                )));
            }
        }
        let indexed: usize = self.children.values().map(BTreeSet::len).sum();
        if indexed != self.nodes.len() {
            return Err(ChartError::internal(format!(
                "child index holds {} entries for {} nodes",
                indexed,
                self.nodes.len()
            )));
        }
        Ok(())
    }
}
