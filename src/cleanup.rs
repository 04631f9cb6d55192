//! # Cleanup Pass
//!
//! Repairs structure left dangling by interrupted edit sequences, e.g. a line
//! whose "create first measure" request never arrived.
//!
//! The pass removes every Line that has no Measures. It deliberately leaves
//! empty Measures and empty Sections alone: it repairs the known failure mode,
//! not every possible empty state. Running it twice is the same as running it once.
//!
//! Cleanup runs when a chart is opened for editing, never on read-only display;
//! charts with empty lines still render.

use crate::chart::ChartTree;
use crate::error::ChartError;

/// Delete all lines without measures.
pub fn cleanup(tree: &mut ChartTree) -> Result<(), ChartError> {
    for section in tree.sections() {
        for line in tree.children_of(section) {
            if tree.children_of(line).is_empty() {
                log::info!("chart {}: removing empty line {} of section {}", tree.id, line, section);
                tree.delete(line)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beat_schema::BeatSchema;
    use crate::chart::{ChartId, Line, Measure, NodeData, NodeId, Section, SongId};

    #[test]
    fn test_cleanup_removes_only_empty_lines() {
        let mut tree = ChartTree::new(ChartId(1), SongId("s".to_string()), "c-major");
        let section = tree.append_child(NodeId::CHART, NodeData::Section(Section::default())).unwrap();
        let empty_section = tree.append_child(NodeId::CHART, NodeData::Section(Section::default())).unwrap();
        let empty_line = tree.append_child(section, NodeData::Line(Line)).unwrap();
        let kept_line = tree.append_child(section, NodeData::Line(Line)).unwrap();
        // A measure without chords still keeps its line
        let measure = tree
            .append_child(
                kept_line,
                NodeData::Measure(Measure {
                    beat_schema: BeatSchema::default(),
                }),
            )
            .unwrap();

        cleanup(&mut tree).unwrap();

        assert_eq!(tree.children_of(section), vec![kept_line]);
        assert!(tree.node(empty_line).is_err());
        assert!(tree.node(measure).is_ok());
        assert_eq!(tree.sections(), vec![section, empty_section]);
    }

    #[test]
    fn test_cleanup_idempotent() {
        let mut tree = ChartTree::new(ChartId(1), SongId("s".to_string()), "c-major");
        let section = tree.append_child(NodeId::CHART, NodeData::Section(Section::default())).unwrap();
        tree.append_child(section, NodeData::Line(Line)).unwrap();
        tree.append_child(section, NodeData::Line(Line)).unwrap();

        cleanup(&mut tree).unwrap();
        let once = tree.clone();
        cleanup(&mut tree).unwrap();
        assert_eq!(tree, once);
        assert_eq!(tree.len(), 1);
    }
}
