//! # Chart Service
//!
//! The boundary callers talk to: edit intents in, render models out, with a
//! persistence collaborator behind the [`ChartStore`] trait.
//!
//! Loads and saves are whole-tree and atomic from the service's point of view.
//! A failed edit saves nothing. Edits take `&mut self` and reads take `&self`,
//! so a single service value can never interleave a read with a mutation of the
//! same chart; callers sharing a service across threads wrap it in a lock.
//!
//! ## Entry Points
//! - [`ChartService::edit()`] - load, apply one [`EditIntent`], save
//! - [`ChartService::read()`] - render for display, never mutates
//! - [`ChartService::open_for_edit()`] - clean up, save, render in edit mode
//! - [`ChartService::delete_chart()`]

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::catalog::Catalog;
use crate::chart::{ChartId, ChartTree};
use crate::cleanup::cleanup;
use crate::document::ChartDocument;
use crate::editor::{EditIntent, EditOutcome, Editor};
use crate::error::ChartError;
use crate::pitch::PitchClass;
use crate::render::{render, RenderModel};

/// Persistence collaborator holding whole chart trees
pub trait ChartStore {
    fn load(&self, chart_id: ChartId) -> Result<ChartTree, ChartError>;
    fn save(&mut self, tree: ChartTree) -> Result<(), ChartError>;
    fn delete(&mut self, chart_id: ChartId) -> Result<(), ChartError>;
}

/// In-process store keyed by chart id
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    charts: BTreeMap<ChartId, ChartTree>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }
}

impl ChartStore for MemoryStore {
    fn load(&self, chart_id: ChartId) -> Result<ChartTree, ChartError> {
        self.charts
            .get(&chart_id)
            .cloned()
            .ok_or_else(|| ChartError::not_found("chart", chart_id))
    }

    fn save(&mut self, tree: ChartTree) -> Result<(), ChartError> {
        self.charts.insert(tree.id, tree);
        Ok(())
    }

    fn delete(&mut self, chart_id: ChartId) -> Result<(), ChartError> {
        self.charts
            .remove(&chart_id)
            .map(|_| ())
            .ok_or_else(|| ChartError::not_found("chart", chart_id))
    }
}

/// A display request for one chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ReadRequest {
    pub chart_id: ChartId,
    #[serde(default)]
    pub target_tonic: Option<PitchClass>,
    #[serde(default)]
    pub edit_mode: bool,
}

pub struct ChartService<'c, S> {
    store: S,
    catalog: &'c Catalog,
}

impl<'c, S: ChartStore> ChartService<'c, S> {
    pub fn new(store: S, catalog: &'c Catalog) -> Self {
        Self { store, catalog }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        self.catalog
    }

    /// Validate a chart document and store it, replacing any chart with the same id.
    pub fn import(&mut self, document: &ChartDocument) -> Result<ChartId, ChartError> {
        let tree = document.into_tree(self.catalog)?;
        let chart_id = tree.id;
        self.store.save(tree)?;
        log::info!("imported chart {}", chart_id);
        Ok(chart_id)
    }

    pub fn export(&self, chart_id: ChartId) -> Result<ChartDocument, ChartError> {
        ChartDocument::from_tree(&self.store.load(chart_id)?)
    }

    pub fn edit(&mut self, chart_id: ChartId, intent: &EditIntent) -> Result<EditOutcome, ChartError> {
        let mut tree = self.store.load(chart_id)?;
        let outcome = Editor::new(self.catalog).apply(&mut tree, intent)?;
        self.store.save(tree)?;
        Ok(outcome)
    }

    pub fn read(&self, request: &ReadRequest) -> Result<RenderModel, ChartError> {
        let tree = self.store.load(request.chart_id)?;
        render(&tree, self.catalog, request.target_tonic, request.edit_mode)
    }

    /// Enter the edit context: run the cleanup pass, persist the result and
    /// render with edit affordances.
    pub fn open_for_edit(
        &mut self,
        chart_id: ChartId,
        target_tonic: Option<PitchClass>,
    ) -> Result<RenderModel, ChartError> {
        let mut tree = self.store.load(chart_id)?;
        let before = tree.len();
        cleanup(&mut tree)?;
        if tree.len() != before {
            self.store.save(tree.clone())?;
        }
        render(&tree, self.catalog, target_tonic, true)
    }

    pub fn delete_chart(&mut self, chart_id: ChartId) -> Result<(), ChartError> {
        self.store.delete(chart_id)?;
        log::info!("deleted chart {}", chart_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{NodeId, SongId};

    fn service_with_chart() -> (ChartService<'static, MemoryStore>, ChartId) {
        let mut service = ChartService::new(MemoryStore::new(), Catalog::standard());
        let document = ChartDocument {
            id: ChartId(10),
            song: SongId("autumn-leaves".to_string()),
            key: "g-minor".to_string(),
            sections: Vec::new(),
        };
        let chart_id = service.import(&document).unwrap();
        (service, chart_id)
    }

    #[test]
    fn test_edit_then_read() {
        let (mut service, chart_id) = service_with_chart();
        let section = service
            .edit(
                chart_id,
                &EditIntent::AppendSection {
                    alt_title: None,
                    key_distance_from_chart: 0,
                    time_signature: None,
                    position: None,
                },
            )
            .unwrap()
            .node
            .unwrap();
        let line = service
            .edit(chart_id, &EditIntent::AppendLine { section, position: None })
            .unwrap()
            .node
            .unwrap();
        let measure = service
            .edit(
                chart_id,
                &EditIntent::AppendMeasure {
                    line,
                    beat_schema: None,
                    position: None,
                },
            )
            .unwrap()
            .node
            .unwrap();
        service
            .edit(
                chart_id,
                &EditIntent::AppendChord {
                    measure,
                    chord_pitch: 0,
                    chord_type: "m7".to_string(),
                    beats: None,
                    alternative_bass_pitch: None,
                    rest: false,
                    position: None,
                },
            )
            .unwrap();

        let model = service
            .read(&ReadRequest {
                chart_id,
                target_tonic: None,
                edit_mode: false,
            })
            .unwrap();
        assert_eq!(model.key.slug, "g-minor");
        assert_eq!(model.sections[0].lines[0].measures[0].chords[0].symbol, "Cm7");
    }

    #[test]
    fn test_failed_edit_saves_nothing() {
        let (mut service, chart_id) = service_with_chart();
        let before = service.store().load(chart_id).unwrap();
        let err = service
            .edit(chart_id, &EditIntent::AppendLine { section: NodeId(99), position: None })
            .unwrap_err();
        assert!(matches!(err, ChartError::NotFound { kind: "section", .. }));
        assert_eq!(service.store().load(chart_id).unwrap(), before);
    }

    #[test]
    fn test_unknown_chart() {
        let (service, _) = service_with_chart();
        let err = service
            .read(&ReadRequest {
                chart_id: ChartId(404),
                target_tonic: None,
                edit_mode: false,
            })
            .unwrap_err();
        assert!(matches!(err, ChartError::NotFound { kind: "chart", .. }));
    }

    #[test]
    fn test_open_for_edit_cleans_up_read_does_not() {
        let (mut service, chart_id) = service_with_chart();
        let section = service
            .edit(
                chart_id,
                &EditIntent::AppendSection {
                    alt_title: Some("Intro".to_string()),
                    key_distance_from_chart: 0,
                    time_signature: None,
                    position: None,
                },
            )
            .unwrap()
            .node
            .unwrap();
        service
            .edit(chart_id, &EditIntent::AppendLine { section, position: None })
            .unwrap();

        let read = service
            .read(&ReadRequest {
                chart_id,
                target_tonic: None,
                edit_mode: false,
            })
            .unwrap();
        assert_eq!(read.sections[0].lines.len(), 1);

        let opened = service.open_for_edit(chart_id, None).unwrap();
        assert!(opened.edit_mode);
        assert!(opened.sections[0].lines.is_empty());
        assert!(service.store().load(chart_id).unwrap().children_of(section).is_empty());
    }

    #[test]
    fn test_read_request_from_json() {
        let request: ReadRequest = serde_json::from_str(r#"{"chart_id": 3, "target_tonic": 7}"#).unwrap();
        assert_eq!(request.chart_id, ChartId(3));
        assert_eq!(request.target_tonic, PitchClass::new(7).ok());
        assert!(!request.edit_mode);
        assert!(serde_json::from_str::<ReadRequest>(r#"{"chart_id": 3, "target_tonic": 12}"#).is_err());
    }

    #[test]
    fn test_delete_chart() {
        let (mut service, chart_id) = service_with_chart();
        service.delete_chart(chart_id).unwrap();
        assert!(service.store().is_empty());
        assert!(matches!(
            service.delete_chart(chart_id),
            Err(ChartError::NotFound { kind: "chart", .. })
        ));
    }
}
