//! Integration tests for the chord chart core
//!
//! Tests the full pipeline from chart document through edits to the render model.

use chordchart::{
    cleanup, render, render_chart, render_chart_in, Catalog, ChartDocument, ChartError, ChartId, ChartService,
    ChartStore, EditIntent, Editor, MemoryStore, PitchClass, ReadRequest, LINE_MAX_MEASURES,
};
use pretty_assertions::assert_eq;

const ALL_THE_THINGS: &str = r#"
id: 42
song: all-the-things-you-are
key: ab-major
sections:
  - lines:
      - measures:
          - chords:
              - { chord_pitch: 5, chord_type: m7 }
          - chords:
              - { chord_pitch: 10, chord_type: m7 }
          - chords:
              - { chord_pitch: 3, chord_type: "7" }
          - chords:
              - { chord_pitch: 8, chord_type: maj7 }
  - alt_title: Bridge
    key_distance_from_chart: 11
    lines:
      - measures:
          - beat_schema: 2-2
            chords:
              - { chord_pitch: 9, chord_type: m7, beats: 2 }
              - { chord_pitch: 2, chord_type: "7", beats: 2 }
          - chords:
              - { chord_pitch: 7, chord_type: maj7 }
"#;

fn symbols(model: &chordchart::RenderModel) -> Vec<Vec<String>> {
    model
        .sections
        .iter()
        .map(|section| {
            section
                .lines
                .iter()
                .flat_map(|line| line.measures.iter())
                .flat_map(|measure| measure.chords.iter())
                .map(|chord| chord.symbol.clone())
                .collect()
        })
        .collect()
}

#[test]
fn test_render_document_in_own_key() {
    let model = render_chart(ALL_THE_THINGS).unwrap();
    assert_eq!(model.key.slug, "ab-major");
    assert_eq!(model.transposition, 0);
    assert_eq!(
        symbols(&model),
        vec![
            vec!["Fm7", "Bbm7", "Eb7", "Abmaj7"],
            vec!["Am7", "D7", "Gmaj7"],
        ]
    );
    assert_eq!(model.sections[0].name, "A Section");
    assert_eq!(model.sections[1].name, "Bridge");
    assert_eq!(model.sections[1].key.slug, "g-major");
}

#[test]
fn test_render_document_transposed() {
    let model = render_chart_in(ALL_THE_THINGS, "C").unwrap();
    assert_eq!(model.transposition, 4);
    assert_eq!(model.key.slug, "c-major");
    assert_eq!(
        symbols(&model),
        vec![
            vec!["Am7", "Dm7", "G7", "Cmaj7"],
            vec!["C#m7", "F#7", "Bmaj7"],
        ]
    );
}

#[test]
fn test_unknown_target_tone() {
    assert!(matches!(
        render_chart_in(ALL_THE_THINGS, "H"),
        Err(ChartError::NotFound { kind: "key", .. })
    ));
}

#[test]
fn test_transposition_round_trip_through_every_key() {
    let catalog = Catalog::standard();
    let tree = ChartDocument::from_yaml(ALL_THE_THINGS).unwrap().into_tree(catalog).unwrap();
    let original = render(&tree, catalog, None, false).unwrap();

    let editor = Editor::new(catalog);
    for tonic in 0..12 {
        let mut moved = tree.clone();
        editor.transpose_chart(&mut moved, tonic).unwrap();
        editor.transpose_chart(&mut moved, 8).unwrap();
        assert_eq!(moved, tree);
        assert_eq!(symbols(&render(&moved, catalog, None, false).unwrap()), symbols(&original));
    }
}

#[test]
fn test_render_is_deterministic_for_every_target() {
    let catalog = Catalog::standard();
    let tree = ChartDocument::from_yaml(ALL_THE_THINGS).unwrap().into_tree(catalog).unwrap();
    for tonic in 0..12 {
        let target = Some(PitchClass::new(tonic).unwrap());
        assert_eq!(
            render(&tree, catalog, target, false).unwrap(),
            render(&tree, catalog, target, false).unwrap()
        );
    }
}

#[test]
fn test_capacity_keeps_eight_measures() {
    let catalog = Catalog::standard();
    let mut tree = ChartDocument::from_yaml(ALL_THE_THINGS).unwrap().into_tree(catalog).unwrap();
    let section = tree.sections()[0];
    let line = tree.children_of(section)[0];
    let editor = Editor::new(catalog);

    for _ in tree.children_of(line).len()..LINE_MAX_MEASURES {
        editor
            .apply(
                &mut tree,
                &EditIntent::AppendMeasure {
                    line,
                    beat_schema: None,
                    position: None,
                },
            )
            .unwrap();
    }
    let err = editor
        .apply(
            &mut tree,
            &EditIntent::AppendMeasure {
                line,
                beat_schema: None,
                position: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, ChartError::CapacityExceeded { max: 8, .. }));
    assert_eq!(tree.children_of(line).len(), LINE_MAX_MEASURES);
}

#[test]
fn test_sibling_positions_stay_unique() {
    let catalog = Catalog::standard();
    let mut tree = ChartDocument::from_yaml(ALL_THE_THINGS).unwrap().into_tree(catalog).unwrap();
    let line = tree.children_of(tree.sections()[0])[0];
    let editor = Editor::new(catalog);
    let measures = tree.children_of(line);

    editor.reorder(&mut tree, measures[3], 0).unwrap();
    editor.delete(&mut tree, measures[1]).unwrap();
    let inserted = editor
        .append_measure(&mut tree, line, Some("1-1-1-1"), Some(1))
        .unwrap()
        .node
        .unwrap();
    editor.reorder(&mut tree, measures[0], 10).unwrap();
    let appended = editor.append_measure(&mut tree, line, None, None).unwrap().node.unwrap();

    assert_eq!(
        tree.children_of(line),
        vec![measures[3], inserted, measures[2], measures[0], appended]
    );
    let positions: Vec<u32> = tree
        .children_of(line)
        .iter()
        .map(|id| tree.position(*id).unwrap())
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    tree.check_invariants().unwrap();
}

#[test]
fn test_cleanup_then_render() {
    let source = r#"
id: 5
song: s
key: c-major
sections:
  - lines:
      - measures: []
      - measures:
          - chords: []
"#;
    let catalog = Catalog::standard();
    let mut tree = ChartDocument::from_yaml(source).unwrap().into_tree(catalog).unwrap();
    assert_eq!(render(&tree, catalog, None, false).unwrap().sections[0].lines.len(), 2);

    cleanup(&mut tree).unwrap();
    let once = tree.clone();
    cleanup(&mut tree).unwrap();
    assert_eq!(tree, once);

    let model = render(&tree, catalog, None, true).unwrap();
    assert_eq!(model.sections[0].lines.len(), 1);
    assert!(model.sections[0].lines[0].measures[0].chords.is_empty());
    assert!(!model.sections[0].lines[0].measures[0].removable);
}

#[test]
fn test_service_json_intents() {
    let mut service = ChartService::new(MemoryStore::new(), Catalog::standard());
    let chart_id = service
        .import(&ChartDocument::from_yaml(ALL_THE_THINGS).unwrap())
        .unwrap();
    assert_eq!(chart_id, ChartId(42));

    let intents = [
        r#"{"operation": "copy_section", "section": 1}"#,
        r#"{"operation": "set_alt_title", "section": 1, "alt_title": "Head"}"#,
        r#"{"operation": "transpose_chart", "tonic": 3}"#,
    ];
    for source in intents {
        let intent: EditIntent = serde_json::from_str(source).unwrap();
        service.edit(chart_id, &intent).unwrap();
    }

    let model = service
        .read(&ReadRequest {
            chart_id,
            target_tonic: None,
            edit_mode: false,
        })
        .unwrap();
    let names: Vec<&str> = model.sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Head", "A Section", "Bridge"]);
    assert_eq!(model.key.slug, "eb-major");
    assert_eq!(symbols(&model)[0], vec!["Cm7", "Fm7", "Bb7", "Ebmaj7"]);
    assert_eq!(symbols(&model)[1], symbols(&model)[0]);

    let exported = service.export(chart_id).unwrap();
    assert_eq!(exported.sections.len(), 3);
    assert_eq!(service.store().load(chart_id).unwrap().key, "eb-major");
}

#[test]
fn test_render_model_json_shape() {
    let model = render_chart(ALL_THE_THINGS).unwrap();
    let json: serde_json::Value = serde_json::to_value(&model).unwrap();
    assert_eq!(json["chartId"], 42);
    assert_eq!(json["grid"]["chartWidth"], 783);
    assert_eq!(json["sections"][1]["lines"][0]["measures"][0]["beatSchema"], "2-2");
    assert_eq!(
        json["sections"][0]["lines"][0]["measures"][0]["chords"][0]["displayPitch"],
        5
    );
    assert_eq!(json["key"]["tonality"], "major");
}

#[test]
fn test_target_tone_with_runaway_accidentals() {
    let tone = format!("C{}", "#".repeat(300));
    assert!(matches!(
        render_chart_in(ALL_THE_THINGS, &tone),
        Err(ChartError::NotFound { kind: "key", .. })
    ));
    assert!(matches!(
        render_chart_in(ALL_THE_THINGS, "Ebb"),
        Err(ChartError::NotFound { kind: "key", .. })
    ));
}

#[test]
fn test_signed_beat_schema_rejected_in_document() {
    let source = r#"
id: 8
song: s
key: c-major
sections:
  - lines:
      - measures:
          - beat_schema: "+2-+2"
"#;
    assert!(matches!(
        render_chart(source),
        Err(ChartError::InvalidBeatSchema { .. })
    ));
}

#[test]
fn test_waltz_section_through_service() {
    let mut service = ChartService::new(MemoryStore::new(), Catalog::standard());
    let chart_id = service
        .import(&ChartDocument::from_yaml(ALL_THE_THINGS).unwrap())
        .unwrap();

    let intent: EditIntent =
        serde_json::from_str(r#"{"operation": "append_section", "alt_title": "Waltz", "time_signature": 3}"#).unwrap();
    let section = service.edit(chart_id, &intent).unwrap().node.unwrap();
    let line = service
        .edit(chart_id, &EditIntent::AppendLine { section, position: None })
        .unwrap()
        .node
        .unwrap();
    service
        .edit(
            chart_id,
            &EditIntent::AppendMeasure {
                line,
                beat_schema: None,
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
    let waltz = &model.sections[2];
    assert_eq!(waltz.name, "Waltz");
    assert_eq!(waltz.time_signature, 3);
    assert_eq!(waltz.lines[0].measures[0].beat_schema, "3");
    assert_eq!(model.sections[0].time_signature, 4);

    let exported = service.export(chart_id).unwrap();
    assert_eq!(exported.sections[2].time_signature, 3);
    assert_eq!(exported.sections[2].lines[0].measures[0].beat_schema, None);
}

#[test]
fn test_bass_flag_alone_rejected_through_service() {
    let mut service = ChartService::new(MemoryStore::new(), Catalog::standard());
    let chart_id = service
        .import(&ChartDocument::from_yaml(ALL_THE_THINGS).unwrap())
        .unwrap();
    let before = service.export(chart_id).unwrap();
    let chord = service.store().load(chart_id).unwrap().chords().next().unwrap().0;

    let intent = EditIntent::SetChord {
        chord,
        chord_pitch: None,
        chord_type: None,
        beats: None,
        has_alternative_bass: Some(true),
        alternative_bass_pitch: None,
        rest: None,
    };
    assert!(matches!(
        service.edit(chart_id, &intent),
        Err(ChartError::MissingBassPitch { .. })
    ));
    assert_eq!(service.export(chart_id).unwrap(), before);
}

#[test]
fn test_missing_chart_file() {
    let path = std::env::temp_dir().join("chordchart-missing-chart.yaml");
    assert!(matches!(ChartDocument::from_path(&path), Err(ChartError::Io(_))));
}
