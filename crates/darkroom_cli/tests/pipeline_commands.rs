use std::fs;
use std::path::PathBuf;

use darkroom_cli::{
    activate_pipeline, create_pipeline, deactivate_pipeline, delete_pipeline, export_pipeline,
    import_pipeline, list_pipelines, pipeline_history, pipeline_version, preview_pipeline,
    show_pipeline, store_stats, update_pipeline, validate_pipeline,
};
use darkroom_graph::PreviewInputs;
use darkroom_store::ListFilter;

fn temp_dir(label: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    std::env::temp_dir().join(format!("darkroom-cli-{}-{}", label, nanos))
}

fn write_definition(dir: &PathBuf, name: &str) -> PathBuf {
    fs::create_dir_all(dir).expect("create dir");
    let path = dir.join("pipeline.yaml");
    let yaml = format!(
        r#"name: {name}
description: studio default
nodes:
  - id: cam
    type: capture
    camera_id_pattern: "{{camera_id:AB3D}}"
    counter_pattern: "{{counter:0001}}"
  - id: raw
    type: file
    extension: .dng
  - id: done
    type: termination
    classification: CONSISTENT
edges:
  - from: cam
    to: raw
  - from: raw
    to: done
"#
    );
    fs::write(&path, yaml).expect("write definition");
    path
}

fn write_invalid_definition(dir: &PathBuf) -> PathBuf {
    fs::create_dir_all(dir).expect("create dir");
    let path = dir.join("invalid.yaml");
    // no termination node and an unknown classification-free graph
    let yaml = r#"name: Draft
nodes:
  - id: cam
    type: capture
    camera_id_pattern: "{camera_id}"
    counter_pattern: "{counter}"
edges: []
"#;
    fs::write(&path, yaml).expect("write definition");
    path
}

#[test]
fn create_show_and_list_roundtrip() {
    let dir = temp_dir("create");
    let store = dir.join("pipelines.json");
    let definition = write_definition(&dir, "Studio Default");

    let created = create_pipeline(&store, &definition, Some("first cut".to_string()), None)
        .expect("create");
    assert_eq!(created.version, 1);
    assert!(created.is_valid);

    let shown = show_pipeline(&store, created.id).expect("show");
    assert_eq!(shown.name, "Studio Default");

    let all = list_pipelines(&store, ListFilter::default()).expect("list");
    assert_eq!(all.len(), 1);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn invalid_definition_is_stored_and_reported() {
    let dir = temp_dir("invalid");
    let store = dir.join("pipelines.json");
    let definition = write_invalid_definition(&dir);

    let created = create_pipeline(&store, &definition, None, None).expect("create");
    assert!(!created.is_valid);

    let report = validate_pipeline(&store, created.id).expect("validate");
    assert!(!report.is_valid);
    assert!(!report.errors.is_empty());

    let err = activate_pipeline(&store, created.id).expect_err("activation must fail");
    assert!(err.contains("invalid"), "unexpected message: {}", err);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn update_bumps_the_version_and_keeps_history() {
    let dir = temp_dir("update");
    let store = dir.join("pipelines.json");
    let definition = write_definition(&dir, "Evolving");

    let id = create_pipeline(&store, &definition, None, None).expect("create").id;
    let updated = update_pipeline(
        &store,
        id,
        None,
        None,
        Some("tethered studio capture".to_string()),
        Some("described".to_string()),
        Some("reviewer".to_string()),
        Some(1),
    )
    .expect("update");
    assert_eq!(updated.version, 2);

    let history = pipeline_history(&store, id).expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].version, 2);
    assert_eq!(history[0].changed_by.as_deref(), Some("reviewer"));

    let v1 = pipeline_version(&store, id, 1).expect("v1");
    assert_eq!(v1.description.as_deref(), Some("studio default"));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn stale_expected_version_is_reported() {
    let dir = temp_dir("stale");
    let store = dir.join("pipelines.json");
    let definition = write_definition(&dir, "Raced");

    let id = create_pipeline(&store, &definition, None, None).expect("create").id;
    update_pipeline(&store, id, None, None, None, None, None, None).expect("first update");

    let err = update_pipeline(&store, id, None, None, None, None, None, Some(1))
        .expect_err("stale update must fail");
    assert!(err.contains("version"), "unexpected message: {}", err);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn activation_is_exclusive_and_blocks_delete() {
    let dir = temp_dir("activate");
    let store = dir.join("pipelines.json");

    let first = create_pipeline(&store, &write_definition(&dir, "First"), None, None)
        .expect("create first")
        .id;
    let second_def = {
        let path = dir.join("second.yaml");
        let yaml = fs::read_to_string(write_definition(&dir, "Second")).expect("read");
        fs::write(&path, yaml).expect("write");
        path
    };
    let second = create_pipeline(&store, &second_def, None, None)
        .expect("create second")
        .id;

    activate_pipeline(&store, first).expect("activate first");
    activate_pipeline(&store, second).expect("activate second");

    assert!(!show_pipeline(&store, first).expect("show").is_active);
    assert!(show_pipeline(&store, second).expect("show").is_active);

    let err = delete_pipeline(&store, second).expect_err("delete active must fail");
    assert!(err.contains("active"), "unexpected message: {}", err);

    deactivate_pipeline(&store, second).expect("deactivate");
    delete_pipeline(&store, second).expect("delete");

    let stats = store_stats(&store).expect("stats");
    assert_eq!(stats.total_pipelines, 1);
    assert_eq!(stats.active_pipeline_id, None);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn preview_uses_supplied_inputs() {
    let dir = temp_dir("preview");
    let store = dir.join("pipelines.json");
    let definition = write_definition(&dir, "Previewed");

    let id = create_pipeline(&store, &definition, None, None).expect("create").id;
    let preview = preview_pipeline(
        &store,
        id,
        &PreviewInputs {
            camera_id: Some("ZZ9X".to_string()),
            counter: Some("0042".to_string()),
        },
    )
    .expect("preview");

    assert_eq!(preview.base_filename, "ZZ9X0042");
    assert_eq!(preview.expected_files.len(), 1);
    assert_eq!(preview.expected_files[0].filename, "ZZ9X0042.dng");
    assert_eq!(preview.terminations.len(), 1);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn preview_falls_back_to_pattern_defaults() {
    let dir = temp_dir("defaults");
    let store = dir.join("pipelines.json");
    let definition = write_definition(&dir, "Defaulted");

    let id = create_pipeline(&store, &definition, None, None).expect("create").id;
    let preview = preview_pipeline(&store, id, &PreviewInputs::default()).expect("preview");
    assert_eq!(preview.base_filename, "AB3D0001");

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn export_and_import_clone_a_definition() {
    let dir = temp_dir("export");
    let store = dir.join("pipelines.json");
    let definition = write_definition(&dir, "Shareable");

    let id = create_pipeline(&store, &definition, None, None).expect("create").id;
    let yaml = export_pipeline(&store, id, None).expect("export");
    let copy_path = dir.join("copy.yaml");
    fs::write(&copy_path, yaml.replace("Shareable", "Shareable Copy")).expect("write copy");

    let copy = import_pipeline(&store, &copy_path, Some("ops".to_string())).expect("import");
    assert_eq!(copy.name, "Shareable Copy");
    assert_eq!(copy.version, 1);
    assert_eq!(copy.nodes, show_pipeline(&store, id).expect("show").nodes);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_pipeline_is_a_not_found_error() {
    let dir = temp_dir("missing");
    let store = dir.join("pipelines.json");

    let err = show_pipeline(&store, 99).expect_err("should fail");
    assert!(err.contains("not found"), "unexpected message: {}", err);
}
