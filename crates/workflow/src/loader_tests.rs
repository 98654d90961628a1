// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn write_workflow(dir: &Path, file: &str, name: &str, description: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join(file),
        format!("name: {name}\ndescription: {description}\n"),
    )
    .unwrap();
}

#[test]
fn loads_from_single_tier() {
    let tmp = tempfile::tempdir().unwrap();
    write_workflow(tmp.path(), "a.yaml", "alpha", "first");
    let loader = DefinitionLoader::new(
        LoaderDirs { bundled: Some(tmp.path().to_path_buf()), ..Default::default() },
        LoaderDirs::default(),
    );
    let workflows = loader.workflows();
    assert_eq!(workflows.len(), 1);
    assert_eq!(workflows.get("alpha").unwrap().description, "first");
}

#[test]
fn project_tier_shadows_bundled() {
    let bundled = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    write_workflow(bundled.path(), "a.yaml", "alpha", "bundled-copy");
    write_workflow(project.path(), "a.yaml", "alpha", "project-copy");
    let loader = DefinitionLoader::new(
        LoaderDirs {
            bundled: Some(bundled.path().to_path_buf()),
            user: None,
            project: Some(project.path().to_path_buf()),
        },
        LoaderDirs::default(),
    );
    assert_eq!(loader.get_workflow("alpha").unwrap().description, "project-copy");
}

#[test]
fn invalid_files_are_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    write_workflow(tmp.path(), "good.yaml", "good", "ok");
    std::fs::write(tmp.path().join("bad.yaml"), ": not yaml :\n  - [").unwrap();
    let loader = DefinitionLoader::new(
        LoaderDirs { bundled: Some(tmp.path().to_path_buf()), ..Default::default() },
        LoaderDirs::default(),
    );
    assert_eq!(loader.workflows().len(), 1);
}

#[test]
fn cache_survives_file_deletion_until_invalidated() {
    let tmp = tempfile::tempdir().unwrap();
    write_workflow(tmp.path(), "a.yaml", "alpha", "v1");
    let loader = DefinitionLoader::new(
        LoaderDirs { bundled: Some(tmp.path().to_path_buf()), ..Default::default() },
        LoaderDirs::default(),
    );
    assert!(loader.get_workflow("alpha").is_some());
    std::fs::remove_file(tmp.path().join("a.yaml")).unwrap();
    // Cached copy still served.
    assert!(loader.get_workflow("alpha").is_some());
    loader.invalidate();
    assert!(loader.get_workflow("alpha").is_none());
}

#[test]
fn missing_dirs_yield_empty_maps() {
    let loader = DefinitionLoader::new(LoaderDirs::default(), LoaderDirs::default());
    assert!(loader.workflows().is_empty());
    assert!(loader.pipelines().is_empty());
}

#[test]
fn loads_pipelines_separately() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path()).unwrap();
    std::fs::write(
        tmp.path().join("p.yaml"),
        "name: pipe\nsteps:\n  - id: s\n    exec: \"true\"\n",
    )
    .unwrap();
    let loader = DefinitionLoader::new(
        LoaderDirs::default(),
        LoaderDirs { bundled: Some(tmp.path().to_path_buf()), ..Default::default() },
    );
    assert!(loader.get_pipeline("pipe").is_some());
    assert!(loader.workflows().is_empty());
}
