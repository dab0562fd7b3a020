//! Integration tests for bazel-gopath-project.
//!
//! These tests project a fixture build graph into a scratch GOPATH and
//! inspect the resulting symlink tree.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bazel_gopath_project::{
    BuildGraph, Layout, ProjectionReport, SkipReason, decode_graph,
    project_graph,
};
use bazel_gopath_schemas::wire::{
    AttributeType, QueryResult, TargetType, WireAttribute, WireRule,
    WireTarget,
};
use camino::Utf8PathBuf;
use prost::Message;

fn fixture_graph() -> BuildGraph {
    let json = fs::read_to_string("tests/fixtures/graph.json")
        .expect("fixture should be readable");
    serde_json::from_str(&json).expect("fixture should be a valid graph")
}

struct Scratch {
    _dir: tempfile::TempDir,
    layout: Layout,
}

fn scratch() -> Scratch {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let workspace = Utf8PathBuf::from_path_buf(dir.path().join("myws"))
        .expect("temp dir should be UTF-8");
    fs::create_dir(&workspace).unwrap();
    let layout = Layout::new(workspace, None);
    Scratch { _dir: dir, layout }
}

/// Collects every symlink under `root` as (relative path → link target).
fn symlinks(root: &Path) -> BTreeMap<String, PathBuf> {
    fn walk(dir: &Path, root: &Path, out: &mut BTreeMap<String, PathBuf>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            let meta = fs::symlink_metadata(&path).unwrap();
            if meta.file_type().is_symlink() {
                let rel = path.strip_prefix(root).unwrap();
                out.insert(
                    rel.to_string_lossy().into_owned(),
                    fs::read_link(&path).unwrap(),
                );
            } else if meta.is_dir() {
                walk(&path, root, out);
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

fn run_fixture(layout: &Layout) -> ProjectionReport {
    project_graph(&fixture_graph(), layout).expect("projection should succeed")
}

#[test]
fn test_fixture_projection() {
    let scratch = scratch();
    let report = run_fixture(&scratch.layout);

    let ws = scratch.layout.workspace().as_std_path();
    let genfiles = ws.join("bazel-genfiles");
    let expected: BTreeMap<String, PathBuf> = [
        // Resolved through the `//:go_prefix` rule input.
        ("github.com/example/repo/server.go", ws.join("server/server.go")),
        ("github.com/example/repo/asm_amd64.s", ws.join("server/asm_amd64.s")),
        // Non-default target name: package and name appended.
        (
            "github.com/example/repo/server/server/extras/extras.go",
            ws.join("server/extras.go"),
        ),
        // Resolved through the `go_prefix` attribute.
        (
            "github.com/example/repo/cmd/tool/tool/main.go",
            ws.join("cmd/tool/main.go"),
        ),
        (
            "github.com/example/repo/cmd/tool/tool/version.go",
            genfiles.join("cmd/tool/version.go"),
        ),
        // proto_compile output used as a go_library source.
        (
            "github.com/example/repo/api/api.pb.go",
            genfiles.join("api/api.pb.go"),
        ),
        // go_proto_library backed by a proto_library.
        (
            "github.com/example/repo/rpc/rpc.pb.go",
            genfiles.join("rpc/rpc.pb.go"),
        ),
        // External repository.
        (
            "github.com/dep/dep.go",
            ws.join("bazel-myws/external/com_github_dep/dep.go"),
        ),
    ]
    .into_iter()
    .map(|(dest, src)| (dest.to_string(), src))
    .collect();

    let src_root = scratch.layout.src_root();
    assert_eq!(symlinks(src_root.as_std_path()), expected);

    assert_eq!(report.projected, 6);
    assert_eq!(report.links_created, 8);
    assert_eq!(report.links_existing, 0);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].label, "//orphan:go_default_library");
    assert_eq!(report.skipped[0].reason, SkipReason::NoImportPath);
}

/// The skipped target leaves nothing behind.
#[test]
fn test_unresolvable_target_creates_nothing() {
    let scratch = scratch();
    run_fixture(&scratch.layout);

    let links = symlinks(scratch.layout.src_root().as_std_path());
    assert!(
        !links.keys().any(|dest| dest.contains("orphan")),
        "orphan should not be projected, found: {links:?}"
    );
    assert!(!links.values().any(|src| src.ends_with("orphan/orphan.go")));
}

/// A second run over the same tree changes nothing and reports every link
/// as already present.
#[test]
fn test_projection_is_idempotent() {
    let scratch = scratch();
    let first = run_fixture(&scratch.layout);
    let before = symlinks(scratch.layout.src_root().as_std_path());

    let second = run_fixture(&scratch.layout);
    let after = symlinks(scratch.layout.src_root().as_std_path());

    assert_eq!(before, after);
    assert_eq!(second.links_created, 0);
    assert_eq!(second.links_existing, first.links_created);
    assert_eq!(second.projected, first.projected);
}

/// A GOPATH outside the workspace, including missing parent directories.
#[test]
fn test_explicit_gopath() {
    let scratch = scratch();
    let gopath =
        scratch.layout.workspace().parent().unwrap().join("out/gopath");
    let layout = Layout::new(scratch.layout.workspace(), Some(gopath.clone()));

    run_fixture(&layout);

    let dest = gopath.join("src/github.com/dep/dep.go");
    assert!(fs::symlink_metadata(&dest).unwrap().file_type().is_symlink());
}

/// Makes a directory read-only until dropped, so the temp dir can always be
/// cleaned up.
#[cfg(unix)]
struct ReadOnlyDir(PathBuf);

#[cfg(unix)]
impl ReadOnlyDir {
    fn new(path: &Path) -> Self {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, fs::Permissions::from_mode(0o555)).unwrap();
        Self(path.to_path_buf())
    }
}

#[cfg(unix)]
impl Drop for ReadOnlyDir {
    fn drop(&mut self) {
        use std::os::unix::fs::PermissionsExt;

        let writable = fs::Permissions::from_mode(0o755);
        let _ = fs::set_permissions(&self.0, writable);
    }
}

/// Only meaningful without root; root ignores permission bits. The
/// uid-independent fatal path is covered in the projector's unit tests.
#[cfg(unix)]
#[test]
fn test_unwritable_gopath_is_fatal() {
    let scratch = scratch();
    let src_root = scratch.layout.src_root();
    fs::create_dir_all(&src_root).unwrap();
    let _guard = ReadOnlyDir::new(src_root.as_std_path());

    if fs::create_dir(src_root.join("writable")).is_ok() {
        return;
    }

    let err = project_graph(&fixture_graph(), &scratch.layout).unwrap_err();
    assert!(err.is_io());
}

fn go_library_graph(import_path: &str) -> BuildGraph {
    serde_json::from_value(serde_json::json!({
        "targets": [{
            "label": "//pkg:go_default_library",
            "rule": {
                "name": "//pkg:go_default_library",
                "class": "go_library",
                "attributes": {
                    "importpath": import_path,
                    "srcs": ["//pkg:bar.go"],
                },
            },
        }],
    }))
    .unwrap()
}

/// An absolute import path is placed under `src/`, never at the absolute
/// location itself.
#[test]
fn test_absolute_import_path_stays_in_gopath() {
    let scratch = scratch();
    let outside = scratch.layout.workspace().parent().unwrap().join("outside");
    let graph = go_library_graph(outside.as_str());

    let report = project_graph(&graph, &scratch.layout).unwrap();

    assert_eq!(report.links_created, 1);
    assert!(!outside.exists());
    let dest = scratch
        .layout
        .src_root()
        .join(outside.as_str().trim_start_matches('/'))
        .join("bar.go");
    assert_eq!(
        fs::read_link(&dest).unwrap(),
        scratch.layout.workspace().join("pkg/bar.go").as_std_path()
    );
}

#[test]
fn test_escaping_import_path_is_skipped() {
    let scratch = scratch();
    let graph = go_library_graph("../../escape");

    let report = project_graph(&graph, &scratch.layout).unwrap();

    assert_eq!(report.projected, 0);
    assert_eq!(report.links_created, 0);
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::InvalidImportPath("../../escape".to_string())
    );
    assert!(symlinks(scratch.layout.src_root().as_std_path()).is_empty());
}

fn wire_rule(
    name: &str,
    class: &str,
    attrs: Vec<WireAttribute>,
) -> WireTarget {
    WireTarget {
        r#type: TargetType::Rule as i32,
        rule: Some(WireRule {
            name: name.to_string(),
            rule_class: class.to_string(),
            attribute: attrs,
            rule_input: Vec::new(),
            rule_output: Vec::new(),
        }),
        source_file: None,
        generated_file: None,
    }
}

/// Query output bytes go through decoding and projection end to end.
#[test]
fn test_decode_and_project_wire_format() {
    let result = QueryResult {
        target: vec![wire_rule(
            "//pkg:go_default_library",
            "go_library",
            vec![
                WireAttribute {
                    name: "importpath".to_string(),
                    r#type: AttributeType::String as i32,
                    string_value: Some("example.com/foo".to_string()),
                    string_list_value: Vec::new(),
                },
                WireAttribute {
                    name: "srcs".to_string(),
                    r#type: AttributeType::LabelList as i32,
                    string_value: None,
                    string_list_value: vec!["//pkg:bar.go".to_string()],
                },
            ],
        )],
    };
    let graph = decode_graph(&result.encode_to_vec()).unwrap();

    let scratch = scratch();
    let report = project_graph(&graph, &scratch.layout).unwrap();

    assert_eq!(report.links_created, 1);
    let dest = scratch.layout.src_root().join("example.com/foo/bar.go");
    assert_eq!(
        fs::read_link(&dest).unwrap(),
        scratch.layout.workspace().join("pkg/bar.go").as_std_path()
    );
}

#[test]
fn test_decode_garbage() {
    let err = decode_graph(b"\xff\xff\xff").unwrap_err();
    assert!(err.is_decode());
}
