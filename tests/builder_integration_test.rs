use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use strata::overlay::Builder;

fn write_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Build an overlay under `tmp` from the named root directories.
fn build(tmp: &TempDir, roots: &[&str]) -> PathBuf {
    let overlay = tmp.path().join("overlay");
    let mut builder = Builder::new(&overlay).unwrap();
    let roots: Vec<PathBuf> = roots.iter().map(|root| tmp.path().join(root)).collect();
    builder.build(&roots).unwrap();
    overlay
}

fn read(overlay: &Path, rel: &str) -> String {
    fs::read_to_string(overlay.join(rel)).unwrap()
}

#[test]
fn test_non_colliding_entries_share_layer_one() {
    let tmp = TempDir::new().unwrap();
    write_file(&tmp.path().join("A/a"), "a");
    write_file(&tmp.path().join("B/b"), "b");

    let overlay = build(&tmp, &["A", "B"]);
    assert_eq!(read(&overlay, "1/a"), "a");
    assert_eq!(read(&overlay, "1/b"), "b");
}

#[test]
fn test_directory_directory_collision_merges_in_layer_one() {
    let tmp = TempDir::new().unwrap();
    write_file(&tmp.path().join("A/x/f"), "a");
    write_file(&tmp.path().join("B/x/g"), "b");

    let overlay = build(&tmp, &["A", "B"]);
    assert_eq!(read(&overlay, "1/x/f"), "a");
    assert_eq!(read(&overlay, "1/x/g"), "b");
}

#[test]
fn test_directory_file_collision_puts_file_in_layer_two() {
    let tmp = TempDir::new().unwrap();
    write_file(&tmp.path().join("A/x/f"), "a");
    write_file(&tmp.path().join("B/x"), "b");

    let overlay = build(&tmp, &["A", "B"]);
    assert_eq!(read(&overlay, "1/x/f"), "a");
    assert_eq!(read(&overlay, "2/x"), "b");
}

#[test]
fn test_file_directory_collision_displaces_file_to_layer_two() {
    let tmp = TempDir::new().unwrap();
    write_file(&tmp.path().join("A/x"), "a");
    write_file(&tmp.path().join("B/x/f"), "b");

    let overlay = build(&tmp, &["A", "B"]);
    assert_eq!(read(&overlay, "1/x/f"), "b");
    assert_eq!(read(&overlay, "2/x"), "a");
}

#[test]
fn test_file_file_collision_drops_the_later_file() {
    let tmp = TempDir::new().unwrap();
    write_file(&tmp.path().join("A/x"), "a");
    write_file(&tmp.path().join("B/x"), "b");

    let overlay = build(&tmp, &["A", "B"]);
    assert_eq!(read(&overlay, "1/x"), "a");
    assert!(!overlay.join("2/x").exists());
}

#[test]
fn test_deep_directory_directory_collision_merges() {
    let tmp = TempDir::new().unwrap();
    write_file(&tmp.path().join("A/x/a/f"), "a");
    write_file(&tmp.path().join("B/x/a/g"), "b");

    let overlay = build(&tmp, &["A", "B"]);
    assert_eq!(read(&overlay, "1/x/a/f"), "a");
    assert_eq!(read(&overlay, "1/x/a/g"), "b");
}

#[test]
fn test_deep_directory_file_collision_cascades() {
    let tmp = TempDir::new().unwrap();
    write_file(&tmp.path().join("A/x/a/f"), "a");
    write_file(&tmp.path().join("B/x/a"), "b");

    let overlay = build(&tmp, &["A", "B"]);
    assert_eq!(read(&overlay, "1/x/a/f"), "a");
    assert_eq!(read(&overlay, "2/x/a"), "b");
}

#[test]
fn test_deep_file_directory_collision_displaces() {
    let tmp = TempDir::new().unwrap();
    write_file(&tmp.path().join("A/x/a"), "a");
    write_file(&tmp.path().join("B/x/a/f"), "b");

    let overlay = build(&tmp, &["A", "B"]);
    assert_eq!(read(&overlay, "1/x/a/f"), "b");
    assert_eq!(read(&overlay, "2/x/a"), "a");
}

#[test]
fn test_deep_file_file_collision_drops_the_later_file() {
    let tmp = TempDir::new().unwrap();
    write_file(&tmp.path().join("A/x/a"), "a");
    write_file(&tmp.path().join("B/x/a"), "b");

    let overlay = build(&tmp, &["A", "B"]);
    assert_eq!(read(&overlay, "1/x/a"), "a");
    assert!(!overlay.join("2/x/a").exists());
}

#[test]
fn test_cascading_collisions_create_a_third_layer() {
    let tmp = TempDir::new().unwrap();
    write_file(&tmp.path().join("A/a"), "a");
    write_file(&tmp.path().join("B/a/b"), "b");
    write_file(&tmp.path().join("C/a/b/c"), "c");

    let overlay = build(&tmp, &["A", "B", "C"]);
    assert_eq!(read(&overlay, "1/a/b/c"), "c");
    assert_eq!(read(&overlay, "2/a/b"), "b");
    assert_eq!(read(&overlay, "3/a"), "a");
}

#[test]
fn test_file_shadowed_across_layers_is_dropped() {
    // C's `x` collides with a directory in layer 1 and a file in layer 2;
    // the layer-2 file keeps shadowing it with no error.
    let tmp = TempDir::new().unwrap();
    write_file(&tmp.path().join("A/x/file"), "a");
    write_file(&tmp.path().join("B/x"), "b");
    write_file(&tmp.path().join("C/x"), "c");

    let overlay = build(&tmp, &["A", "B", "C"]);
    assert_eq!(read(&overlay, "1/x/file"), "a");
    assert_eq!(read(&overlay, "2/x"), "b");
    assert!(!overlay.join("3/x").exists());
}

#[test]
fn test_merge_materializes_symlinked_directory() {
    let tmp = TempDir::new().unwrap();
    write_file(&tmp.path().join("A/x/f"), "a");
    write_file(&tmp.path().join("B/x/g"), "b");

    let overlay = build(&tmp, &["A", "B"]);

    // The merged entry is a real directory whose children are symlinks
    // preserving the original targets.
    let merged = overlay.join("1/x");
    assert!(!fs::symlink_metadata(&merged).unwrap().file_type().is_symlink());
    assert!(fs::symlink_metadata(merged.join("f")).unwrap().file_type().is_symlink());
    assert_eq!(fs::canonicalize(merged.join("f")).unwrap(), tmp.path().join("A/x/f").canonicalize().unwrap());
}

#[test]
fn test_nonexistent_roots_are_skipped() {
    let tmp = TempDir::new().unwrap();
    write_file(&tmp.path().join("A/a"), "a");

    let overlay = build(&tmp, &["missing", "A"]);
    assert_eq!(read(&overlay, "1/a"), "a");
}

#[test]
fn test_plain_file_roots_are_skipped() {
    let tmp = TempDir::new().unwrap();
    write_file(&tmp.path().join("A"), "not a directory");
    write_file(&tmp.path().join("B/b"), "b");

    let overlay = build(&tmp, &["A", "B"]);
    assert_eq!(read(&overlay, "1/b"), "b");
}

#[test]
fn test_root_that_is_a_symlink_to_a_directory_is_layered() {
    let tmp = TempDir::new().unwrap();
    write_file(&tmp.path().join("A/a"), "a");
    std::os::unix::fs::symlink(tmp.path().join("A"), tmp.path().join("B")).unwrap();

    let overlay = build(&tmp, &["B"]);
    assert_eq!(read(&overlay, "1/a"), "a");
}

#[test]
fn test_no_symlink_is_ever_placed_beneath_a_file() {
    // Layer 1 holds `a` as a file; everything nested under `a` must land
    // in deeper layers.
    let tmp = TempDir::new().unwrap();
    write_file(&tmp.path().join("A/a"), "a");
    write_file(&tmp.path().join("B/a/b"), "b");
    write_file(&tmp.path().join("C/a/c"), "c");

    let overlay = build(&tmp, &["A", "B", "C"]);
    assert_eq!(read(&overlay, "2/a"), "a");
    assert_eq!(read(&overlay, "1/a/b"), "b");
    assert_eq!(read(&overlay, "1/a/c"), "c");
}
