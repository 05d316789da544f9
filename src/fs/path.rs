use std::path::{Component, Path, PathBuf};

/// Lexically resolve `.` and `..` segments without touching the filesystem.
///
/// A `..` segment cancels the preceding normal segment; leading `..`
/// segments of a relative path are kept. `..` directly under the root
/// stays at the root. Symlinks are deliberately not followed: overlay
/// layers contain symlinks whose parents must be traversed as written,
/// not as resolved.
pub fn clean(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    out.iter().collect()
}

/// Number of leading parent-traversal segments in the cleaned form of
/// `path`.
///
/// This is how far the path climbs above its starting directory:
/// `../../data/file` ascends two levels, `a/../b` ascends none.
pub fn ascents(path: &Path) -> usize {
    clean(path)
        .components()
        .take_while(|c| matches!(c, Component::ParentDir))
        .count()
}

/// Number of segments in the directory portion of a relative path.
///
/// `a` has zero, `lib/native.so` has one, `x/y/z` has two.
pub fn dir_segments(path: &Path) -> usize {
    path.parent().map(|p| p.components().count()).unwrap_or(0)
}
