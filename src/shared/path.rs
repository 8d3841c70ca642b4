use std::path::{Path, PathBuf};

/// Returns an absolute version of the provided path without touching the filesystem.
/// Falls back to the original path if the current working directory cannot be resolved.
pub fn absolutize<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        return path.to_path_buf();
    }

    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Path of the `index`-th fragment for an output base name.
/// Fragment 0 is `<base>.root`, later ones are `<base>_<index>.root`.
pub fn fragment_path<P: AsRef<Path>>(base: P, index: usize) -> PathBuf {
    let base = base.as_ref();
    let stem = base.to_string_lossy();
    let stem = stem.strip_suffix(".root").unwrap_or(&stem);
    if index == 0 {
        PathBuf::from(format!("{stem}.root"))
    } else {
        PathBuf::from(format!("{stem}_{index}.root"))
    }
}

/// Directory holding `path`, `.` for bare file names.
pub fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
