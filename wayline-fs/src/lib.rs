//! Shared filesystem helpers built on `cap-std` and `camino`.
#![forbid(unsafe_code)]

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8};
use std::io;

/// Open a UTF-8 file path using ambient authority.
pub fn open_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Resolve an ambient directory for the given path and return the directory with the file name.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("target should include a file name"))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Return whether a path exists and is a regular file using capability-based IO.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.metadata(name.as_str()).map(|meta| meta.is_file())
}

/// Remove a regular file, treating a missing file or parent directory as success.
///
/// Returns `Ok(true)` when a file was removed and `Ok(false)` when nothing
/// existed at `path`.
pub fn remove_file_if_exists(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = match open_dir_and_file(path) {
        Ok(pair) => pair,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    match dir.remove_file(name.as_str()) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    #[fixture]
    fn temp_dir() -> TempDir {
        TempDir::new().expect("tempdir")
    }

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path")
    }

    #[rstest]
    fn removes_existing_file(temp_dir: TempDir) {
        let path = utf8(&temp_dir).join("car.routing");
        fs::write(&path, b"cached").expect("write file");

        let removed = remove_file_if_exists(&path).expect("removal succeeds");

        assert!(removed);
        assert!(!path.exists());
    }

    #[rstest]
    fn missing_file_is_not_an_error(temp_dir: TempDir) {
        let path = utf8(&temp_dir).join("absent.routing");
        let removed = remove_file_if_exists(&path).expect("missing file tolerated");
        assert!(!removed);
    }

    #[rstest]
    fn missing_parent_is_not_an_error(temp_dir: TempDir) {
        let path = utf8(&temp_dir).join("nowhere").join("absent.routing");
        let removed = remove_file_if_exists(&path).expect("missing parent tolerated");
        assert!(!removed);
    }

    #[rstest]
    fn directories_are_not_removed(temp_dir: TempDir) {
        let path = utf8(&temp_dir).join("nested");
        fs::create_dir(&path).expect("create dir");

        assert!(remove_file_if_exists(&path).is_err());
        assert!(path.is_dir());
    }

    #[rstest]
    fn file_is_file_distinguishes_directories(temp_dir: TempDir) {
        let root = utf8(&temp_dir);
        let file = root.join("scenario.json");
        fs::write(&file, b"{}").expect("write file");

        assert!(file_is_file(&file).expect("inspect file"));
        assert!(!file_is_file(&root).expect("inspect dir"));
    }
}
