use std::{
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
};

/// The file name of `path` without its last extension, lossily converted to a string.
pub fn file_stem_lossy(path: impl AsRef<Path>) -> Option<String> {
    path.as_ref()
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

/// Collects all regular files directly inside `dir`, sorted by their file names. Does
/// not walk subdirectories.
pub fn sorted_files(dir: impl AsRef<Path>) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort_by_key(|path| path.file_name().map(|name| name.to_owned()));
    Ok(files)
}

/// Try to read the file, return None if it doesn't exist
pub fn read_optional_file(path: impl AsRef<Path>) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
        Ok(s) => Ok(Some(s)),
    }
}

/// Removes the file, returns false if it didn't exist
pub fn remove_if_exists(path: impl AsRef<Path>) -> io::Result<bool> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
        Ok(()) => Ok(true),
    }
}

/// All file names inside `dir`, sorted. Mostly useful to look at what a run produced.
pub fn file_names(dir: impl AsRef<Path>) -> io::Result<Vec<OsString>> {
    Ok(sorted_files(dir)?
        .into_iter()
        .filter_map(|path| path.file_name().map(|name| name.to_owned()))
        .collect())
}
