use std::{
    env,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

pub mod error {
    use std::{io, path::PathBuf};

    pub type Result<T> = std::result::Result<T, self::Error>;

    type Msg = &'static str;

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("{0} ({1}): {2}")]
        SingleIO(Msg, PathBuf, #[source] io::Error),

        #[error("Cannot get current dir: {0}")]
        CurrentDir(#[source] io::Error),

        #[error("'{0}' is absent in current working directory and in PATH")]
        NotFoundInPath(String),

        #[error("'{0}' does not exist")]
        NotFound(PathBuf),

        #[error("'{0}' is a directory")]
        IsDirectory(PathBuf),
    }
}
pub use error::{Error, Result};

#[must_use]
pub fn read_to_string(filepath: impl AsRef<Path>) -> Result<String> {
    fs::read_to_string(&filepath)
        .map_err(|e| Error::SingleIO("Cannot read file", filepath.as_ref().to_owned(), e))
}

/// Normalize the path
/// ```
/// use fsutil::normalize_path;
/// use std::path::Path;
///
/// assert_eq!(normalize_path("./hoge/.config/././foo"), Path::new("hoge/.config/foo"));
/// assert_eq!(normalize_path("hoge/.config/../../bar/."), Path::new("bar"));
/// assert_eq!(normalize_path("/foo/"), Path::new("/foo"));
/// assert_eq!(normalize_path("./././."), Path::new("."));
/// ```
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    use ::std::path::Component;
    let components = path.as_ref().components();
    let mut stack = Vec::with_capacity(components.size_hint().1.unwrap_or(4));
    for c in components {
        match c {
            Component::CurDir => (),
            Component::ParentDir if matches!(stack.last(), Some(Component::Normal(_))) => {
                stack.pop();
            }
            _ => {
                stack.push(c);
            }
        }
    }
    if stack.is_empty() {
        stack.push(Component::CurDir);
    }
    stack.iter().collect()
}

/// Joins a relative `path` onto the current dir, without touching the file system otherwise.
pub fn absolute_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.is_absolute() {
        return Ok(normalize_path(path));
    }
    let cwd = env::current_dir().map_err(Error::CurrentDir)?;
    Ok(normalize_path(cwd.join(path)))
}

/// Directories listed in `PATH`.
pub fn search_paths() -> Vec<PathBuf> {
    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).collect())
        .unwrap_or_default()
}

/// Locates the program the user named on the command line.
///
/// The name is tried relative to the current dir first. A bare file name
/// is then looked up in every `PATH` entry. On Windows, a missing
/// extension defaults to `.exe`.
pub fn find_executable(user_path: impl AsRef<Path>) -> Result<PathBuf> {
    find_executable_in(user_path, &search_paths())
}

pub fn find_executable_in(user_path: impl AsRef<Path>, dirs: &[PathBuf]) -> Result<PathBuf> {
    let user_path = with_default_extension(user_path.as_ref());
    let is_bare_name = user_path.components().count() == 1 && user_path.file_name().is_some();

    let mut candidates = Vec::new();
    match absolute_path(&user_path) {
        Ok(abs) => candidates.push(abs),
        Err(e) => log::warn!("{:#}. Will look in PATH", e),
    }
    if is_bare_name {
        candidates.extend(dirs.iter().map(|dir| dir.join(&user_path)));
    }

    for cand in candidates {
        let Ok(meta) = fs::metadata(&cand) else {
            continue
        };
        if meta.is_dir() {
            return Err(Error::IsDirectory(cand));
        }
        log::debug!("Found executable: {}", cand.display());
        return Ok(cand);
    }

    if is_bare_name {
        Err(Error::NotFoundInPath(user_path.to_string_lossy().into_owned()))
    } else {
        Err(Error::NotFound(absolute_path(&user_path).unwrap_or(user_path)))
    }
}

fn with_default_extension(path: &Path) -> PathBuf {
    if cfg!(windows) && path.extension().is_none() {
        let mut s: OsString = path.as_os_str().to_owned();
        s.push(".exe");
        return s.into();
    }
    path.to_owned()
}
