use std::path::{Path, PathBuf};

use crossterm::tty::IsTty;

/// Logs go to stderr; the level defaults to `warn` and follows `RUST_LOG` otherwise.
pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .try_init()
        .ok();
}

pub fn is_stdout_tty() -> bool {
    std::io::stdout().is_tty()
}

pub fn replace_homedir_to_tilde(path: impl Into<PathBuf>) -> PathBuf {
    let path = path.into();
    let Some(home_dir) = ::dirs::home_dir() else {
        return path
    };
    path.strip_prefix(home_dir)
        .map(|path| Path::new("~").join(path))
        .unwrap_or(path)
}
