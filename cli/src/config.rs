use std::{
    fs::File,
    io,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context as _;
use scold_core::{
    inputs::{default_inputs_config, InputsConfig},
    PositiveDuration,
};
use serde::Deserialize;
use thiserror::Error;

use crate::{cmd::Args, util};

pub const APP_NAME: &str = "scold";

pub const DEFAULT_INPUTS_FILE: &str = "inputs.txt";

/// Number of tests run concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "JobCountRepr")]
pub enum JobCount {
    CpuCount,
    Fixed(NonZeroUsize),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobCountError {
    #[error("job count must be at least 1")]
    Zero,

    #[error("invalid job count {0:?}: expected a positive integer or CPU_COUNT")]
    Invalid(String),
}

impl JobCount {
    pub const CPU_COUNT: &str = "CPU_COUNT";

    pub fn get(self) -> usize {
        match self {
            Self::CpuCount => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            Self::Fixed(n) => n.get(),
        }
    }
}

impl Default for JobCount {
    fn default() -> Self {
        Self::CpuCount
    }
}

impl FromStr for JobCount {
    type Err = JobCountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::CPU_COUNT {
            return Ok(Self::CpuCount);
        }
        let n: usize = s.parse().map_err(|_| JobCountError::Invalid(s.to_owned()))?;
        NonZeroUsize::new(n).map(Self::Fixed).ok_or(JobCountError::Zero)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JobCountRepr {
    Count(usize),
    Name(String),
}

impl TryFrom<JobCountRepr> for JobCount {
    type Error = JobCountError;

    fn try_from(repr: JobCountRepr) -> Result<Self, Self::Error> {
        match repr {
            JobCountRepr::Count(n) => NonZeroUsize::new(n).map(Self::Fixed).ok_or(JobCountError::Zero),
            JobCountRepr::Name(s) => s.parse(),
        }
    }
}

/// User preferences from `<config_dir>/scold/scold.toml` and `SCOLD_*` env vars.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub inputs: Option<PathBuf>,
    pub jobs: Option<JobCount>,
    pub no_colors: Option<bool>,
    pub no_progress: Option<bool>,
    pub tl: Option<String>,
    pub prec: Option<u8>,
}

impl GlobalConfig {
    pub const FILENAME: &str = "scold.toml";
    pub const ENV_PREFIX: &str = "SCOLD_";

    pub fn filepath() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(Self::FILENAME))
    }

    pub fn from_file_or_default() -> anyhow::Result<Self> {
        let Some(path) = Self::filepath() else {
            log::debug!("No config dir on this platform");
            return Ok(Self::default())
        };
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let toml_str = match File::open(path).and_then(io::read_to_string) {
            Ok(toml) => toml,
            Err(e) => {
                log::debug!("Skipping config '{}': {}", path.display(), e);
                return Ok(Self::default());
            }
        };
        toml::from_str(&toml_str).with_context(|| {
            format!(
                "Invalid config '{}'",
                util::replace_homedir_to_tilde(path).display()
            )
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        envy::prefixed(Self::ENV_PREFIX)
            .from_env()
            .context("Invalid SCOLD_* environment variable")
    }

    /// Fields set in `other` win.
    pub fn overridden_by(self, other: Self) -> Self {
        Self {
            inputs: other.inputs.or(self.inputs),
            jobs: other.jobs.or(self.jobs),
            no_colors: other.no_colors.or(self.no_colors),
            no_progress: other.no_progress.or(self.no_progress),
            tl: other.tl.or(self.tl),
            prec: other.prec.or(self.prec),
        }
    }

    /// File settings overridden by env settings.
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self::from_file_or_default()?.overridden_by(Self::from_env()?))
    }

    /// Defaults for the inputs-file header.
    pub fn inputs_config(&self) -> anyhow::Result<InputsConfig> {
        let mut cfg = default_inputs_config();
        if let Some(tl) = &self.tl {
            let (tl, warning) = PositiveDuration::parse(tl).context("Invalid default time limit")?;
            if let Some(w) = warning {
                log::warn!("Default time limit {:?}: {}", self.tl, w);
            }
            cfg.tl = tl;
        }
        if let Some(prec) = self.prec {
            cfg.prec = prec;
        }
        Ok(cfg)
    }
}

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub inputs: PathBuf,
    pub jobs: usize,
    pub colors: bool,
    pub progress: bool,
    pub inputs_config: InputsConfig,
}

impl Settings {
    /// Command-line flags win over `cfg`. Colors and the progress bar are off
    /// when stdout is not a terminal unless forced; `--no-*` beats `--force-*`.
    pub fn resolve(args: &Args, cfg: &GlobalConfig, is_tty: bool) -> anyhow::Result<Self> {
        if args.no_colors && args.force_colors {
            log::warn!("Colors are forced and disabled at the same time. --no-colors is preferred.");
        }
        if args.no_progress && args.force_progress {
            log::warn!("Progress bar is forced and disabled at the same time. --no-progress is preferred.");
        }

        let no_colors = args.no_colors || cfg.no_colors.unwrap_or(false);
        let no_progress = args.no_progress || cfg.no_progress.unwrap_or(false);

        Ok(Self {
            inputs: args
                .inputs
                .clone()
                .or_else(|| cfg.inputs.clone())
                .unwrap_or_else(|| DEFAULT_INPUTS_FILE.into()),
            jobs: args.jobs.or(cfg.jobs).unwrap_or_default().get(),
            colors: !no_colors && (args.force_colors || is_tty),
            progress: !no_progress && (args.force_progress || is_tty),
            inputs_config: cfg.inputs_config()?,
        })
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use clap::Parser;

    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("scold").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_job_count_from_str() {
        assert_eq!("CPU_COUNT".parse(), Ok(JobCount::CpuCount));
        assert_eq!("4".parse(), Ok(JobCount::Fixed(NonZeroUsize::new(4).unwrap())));
        assert_eq!("0".parse::<JobCount>(), Err(JobCountError::Zero));
        assert_eq!(
            "-1".parse::<JobCount>(),
            Err(JobCountError::Invalid("-1".into()))
        );
        assert!(JobCount::CpuCount.get() >= 1);
    }

    #[test]
    fn test_global_config_from_toml() {
        let cfg: GlobalConfig = toml::from_str(
            r#"
            inputs = "tests.txt"
            jobs = 3
            no_colors = true
            tl = "2s"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.inputs, Some(PathBuf::from("tests.txt")));
        assert_eq!(cfg.jobs, Some(JobCount::Fixed(NonZeroUsize::new(3).unwrap())));
        assert_eq!(cfg.no_colors, Some(true));
        assert_eq!(cfg.no_progress, None);

        let cfg: GlobalConfig = toml::from_str(r#"jobs = "CPU_COUNT""#).unwrap();
        assert_eq!(cfg.jobs, Some(JobCount::CpuCount));

        assert!(toml::from_str::<GlobalConfig>("jobs = 0").is_err());
    }

    #[test]
    fn test_global_config_from_env_vars() {
        let vars = vec![
            ("SCOLD_JOBS".to_owned(), "2".to_owned()),
            ("SCOLD_NO_PROGRESS".to_owned(), "true".to_owned()),
            ("SCOLD_PREC".to_owned(), "3".to_owned()),
            ("UNRELATED".to_owned(), "x".to_owned()),
        ];
        let cfg: GlobalConfig = envy::prefixed(GlobalConfig::ENV_PREFIX)
            .from_iter(vars)
            .unwrap();
        assert_eq!(cfg.jobs, Some(JobCount::Fixed(NonZeroUsize::new(2).unwrap())));
        assert_eq!(cfg.no_progress, Some(true));
        assert_eq!(cfg.prec, Some(3));
    }

    #[test]
    fn test_overridden_by() {
        let file = GlobalConfig {
            jobs: Some(JobCount::CpuCount),
            prec: Some(4),
            ..Default::default()
        };
        let env = GlobalConfig {
            prec: Some(2),
            ..Default::default()
        };
        let cfg = file.overridden_by(env);
        assert_eq!(cfg.jobs, Some(JobCount::CpuCount));
        assert_eq!(cfg.prec, Some(2));
    }

    #[test]
    fn test_resolve_defaults() {
        let s = Settings::resolve(&args(&["./prog"]), &GlobalConfig::default(), true).unwrap();
        assert_eq!(s.inputs, PathBuf::from(DEFAULT_INPUTS_FILE));
        assert!(s.colors);
        assert!(s.progress);
        assert!(s.jobs >= 1);

        let s = Settings::resolve(&args(&["./prog"]), &GlobalConfig::default(), false).unwrap();
        assert!(!s.colors);
        assert!(!s.progress);
    }

    #[test]
    fn test_resolve_flags_win() {
        let cfg = GlobalConfig {
            inputs: Some("from-config.txt".into()),
            jobs: Some(JobCount::Fixed(NonZeroUsize::new(8).unwrap())),
            ..Default::default()
        };
        let a = args(&["-i", "mine.txt", "-j", "2", "--force-colors", "--no-progress", "--force-progress", "./prog"]);
        let s = Settings::resolve(&a, &cfg, false).unwrap();
        assert_eq!(s.inputs, PathBuf::from("mine.txt"));
        assert_eq!(s.jobs, 2);
        assert!(s.colors);
        assert!(!s.progress);
    }

    #[test]
    fn test_resolve_inputs_config() {
        let cfg = GlobalConfig {
            tl: Some("1500ms".into()),
            prec: Some(3),
            ..Default::default()
        };
        let s = Settings::resolve(&args(&["./prog"]), &cfg, false).unwrap();
        assert_eq!(*s.inputs_config.tl, Duration::from_millis(1500));
        assert_eq!(s.inputs_config.prec, 3);

        let cfg = GlobalConfig {
            tl: Some("-1s".into()),
            ..Default::default()
        };
        assert!(Settings::resolve(&args(&["./prog"]), &cfg, false).is_err());
    }
}
