use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use scold_core::{
    inputs::{scan_inputs, set_default_inputs_config},
    testing::{Stopwatch, TestingBatch, ThreadPool},
};

use crate::{
    config::{GlobalConfig, JobCount, Settings},
    executable::Executable,
    printer::{self, PrettyPrinter},
    util,
};

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about = "Feed programs fixed inputs, compare their outputs against expected ones.",
    long_about = None
)]
pub struct Args {
    /// File with tests [default: inputs.txt]
    #[arg(short, long, value_name = "PATH")]
    pub inputs: Option<PathBuf>,

    /// Number of tests to run concurrently: a positive integer or CPU_COUNT [default: CPU_COUNT]
    #[arg(short, long, value_name = "COUNT")]
    pub jobs: Option<JobCount>,

    /// Disable colored output
    #[arg(long)]
    pub no_colors: bool,

    /// Print colors even when stdout is not a terminal
    #[arg(long)]
    pub force_colors: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Print the progress bar even when stdout is not a terminal
    #[arg(long)]
    pub force_progress: bool,

    /// Program under test
    pub executable: PathBuf,

    /// Arguments passed to the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARG")]
    pub args: Vec<String>,
}

impl Args {
    /// Runs every test and returns the process exit code.
    pub async fn exec(&self) -> anyhow::Result<i32> {
        let cfg = GlobalConfig::load()?;
        let settings = Settings::resolve(self, &cfg, util::is_stdout_tty())?;
        colored::control::set_override(settings.colors);
        set_default_inputs_config(settings.inputs_config);

        let inputs_path = fsutil::absolute_path(&settings.inputs)?;
        let text = fsutil::read_to_string(&inputs_path).context("Failed to load inputs file")?;
        let (inputs, errs) = scan_inputs(&text);
        if printer::print_inputs_errors(&settings.inputs, errs) {
            return Ok(1);
        }

        let exec_path =
            fsutil::find_executable(&self.executable).context("Failed to find executable")?;
        log::info!("Running: {} {:?}", exec_path.display(), self.args);
        let proc = Executable::new(exec_path).args(self.args.clone());

        printer::print_run_header(&inputs.config, settings.jobs);

        let swatch = Stopwatch::with_system_clock(*inputs.config.tl);
        let pool = ThreadPool::new(settings.jobs);
        let mut printer = PrettyPrinter::new(inputs.tests.len(), settings.progress);

        let mut batch = TestingBatch::new(inputs, Arc::new(proc), swatch, Arc::new(pool));
        batch.run(&mut printer).await;

        Ok(if batch.all_passed() { 0 } else { 1 })
    }
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from(["scold", "-j", "2", "--no-colors", "./prog", "a", "-x", "--y"]).unwrap();
        assert_eq!(args.executable, PathBuf::from("./prog"));
        assert_eq!(args.args, vec!["a", "-x", "--y"]);
        assert!(args.no_colors);
        assert_eq!(args.jobs, Some("2".parse().unwrap()));
        assert_eq!(args.inputs, None);
    }

    #[test]
    fn test_parse_args_requires_executable() {
        assert!(Args::try_parse_from(["scold", "-i", "tests.txt"]).is_err());
        assert!(Args::try_parse_from(["scold", "-j", "0", "./prog"]).is_err());
    }
}
