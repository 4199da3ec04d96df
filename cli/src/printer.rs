use std::path::Path;

use colored::{Color, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use scold_core::{
    error::InputsError,
    inputs::{InputsConfig, Test},
    print_success,
    rich_text::{dump_lexemes, RichText},
    style::{self, ColorTheme},
    testing::{TestResult, TestingBatch, TestingEventListener, Verdict},
};

const DIFF_COLOR: Color = Color::Red;
const MISSING_NEWLINE_COLOR: Color = Color::Magenta;

/// Prints parse diagnostics sorted by line. Returns true if any of them is a hard error.
pub fn print_inputs_errors(path: &Path, mut errs: Vec<InputsError>) -> bool {
    errs.sort_by_key(|e| e.line_range().begin);
    for err in &errs {
        print!("{}", render_inputs_error(path, err));
    }
    errs.iter().any(|e| !e.is_warning())
}

/// `path:line: error: summary` followed by the offending lines.
pub fn render_inputs_error(path: &Path, err: &InputsError) -> String {
    let (level, label) = if err.is_warning() {
        (log::Level::Warn, "warning")
    } else {
        (log::Level::Error, "error")
    };
    let range = err.line_range();
    format!(
        "{}:{}: {}: {}\n{}",
        path.display(),
        range.begin,
        label.color(level.color()).bold(),
        err.summary(),
        range.code_snippet(),
    )
}

pub fn print_run_header(cfg: &InputsConfig, jobs: usize) {
    if cfg.tl.is_zero() {
        println!("time limit: infinity");
    } else {
        println!("time limit: {}", cfg.tl);
    }
    println!("floating point precision: {} digit(s)", cfg.prec);
    println!("job count: {}", jobs);
}

/// Human-readable report of a batch run, with an optional progress bar.
#[derive(Debug)]
pub struct PrettyPrinter {
    bar: ProgressBar,
}

impl PrettyPrinter {
    pub fn new(total: usize, show_progress: bool) -> Self {
        let bar = if show_progress {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::with_template("{prefix:>11.cyan.bold} [{bar:20}] {pos}/{len}")
            .map(|s| s.progress_chars("=> "))
            .unwrap_or_else(|e| {
                log::debug!("Bad progress template: {}", e);
                ProgressStyle::default_bar()
            });
        bar.set_style(style);
        bar.set_prefix("Testing");
        Self { bar }
    }
}

impl TestingEventListener for PrettyPrinter {
    fn test_started(&mut self, id: usize) {
        log::trace!("Test {} started", id);
        self.bar.tick();
    }

    fn test_finished(&mut self, test: &Test, result: &TestResult) {
        let report = render_result(test, result);
        self.bar.suspend(|| print!("{}", report));
        self.bar.inc(1);
    }

    fn suite_finished(&mut self, batch: &TestingBatch) {
        self.bar.finish_and_clear();

        let results = batch.results();
        let passed = results.values().filter(|r| r.is_ok()).count();
        if passed == results.len() {
            print_success!("{}", "OK".bold());
        } else {
            println!("{}", "FAIL".red().bold());
            println!("{}/{} passed", passed, results.len());
        }
    }
}

/// The report for one finished test. Only failures get details.
pub fn render_result(test: &Test, result: &TestResult) -> String {
    let secs = result.time.as_millis() as f64 / 1e3;
    let mut s = format!(
        "--- {}:\tTest {} ({:.3}s)\n",
        style::verdict_icon(result.verdict),
        result.id,
        secs
    );
    if result.verdict == Verdict::OK {
        return s;
    }

    s += &format!("Input:\n{}\n", test.input);
    s += &format!("Answer:\n{}\n", dump_lexemes(&result.rich_answer, DIFF_COLOR));

    match result.verdict {
        Verdict::RE => {
            let code = result.out.exit_code;
            if code < 0 {
                s += &format!("Exit code: {} (unsigned: {})\n\n", code, code as u32);
            } else {
                s += &format!("Exit code: {}\n\n", code);
            }
            s += "Output:\n";
            push_with_newline(&mut s, &result.out.stdout);
            s += "Stderr:\n";
            push_with_newline(&mut s, &result.out.stderr);
        }
        Verdict::WA => {
            s += &format!("Output:\n{}\n", dump_lexemes(&result.rich_out, DIFF_COLOR));
            if !result.out.stderr.is_empty() {
                s += &format!("Stderr:\n{}\n", result.out.stderr);
            }
        }
        Verdict::TL => {
            if !result.out.stdout.is_empty() {
                s += "Output:\n";
                push_with_newline(&mut s, &result.out.stdout);
            }
            if !result.out.stderr.is_empty() {
                s += "Stderr:\n";
                push_with_newline(&mut s, &result.out.stderr);
            }
        }
        Verdict::IE => {
            let err = result.err.as_ref().map(ToString::to_string).unwrap_or_default();
            s += &format!("Error:\n{}\n\n", err);
        }
        Verdict::OK => (),
    }
    s
}

/// Appends `text`, marking a missing final line feed.
fn push_with_newline(s: &mut String, text: &str) {
    *s += text;
    if !text.is_empty() && !text.ends_with('\n') {
        *s += &dump_lexemes(&[RichText::highlighted("\n")], MISSING_NEWLINE_COLOR);
    }
}
