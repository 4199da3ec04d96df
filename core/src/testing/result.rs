use std::time::Duration;

use super::process::{ExecutionError, ExecutionResult};
use crate::rich_text::RichText;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::EnumIter,
)]
pub enum Verdict {
    OK,
    IE,
    WA,
    RE,
    TL,
}

#[derive(Debug, Clone)]
pub struct TestResult {
    /// 1-based index into the tests of the inputs file.
    pub id: usize,
    pub verdict: Verdict,
    pub time: Duration,
    /// Highlighted against the expected answer.
    pub rich_out: Vec<RichText>,
    /// Highlighted against the actual output.
    pub rich_answer: Vec<RichText>,
    pub out: ExecutionResult,
    pub err: Option<ExecutionError>,
}

impl TestResult {
    pub fn is_ok(&self) -> bool {
        self.verdict == Verdict::OK
    }
}
