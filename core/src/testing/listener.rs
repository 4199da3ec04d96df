use super::{batch::TestingBatch, result::TestResult};
use crate::inputs::Test;

/// Observer of a [`TestingBatch`] run. All callbacks happen on the orchestrating task.
///
/// `test_started(id)` always precedes `test_finished` for the same id,
/// and `suite_finished` comes last.
pub trait TestingEventListener {
    fn test_started(&mut self, _id: usize) {}

    fn test_finished(&mut self, _test: &Test, _result: &TestResult) {}

    fn suite_finished(&mut self, _batch: &TestingBatch) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl TestingEventListener for NoopListener {}
