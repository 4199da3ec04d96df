use std::{
    any::Any,
    collections::{hash_map::Entry, BTreeMap, HashMap},
    io::Cursor,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::{mpsc, Mutex};

use super::{
    listener::TestingEventListener,
    pool::{inherit_worker_id, WorkerPool},
    process::{CancelToken, ExecutionError, ExecutionResult, ProcessExecutor},
    result::{TestResult, Verdict},
    stopwatch::Stopwatch,
};
use crate::{
    inputs::Inputs,
    lexer::{self, Lexer},
    rich_text::RichText,
};

#[derive(Debug)]
struct TestExecutionResult {
    id: usize,
    result: Result<ExecutionResult, ExecutionError>,
}

#[derive(Debug)]
enum CancelSlot {
    Live(CancelToken),
    /// The test timed out before its worker started.
    Sentinel,
}

type CancelSlots = Arc<Mutex<HashMap<usize, CancelSlot>>>;

enum Event {
    TimeLimit(Duration),
    Completed(Option<TestExecutionResult>),
}

/// Runs every test of an [`Inputs`] against one executor and judges the outputs.
///
/// Tests are dispatched to the pool in id order, at most `worker_count` at a time.
/// Only the oldest unfinished test is watched for its time limit.
pub struct TestingBatch {
    inputs: Arc<Inputs>,
    proc: Arc<dyn ProcessExecutor>,
    swatch: Stopwatch,
    pool: Arc<dyn WorkerPool>,
    lexer: Lexer,
    results: BTreeMap<usize, TestResult>,
    start_times: HashMap<usize, Instant>,
    cancels: CancelSlots,
}

impl TestingBatch {
    pub fn new(
        inputs: impl Into<Arc<Inputs>>,
        proc: Arc<dyn ProcessExecutor>,
        swatch: Stopwatch,
        pool: Arc<dyn WorkerPool>,
    ) -> Self {
        let inputs = inputs.into();
        let lexer = Lexer::new(inputs.config.prec);
        Self {
            inputs,
            proc,
            swatch,
            pool,
            lexer,
            results: BTreeMap::new(),
            start_times: HashMap::new(),
            cancels: Arc::default(),
        }
    }

    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    pub fn stopwatch(&self) -> &Stopwatch {
        &self.swatch
    }

    pub fn lexer(&self) -> &Lexer {
        &self.lexer
    }

    /// Results keyed by test id.
    pub fn results(&self) -> &BTreeMap<usize, TestResult> {
        &self.results
    }

    pub fn all_passed(&self) -> bool {
        self.results.len() == self.inputs.tests.len() && self.results.values().all(TestResult::is_ok)
    }

    pub async fn run<L>(&mut self, listener: &mut L)
    where
        L: TestingEventListener + ?Sized,
    {
        let n = self.inputs.tests.len();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut next_id = 1;
        while next_id <= n.min(self.pool.worker_count()) {
            self.launch(next_id, &tx, listener);
            next_id += 1;
        }

        let mut oldest = 1;
        while self.results.len() < n {
            let since = self.start_times.get(&oldest).copied();
            let event = tokio::select! {
                tl = self.swatch.time_limit(since) => Event::TimeLimit(tl),
                res = rx.recv() => Event::Completed(res),
            };

            match event {
                Event::TimeLimit(tl) => {
                    log::debug!("Test {} exceeded the time limit of {:?}", oldest, tl);
                    self.interrupt(oldest).await;
                    oldest += 1;
                }
                Event::Completed(Some(exec)) => {
                    if next_id <= n {
                        self.launch(next_id, &tx, listener);
                        next_id += 1;
                    }
                    let id = exec.id;
                    let result = self.judge(exec);
                    self.cancels.lock().await.remove(&id);
                    self.results.insert(id, result);
                    if let Some(result) = self.results.get(&id) {
                        listener.test_finished(&self.inputs.tests[id - 1], result);
                    }
                }
                Event::Completed(None) => {
                    log::error!("Completion channel closed with {} tests pending", n - self.results.len());
                    break;
                }
            }
            while self.results.contains_key(&oldest) {
                oldest += 1;
            }
        }

        listener.suite_finished(self);
    }

    fn launch<L>(&mut self, id: usize, complete: &mpsc::UnboundedSender<TestExecutionResult>, listener: &mut L)
    where
        L: TestingEventListener + ?Sized,
    {
        self.start_times.insert(id, self.swatch.now());
        listener.test_started(id);

        let task = execute_test(
            id,
            self.inputs.tests[id - 1].input.clone().into_bytes(),
            Arc::clone(&self.proc),
            Arc::clone(&self.cancels),
            complete.clone(),
        );
        if let Err(e) = self.pool.execute(Box::pin(task)) {
            log::warn!("Failed to dispatch test {}: {}", id, e);
            let _ = complete.send(TestExecutionResult {
                id,
                result: Err(ExecutionError::Internal(format!("failed to dispatch test: {}", e))),
            });
        }
    }

    async fn interrupt(&self, id: usize) {
        let mut cancels = self.cancels.lock().await;
        match cancels.entry(id) {
            Entry::Occupied(slot) => {
                if let CancelSlot::Live(token) = slot.get() {
                    token.cancel();
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(CancelSlot::Sentinel);
            }
        }
    }

    fn judge(&self, exec: TestExecutionResult) -> TestResult {
        let TestExecutionResult { id, result } = exec;
        let answer = lexer::scan(&self.inputs.tests[id - 1].output);
        let elapsed = self.swatch.elapsed(self.start_times.get(&id).copied());

        let (out, err) = match result {
            Ok(out) => (out, None),
            Err(e) => (ExecutionResult::default(), Some(e)),
        };
        let got = lexer::scan(&out.stdout);

        let (verdict, time, rich_out, rich_answer) = match &err {
            Some(e) if e.is_time_limit() => {
                let tl = self.swatch.tl();
                let time = if tl.is_zero() { elapsed } else { tl };
                (Verdict::TL, time, plain(&got), plain(&answer))
            }
            Some(_) => (Verdict::IE, elapsed, plain(&got), plain(&answer)),
            None if out.exit_code != 0 => (Verdict::RE, elapsed, plain(&got), plain(&answer)),
            None => {
                let (rich_out, out_ok) = self.lexer.compare(&got, &answer);
                let (rich_answer, answer_ok) = self.lexer.compare(&answer, &got);
                let verdict = if out_ok && answer_ok { Verdict::OK } else { Verdict::WA };
                (verdict, elapsed, rich_out, rich_answer)
            }
        };

        TestResult {
            id,
            verdict,
            time,
            rich_out,
            rich_answer,
            out,
            err,
        }
    }
}

impl std::fmt::Debug for TestingBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestingBatch")
            .field("tests", &self.inputs.tests.len())
            .field("swatch", &self.swatch)
            .field("workers", &self.pool.worker_count())
            .field("results", &self.results.len())
            .finish()
    }
}

/// Body of a single test, run on a pool worker.
async fn execute_test(
    id: usize,
    input: Vec<u8>,
    proc: Arc<dyn ProcessExecutor>,
    cancels: CancelSlots,
    complete: mpsc::UnboundedSender<TestExecutionResult>,
) {
    let token = CancelToken::new();
    {
        let mut cancels = cancels.lock().await;
        match cancels.entry(id) {
            Entry::Occupied(_) => {
                drop(cancels);
                let _ = complete.send(TestExecutionResult {
                    id,
                    result: Err(ExecutionError::TimeLimit),
                });
                return;
            }
            Entry::Vacant(slot) => {
                slot.insert(CancelSlot::Live(token.clone()));
            }
        }
    }

    let run = {
        let token = token.clone();
        tokio::spawn(inherit_worker_id(async move {
            proc.run(token, Box::new(Cursor::new(input))).await
        }))
    };
    let result = match run.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(ExecutionError::Internal(panic_message(e.into_panic()))),
        Err(e) => Err(ExecutionError::Internal(e.to_string())),
    };
    let result = match result {
        Err(_) if token.is_cancelled() => Err(ExecutionError::TimeLimit),
        other => other,
    };

    let _ = complete.send(TestExecutionResult { id, result });
}

fn plain(xms: &[&str]) -> Vec<RichText> {
    xms.iter().map(|&xm| RichText::plain(xm)).collect()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("executor panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("executor panicked: {}", s)
    } else {
        "executor panicked".to_owned()
    }
}
