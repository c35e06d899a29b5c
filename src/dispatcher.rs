use crate::error::{AnalysisError, Result};
use crate::schema::{ChunkAnalysisResult, TextChunk};
use futures::FutureExt;
use log::{debug, error, info, warn};
use rand::Rng;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::sleep;

pub const DEFAULT_CONCURRENCY_LIMIT: usize = 3;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Position of a chunk within its batch, handed to the analyzer with the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkContext {
    pub index: usize,
    pub total: usize,
}

/// Analyzes the content of one chunk.
#[async_trait::async_trait]
pub trait ChunkAnalyzer: Send + Sync {
    async fn analyze(&self, content: &str, context: &ChunkContext) -> Result<String>;
}

/// Exponential backoff: the wait after failed attempt `n` (0-based) is
/// `base_delay * 2^n`, plus an optional random jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_delay.saturating_mul(factor)
    }

    fn sample_jitter(&self) -> Duration {
        let max_ms = self.jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }

    /// Runs `op` until it succeeds or the retries are used up, returning the last error.
    ///
    /// `op` receives the 0-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_retries => return Err(e),
                Err(e) => {
                    let delay = self.delay_for_attempt(attempt) + self.sample_jitter();
                    warn!(
                        "Attempt {} of {} failed: {}. Retrying in {:?}",
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Fans chunk analyses out under a concurrency cap and gathers them back in input order.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisDispatcher {
    policy: RetryPolicy,
    concurrency_limit: usize,
}

impl Default for AnalysisDispatcher {
    fn default() -> Self {
        Self::new(RetryPolicy::default(), DEFAULT_CONCURRENCY_LIMIT)
    }
}

impl AnalysisDispatcher {
    pub fn new(policy: RetryPolicy, concurrency_limit: usize) -> Self {
        Self {
            policy,
            concurrency_limit: concurrency_limit.max(1),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Analyzes every chunk, at most `concurrency_limit` at a time.
    ///
    /// Never fails. A chunk whose retries run out, including an analyzer that
    /// panics on every attempt, yields an empty string at its own position. Only
    /// a failure of the fan-out itself (a closed admission gate, a task that dies
    /// outside the analyzer) empties the whole batch, and the remaining tasks are
    /// aborted before returning.
    pub async fn dispatch<A>(
        &self,
        chunks: Vec<TextChunk>,
        analyzer: Arc<A>,
    ) -> Vec<ChunkAnalysisResult>
    where
        A: ChunkAnalyzer + ?Sized + 'static,
    {
        let total = chunks.len();
        let indices: Vec<usize> = chunks.iter().map(|c| c.index).collect();
        if total == 0 {
            return Vec::new();
        }

        info!(
            "Dispatching {} chunks (concurrency {}, max retries {})",
            total, self.concurrency_limit, self.policy.max_retries
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut tasks = JoinSet::new();

        for (slot, chunk) in chunks.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let analyzer = Arc::clone(&analyzer);
            let policy = self.policy;

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                let context = ChunkContext {
                    index: chunk.index,
                    total,
                };

                let outcome = policy
                    .run(|_| analyze_guarded(analyzer.as_ref(), &chunk.content, &context))
                    .await;

                let text = match outcome {
                    Ok(text) => {
                        debug!("Chunk {} analyzed ({} chars)", chunk.index, text.len());
                        text
                    }
                    Err(e) => {
                        error!(
                            "Chunk {} failed after {} attempts: {}",
                            chunk.index,
                            policy.max_retries + 1,
                            e
                        );
                        String::new()
                    }
                };
                Some((slot, text))
            });
        }

        let mut slots: Vec<Option<String>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some((slot, text))) => slots[slot] = Some(text),
                Ok(None) => {
                    error!("Admission gate closed during dispatch; discarding batch results");
                    tasks.abort_all();
                    return empty_results(&indices);
                }
                Err(e) => {
                    error!("Chunk task failed during dispatch: {}; discarding batch results", e);
                    tasks.abort_all();
                    return empty_results(&indices);
                }
            }
        }

        indices
            .into_iter()
            .zip(slots)
            .map(|(index, text)| ChunkAnalysisResult {
                index,
                text: text.unwrap_or_default(),
            })
            .collect()
    }
}

/// One analysis attempt; a panic inside the analyzer counts as a failed attempt.
async fn analyze_guarded<A>(analyzer: &A, content: &str, context: &ChunkContext) -> Result<String>
where
    A: ChunkAnalyzer + ?Sized,
{
    match AssertUnwindSafe(analyzer.analyze(content, context))
        .catch_unwind()
        .await
    {
        Ok(outcome) => outcome,
        Err(_) => Err(AnalysisError::Completion(format!(
            "analyzer panicked on chunk {}",
            context.index
        ))),
    }
}

fn empty_results(indices: &[usize]) -> Vec<ChunkAnalysisResult> {
    indices
        .iter()
        .map(|index| ChunkAnalysisResult {
            index: *index,
            text: String::new(),
        })
        .collect()
}

/// One-shot form of [`AnalysisDispatcher::dispatch`] with a one-second backoff unit.
pub async fn dispatch<A>(
    chunks: Vec<TextChunk>,
    analyzer: Arc<A>,
    concurrency_limit: usize,
    max_retries: u32,
) -> Vec<ChunkAnalysisResult>
where
    A: ChunkAnalyzer + ?Sized + 'static,
{
    AnalysisDispatcher::new(
        RetryPolicy::new(max_retries, Duration::from_secs(1)),
        concurrency_limit,
    )
    .dispatch(chunks, analyzer)
    .await
}
