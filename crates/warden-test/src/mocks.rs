//! Mock implementations for testing.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use warden_gateway::{UpstreamCall, UpstreamError, UpstreamExecutor};
use warden_review::{ReviewContext, ReviewError, ReviewResult, RiskReviewer};

/// One scripted reviewer answer.
#[derive(Debug, Clone)]
pub enum ReviewScript {
    /// Answer with this raw body.
    Respond(Value),
    /// Wait, then answer with this raw body.
    Delayed(Duration, Value),
    /// Fail with this error.
    Fail(ReviewError),
}

/// Reviewer that plays back queued answers.
///
/// Uses `std::sync::Mutex` internally so builder methods work without a
/// tokio runtime. When the queue is empty the default answer is used.
#[derive(Debug, Clone)]
pub struct ScriptedReviewer {
    script: Arc<Mutex<VecDeque<ReviewScript>>>,
    default: ReviewScript,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<ReviewContext>>>,
}

impl ScriptedReviewer {
    /// Create a reviewer that allows everything at score 0 by default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            default: ReviewScript::Respond(verdict_body("ALLOW", 0, "no risk found")),
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a well-formed verdict.
    #[must_use]
    pub fn with_verdict(self, decision: &str, score: i64, reason: &str) -> Self {
        self.then(ReviewScript::Respond(verdict_body(decision, score, reason)))
    }

    /// Queue a raw body.
    #[must_use]
    pub fn with_body(self, body: Value) -> Self {
        self.then(ReviewScript::Respond(body))
    }

    /// Queue an answer that arrives after `delay`.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        self.then(ReviewScript::Delayed(
            delay,
            verdict_body("ALLOW", 0, "late answer"),
        ))
    }

    /// Queue a failure.
    #[must_use]
    pub fn with_error(self, error: ReviewError) -> Self {
        self.then(ReviewScript::Fail(error))
    }

    /// Answer used once the queue is drained.
    #[must_use]
    pub fn with_default(mut self, default: ReviewScript) -> Self {
        self.default = default;
        self
    }

    fn then(self, step: ReviewScript) -> Self {
        if let Ok(mut guard) = self.script.lock() {
            guard.push_back(step);
        }
        self
    }

    /// Number of review calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Contexts the reviewer was shown, in call order.
    #[must_use]
    pub fn seen(&self) -> Vec<ReviewContext> {
        self.seen.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl Default for ScriptedReviewer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RiskReviewer for ScriptedReviewer {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn review(&self, context: &ReviewContext) -> ReviewResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.seen.lock() {
            guard.push(context.clone());
        }
        let step = self
            .script
            .lock()
            .ok()
            .and_then(|mut guard| guard.pop_front())
            .unwrap_or_else(|| self.default.clone());

        match step {
            ReviewScript::Respond(body) => Ok(body),
            ReviewScript::Delayed(delay, body) => {
                tokio::time::sleep(delay).await;
                Ok(body)
            },
            ReviewScript::Fail(error) => Err(error),
        }
    }
}

/// Build a well-formed reviewer body.
#[must_use]
pub fn verdict_body(decision: &str, score: i64, reason: &str) -> Value {
    json!({
        "decision": decision,
        "riskScore": score,
        "reasons": [reason],
    })
}

/// Executor that records every call and answers with a fixed result.
#[derive(Debug, Clone)]
pub struct RecordingExecutor {
    calls: Arc<Mutex<Vec<UpstreamCall>>>,
    failure: Option<String>,
}

impl RecordingExecutor {
    /// An executor whose calls all succeed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            failure: None,
        }
    }

    /// An executor whose calls all fail with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new()
        }
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<UpstreamCall> {
        self.calls.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpstreamExecutor for RecordingExecutor {
    async fn execute(&self, call: &UpstreamCall) -> Result<String, UpstreamError> {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push(call.clone());
        }
        match &self.failure {
            Some(message) => Err(UpstreamError(message.clone())),
            None => Ok(format!("{} {} ok", call.verb, call.path)),
        }
    }
}
