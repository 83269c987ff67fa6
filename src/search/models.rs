//! Thread planning and progress types for dispatch

use std::sync::Arc;

/// How the thread budget is split between concurrent invocations and the
/// tool's own `--cpu` parallelism
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadPlan {
    /// Total thread budget
    pub budget: usize,
    /// Threads handed to each tool invocation
    pub tool_threads: usize,
}

impl ThreadPlan {
    /// Plan from an explicit budget, or the available parallelism
    pub fn new(budget: Option<usize>) -> Self {
        let budget = budget
            .filter(|b| *b > 0)
            .unwrap_or_else(available_threads);
        Self {
            budget,
            tool_threads: tool_threads(budget),
        }
    }

    /// Concurrent invocations for a given number of models
    pub fn workers(&self, model_count: usize) -> usize {
        self.budget.min(model_count).max(1)
    }
}

/// Per-invocation thread count: `max(1, min(2, budget / 4))`
pub fn tool_threads(budget: usize) -> usize {
    (budget / 4).clamp(1, 2)
}

fn available_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Reported once per completed model, in completion order
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Tasks completed so far, including this one
    pub completed: usize,
    /// Total submitted tasks
    pub total: usize,
    /// Model that just finished
    pub model: String,
    /// Hits parsed for the model (0 on failure)
    pub hits: usize,
    /// Whether the invocation succeeded
    pub succeeded: bool,
}

/// Callback invoked for each progress event
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;
