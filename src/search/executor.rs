//! Search dispatch across all models

use super::models::{ProgressCallback, ProgressEvent, ThreadPlan};
use super::tool::SearchTool;
use crate::catalog::{Model, ModelCatalog};
use crate::error::{Error, Result, ToolError};
use crate::results::{parse_tblout, HitCollection, HitRecord, ModelTiming};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Outcome of a single model's search
struct TaskOutcome {
    model: String,
    elapsed: Duration,
    result: std::result::Result<Vec<HitRecord>, ToolError>,
}

/// Dispatcher that runs one search per model with bounded concurrency
pub struct Dispatcher {
    /// Tool invoked per model
    tool: Arc<dyn SearchTool>,
    /// Thread budget split
    plan: ThreadPlan,
    /// Optional progress callback
    progress: Option<ProgressCallback>,
}

impl Dispatcher {
    /// Create a new dispatcher. `threads` overrides the available parallelism.
    pub fn new(tool: Arc<dyn SearchTool>, threads: Option<usize>) -> Self {
        Self {
            tool,
            plan: ThreadPlan::new(threads),
            progress: None,
        }
    }

    /// Set a callback invoked once per completed model
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn plan(&self) -> ThreadPlan {
        self.plan
    }

    /// Search `input` with every model in the catalog.
    ///
    /// Returns once every task has finished. A failing model contributes zero
    /// hits and is recorded in the collection's failures; it never aborts the
    /// other tasks. Hits are appended in completion order.
    pub async fn dispatch(&self, catalog: &ModelCatalog, input: &Path) -> Result<HitCollection> {
        if !input.is_file() {
            return Err(Error::InputNotFound(input.to_path_buf()));
        }

        let total = catalog.len();
        let workers = self.plan.workers(total);

        info!(
            "Searching {} with {} models from {} ({} concurrent, --cpu {} each)",
            input.display(),
            total,
            catalog.dir().display(),
            workers,
            self.plan.tool_threads
        );

        let mut outcomes = stream::iter(catalog.models())
            .map(|model| self.run_model(model, input))
            .buffer_unordered(workers);

        let mut collection = HitCollection::new();
        let mut completed = 0;

        while let Some(outcome) = outcomes.next().await {
            completed += 1;
            let model = outcome.model.clone();
            let (hits, succeeded) = self.record(&mut collection, outcome);

            let event = ProgressEvent {
                completed,
                total,
                model,
                hits,
                succeeded,
            };
            info!(
                "[{}/{}] {} finished with {} hits",
                event.completed, event.total, event.model, event.hits
            );
            if let Some(callback) = &self.progress {
                callback(&event);
            }
        }

        info!(
            "Search complete: {} hits from {} models ({} failed)",
            collection.hit_count(),
            total,
            collection.failures().len()
        );

        Ok(collection)
    }

    /// Blocking form of [`dispatch`](Self::dispatch) for synchronous callers.
    ///
    /// Must not be called from inside a Tokio runtime.
    pub fn dispatch_blocking(&self, catalog: &ModelCatalog, input: &Path) -> Result<HitCollection> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(Error::Runtime)?;
        runtime.block_on(self.dispatch(catalog, input))
    }

    /// Run one model, converting any error or panic into an outcome value
    async fn run_model(&self, model: &Model, input: &Path) -> TaskOutcome {
        let start = Instant::now();

        let result = match AssertUnwindSafe(self.search_model(model, input))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(ToolError::Panicked(panic_message(panic.as_ref()))),
        };

        TaskOutcome {
            model: model.id.clone(),
            elapsed: start.elapsed(),
            result,
        }
    }

    async fn search_model(
        &self,
        model: &Model,
        input: &Path,
    ) -> std::result::Result<Vec<HitRecord>, ToolError> {
        let lines = self
            .tool
            .search(model, input, self.plan.tool_threads)
            .await?;
        debug!("{} produced {} output lines", model.id, lines.len());
        Ok(parse_tblout(&lines, &model.id))
    }

    /// Fold an outcome into the collection, returning (hit count, success)
    fn record(&self, collection: &mut HitCollection, outcome: TaskOutcome) -> (usize, bool) {
        let (hits, succeeded) = match outcome.result {
            Ok(hits) => {
                let count = hits.len();
                collection.extend_hits(hits);
                (count, true)
            }
            Err(e) => {
                log_failure(self.tool.name(), &outcome.model, &e);
                collection.add_failure(outcome.model.clone(), e.to_string());
                (0, false)
            }
        };

        collection.add_timing(ModelTiming {
            model: outcome.model,
            elapsed_ms: outcome.elapsed.as_millis() as u64,
            hit_count: hits,
        });

        (hits, succeeded)
    }
}

fn log_failure(tool: &str, model: &str, err: &ToolError) {
    error!("{} failed for model {}: {}", tool, model, err);
    if let ToolError::Failed { stdout, stderr, .. } = err {
        if !stdout.trim().is_empty() {
            error!("stdout: {}", stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            error!("stderr: {}", stderr.trim_end());
        }
    } else {
        warn!("Treating model {} as having no hits", model);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory tool returning canned output per model id
    struct FakeTool {
        outputs: HashMap<String, std::result::Result<Vec<String>, String>>,
        delays: HashMap<String, u64>,
    }

    #[async_trait]
    impl SearchTool for FakeTool {
        fn name(&self) -> &str {
            "fake"
        }

        async fn search(
            &self,
            model: &Model,
            _input: &Path,
            _cpu: usize,
        ) -> std::result::Result<Vec<String>, ToolError> {
            if let Some(ms) = self.delays.get(&model.id) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            match self.outputs.get(&model.id) {
                Some(Ok(lines)) => Ok(lines.clone()),
                Some(Err(msg)) if msg == "panic" => panic!("tool blew up"),
                Some(Err(msg)) => Err(ToolError::Failed {
                    binary: "fake".to_string(),
                    status: "exit status: 1".to_string(),
                    stdout: String::new(),
                    stderr: msg.clone(),
                }),
                None => Ok(vec![]),
            }
        }
    }

    fn rows(model: &str, n: usize) -> Vec<String> {
        let mut lines = vec!["# comment".to_string()];
        for i in 0..n {
            lines.push(format!("prot{}_{} - {} - 1e-{} 50.0 0.1 1e-5 49.0", model, i, model, 10 + i));
        }
        lines
    }

    fn catalog(ids: &[&str]) -> ModelCatalog {
        let models = ids
            .iter()
            .map(|id| Model::new(*id, format!("/models/{}.hmm", id)))
            .collect();
        ModelCatalog::from_models("/models", models, "hmm").unwrap()
    }

    fn input_file() -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), ">p1\nMKV\n").unwrap();
        file
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_dispatch() {
        let mut outputs = HashMap::new();
        outputs.insert("cas1".to_string(), Ok(rows("cas1", 2)));
        outputs.insert("cas2".to_string(), Err("segfault".to_string()));
        outputs.insert("cas3".to_string(), Ok(rows("cas3", 3)));
        let tool = FakeTool {
            outputs,
            delays: HashMap::new(),
        };

        let input = input_file();
        let dispatcher = Dispatcher::new(Arc::new(tool), Some(4));
        let collection = dispatcher
            .dispatch(&catalog(&["cas1", "cas2", "cas3"]), input.path())
            .await
            .unwrap();

        assert_eq!(collection.hit_count(), 5);
        assert_eq!(collection.failures().len(), 1);
        assert_eq!(collection.failures()[0].model, "cas2");
        assert_eq!(collection.timings().len(), 3);
    }

    #[tokio::test]
    async fn test_panicking_task_is_isolated() {
        let mut outputs = HashMap::new();
        outputs.insert("cas1".to_string(), Err("panic".to_string()));
        outputs.insert("cas9".to_string(), Ok(rows("cas9", 1)));
        let tool = FakeTool {
            outputs,
            delays: HashMap::new(),
        };

        let input = input_file();
        let dispatcher = Dispatcher::new(Arc::new(tool), Some(2));
        let collection = dispatcher
            .dispatch(&catalog(&["cas1", "cas9"]), input.path())
            .await
            .unwrap();

        assert_eq!(collection.hit_count(), 1);
        assert!(collection.failures()[0].error.contains("tool blew up"));
    }

    #[tokio::test]
    async fn test_completion_order() {
        let mut outputs = HashMap::new();
        outputs.insert("a_slow".to_string(), Ok(rows("a_slow", 1)));
        outputs.insert("b_fast".to_string(), Ok(rows("b_fast", 1)));
        let mut delays = HashMap::new();
        delays.insert("a_slow".to_string(), 200);

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let input = input_file();
        let dispatcher = Dispatcher::new(Arc::new(FakeTool { outputs, delays }), Some(2))
            .with_progress(Arc::new(move |e: &ProgressEvent| {
                sink.lock().unwrap().push((e.completed, e.model.clone()));
            }));

        let collection = dispatcher
            .dispatch(&catalog(&["a_slow", "b_fast"]), input.path())
            .await
            .unwrap();

        // a_slow is submitted first but finishes last
        assert_eq!(collection.hits()[0].source_model, "b_fast");
        assert_eq!(collection.hits()[1].source_model, "a_slow");
        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![(1, "b_fast".to_string()), (2, "a_slow".to_string())]
        );
    }

    #[tokio::test]
    async fn test_missing_input_is_fatal() {
        let tool = FakeTool {
            outputs: HashMap::new(),
            delays: HashMap::new(),
        };
        let dispatcher = Dispatcher::new(Arc::new(tool), Some(1));
        let err = dispatcher
            .dispatch(&catalog(&["cas1"]), Path::new("/no/such/input.faa"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InputNotFound(_)));
    }

    #[test]
    fn test_dispatch_blocking() {
        let mut outputs = HashMap::new();
        outputs.insert("cas9".to_string(), Ok(rows("cas9", 2)));
        let tool = FakeTool {
            outputs,
            delays: HashMap::new(),
        };

        let input = input_file();
        let dispatcher = Dispatcher::new(Arc::new(tool), Some(1));
        let collection = dispatcher
            .dispatch_blocking(&catalog(&["cas9"]), input.path())
            .unwrap();
        assert_eq!(collection.hit_count(), 2);
    }
}
