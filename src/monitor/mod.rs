//! Background memory monitor
//!
//! Samples system memory on a fixed interval, tracks the peak, fires
//! callbacks on state transitions and runs reclamation hooks while memory
//! usage is critical. It only observes; nothing in the search path depends
//! on it.

mod source;

pub use source::{MemorySnapshot, MemorySource, ProcMeminfo};

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Memory pressure state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryState {
    Normal,
    Warning,
    Critical,
}

impl std::fmt::Display for MemoryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
        })
    }
}

/// Monitor thresholds and interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    /// Usage percent at which the state becomes warning
    pub warning_threshold: f64,
    /// Usage percent at which the state becomes critical
    pub critical_threshold: f64,
    pub interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            warning_threshold: 70.0,
            critical_threshold: 85.0,
            interval: Duration::from_secs(5),
        }
    }
}

/// Callback receiving the current usage percent
pub type StateCallback = Arc<dyn Fn(f64) -> anyhow::Result<()> + Send + Sync>;

/// Hook releasing memory, returning the number of bytes or items freed
pub type ReclaimHook = Arc<dyn Fn() -> usize + Send + Sync>;

/// State machine shared by the monitor loop and synchronous callers
pub struct MemoryWatch {
    config: MonitorConfig,
    state: MemoryState,
    peak: f64,
    callbacks: Vec<(MemoryState, StateCallback)>,
    reclaimers: Vec<ReclaimHook>,
}

impl MemoryWatch {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            state: MemoryState::Normal,
            peak: 0.0,
            callbacks: Vec::new(),
            reclaimers: Vec::new(),
        }
    }

    /// Register a callback fired when the state changes to `state`
    pub fn on_state(&mut self, state: MemoryState, callback: StateCallback) {
        self.callbacks.push((state, callback));
    }

    /// Register a hook run on every critical observation
    pub fn add_reclaimer(&mut self, hook: ReclaimHook) {
        self.reclaimers.push(hook);
    }

    /// Classify a usage percent
    pub fn classify(&self, percent: f64) -> MemoryState {
        if percent >= self.config.critical_threshold {
            MemoryState::Critical
        } else if percent >= self.config.warning_threshold {
            MemoryState::Warning
        } else {
            MemoryState::Normal
        }
    }

    /// Process one observation, returning the new state if it changed
    pub fn observe(&mut self, percent: f64) -> Option<MemoryState> {
        if percent > self.peak {
            self.peak = percent;
        }

        let current = self.classify(percent);
        let changed = current != self.state;

        if changed {
            info!(
                "Memory state changed from {} to {} ({:.1}%)",
                self.state, current, percent
            );
            for (state, callback) in &self.callbacks {
                if *state == current {
                    if let Err(e) = callback(percent) {
                        error!("Memory callback failed: {}", e);
                    }
                }
            }
            self.state = current;
        }

        if current == MemoryState::Critical && !self.reclaimers.is_empty() {
            warn!("Memory usage critical: {:.1}%, running reclamation", percent);
            let freed: usize = self.reclaimers.iter().map(|hook| hook()).sum();
            info!("Reclamation hooks released {} units", freed);
        }

        changed.then_some(current)
    }

    pub fn state(&self) -> MemoryState {
        self.state
    }

    pub fn peak(&self) -> f64 {
        self.peak
    }
}

/// Handle to a running monitor task
pub struct MonitorHandle {
    watch: Arc<Mutex<MemoryWatch>>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stop the loop and return the peak usage percent
    pub async fn stop(self) -> f64 {
        let MonitorHandle {
            watch,
            shutdown,
            task,
        } = self;

        if shutdown.send(true).is_err() {
            debug!("Memory monitor loop already exited");
        }
        if let Err(e) = task.await {
            error!("Memory monitor task ended abnormally: {}", e);
        }
        let peak = watch.lock().map(|w| w.peak()).unwrap_or(0.0);
        info!("Memory monitor stopped, peak usage {:.1}%", peak);
        peak
    }
}

/// Memory monitor service
pub struct MemoryMonitor {
    source: Arc<dyn MemorySource>,
    watch: Arc<Mutex<MemoryWatch>>,
    running: bool,
}

impl MemoryMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self::with_source(config, Arc::new(ProcMeminfo::default()))
    }

    pub fn with_source(config: MonitorConfig, source: Arc<dyn MemorySource>) -> Self {
        Self {
            source,
            watch: Arc::new(Mutex::new(MemoryWatch::new(config))),
            running: false,
        }
    }

    /// Register a state transition callback
    pub fn on_state(&self, state: MemoryState, callback: StateCallback) {
        if let Ok(mut watch) = self.watch.lock() {
            watch.on_state(state, callback);
        }
    }

    /// Register a reclamation hook
    pub fn add_reclaimer(&self, hook: ReclaimHook) {
        if let Ok(mut watch) = self.watch.lock() {
            watch.add_reclaimer(hook);
        }
    }

    /// Current memory usage
    pub fn snapshot(&self) -> std::io::Result<MemorySnapshot> {
        self.source.sample()
    }

    /// Log current usage together with the peak
    pub fn log_report(&self) {
        let peak = self.watch.lock().map(|w| w.peak()).unwrap_or(0.0);
        match self.snapshot() {
            Ok(s) => info!(
                "Memory: {:.1}% used ({:.2} GB / {:.2} GB), {:.2} GB available, peak {:.1}%",
                s.percent, s.used_gb, s.total_gb, s.available_gb, peak
            ),
            Err(e) => debug!("Memory report unavailable: {}", e),
        }
    }

    /// Spawn the monitoring loop on the current Tokio runtime.
    ///
    /// Returns `None` if this monitor was already started.
    pub fn start(&mut self) -> Option<MonitorHandle> {
        if self.running {
            warn!("Memory monitor already running");
            return None;
        }
        self.running = true;

        let (shutdown, mut stopped) = watch::channel(false);
        let source = self.source.clone();
        let state = self.watch.clone();
        let (interval, warning, critical) = match self.watch.lock() {
            Ok(w) => (
                w.config.interval,
                w.config.warning_threshold,
                w.config.critical_threshold,
            ),
            Err(_) => {
                let d = MonitorConfig::default();
                (d.interval, d.warning_threshold, d.critical_threshold)
            }
        };

        info!(
            "Memory monitor started (warning {:.0}%, critical {:.0}%)",
            warning, critical
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stopped.changed() => break,
                }

                match source.sample() {
                    Ok(snapshot) => {
                        if let Ok(mut watch) = state.lock() {
                            watch.observe(snapshot.percent);
                        }
                    }
                    Err(e) => debug!("Memory sample failed: {}", e),
                }
            }
        });

        Some(MonitorHandle {
            watch: self.watch.clone(),
            shutdown,
            task,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source replaying a fixed series of readings, then repeating the last
    struct Scripted {
        readings: Mutex<Vec<f64>>,
    }

    impl MemorySource for Scripted {
        fn sample(&self) -> std::io::Result<MemorySnapshot> {
            let mut readings = self.readings.lock().unwrap();
            let percent = if readings.len() > 1 {
                readings.remove(0)
            } else {
                readings[0]
            };
            Ok(MemorySnapshot::from_percent(percent, 16.0))
        }
    }

    #[test]
    fn test_transitions_fire_callbacks() {
        let mut watch = MemoryWatch::new(MonitorConfig::default());
        let critical_calls = Arc::new(AtomicUsize::new(0));
        let reclaimed = Arc::new(AtomicUsize::new(0));

        let calls = critical_calls.clone();
        watch.on_state(
            MemoryState::Critical,
            Arc::new(move |_: f64| -> anyhow::Result<()> {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );
        watch.on_state(
            MemoryState::Warning,
            Arc::new(|_: f64| -> anyhow::Result<()> {
                Err(anyhow::anyhow!("callback failure is contained"))
            }),
        );
        let counter = reclaimed.clone();
        watch.add_reclaimer(Arc::new(move || -> usize {
            counter.fetch_add(1, Ordering::SeqCst);
            0
        }));

        assert_eq!(watch.observe(40.0), None);
        assert_eq!(watch.observe(72.0), Some(MemoryState::Warning));
        assert_eq!(watch.observe(90.0), Some(MemoryState::Critical));
        assert_eq!(watch.observe(91.0), None);
        assert_eq!(watch.observe(50.0), Some(MemoryState::Normal));

        assert_eq!(critical_calls.load(Ordering::SeqCst), 1);
        // reclamation runs on every critical observation
        assert_eq!(reclaimed.load(Ordering::SeqCst), 2);
        assert_eq!(watch.peak(), 91.0);
        assert_eq!(watch.state(), MemoryState::Normal);
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let watch = MemoryWatch::new(MonitorConfig::default());
        assert_eq!(watch.classify(69.9), MemoryState::Normal);
        assert_eq!(watch.classify(70.0), MemoryState::Warning);
        assert_eq!(watch.classify(85.0), MemoryState::Critical);
    }

    #[test]
    fn test_monitor_loop_tracks_peak() {
        tokio_test::block_on(async {
            let source = Arc::new(Scripted {
                readings: Mutex::new(vec![30.0, 88.0, 40.0]),
            });
            let config = MonitorConfig {
                interval: Duration::from_millis(5),
                ..Default::default()
            };
            let mut monitor = MemoryMonitor::with_source(config, source);
            let handle = monitor.start().unwrap();
            assert!(monitor.start().is_none());

            tokio::time::sleep(Duration::from_millis(60)).await;
            let peak = handle.stop().await;
            assert_eq!(peak, 88.0);
        });
    }
}
