// ─── Progress Surface ───
// The only view the launcher has of whatever shows progress to the user
// (native window, web page, nothing at all).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{error, info};

/// Capability set the launch pipeline depends on.
pub trait ProgressSink: Send + Sync {
    fn start(&self, window_title: &str);
    fn set_title(&self, title: &str);
    fn send_text(&self, text: &str);
    fn send_error(&self, message: &str);
    fn close(&self);
    fn set_progress_max(&self, max: usize);
    fn step_progress(&self);
    /// The user dismissed the surface; treated as a cancellation request.
    fn is_closed(&self) -> bool;
}

/// Shared cancellation signal. Polled at checkpoints, never used to abort
/// in-flight I/O.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress surface plus cancellation flag, cloned into every worker.
#[derive(Clone)]
pub struct LaunchContext {
    pub progress: Arc<dyn ProgressSink>,
    pub cancel: CancelFlag,
}

impl LaunchContext {
    pub fn new(progress: Arc<dyn ProgressSink>, cancel: CancelFlag) -> Self {
        Self { progress, cancel }
    }

    pub fn headless() -> Self {
        Self::new(Arc::new(HeadlessProgress::new()), CancelFlag::new())
    }

    /// Either the caller cancelled or the user closed the progress surface.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.progress.is_closed()
    }
}

/// Surface with no UI: text goes to the log, counters are kept for callers
/// and tests.
#[derive(Debug, Default)]
pub struct HeadlessProgress {
    title: Mutex<String>,
    closed: AtomicBool,
    max: AtomicUsize,
    steps: AtomicUsize,
    messages: Mutex<Vec<String>>,
}

impl HeadlessProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> usize {
        self.steps.load(Ordering::SeqCst)
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }

    pub fn title(&self) -> String {
        self.title.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl ProgressSink for HeadlessProgress {
    fn start(&self, window_title: &str) {
        info!("starting {}", window_title);
    }

    fn set_title(&self, title: &str) {
        if let Ok(mut current) = self.title.lock() {
            *current = title.to_string();
        }
    }

    fn send_text(&self, text: &str) {
        info!("{}", text.trim_end());
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(text.trim_end().to_string());
        }
    }

    fn send_error(&self, message: &str) {
        error!("{}", message);
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(format!("Error: {message}"));
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn set_progress_max(&self, max: usize) {
        self.max.store(max, Ordering::SeqCst);
    }

    fn step_progress(&self) {
        self.steps.fetch_add(1, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Text-only surface on stderr for interactive command-line runs.
#[derive(Debug, Default)]
pub struct ConsoleProgress {
    max: AtomicUsize,
    steps: AtomicUsize,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self) -> String {
        let max = self.max.load(Ordering::SeqCst);
        if max == 0 {
            return String::new();
        }
        let steps = self.steps.load(Ordering::SeqCst).min(max);
        format!("[{}%] ", steps * 100 / max)
    }
}

impl ProgressSink for ConsoleProgress {
    fn start(&self, window_title: &str) {
        eprintln!("{window_title}");
    }

    fn set_title(&self, title: &str) {
        if !title.is_empty() {
            eprintln!("{title}");
        }
    }

    fn send_text(&self, text: &str) {
        info!("{}", text.trim_end());
        eprintln!("{}{}", self.counter(), text.trim_end());
    }

    fn send_error(&self, message: &str) {
        eprintln!("Error: {message}");
    }

    fn close(&self) {}

    fn set_progress_max(&self, max: usize) {
        self.max.store(max, Ordering::SeqCst);
    }

    fn step_progress(&self) {
        self.steps.fetch_add(1, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closing_the_surface_cancels() {
        let progress = Arc::new(HeadlessProgress::new());
        let ctx = LaunchContext::new(progress.clone(), CancelFlag::new());
        assert!(!ctx.is_cancelled());
        progress.close();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        other.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn headless_counts_steps() {
        let progress = HeadlessProgress::new();
        progress.set_progress_max(7);
        progress.step_progress();
        progress.step_progress();
        progress.send_text("Downloading JAR a.jar\n");
        assert_eq!(progress.max(), 7);
        assert_eq!(progress.steps(), 2);
        assert_eq!(progress.messages(), vec!["Downloading JAR a.jar"]);
    }

    #[test]
    fn console_counter_is_a_percentage() {
        let progress = ConsoleProgress::new();
        assert_eq!(progress.counter(), "");
        progress.set_progress_max(4);
        progress.step_progress();
        assert_eq!(progress.counter(), "[25%] ");
    }
}
