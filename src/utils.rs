// utils.rs
use crate::runner::events::{ConversionEvent, ConversionOutcome, EventSink};
use parking_lot::Mutex;
use std::fmt;
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Conversion log panel feed. Each line gets a wall-clock prefix and is
/// appended by a helper thread, so the runner never waits on the panel lock.
pub struct Logger {
    lines: mpsc::Sender<String>,
}

impl Logger {
    pub fn new(panel: Arc<Mutex<Vec<String>>>) -> Self {
        let (lines, incoming) = mpsc::channel::<String>();
        thread::spawn(move || incoming.into_iter().for_each(|line| panel.lock().push(line)));
        Logger { lines }
    }

    pub fn log(&self, message: impl fmt::Display) {
        let stamped = format!("[{}] {}", chrono::Local::now().format("%H:%M:%S%.3f"), message);
        // The panel may already be gone when a window closes mid-run.
        let _ = self.lines.send(stamped);
    }
}

impl EventSink for Logger {
    fn emit(&self, event: ConversionEvent) {
        match event {
            // Percentages are already visible on the progress bar.
            ConversionEvent::Progress(_) => {}
            ConversionEvent::Status(message) => self.log(message),
            ConversionEvent::Error(message) => self.log(format_args!("error: {}", message)),
            ConversionEvent::FileFinished(report) => {
                let source = report.source.display();
                match (report.outcome, report.compression_rate()) {
                    (ConversionOutcome::Succeeded, Some(rate)) => self.log(format_args!(
                        "{} converted, size reduced by {:.2}%",
                        source,
                        rate * 100.0
                    )),
                    (ConversionOutcome::Succeeded, None) => {
                        self.log(format_args!("{} converted", source))
                    }
                    (ConversionOutcome::Failed(kind), _) => {
                        self.log(format_args!("{} failed: {}", source, kind))
                    }
                };
            }
            ConversionEvent::Completed { succeeded, failed } => self.log(format_args!(
                "Conversion complete: {} succeeded, {} failed",
                succeeded, failed
            )),
        }
    }
}

/// Runs one pipeline stage and logs its duration at debug level.
pub fn timed<T>(stage: &str, target: &Path, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    log::debug!("{} {} took {:?}", stage, target.display(), start.elapsed());
    result
}

/// Logs system memory at debug level; decoded buffers dominate our footprint.
pub fn log_memory_usage(context: &str) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    match sys_info::mem_info() {
        Ok(mem) => log::debug!(
            "{}: memory total {} MB, free {} MB, used {} MB",
            context,
            mem.total / 1024,
            mem.free / 1024,
            mem.total.saturating_sub(mem.free) / 1024
        ),
        Err(e) => log::debug!("{}: memory info unavailable: {}", context, e),
    }
}
