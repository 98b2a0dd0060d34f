use std::io::{self, Write};
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Level {
    Info,
    Warn,
}

/// Timestamped status lines on stderr. Stdout carries only results.
pub struct ConsoleProgress {
    enabled: bool,
    t0: Instant,
}

impl ConsoleProgress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            t0: Instant::now(),
        }
    }

    pub fn silent() -> Self {
        Self::new(false)
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.log(Level::Info, msg.as_ref());
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.log(Level::Warn, msg.as_ref());
    }

    /// Reports `current/total`, but only every `every` steps and on the last one.
    pub fn progress(&self, label: &str, current: usize, total: usize, every: usize) {
        let total = total.max(1);
        let current = current.min(total);
        if current != total && current % every.max(1) != 0 {
            return;
        }
        let pct = (current as f64 / total as f64) * 100.0;
        self.log(
            Level::Info,
            &format!("{label} {current}/{total} ({pct:5.1}%)"),
        );
    }

    fn log(&self, level: Level, msg: &str) {
        if !self.enabled {
            return;
        }
        let ts = fmt_elapsed(self.t0.elapsed().as_secs_f64());
        let mut stderr = io::stderr().lock();
        let _ = match level {
            Level::Info => writeln!(stderr, "[{ts}] {msg}"),
            Level::Warn => writeln!(stderr, "[{ts}] WARN {msg}"),
        };
    }
}

fn fmt_elapsed(seconds: f64) -> String {
    let seconds = seconds.max(0.0) as u64;
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
