//! Terminal progress output for downloads.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::downloader::{
    BatchDownloadResult, BatchProgressCallback, DownloadStatus, DownloadTask, ProgressCallback,
};

const BAR_WIDTH: usize = 30;
const MAX_LISTED_ERRORS: usize = 5;

/// Human-readable byte count: `512B`, `1.5KB`, `3.2MB`, `1.0GB`.
pub fn format_size(size: u64) -> String {
    const KB: f64 = 1024.0;
    let bytes = size as f64;
    if bytes < KB {
        format!("{}B", size)
    } else if bytes < KB * KB {
        format!("{:.1}KB", bytes / KB)
    } else if bytes < KB * KB * KB {
        format!("{:.1}MB", bytes / (KB * KB))
    } else {
        format!("{:.1}GB", bytes / (KB * KB * KB))
    }
}

pub fn format_speed(bytes_per_sec: f64) -> String {
    format!("{}/s", format_size(bytes_per_sec.max(0.0) as u64))
}

/// Single-line progress bar for one download at a time.
#[derive(Debug)]
pub struct SimpleProgressDisplay {
    show_speed: bool,
    /// Time and byte count of the previous update.
    last: Mutex<Option<(Instant, u64)>>,
}

impl Default for SimpleProgressDisplay {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SimpleProgressDisplay {
    pub fn new(show_speed: bool) -> Self {
        Self {
            show_speed,
            last: Mutex::new(None),
        }
    }

    /// The line shown for `task`.
    pub fn render(&self, task: &DownloadTask) -> String {
        match task.status {
            DownloadStatus::Pending => format!("⏳ Preparing {}...", task.filename),
            DownloadStatus::Completed => format!(
                "✅ {} downloaded ({})",
                task.filename,
                format_size(task.downloaded)
            ),
            DownloadStatus::Failed => format!(
                "❌ {} failed: {}",
                task.filename,
                task.error.as_deref().unwrap_or("unknown error")
            ),
            DownloadStatus::Downloading => {
                let speed = self.speed(task).map(|s| format!(" {}", format_speed(s)));
                match task.fraction() {
                    Some(fraction) => {
                        let filled = (fraction * BAR_WIDTH as f64) as usize;
                        format!(
                            "{} [{}{}] {:.1}% ({}/{}){}",
                            task.filename,
                            "█".repeat(filled),
                            "-".repeat(BAR_WIDTH - filled),
                            fraction * 100.0,
                            format_size(task.downloaded),
                            format_size(task.total_size),
                            speed.unwrap_or_default()
                        )
                    }
                    None => format!(
                        "{} {}{}",
                        task.filename,
                        format_size(task.downloaded),
                        speed.unwrap_or_default()
                    ),
                }
            }
        }
    }

    /// Print `task`, redrawing the current line while it is in flight.
    pub fn display(&self, task: &DownloadTask) {
        let line = self.render(task);
        match task.status {
            DownloadStatus::Downloading => {
                print!("\r{}", line);
                let _ = std::io::stdout().flush();
            }
            DownloadStatus::Pending => println!("{}", line),
            DownloadStatus::Completed | DownloadStatus::Failed => {
                self.reset();
                println!("\r{}", line);
            }
        }
    }

    pub fn into_callback(self) -> ProgressCallback {
        Arc::new(move |task: &DownloadTask| self.display(task))
    }

    fn speed(&self, task: &DownloadTask) -> Option<f64> {
        if !self.show_speed {
            return None;
        }
        let now = Instant::now();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let speed = (*last).and_then(|(at, downloaded)| {
            let secs = now.duration_since(at).as_secs_f64();
            (secs > 0.0 && task.downloaded >= downloaded)
                .then(|| (task.downloaded - downloaded) as f64 / secs)
        });
        *last = Some((now, task.downloaded));
        speed
    }

    fn reset(&self) {
        *self.last.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// `current/total` line for sequential batch downloads.
#[derive(Debug, Default)]
pub struct BatchProgressDisplay;

impl BatchProgressDisplay {
    pub fn new() -> Self {
        Self
    }

    pub fn render(current: usize, total: usize, title: &str) -> String {
        let percent = if total > 0 {
            current as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        format!(
            "📦 Batch: {}/{} ({:.1}%) - current: {}",
            current, total, percent, title
        )
    }

    pub fn update(&self, current: usize, total: usize, title: &str) {
        print!("\r{}", Self::render(current, total, title));
        let _ = std::io::stdout().flush();
    }

    pub fn into_callback(self) -> BatchProgressCallback {
        Arc::new(move |current: usize, total: usize, title: &str| self.update(current, total, title))
    }

    /// Summary of a finished batch, listing at most five failures.
    pub fn summary(result: &BatchDownloadResult) -> String {
        let mut out = format!(
            "✅ Batch finished!\n   Succeeded: {}\n   Failed: {}",
            result.successful.len(),
            result.failed.len()
        );
        if !result.failed.is_empty() {
            out.push_str("\n\n❌ Errors:");
            for (title, error) in result.failed.iter().take(MAX_LISTED_ERRORS) {
                out.push_str(&format!("\n   - {}: {}", title, error));
            }
            if result.failed.len() > MAX_LISTED_ERRORS {
                out.push_str(&format!(
                    "\n   ... and {} more",
                    result.failed.len() - MAX_LISTED_ERRORS
                ));
            }
        }
        out
    }

    pub fn finish(&self, result: &BatchDownloadResult) {
        println!("\n{}", Self::summary(result));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(status: DownloadStatus, downloaded: u64, total: u64) -> DownloadTask {
        let mut task = DownloadTask::new("https://cdn/a.m4s", "out/song.m4a");
        task.status = status;
        task.downloaded = downloaded;
        task.total_size = total;
        task
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0B");
        assert_eq!(format_size(1023), "1023B");
        assert_eq!(format_size(1536), "1.5KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0GB");
        assert_eq!(format_speed(2048.0), "2.0KB/s");
    }

    #[test]
    fn test_render_bar() {
        let display = SimpleProgressDisplay::new(false);
        let line = display.render(&task(DownloadStatus::Downloading, 512, 1024));
        assert_eq!(
            line,
            format!(
                "song.m4a [{}{}] 50.0% (512B/1.0KB)",
                "█".repeat(15),
                "-".repeat(15)
            )
        );
    }

    #[test]
    fn test_render_unknown_size_and_states() {
        let display = SimpleProgressDisplay::new(false);
        assert_eq!(
            display.render(&task(DownloadStatus::Downloading, 2048, 0)),
            "song.m4a 2.0KB"
        );
        assert_eq!(
            display.render(&task(DownloadStatus::Completed, 2048, 2048)),
            "✅ song.m4a downloaded (2.0KB)"
        );
        let mut failed = task(DownloadStatus::Failed, 0, 0);
        failed.error = Some("HTTP 404".into());
        assert_eq!(display.render(&failed), "❌ song.m4a failed: HTTP 404");
        assert!(display
            .render(&task(DownloadStatus::Pending, 0, 0))
            .contains("song.m4a"));
    }

    #[test]
    fn test_speed_needs_two_samples() {
        let display = SimpleProgressDisplay::new(true);
        let first = display.render(&task(DownloadStatus::Downloading, 100, 1000));
        assert!(!first.contains("/s"));
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = display.render(&task(DownloadStatus::Downloading, 600, 1000));
        assert!(second.ends_with("/s"));
    }

    #[test]
    fn test_batch_render() {
        assert_eq!(
            BatchProgressDisplay::render(1, 4, "song"),
            "📦 Batch: 1/4 (25.0%) - current: song"
        );
        assert!(BatchProgressDisplay::render(0, 0, "").contains("(0.0%)"));
    }

    #[test]
    fn test_summary_caps_errors() {
        let result = BatchDownloadResult {
            failed: (0..7).map(|i| (format!("v{}", i), "boom".into())).collect(),
            ..Default::default()
        };
        let summary = BatchProgressDisplay::summary(&result);
        assert!(summary.contains("Failed: 7"));
        assert!(summary.contains("v4: boom"));
        assert!(!summary.contains("v5: boom"));
        assert!(summary.ends_with("... and 2 more"));
    }
}
