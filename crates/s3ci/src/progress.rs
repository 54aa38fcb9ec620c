//! 📊 progress.rs: "Are we there yet?" asks every download, every time, forever.
//!
//! 🚀 Answers the age-old question: "how fast is this tarball coming down?"
//! With cold hard numbers and a progress bar on stderr. Stdout is reserved for the
//! binary path, and we will not be the ones to pollute it.
//!
//! ⚠️  Warning: Watching this progress bar will not make it go faster.
//! Neither will refreshing it. We've tried. Science says no.
//!
//! 🦆 The duck has nothing to do with this module. It's just vibing.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

// -- 📏 one mebibyte, not a megabyte, pedants. there's a difference and I will die on this hill.
const MIB: u64 = 1024 * 1024;

// -- ⏱️ rates are averaged over this much recent history so spikes don't scare anyone
const RATE_WINDOW: Duration = Duration::from_secs(5);

/// 📦 Converts raw bytes into a human-readable string scaled to the total size.
/// Because "1073741824 bytes" is a war crime in a UI.
fn format_bytes(bytes: u64, total_size: u64) -> String {
    if total_size >= 512 * MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if total_size >= MIB {
        format!("{:.2} KiB", bytes as f64 / 1024.0)
    } else {
        // -- 🐛 raw bytes mode. small tarballs need love too.
        format!("{} bytes", bytes)
    }
}

/// ⏱️ Formats a Duration into MM:SS or HH:MM:SS.
/// If it shows HH:MM:SS, you should probably call your mom. It's been a while.
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 📊 Tracks bytes, rate and ETA for one object download.
///
/// # Ancient Proverb
/// "He who downloads without a progress bar, downloads alone and in darkness."
pub(crate) struct DownloadProgress {
    /// 🏷️ usually `s3://bucket/key`
    label: String,
    /// 📏 total size in bytes, 0 if the store wouldn't say
    total_size: u64,
    /// 📦 bytes written so far
    total_bytes: u64,
    progress_bar: ProgressBar,
    /// 🔄 sliding window of (timestamp, bytes) for rate calculation
    rate_samples: VecDeque<(Instant, u64)>,
    start_time: Instant,
}

impl std::fmt::Debug for DownloadProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("DownloadProgress")
            .field("label", &self.label)
            .field("total_size", &self.total_size)
            .field("total_bytes", &self.total_bytes)
            .finish()
    }
}

impl DownloadProgress {
    /// 🚀 Pass 0 for `total_size` when the size is a mystery; the bar copes.
    pub(crate) fn new(label: String, total_size: u64) -> Self {
        let progress_bar = ProgressBar::new(total_size);
        let the_style = ProgressStyle::default_bar()
            .template("{msg}\n| [{bar:40.cyan/blue}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        progress_bar.set_style(the_style);

        let start_time = Instant::now();
        // -- 🔄 seed the rate window with t=0 so we don't divide by zero like animals
        let mut rate_samples = VecDeque::new();
        rate_samples.push_back((start_time, 0u64));

        Self {
            label,
            total_size,
            total_bytes: 0,
            progress_bar,
            rate_samples,
            start_time,
        }
    }

    /// 🔄 Record another chunk landing on disk.
    pub(crate) fn update(&mut self, bytes_written: u64) {
        self.total_bytes += bytes_written;
        let the_rate = self.mib_per_sec();
        self.render(the_rate);
        self.progress_bar.set_position(self.total_bytes);
    }

    /// ✅ Ring the bell. We made it.
    pub(crate) fn finish(&self) {
        self.progress_bar.finish();
    }

    fn mib_per_sec(&mut self) -> f64 {
        let now = Instant::now();
        while let Some(&(timestamp, _)) = self.rate_samples.front() {
            if now.duration_since(timestamp) > RATE_WINDOW {
                self.rate_samples.pop_front();
            } else {
                break;
            }
        }
        self.rate_samples.push_back((now, self.total_bytes));

        match self.rate_samples.front() {
            Some(&(oldest_time, oldest_bytes)) => {
                let elapsed = now.duration_since(oldest_time).as_secs_f64();
                if elapsed > 0.0 {
                    let bytes_delta = self.total_bytes.saturating_sub(oldest_bytes);
                    (bytes_delta as f64 / elapsed) / MIB as f64
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }

    fn percent(&self) -> f64 {
        if self.total_size > 0 {
            (self.total_bytes as f64 / self.total_size as f64) * 100.0
        } else {
            0.0
        }
    }

    fn render(&self, mib_per_sec: f64) {
        let percent = self.percent();
        let elapsed = self.start_time.elapsed();
        let remaining = if percent > 0.0 {
            // 🔮 linear extrapolation, assumes the future looks like the past
            let total_estimated = elapsed.as_secs_f64() / (percent / 100.0);
            let remaining_secs = total_estimated - elapsed.as_secs_f64();
            if remaining_secs > 0.0 {
                format_duration(Duration::from_secs_f64(remaining_secs))
            } else {
                "--:--".to_string()
            }
        } else {
            "--:--".to_string()
        };

        self.progress_bar.set_message(format!(
            "source: {}\n  {:.2} MiB/s  {} / {}  {:.2}%  {} elapsed  {} remaining",
            self.label,
            mib_per_sec,
            format_bytes(self.total_bytes, self.total_size),
            format_bytes(self.total_size, self.total_size),
            percent,
            format_duration(elapsed),
            remaining
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_bytes_are_scaled_to_the_total() {
        assert_eq!(format_bytes(512, 1000), "512 bytes");
        assert_eq!(format_bytes(2048, 2 * MIB), "2.00 KiB");
        assert_eq!(format_bytes(MIB, 1024 * MIB), "1.00 MiB");
    }

    #[test]
    fn the_one_where_durations_grow_an_hours_column_when_needed() {
        assert_eq!(format_duration(Duration::from_secs(65)), "01:05");
        assert_eq!(format_duration(Duration::from_secs(3_725)), "01:02:05");
    }

    #[test]
    fn the_one_where_updates_add_up() {
        let mut the_progress = DownloadProgress::new("s3://b/k".to_string(), 100);
        the_progress.update(40);
        the_progress.update(60);
        assert_eq!(the_progress.total_bytes, 100);
        assert!((the_progress.percent() - 100.0).abs() < f64::EPSILON);
        the_progress.finish();
    }

    #[test]
    fn the_one_where_an_unknown_size_never_claims_progress() {
        let mut the_progress = DownloadProgress::new("s3://b/k".to_string(), 0);
        the_progress.update(1234);
        assert_eq!(the_progress.percent(), 0.0);
    }
}
