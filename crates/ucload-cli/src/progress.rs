use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner that turns into a byte-counting bar once the download size is known
pub fn download_bar() -> ProgressBar {
    spinner("Downloading...")
}

/// Callback for [`ucload_pm::DownloadManager::acquire_with_progress`]
pub fn tracker(pb: &ProgressBar) -> impl Fn(u64, u64) + Send + Sync {
    let pb = pb.clone();
    move |downloaded, total| {
        if total > 0 && pb.length() != Some(total) {
            pb.set_length(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {msg}")
                    .unwrap()
                    .progress_chars("#>-"),
            );
        }
        if total == 0 {
            pb.set_message(format!("Downloading... {}", format_bytes(downloaded)));
        }
        pb.set_position(downloaded);
    }
}

pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    pb
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(100 * 1024 * 1024), "100.0 MiB");
    }

    #[test]
    fn test_tracker_sets_length_once_known() {
        let pb = ProgressBar::hidden();
        let track = tracker(&pb);
        track(10, 0);
        assert_eq!(pb.position(), 10);
        track(50, 200);
        assert_eq!(pb.length(), Some(200));
        assert_eq!(pb.position(), 50);
    }
}
