//! Line-based progress output driven by job events.

use std::time::{Duration, Instant};

use rangefetch::{JobEvent, ProgressStats};
use tokio::sync::mpsc::UnboundedReceiver;

const PRINT_INTERVAL: Duration = Duration::from_millis(500);
const MIB: f64 = 1_048_576.0;

pub async fn print_events(mut rx: UnboundedReceiver<JobEvent>) {
    let started = Instant::now();
    let mut last_print: Option<Instant> = None;
    let mut stats = ProgressStats {
        bytes_done: 0,
        total_bytes: 0,
        elapsed: Duration::ZERO,
    };

    while let Some(event) = rx.recv().await {
        match event {
            JobEvent::Started {
                file_name,
                total_size,
                segment_count,
            } => {
                stats.total_bytes = total_size;
                println!(
                    "downloading {} ({:.1} MiB, {} segment(s))",
                    file_name,
                    total_size as f64 / MIB,
                    segment_count
                );
            }
            JobEvent::Progress { total, .. } => {
                stats.bytes_done = stats.bytes_done.max(total);
                stats.elapsed = started.elapsed();
                let due = last_print.map_or(true, |t| t.elapsed() >= PRINT_INTERVAL);
                if due || stats.bytes_done >= stats.total_bytes {
                    println!("{}", format_line(&stats));
                    last_print = Some(Instant::now());
                }
            }
            JobEvent::SegmentFinished { .. } => {}
            JobEvent::Finished { success: false, .. } => println!("download failed"),
            JobEvent::Finished { .. } => {}
        }
    }
}

pub fn format_line(stats: &ProgressStats) -> String {
    let eta = stats
        .eta_secs()
        .map(|s| format!("{:.0}s", s))
        .unwrap_or_else(|| "?".to_string());
    format!(
        "  {:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s  ETA {}",
        stats.bytes_done as f64 / MIB,
        stats.total_bytes as f64 / MIB,
        stats.fraction() * 100.0,
        stats.bytes_per_sec() / MIB,
        eta
    )
}
