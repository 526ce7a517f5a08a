use std::sync::Once;

use colored::*;
use indicatif::ProgressStyle;
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▁▁▁▁▁", "▁▂▂▂▁", "▁▄▂▄▁", "▂▄▆▄▂", "▄▆█▆▄", "▂▄▆▄▂", "▁▄▂▄▁", "▁▂▂▂▁",
        ])
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.blue} [{bar:32.green/bright_black}] {pos}/{len} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("━╸ ")
}

/// Spinner while hosts are discovered, then a bar over the host pipelines.
///
/// The bar hangs off a tracing span and disappears when the handle is dropped.
pub struct ScanProgress {
    span: Span,
    sized: Once,
}

impl ScanProgress {
    pub fn start() -> Self {
        let span = info_span!("scan", indicatif.pb_show = true);
        span.pb_set_style(&spinner_style());
        span.pb_set_message(&format!("{}", "Discovering hosts...".italic()));
        span.pb_start();

        Self {
            span,
            sized: Once::new(),
        }
    }

    pub fn update(&self, completed: usize, total: usize) {
        self.sized.call_once(|| {
            self.span.pb_set_style(&bar_style());
            self.span.pb_set_message("hosts scanned");
        });
        self.span.pb_set_length(total as u64);
        self.span.pb_set_position(completed as u64);
    }
}
