//! Progress reporting for long parse and conversion passes.
//!
//! Progress is a side channel only. Disabled bars are hidden and cost
//! next to nothing.

use indicatif::{ProgressBar, ProgressStyle};

/// Spinner for passes whose length is unknown up front.
pub(crate) fn spinner(enabled: bool, label: &str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template(&format!(
        "{{spinner:.green}} [{}] [{{elapsed_precise}}] {{pos}} samples",
        label
    ))
    .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb
}

/// Bar for passes over a known number of items.
pub(crate) fn bar(enabled: bool, len: u64, label: &str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    let style = ProgressStyle::with_template(&format!(
        "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
        label
    ))
    .map(|style| style.progress_chars("#>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}
