use std::time::{Duration, Instant};

use anyhow::Context;
use colored::*;
use netmapper_common::success;
use netmapper_core::discovery::DiscoveryService;
use netmapper_core::model::ScanResult;

use crate::commands::CommandLine;
use crate::mprint;
use crate::terminal::progress::ScanProgress;
use crate::terminal::{colors, format, print};

pub async fn scan(args: &CommandLine) -> anyhow::Result<()> {
    let cfg = args.to_config();
    print::header("getting ready for scan", args.quiet);

    let service = DiscoveryService::system(cfg)
        .await
        .context("invalid scan configuration")?;
    print_parameters(args);

    let progress = ScanProgress::start();
    let service =
        service.with_progress(move |completed, total| progress.update(completed, total));

    let start_time = Instant::now();
    let outcome = service.run(&args.target, args.mode, args.detailed).await;
    drop(service);

    let results = outcome.with_context(|| format!("cannot scan '{}'", args.target))?;
    scan_ends(&results, start_time.elapsed(), args.quiet);
    Ok(())
}

fn print_parameters(args: &CommandLine) {
    if args.quiet > 0 {
        return;
    }
    print::set_key_width(&["Target", "Mode", "Detailed"]);
    print::aligned_line("Target", args.target.as_str());
    print::aligned_line("Mode", args.mode.to_string());
    print::aligned_line("Detailed", if args.detailed { "yes" } else { "no" });
}

fn scan_ends(results: &[ScanResult], total_time: Duration, q_level: u8) {
    if results.is_empty() {
        print::header("zero hosts detected", q_level);
        print::no_results();
        return;
    }

    if q_level > 0 {
        mprint!();
    }

    print::header("scan results", q_level);
    if q_level < 2 {
        print_results(results);
    }
    print_summary(results.len(), total_time, q_level);
}

fn print_results(results: &[ScanResult]) {
    for (idx, result) in results.iter().enumerate() {
        let name = result.hostname.as_deref().unwrap_or("No hostname");
        print::tree_head(idx, name);
        print::as_tree_one_level(format::result_details(result));
        if idx + 1 != results.len() {
            mprint!();
        }
    }
}

fn print_summary(hosts_len: usize, total_time: Duration, q_level: u8) {
    let active_hosts = format!("{hosts_len} active hosts").bold().green();
    let total_time = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output = format!("Scan Complete: {active_hosts} identified in {total_time}")
        .color(colors::TEXT_DEFAULT)
        .to_string();

    match q_level {
        0 => {
            print::fat_separator();
            print::centerln(&output);
        }
        _ => {
            mprint!();
            success!("{output}");
        }
    }
}
