use std::fmt;

use colored::*;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

/// Events on this target are printed verbatim, without a level symbol.
pub const PRINT_TARGET: &str = "netmapper::print";

pub struct NetmapperFormatter;

#[derive(Default)]
struct EventFields {
    message: String,
    raw_msg: Option<String>,
    success: bool,
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "raw_msg" => self.raw_msg = Some(value.to_string()),
            "status" => self.success = value == "success",
            "message" => self.message = value.to_string(),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}

impl<S, N> FormatEvent<S, N> for NetmapperFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = EventFields::default();
        event.record(&mut fields);

        if let Some(raw) = fields.raw_msg {
            return writeln!(writer, "{raw}");
        }

        let (symbol, color_func): (&str, fn(ColoredString) -> ColoredString) =
            match *event.metadata().level() {
                Level::TRACE => ("[ ]", |s| s.dimmed()),
                Level::DEBUG => ("[?]", |s| s.blue()),
                Level::INFO => ("[+]", |s| s.green().bold()),
                Level::WARN => ("[*]", |s| s.yellow().bold()),
                Level::ERROR => ("[-]", |s| s.red().bold()),
            };

        let message = if fields.success {
            fields.message.bold()
        } else {
            fields.message.normal()
        };
        writeln!(writer, "{} {}", color_func(symbol.into()), message)
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the verbosity flag.
///
/// Report lines go to stdout and log events to stderr. Both are written
/// through the progress layer, so an active bar is redrawn below them.
pub fn init(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let indicatif_layer = IndicatifLayer::new();

    let report = tracing_subscriber::fmt::layer()
        .event_format(NetmapperFormatter)
        .with_writer(indicatif_layer.get_stdout_writer())
        .with_filter(filter_fn(|meta| meta.target() == PRINT_TARGET));
    let logs = tracing_subscriber::fmt::layer()
        .event_format(NetmapperFormatter)
        .with_writer(indicatif_layer.get_stderr_writer())
        .with_filter(filter_fn(|meta| meta.target() != PRINT_TARGET));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(report)
        .with(logs)
        .with(indicatif_layer)
        .try_init();

    if installed.is_err() {
        eprintln!("logging was already initialised");
    }
}
