//! Report command implementation

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::CommandContext;
use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::error::{Error, Result};
use crate::output;
use crate::probes::ReqwestProber;
use crate::probes::server::server_variables;
use crate::report::{ReportContext, build_report};

/// Run every check and print the report
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let http = ReqwestProber::new(&ctx.config.requests).map_err(|e| Error::Other(e.to_string()))?;
    let server = server_variables(std::env::vars());

    let report_ctx = ReportContext {
        config: &ctx.config,
        http: &http,
        server: &server,
    };
    let mut runner = ctx.runner();

    let spinner = (ctx.format == OutputFormat::Pretty).then(|| spinner("Running diagnostics..."));
    let report = build_report(&report_ctx, &mut runner).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let report = report?;

    log::debug!(
        "Report has {} failing checks out of {}",
        report.failure_count(),
        report.rows().count()
    );

    output::print(&report, ctx.format)
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
