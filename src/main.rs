use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use crate::{
    bibtex::Writer,
    cli::Cli,
    config::Settings,
    keywords::Yake,
    orcid::{HttpApi, fetch::fetch_citations},
};

mod bibtex;
mod cli;
mod config;
mod keywords;
mod orcid;

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Cli::parse();
    let settings = Settings::from_env()?;
    let out = args.output_path();

    let api = HttpApi::new(&settings);
    let progress = ProgressBar::new(0).with_style(ProgressStyle::with_template(
        "{spinner} {pos}/{len} works {wide_bar}",
    )?);
    let harvest = fetch_citations(&api, &args.orcid, settings.concurrency, &progress)?;

    bibtex::write_citations(&out, &harvest.citations)?;
    let writer = Writer {
        indent: settings.indent,
        order_by: settings.order_by.clone(),
    };
    let written = bibtex::format_file(&out, &out, Yake::default(), &writer)?;
    tracing::info!(entries = written, path = %out.display(), "wrote bibliography");

    print_summary(written, harvest.skipped);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn print_summary(written: usize, skipped: usize) {
    if std::env::var_os("NO_COLOR").is_some() {
        eprintln!("✓ {written} ✗ {skipped}");
    } else {
        eprintln!(
            "{} {}",
            format!("✓ {written}").green(),
            format!("✗ {skipped}").red()
        );
    }
}
