//! Command-line shell: digest one local PDF and write the text artifacts.
//!
//! Shares configuration and the pipeline with the HTTP server. The summary is written to
//! `summary_<lang>.txt` in the output directory; `--with-translation` also writes
//! `translation_<lang>.txt`.
use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use pdfdigest::{
    config, logging,
    processing::{DigestApi, DigestService, summary_file_name, translation_file_name},
};

#[derive(Parser)]
#[command(
    name = "pdfdigest-cli",
    about = "Translate and summarize a PDF document"
)]
struct Cli {
    /// PDF file to digest.
    input: PathBuf,
    /// Directory receiving the text artifacts.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    /// Also write the full translated text.
    #[arg(long)]
    with_translation: bool,
    /// Print the summary to stdout.
    #[arg(long)]
    print: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();
    config::init_config();
    let config = config::get_config();

    let is_pdf = cli
        .input
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        bail!("{} is not a .pdf file", cli.input.display());
    }
    let bytes = fs::read(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    let service =
        DigestService::from_config(config).context("failed to initialize inference engines")?;
    let outcome = service
        .digest(bytes)
        .await
        .with_context(|| format!("failed to digest {}", cli.input.display()))?;

    if outcome.is_partial() {
        eprintln!(
            "warning: {} translation and {} summary chunks failed and were skipped",
            outcome.translation_gaps.len(),
            outcome.summary_gaps.len()
        );
    }

    fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("failed to create {}", cli.out_dir.display()))?;
    let language = service.target_language();
    write_artifact(&cli.out_dir, &summary_file_name(language), &outcome.summary)?;
    if cli.with_translation {
        write_artifact(
            &cli.out_dir,
            &translation_file_name(language),
            &outcome.translated_text,
        )?;
    }

    if cli.print {
        println!("{}", outcome.summary);
    }
    Ok(())
}

fn write_artifact(dir: &Path, name: &str, contents: &str) -> Result<()> {
    let path = dir.join(name);
    fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "Wrote artifact");
    Ok(())
}
