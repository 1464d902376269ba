//! Process command - the CLI form of "Submit & Process".

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Settings;
use crate::documents::UploadedDocument;
use crate::index::IndexProgress;
use crate::qa::Assistant;

fn new_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Extracting text...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn describe(progress: &IndexProgress) -> String {
    match progress {
        IndexProgress::Embedding { done, total } => format!("Embedding chunks {done}/{total}"),
        IndexProgress::Writing => "Writing index...".to_string(),
        IndexProgress::Committed { generation } => format!("Committed {generation}"),
    }
}

/// Run the process command.
pub async fn run(settings: &Settings, paths: &[PathBuf], no_progress: bool) -> anyhow::Result<()> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let document = UploadedDocument::from_path(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        documents.push(document);
    }

    let assistant = Assistant::from_settings(settings)?;

    let spinner = (!no_progress && console::Term::stderr().is_term()).then(new_spinner);
    let result = assistant
        .process_with_progress(documents, |progress| {
            if let Some(spinner) = &spinner {
                spinner.set_message(describe(&progress));
            }
        })
        .await;

    if let Some(spinner) = &spinner {
        spinner.finish_and_clear();
    }
    let report = result?;

    println!("{}", style("Done").green().bold());
    println!(
        "  {} of {} file(s) read, {} page(s), {} characters",
        report.documents_read, report.documents_uploaded, report.pages_read, report.characters
    );
    println!(
        "  {} chunk(s) embedded with {} (dim {})",
        report.chunks, report.embedding_model, report.dimension
    );
    println!(
        "  index: {}",
        style(assistant.index_path().join(&report.generation).display()).dim()
    );
    Ok(())
}
