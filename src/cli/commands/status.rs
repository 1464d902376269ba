//! Status command - describe the active index.

use console::style;
use serde_json::json;

use crate::config::Settings;
use crate::index::{IndexError, IndexManifest, VectorIndex};
use crate::provider::gemini::qualified_model;

/// Run the status command. Needs no credential.
pub fn run(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let manifest = match VectorIndex::current_manifest(&settings.index_path) {
        Ok(manifest) => Some(manifest),
        Err(IndexError::NotBuilt { .. }) => None,
        Err(e) => return Err(e.into()),
    };
    let configured = qualified_model(&settings.provider.embedding_model);

    if json {
        let output = json!({
            "index_path": settings.index_path,
            "indexed": manifest.is_some(),
            "configured_embedding_model": configured,
            "manifest": manifest,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match manifest {
        None => println!(
            "No index at {}. Run 'pdfchat process <PDF>...' first.",
            settings.index_path.display()
        ),
        Some(manifest) => print_manifest(&manifest, &configured),
    }
    Ok(())
}

fn print_manifest(manifest: &IndexManifest, configured: &str) {
    println!("{}", style("Active index").bold());
    println!("  generation: {}", manifest.generation);
    println!("  model:      {}", manifest.embedding_model);
    println!("  dimension:  {}", manifest.dimension);
    println!("  chunks:     {}", manifest.chunk_count);
    println!(
        "  created:    {}",
        manifest.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if manifest.embedding_model != configured {
        println!(
            "{} index was built with {} but {} is configured; process the documents again",
            style("warning:").yellow().bold(),
            manifest.embedding_model,
            configured
        );
    }
}
