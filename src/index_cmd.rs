use anyhow::Result;

use crate::config::Config;
use crate::embedding;
use crate::index::{build_or_load, clear_index, index_path, Index};

/// Build or load the index and print a summary. With `rebuild`, the
/// existing index is cleared first.
pub async fn run_index(config: &Config, rebuild: bool) -> Result<()> {
    let persist_dir = &config.index.persist_dir;
    if rebuild {
        clear_index(persist_dir)?;
    }

    let provider = embedding::create_provider(&config.embedding)?;
    let index = build_or_load(&config.corpus.path, persist_dir, provider.as_ref()).await?;

    print!("{}", summary(&index, &index_path(persist_dir).display().to_string()));
    Ok(())
}

fn summary(index: &Index, path: &str) -> String {
    format!(
        "index {}\n  units: {}\n  model: {}\n  dims: {}\n  built_at: {}\n  path: {}\n",
        index.origin,
        index.len(),
        index.meta.model,
        index.meta.dims,
        index.meta.built_at,
        path
    )
}
