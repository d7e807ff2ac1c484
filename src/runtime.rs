//! Startup wiring: config → embedder → index → retriever + generator → [`Pipeline`].
//!
//! The pipeline is built once per process and shared by `Arc`.

use anyhow::Result;
use std::sync::Arc;

use focusia_core::generate::{GenerationAdapter, GenerationBackend};
use focusia_core::pipeline::Pipeline;
use focusia_core::retrieve::MmrRetriever;

use crate::config::Config;
use crate::embedding::create_provider;
use crate::hf::HfInferenceBackend;
use crate::index::{build_or_load, IndexMeta, IndexOrigin};

pub struct Runtime {
    pub pipeline: Arc<Pipeline>,
    pub index_meta: IndexMeta,
    pub index_origin: IndexOrigin,
    pub units: usize,
}

/// Build the pipeline against the Hugging Face backend.
///
/// The access token is resolved before the index is touched, so a missing
/// credential fails without reading or embedding anything.
pub async fn build_pipeline(config: &Config) -> Result<Runtime> {
    let backend = HfInferenceBackend::from_config(&config.generation)?;
    build_pipeline_with(config, Arc::new(backend)).await
}

/// Build the pipeline against any generation backend.
pub async fn build_pipeline_with(
    config: &Config,
    backend: Arc<dyn GenerationBackend>,
) -> Result<Runtime> {
    let params = config.retrieval.params();
    params.validate()?;
    let sampling = config.generation.sampling();
    sampling.validate()?;

    let embedder = create_provider(&config.embedding)?;
    let index = build_or_load(
        &config.corpus.path,
        &config.index.persist_dir,
        embedder.as_ref(),
    )
    .await?;

    let retriever = MmrRetriever::new(index.store(), embedder, params);
    let generator = GenerationAdapter::new(backend, sampling);

    Ok(Runtime {
        pipeline: Arc::new(Pipeline::new(Arc::new(retriever), Arc::new(generator))),
        units: index.len(),
        index_meta: index.meta,
        index_origin: index.origin,
    })
}
