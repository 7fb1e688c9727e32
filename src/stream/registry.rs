//! Lazy, cached construction of engine adapters.
//!
//! The registry is the single place adapters are built. Streaming providers
//! are cached per [`ProviderKind`] and reused across sessions, so the
//! neural adapter's warm engine survives between dictations; a cached
//! instance is discarded on request (unrecoverable failure) or when the
//! neural revision changes. The parallel [`transcriber_for`] lookup serves
//! the plain whole-buffer contract for every model uniformly, wrapping
//! streaming-only backends in [`StreamingBatchFallback`].
//!
//! [`transcriber_for`]: ProviderRegistry::transcriber_for

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, info};

use crate::stream::native::{system_speech_service, NativeSpeechProvider, SpeechService};
use crate::stream::{StartError, StreamingBatchFallback, StreamingProvider, WhisperStreamProvider};
use crate::stt::{
    EngineRevision, ModelDescriptor, ModelPaths, ProviderKind, SttEngine, SttError,
    TranscribeParams, WhisperEngine,
};

// ---------------------------------------------------------------------------
// ProviderSource trait
// ---------------------------------------------------------------------------

/// The coordinator's view of the registry. A trait seam so session logic
/// can be tested against scripted providers.
pub trait ProviderSource: Send + Sync {
    /// The streaming provider serving `descriptor`, built on first use and
    /// cached per [`ProviderKind`].
    fn streaming_provider_for(
        &self,
        descriptor: &ModelDescriptor,
    ) -> Result<Arc<dyn StreamingProvider>, StartError>;

    /// Drop the cached streaming provider for `kind` so the next lookup
    /// builds a fresh instance.
    fn discard_streaming(&self, kind: ProviderKind);
}

// ---------------------------------------------------------------------------
// ProviderRegistry
// ---------------------------------------------------------------------------

/// Builds and caches streaming providers and plain transcription engines.
pub struct ProviderRegistry {
    paths: ModelPaths,
    base_params: TranscribeParams,
    speech_service: Arc<dyn SpeechService>,
    streaming: Mutex<HashMap<ProviderKind, Arc<dyn StreamingProvider>>>,
    // Revision the cached NeuralStreaming provider was built for.
    neural_revision: Mutex<Option<EngineRevision>>,
    transcribers: Mutex<HashMap<String, Arc<dyn SttEngine>>>,
}

impl ProviderRegistry {
    /// A registry using the platform speech service.
    pub fn new(paths: ModelPaths, base_params: TranscribeParams) -> Self {
        Self::with_speech_service(paths, base_params, system_speech_service())
    }

    /// A registry with an explicit speech service (used by tests and by
    /// platform integrations that carry their own binding).
    pub fn with_speech_service(
        paths: ModelPaths,
        base_params: TranscribeParams,
        speech_service: Arc<dyn SpeechService>,
    ) -> Self {
        Self {
            paths,
            base_params,
            speech_service,
            streaming: Mutex::new(HashMap::new()),
            neural_revision: Mutex::new(None),
            transcribers: Mutex::new(HashMap::new()),
        }
    }

    fn build_streaming(
        &self,
        descriptor: &ModelDescriptor,
    ) -> Result<Arc<dyn StreamingProvider>, StartError> {
        match descriptor.provider {
            ProviderKind::Cloud => Err(StartError::EngineUnavailable(format!(
                "model {} streams server-side; no local backend",
                descriptor.id
            ))),
            ProviderKind::NativeSpeech => {
                let mut cache = self.streaming.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(cached) = cache.get(&ProviderKind::NativeSpeech) {
                    return Ok(Arc::clone(cached));
                }
                info!("building system speech provider");
                let provider: Arc<dyn StreamingProvider> =
                    Arc::new(NativeSpeechProvider::new(Arc::clone(&self.speech_service)));
                cache.insert(ProviderKind::NativeSpeech, Arc::clone(&provider));
                Ok(provider)
            }
            ProviderKind::NeuralStreaming => {
                let revision = descriptor.revision.unwrap_or_default();
                let mut cache = self.streaming.lock().unwrap_or_else(|e| e.into_inner());
                let mut cached_revision =
                    self.neural_revision.lock().unwrap_or_else(|e| e.into_inner());

                if *cached_revision == Some(revision) {
                    if let Some(cached) = cache.get(&ProviderKind::NeuralStreaming) {
                        return Ok(Arc::clone(cached));
                    }
                }
                if cached_revision.is_some() && *cached_revision != Some(revision) {
                    debug!(
                        "neural revision change {:?} -> {revision:?}: rebuilding provider",
                        *cached_revision
                    );
                    cache.remove(&ProviderKind::NeuralStreaming);
                }

                info!("building neural streaming provider (revision {revision:?})");
                let provider: Arc<dyn StreamingProvider> = Arc::new(WhisperStreamProvider::new(
                    revision,
                    &self.paths,
                    self.base_params.clone(),
                )?);
                cache.insert(ProviderKind::NeuralStreaming, Arc::clone(&provider));
                *cached_revision = Some(revision);
                Ok(provider)
            }
        }
    }

    /// The plain whole-buffer engine for `descriptor`, built on first use
    /// and cached by model id. Batch-capable local models load a
    /// [`WhisperEngine`]; everything else replays through its streaming
    /// provider via [`StreamingBatchFallback`].
    ///
    /// # Errors
    ///
    /// - [`SttError::ModelNotFound`] / [`SttError::ContextInit`] — the
    ///   batch engine could not load its weights.
    /// - [`SttError::Unavailable`] — the model has no usable backend here.
    pub fn transcriber_for(
        &self,
        descriptor: &ModelDescriptor,
    ) -> Result<Arc<dyn SttEngine>, SttError> {
        {
            let cache = self.transcribers.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(cached) = cache.get(descriptor.id) {
                return Ok(Arc::clone(cached));
            }
        }

        let engine: Arc<dyn SttEngine> = match (descriptor.provider, descriptor.file_name) {
            (ProviderKind::Cloud, _) => {
                return Err(SttError::Unavailable(descriptor.id.to_string()))
            }
            // Local weights with a native batch mode load directly.
            (ProviderKind::NeuralStreaming, Some(_))
                if !matches!(
                    descriptor.capability,
                    crate::stt::StreamingCapability::StreamingOnly
                ) =>
            {
                let path = self
                    .paths
                    .model_path(descriptor)
                    .ok_or_else(|| SttError::ModelNotFound(descriptor.id.to_string()))?;
                Arc::new(WhisperEngine::load(path, self.base_params.clone())?)
            }
            // Streaming-only models and the system service replay through
            // their streaming provider.
            _ => {
                let provider = self
                    .build_streaming(descriptor)
                    .map_err(|e| SttError::Unavailable(e.to_string()))?;
                Arc::new(StreamingBatchFallback::new(
                    provider,
                    self.base_params.language.clone(),
                ))
            }
        };

        let mut cache = self.transcribers.lock().unwrap_or_else(|e| e.into_inner());
        Ok(Arc::clone(
            cache
                .entry(descriptor.id.to_string())
                .or_insert(engine),
        ))
    }
}

impl ProviderSource for ProviderRegistry {
    fn streaming_provider_for(
        &self,
        descriptor: &ModelDescriptor,
    ) -> Result<Arc<dyn StreamingProvider>, StartError> {
        self.build_streaming(descriptor)
    }

    fn discard_streaming(&self, kind: ProviderKind) {
        let mut cache = self.streaming.lock().unwrap_or_else(|e| e.into_inner());
        if cache.remove(&kind).is_some() {
            info!("discarded cached streaming provider for {kind:?}");
        }
        if kind == ProviderKind::NeuralStreaming {
            let mut cached_revision =
                self.neural_revision.lock().unwrap_or_else(|e| e.into_inner());
            *cached_revision = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stt::{
        find_model_by_id, streaming_model_for_revision, StreamingCapability, SYSTEM_MODELS,
    };

    const CLOUD_MODEL: ModelDescriptor = ModelDescriptor {
        id: "cloud-test",
        display_name: "Cloud Test",
        file_name: None,
        provider: ProviderKind::Cloud,
        capability: StreamingCapability::BatchAndStreaming,
        revision: None,
        language: "multilingual",
    };

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new(
            ModelPaths::new("/nonexistent/models"),
            TranscribeParams::default(),
        )
    }

    #[test]
    fn cloud_models_have_no_streaming_backend() {
        let reg = registry();
        let err = reg.streaming_provider_for(&CLOUD_MODEL).unwrap_err();
        assert!(matches!(err, StartError::EngineUnavailable(_)));
    }

    #[test]
    fn streaming_providers_are_cached_per_kind() {
        let reg = registry();
        let system = &SYSTEM_MODELS[0];
        let a = reg.streaming_provider_for(system).unwrap();
        let b = reg.streaming_provider_for(system).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let v3 = streaming_model_for_revision(EngineRevision::V3);
        let c = reg.streaming_provider_for(v3).unwrap();
        let d = reg.streaming_provider_for(v3).unwrap();
        assert!(Arc::ptr_eq(&c, &d));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn discard_forces_a_rebuild() {
        let reg = registry();
        let v3 = streaming_model_for_revision(EngineRevision::V3);
        let before = reg.streaming_provider_for(v3).unwrap();
        reg.discard_streaming(ProviderKind::NeuralStreaming);
        let after = reg.streaming_provider_for(v3).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn revision_change_rebuilds_the_neural_provider() {
        let reg = registry();
        let v2 = streaming_model_for_revision(EngineRevision::V2);
        let v3 = streaming_model_for_revision(EngineRevision::V3);

        let old = reg.streaming_provider_for(v2).unwrap();
        let new = reg.streaming_provider_for(v3).unwrap();
        assert!(!Arc::ptr_eq(&old, &new));

        // Same revision again reuses the rebuilt instance.
        let again = reg.streaming_provider_for(v3).unwrap();
        assert!(Arc::ptr_eq(&new, &again));
    }

    #[test]
    fn cloud_models_have_no_transcriber_either() {
        let reg = registry();
        assert!(matches!(
            reg.transcriber_for(&CLOUD_MODEL),
            Err(SttError::Unavailable(_))
        ));
    }

    #[test]
    fn streaming_only_models_get_the_batch_fallback() {
        let reg = registry();
        let v3 = streaming_model_for_revision(EngineRevision::V3);
        // Construction is cold (no file access); only transcribing needs
        // the weights.
        let a = reg.transcriber_for(v3).unwrap();
        let b = reg.transcriber_for(v3).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn system_speech_gets_the_batch_fallback() {
        let reg = registry();
        assert!(reg.transcriber_for(&SYSTEM_MODELS[0]).is_ok());
    }

    #[test]
    fn batch_models_fail_to_load_without_weights() {
        let reg = registry();
        let small = find_model_by_id("whisper-small").unwrap();
        assert!(matches!(
            reg.transcriber_for(small),
            Err(SttError::ModelNotFound(_))
        ));
    }
}
