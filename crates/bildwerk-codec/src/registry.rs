// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Codec registry — lazy, coalesced acquisition of external codecs.
//
// Each resource id owns one slot. The first caller starts the load and parks
// a shared future in the slot; every concurrent caller awaits that same
// future, so one acquisition serves all of them and they all observe the same
// outcome. A failed slot is retried by the next caller: there is no negative
// caching, so a codec that was briefly unavailable can still be picked up
// later in the session.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bildwerk_core::error::{ConversionError, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::traits::{CodecLoadError, CodecLoader, ExternalCodec};

type LoadOutcome = std::result::Result<Arc<dyn ExternalCodec>, CodecLoadError>;
type SharedLoad = Shared<BoxFuture<'static, LoadOutcome>>;

/// Observable lifecycle of a codec slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecState {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

enum Slot {
    Loading { attempt: u64, load: SharedLoad },
    Ready(Arc<dyn ExternalCodec>),
    Failed(CodecLoadError),
}

/// Registry of external codecs keyed by resource id.
///
/// Owned by the converter and injected into it; there is no process-wide
/// instance.
pub struct CodecRegistry {
    loader: Arc<dyn CodecLoader>,
    slots: Mutex<HashMap<String, Slot>>,
    attempts: AtomicU64,
}

impl CodecRegistry {
    pub fn new(loader: Arc<dyn CodecLoader>) -> Self {
        Self {
            loader,
            slots: Mutex::new(HashMap::new()),
            attempts: AtomicU64::new(0),
        }
    }

    /// Get the codec for `resource_id`, loading it if needed.
    ///
    /// Suspends until the codec is ready or its acquisition has failed.
    /// Fails with `CodecUnavailable` when the loader errors or reports the
    /// capability missing.
    #[instrument(skip(self))]
    pub async fn acquire(&self, resource_id: &str) -> Result<Arc<dyn ExternalCodec>> {
        let (attempt, load) = {
            let mut slots = self.slots.lock();
            match slots.get(resource_id) {
                Some(Slot::Ready(codec)) => return Ok(Arc::clone(codec)),
                Some(Slot::Loading { attempt, load }) => {
                    debug!(attempt, "joining in-flight codec acquisition");
                    (*attempt, load.clone())
                }
                Some(Slot::Failed(_)) | None => {
                    let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
                    let loader = Arc::clone(&self.loader);
                    let id = resource_id.to_string();
                    let load = async move { loader.load(&id).await }.boxed().shared();
                    slots.insert(
                        resource_id.to_string(),
                        Slot::Loading {
                            attempt,
                            load: load.clone(),
                        },
                    );
                    info!(attempt, "acquiring external codec");
                    (attempt, load)
                }
            }
        };

        let outcome = load.await;
        self.settle(resource_id, attempt, &outcome);

        outcome.map_err(|err| ConversionError::CodecUnavailable {
            resource: resource_id.to_string(),
            reason: err.to_string(),
        })
    }

    /// Current lifecycle state for `resource_id`.
    pub fn state(&self, resource_id: &str) -> CodecState {
        match self.slots.lock().get(resource_id) {
            None => CodecState::Unloaded,
            Some(Slot::Loading { .. }) => CodecState::Loading,
            Some(Slot::Ready(_)) => CodecState::Ready,
            Some(Slot::Failed(_)) => CodecState::Failed,
        }
    }

    /// Why the last settled acquisition of `resource_id` failed. `None` when
    /// the slot is unloaded, loading, or ready.
    pub fn last_error(&self, resource_id: &str) -> Option<CodecLoadError> {
        match self.slots.lock().get(resource_id) {
            Some(Slot::Failed(err)) => Some(err.clone()),
            _ => None,
        }
    }

    /// Record the outcome of `attempt`, unless a newer attempt already owns
    /// the slot. The first waiter to wake does the write; later waiters of
    /// the same attempt find it settled and leave it alone.
    fn settle(&self, resource_id: &str, attempt: u64, outcome: &LoadOutcome) {
        let mut slots = self.slots.lock();
        let owns_slot = matches!(
            slots.get(resource_id),
            Some(Slot::Loading { attempt: current, .. }) if *current == attempt
        );
        if !owns_slot {
            return;
        }

        match outcome {
            Ok(codec) => {
                info!(resource_id, codec = codec.name(), "external codec ready");
                slots.insert(resource_id.to_string(), Slot::Ready(Arc::clone(codec)));
            }
            Err(err) => {
                warn!(resource_id, error = %err, "external codec acquisition failed");
                slots.insert(resource_id.to_string(), Slot::Failed(err.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use bildwerk_core::{CanonicalFormat, ErrorKind};
    use futures::future::join_all;

    use super::*;
    use crate::traits::ExternalCodecError;

    struct NamedCodec(String);

    #[async_trait]
    impl ExternalCodec for NamedCodec {
        fn name(&self) -> &str {
            &self.0
        }

        async fn transcode(
            &self,
            _bytes: &[u8],
            _target: CanonicalFormat,
            _quality: f32,
        ) -> std::result::Result<Vec<u8>, ExternalCodecError> {
            Ok(Vec::new())
        }
    }

    /// Loader that counts calls and fails the first `failures` of them.
    struct CountingLoader {
        calls: AtomicUsize,
        failures: usize,
        missing: bool,
    }

    impl CountingLoader {
        fn new(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                failures,
                missing: false,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CodecLoader for CountingLoader {
        async fn load(
            &self,
            resource_id: &str,
        ) -> std::result::Result<Arc<dyn ExternalCodec>, CodecLoadError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.missing {
                return Err(CodecLoadError::MissingCapability("no entry point".into()));
            }
            if call < self.failures {
                return Err(CodecLoadError::Acquisition("fetch failed".into()));
            }
            Ok(Arc::new(NamedCodec(format!("{resource_id}#{call}"))))
        }
    }

    #[tokio::test]
    async fn concurrent_acquire_coalesces_into_one_load() {
        let loader = CountingLoader::new(0);
        let registry = CodecRegistry::new(loader.clone());

        let results = join_all((0..8).map(|_| registry.acquire("heif"))).await;

        assert_eq!(loader.calls(), 1);
        for result in &results {
            assert_eq!(result.as_ref().unwrap().name(), "heif#0");
        }
        assert_eq!(registry.state("heif"), CodecState::Ready);
    }

    #[tokio::test]
    async fn concurrent_waiters_all_see_the_failure() {
        let loader = CountingLoader::new(1);
        let registry = CodecRegistry::new(loader.clone());

        let results = join_all((0..5).map(|_| registry.acquire("heif"))).await;

        assert_eq!(loader.calls(), 1);
        for result in results {
            let err = result.err().unwrap();
            assert_eq!(err.kind(), ErrorKind::CodecUnavailable);
        }
        assert_eq!(registry.state("heif"), CodecState::Failed);
    }

    #[tokio::test]
    async fn failed_codec_is_retried_by_the_next_caller() {
        let loader = CountingLoader::new(1);
        let registry = CodecRegistry::new(loader.clone());

        assert!(registry.acquire("heif").await.is_err());
        assert_eq!(
            registry.last_error("heif"),
            Some(CodecLoadError::Acquisition("fetch failed".into()))
        );
        let codec = registry.acquire("heif").await.unwrap();

        assert_eq!(loader.calls(), 2);
        assert_eq!(codec.name(), "heif#1");
        assert_eq!(registry.state("heif"), CodecState::Ready);
        assert_eq!(registry.last_error("heif"), None);
    }

    #[tokio::test]
    async fn ready_codec_is_not_reloaded() {
        let loader = CountingLoader::new(0);
        let registry = CodecRegistry::new(loader.clone());
        assert_eq!(registry.state("heif"), CodecState::Unloaded);

        registry.acquire("heif").await.unwrap();
        registry.acquire("heif").await.unwrap();

        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test]
    async fn missing_capability_is_unavailable() {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
            failures: 0,
            missing: true,
        });
        let registry = CodecRegistry::new(loader);
        assert_eq!(registry.last_error("heif"), None);

        let err = registry.acquire("heif").await.err().unwrap();
        match err {
            ConversionError::CodecUnavailable { resource, reason } => {
                assert_eq!(resource, "heif");
                assert!(reason.contains("capability missing"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            registry.last_error("heif"),
            Some(CodecLoadError::MissingCapability(_))
        ));
        assert_eq!(registry.last_error("avif"), None);
    }

    #[tokio::test]
    async fn resources_load_independently() {
        let loader = CountingLoader::new(0);
        let registry = CodecRegistry::new(loader.clone());

        let (a, b) = tokio::join!(registry.acquire("heif"), registry.acquire("avif"));

        assert_eq!(loader.calls(), 2);
        assert!(a.unwrap().name().starts_with("heif#"));
        assert!(b.unwrap().name().starts_with("avif#"));
    }
}
