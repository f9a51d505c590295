//! Typed, revision-aware view over one NATS KV bucket.

use std::marker::PhantomData;
use std::time::Duration;

use async_nats::jetstream::{self, kv};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{KvBucket, KvKey};
use crate::{Error, Result, TRACING_TARGET_KV};

/// A value read from the bucket together with the revision it was read at.
#[derive(Debug, Clone)]
pub struct Revisioned<V> {
    pub value: V,
    pub revision: u64,
}

/// Typed store over the bucket described by `B`, keyed by `K`.
///
/// Values are stored as JSON. Writes are compare-and-set: a write names the
/// revision it expects to replace (or `None` for a key that must not exist
/// yet) and fails with [`Error::KvConflict`] otherwise.
#[derive(Clone)]
pub struct KvStore<K, V, B> {
    store: kv::Store,
    marker: PhantomData<fn() -> (K, V, B)>,
}

impl<K, V, B: KvBucket> std::fmt::Debug for KvStore<K, V, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("KvStore").field(&B::NAME).finish()
    }
}

impl<K, V, B> KvStore<K, V, B>
where
    K: KvKey,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    B: KvBucket,
{
    /// Binds to the bucket, creating it with entry expiry `ttl` when missing.
    ///
    /// An existing bucket keeps the expiry it was created with.
    #[tracing::instrument(skip(jetstream), target = TRACING_TARGET_KV)]
    pub(crate) async fn open(jetstream: &jetstream::Context, ttl: Duration) -> Result<Self> {
        let store = if let Ok(store) = jetstream.get_key_value(B::NAME).await {
            store
        } else {
            tracing::info!(
                target: TRACING_TARGET_KV,
                bucket = B::NAME,
                ttl_secs = ttl.as_secs(),
                "Creating KV bucket"
            );
            jetstream
                .create_key_value(kv::Config {
                    bucket: B::NAME.to_owned(),
                    description: B::DESCRIPTION.to_owned(),
                    history: B::HISTORY,
                    max_age: ttl,
                    ..Default::default()
                })
                .await
                .map_err(|e| Error::kv(B::NAME, "kv_create", e))?
        };

        Ok(Self {
            store,
            marker: PhantomData,
        })
    }

    #[inline]
    pub fn bucket_name(&self) -> &'static str {
        B::NAME
    }

    /// Reads the current value of `key`. Deleted and purged keys are absent.
    pub async fn read(&self, key: &K) -> Result<Option<Revisioned<V>>> {
        let key = key.to_string();
        let entry = self
            .store
            .entry(&key)
            .await
            .map_err(|e| Error::kv(B::NAME, "kv_get", e))?;

        let Some(entry) = entry.filter(|e| matches!(e.operation, kv::Operation::Put)) else {
            tracing::trace!(target: TRACING_TARGET_KV, key = %key, "KV key absent");
            return Ok(None);
        };

        Ok(Some(Revisioned {
            value: serde_json::from_slice(&entry.value)?,
            revision: entry.revision,
        }))
    }

    /// Writes `value` if `key` is still at `expected` and returns the new
    /// revision.
    #[tracing::instrument(skip(self, value), target = TRACING_TARGET_KV)]
    pub async fn write(&self, key: &K, value: &V, expected: Option<u64>) -> Result<u64> {
        let key = key.to_string();
        let payload = serde_json::to_vec(value)?;
        let bytes = payload.len();

        let revision = match expected {
            None => self
                .store
                .create(&key, payload.into())
                .await
                .map_err(|e| match e.kind() {
                    kv::CreateErrorKind::AlreadyExists => Error::kv_conflict(B::NAME, &key),
                    _ => Error::kv(B::NAME, "kv_create_key", e),
                })?,
            Some(expected) => self
                .store
                .update(&key, payload.into(), expected)
                .await
                .map_err(|e| match e.kind() {
                    kv::UpdateErrorKind::WrongLastRevision => Error::kv_conflict(B::NAME, &key),
                    _ => Error::kv(B::NAME, "kv_update", e),
                })?,
        };

        tracing::debug!(
            target: TRACING_TARGET_KV,
            key = %key,
            revision,
            bytes,
            "KV value written"
        );
        Ok(revision)
    }
}
