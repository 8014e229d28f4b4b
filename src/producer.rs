//! Producer Module
//!
//! The contract for the external collaborator that computes rule payloads on
//! a cache miss, plus two small implementations.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::Deserialize;

use crate::cache::EntryId;

// == Computed ==
/// A freshly computed payload and how long it stays valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Computed {
    pub payload: Vec<u8>,
    pub ttl: Duration,
}

impl Computed {
    pub fn new(payload: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            payload: payload.into(),
            ttl,
        }
    }
}

// == Producer Trait ==
/// Computes the payload for `(rule_type, key)`.
///
/// The cache assumes nothing about latency or determinism beyond "eventually
/// returns or errors". Honoring its own timeout is the Producer's job.
#[async_trait]
pub trait Producer: Send + Sync + 'static {
    async fn compute(&self, rule_type: &str, key: &str) -> anyhow::Result<Computed>;
}

#[async_trait]
impl<T: Producer> Producer for Arc<T> {
    async fn compute(&self, rule_type: &str, key: &str) -> anyhow::Result<Computed> {
        (**self).compute(rule_type, key).await
    }
}

// == Fn Producer ==
/// Adapts an async closure into a [`Producer`].
pub struct FnProducer<F> {
    f: F,
}

impl<F, Fut> FnProducer<F>
where
    F: Fn(String, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Computed>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Producer for FnProducer<F>
where
    F: Fn(String, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Computed>> + Send + 'static,
{
    async fn compute(&self, rule_type: &str, key: &str) -> anyhow::Result<Computed> {
        (self.f)(rule_type.to_string(), key.to_string()).await
    }
}

// == Seed Rule ==
/// One precomputed rule in a JSON seed file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRule {
    pub rule_type: String,
    pub key: String,
    /// Any JSON value; stored as its serialized bytes
    pub payload: serde_json::Value,
    pub ttl_secs: u64,
}

// == Static Producer ==
/// Serves payloads from a fixed table. Unknown identities are errors.
#[derive(Debug, Clone, Default)]
pub struct StaticProducer {
    rules: HashMap<EntryId, Computed>,
}

impl StaticProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the payload served for `(rule_type, key)`.
    pub fn with_rule(
        mut self,
        rule_type: impl Into<String>,
        key: impl Into<String>,
        computed: Computed,
    ) -> Self {
        self.rules.insert(EntryId::new(rule_type, key), computed);
        self
    }

    // == From Seed ==
    /// Builds a producer from a JSON array of [`SeedRule`]s.
    pub fn from_seed_json(json: &str) -> anyhow::Result<Self> {
        let seeds: Vec<SeedRule> = serde_json::from_str(json).context("parsing seed rules")?;

        let mut producer = Self::new();
        for seed in seeds {
            let payload = serde_json::to_vec(&seed.payload)?;
            producer = producer.with_rule(
                seed.rule_type,
                seed.key,
                Computed::new(payload, Duration::from_secs(seed.ttl_secs)),
            );
        }
        Ok(producer)
    }

    /// Reads and parses a seed file.
    pub fn from_seed_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading seed file {}", path.display()))?;
        Self::from_seed_json(&json)
    }

    /// Iterates over every rule this producer knows.
    pub fn rules(&self) -> impl Iterator<Item = (&EntryId, &Computed)> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[async_trait]
impl Producer for StaticProducer {
    async fn compute(&self, rule_type: &str, key: &str) -> anyhow::Result<Computed> {
        match self.rules.get(&EntryId::new(rule_type, key)) {
            Some(computed) => Ok(computed.clone()),
            None => bail!("no rule defined for {}/{}", rule_type, key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = r#"[
        {"ruleType": "return-risk", "key": "C003", "payload": {"threshold": 0.42}, "ttlSecs": 60},
        {"ruleType": "segmentation", "key": "C001", "payload": "Champions", "ttlSecs": 300}
    ]"#;

    #[tokio::test]
    async fn test_fn_producer() {
        let producer = FnProducer::new(|rule_type: String, key: String| async move {
            Ok::<_, anyhow::Error>(Computed::new(
                format!("{}:{}", rule_type, key),
                Duration::from_secs(10),
            ))
        });

        let computed = producer.compute("segmentation", "C001").await.unwrap();
        assert_eq!(computed.payload, b"segmentation:C001");
        assert_eq!(computed.ttl, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_static_producer_from_seed() {
        let producer = StaticProducer::from_seed_json(SEED).unwrap();
        assert_eq!(producer.len(), 2);

        let computed = producer.compute("return-risk", "C003").await.unwrap();
        assert_eq!(computed.payload, br#"{"threshold":0.42}"#);
        assert_eq!(computed.ttl, Duration::from_secs(60));

        let computed = producer.compute("segmentation", "C001").await.unwrap();
        assert_eq!(computed.payload, br#""Champions""#);
    }

    #[tokio::test]
    async fn test_static_producer_unknown_rule() {
        let producer = StaticProducer::new();
        let err = producer.compute("segmentation", "C999").await.unwrap_err();
        assert!(err.to_string().contains("segmentation/C999"));
    }

    #[test]
    fn test_demo_seed_file_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/rules.json");
        let producer = StaticProducer::from_seed_file(path).unwrap();
        assert_eq!(producer.len(), 4);
        assert!(producer
            .rules()
            .all(|(id, computed)| id.validate().is_ok() && !computed.ttl.is_zero()));
    }

    #[test]
    fn test_static_producer_bad_seed() {
        assert!(StaticProducer::from_seed_json("{not json").is_err());
        assert!(StaticProducer::from_seed_file("/nonexistent/seed.json").is_err());
    }
}
