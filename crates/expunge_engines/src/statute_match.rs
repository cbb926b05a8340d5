#![forbid(unsafe_code)]

//! Statute-list membership as a fuzzy capability.
//!
//! The intake wording of a charge rarely matches statutory wording exactly,
//! so membership is semantic: reference embeddings per statute list, cosine
//! top-k candidate selection, then a yes/no confirmation completion. Any
//! provider failure degrades to "not matched" so the resolver cascade is
//! never blocked; unmatched charges surface for manual review instead.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::time::Duration;

use expunge_contracts::statutes::{StatuteList, StatuteListId};
use serde_json::Value;
use sha2::{Digest, Sha256};

const CANDIDATE_TOP_K: usize = 5;

/// External fuzzy membership oracle consumed by the resolvers. Injectable so
/// the engines stay deterministic under test.
pub trait StatuteMatcher {
    fn matches(&self, list: StatuteListId, charge: &str) -> bool;
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// Deterministic matcher over seeded lists, used by tests and as the CLI
/// default when no provider is configured. Membership is normalized exact
/// match.
#[derive(Debug, Clone, Default)]
pub struct StaticStatuteMatcher {
    lists: BTreeMap<StatuteListId, BTreeSet<String>>,
}

impl StaticStatuteMatcher {
    pub fn from_lists(lists: &[StatuteList]) -> Self {
        let mut map: BTreeMap<StatuteListId, BTreeSet<String>> = BTreeMap::new();
        for list in lists {
            let entries = map.entry(list.id).or_default();
            for entry in &list.entries {
                entries.insert(normalize(entry));
            }
        }
        Self { lists: map }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl StatuteMatcher for StaticStatuteMatcher {
    fn matches(&self, list: StatuteListId, charge: &str) -> bool {
        self.lists
            .get(&list)
            .map(|entries| entries.contains(&normalize(charge)))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCallError {
    provider: &'static str,
    http_status: Option<u16>,
    error_kind: &'static str,
}

impl ProviderCallError {
    fn new(provider: &'static str, error_kind: &'static str, http_status: Option<u16>) -> Self {
        Self {
            provider,
            http_status,
            error_kind,
        }
    }

    pub fn safe_detail(&self) -> String {
        match self.http_status {
            Some(status) => format!(
                "provider={} error={} status={}",
                self.provider, self.error_kind, status
            ),
            None => format!("provider={} error={}", self.provider, self.error_kind),
        }
    }
}

/// Provider endpoints and models for the live matcher. Fixture fields bypass
/// the network entirely for offline tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherProviderConfig {
    pub embeddings_url: String,
    pub responses_url: String,
    pub embed_model: String,
    pub confirm_model: String,
    pub api_key: Option<String>,
    pub user_agent: String,
    pub timeout_ms: u32,
    pub embed_fixture_json: Option<String>,
    pub confirm_fixture_text: Option<String>,
}

impl MatcherProviderConfig {
    pub fn from_env() -> Self {
        Self {
            embeddings_url: env::var("EXPUNGE_EMBEDDINGS_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/embeddings".to_string()),
            responses_url: env::var("EXPUNGE_RESPONSES_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/responses".to_string()),
            embed_model: env::var("EXPUNGE_EMBED_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            confirm_model: env::var("EXPUNGE_CONFIRM_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            api_key: env::var("EXPUNGE_PROVIDER_API_KEY").ok(),
            user_agent: env::var("EXPUNGE_HTTP_USER_AGENT")
                .unwrap_or_else(|_| "expunge-matcher/1.0".to_string()),
            timeout_ms: 5_000,
            embed_fixture_json: None,
            confirm_fixture_text: None,
        }
    }
}

/// Live matcher backed by an embedding provider plus a confirmation model.
///
/// Reference embeddings are computed once per statute list and memoized for
/// the life of the matcher; query verdicts are memoized per
/// (list, sha256(charge)) so repeated cascade queries do not re-pay provider
/// latency.
pub struct EmbeddingStatuteMatcher {
    config: MatcherProviderConfig,
    lists: BTreeMap<StatuteListId, Vec<String>>,
    reference: RefCell<BTreeMap<StatuteListId, Vec<Vec<f32>>>>,
    query_memo: RefCell<BTreeMap<(StatuteListId, [u8; 32]), bool>>,
    provider_calls: Cell<u64>,
}

impl EmbeddingStatuteMatcher {
    pub fn new(config: MatcherProviderConfig, lists: &[StatuteList]) -> Self {
        let mut map: BTreeMap<StatuteListId, Vec<String>> = BTreeMap::new();
        for list in lists {
            map.entry(list.id)
                .or_default()
                .extend(list.entries.iter().cloned());
        }
        Self {
            config,
            lists: map,
            reference: RefCell::new(BTreeMap::new()),
            query_memo: RefCell::new(BTreeMap::new()),
            provider_calls: Cell::new(0),
        }
    }

    /// Provider round trips performed so far (fixture resolutions included).
    /// A memoized verdict answers without adding to this count.
    pub fn provider_call_count(&self) -> u64 {
        self.provider_calls.get()
    }

    fn try_matches(&self, list: StatuteListId, charge: &str) -> Result<bool, ProviderCallError> {
        let Some(entries) = self.lists.get(&list) else {
            return Ok(false);
        };
        let memo_key = (list, charge_digest(charge));
        if let Some(&cached) = self.query_memo.borrow().get(&memo_key) {
            return Ok(cached);
        }

        self.ensure_reference(list, entries)?;
        let query_embedding = self
            .embed_texts(std::slice::from_ref(&normalize(charge)))?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderCallError::new("embeddings", "empty_results", None))?;

        let reference = self.reference.borrow();
        let vectors = reference
            .get(&list)
            .ok_or_else(|| ProviderCallError::new("embeddings", "reference_missing", None))?;
        let candidates = top_k_candidates(entries, vectors, &query_embedding, CANDIDATE_TOP_K);
        drop(reference);

        let matched = if candidates.is_empty() {
            false
        } else {
            self.confirm_candidate(&candidates, charge)?
        };
        self.query_memo.borrow_mut().insert(memo_key, matched);
        Ok(matched)
    }

    fn ensure_reference(
        &self,
        list: StatuteListId,
        entries: &[String],
    ) -> Result<(), ProviderCallError> {
        if self.reference.borrow().contains_key(&list) {
            return Ok(());
        }
        let vectors = self.embed_texts(entries)?;
        if vectors.len() != entries.len() {
            return Err(ProviderCallError::new("embeddings", "count_mismatch", None));
        }
        self.reference.borrow_mut().insert(list, vectors);
        Ok(())
    }

    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderCallError> {
        self.provider_calls.set(self.provider_calls.get() + 1);
        let body: Value = if let Some(fixture) = self.config.embed_fixture_json.as_deref() {
            serde_json::from_str(fixture)
                .map_err(|_| ProviderCallError::new("embeddings", "json_parse", None))?
        } else {
            let api_key = self
                .config
                .api_key
                .as_deref()
                .ok_or_else(|| ProviderCallError::new("embeddings", "missing_api_key", None))?;
            let payload = serde_json::json!({
                "model": self.config.embed_model,
                "input": texts,
            });
            post_json(
                "embeddings",
                &self.config.embeddings_url,
                api_key,
                self.config.timeout_ms,
                &self.config.user_agent,
                &payload,
            )?
        };
        let data = body
            .pointer("/data")
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderCallError::new("embeddings", "missing_data", None))?;
        let mut vectors = Vec::with_capacity(data.len());
        for item in data {
            let raw = item
                .pointer("/embedding")
                .and_then(Value::as_array)
                .ok_or_else(|| ProviderCallError::new("embeddings", "missing_embedding", None))?;
            let mut vector: Vec<f32> = Vec::with_capacity(raw.len());
            for component in raw {
                let value = component
                    .as_f64()
                    .ok_or_else(|| ProviderCallError::new("embeddings", "bad_component", None))?;
                vector.push(value as f32);
            }
            l2_normalize(&mut vector);
            vectors.push(vector);
        }
        Ok(vectors)
    }

    fn confirm_candidate(
        &self,
        candidates: &[&String],
        charge: &str,
    ) -> Result<bool, ProviderCallError> {
        self.provider_calls.set(self.provider_calls.get() + 1);
        let text = if let Some(fixture) = self.config.confirm_fixture_text.as_deref() {
            fixture.to_string()
        } else {
            let api_key = self
                .config
                .api_key
                .as_deref()
                .ok_or_else(|| ProviderCallError::new("responses", "missing_api_key", None))?;
            let candidate_block = candidates
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            let prompt = format!(
                "I have a list of newline separated legal statute descriptions {candidate_block}. \
                 I have a legal statute description {charge}. Of the counts provided, does this \
                 statute match any of them? The language may be different, but if the meaning is \
                 the same, please return 1. Otherwise, return 0. Do not return anything else."
            );
            let payload = serde_json::json!({
                "model": self.config.confirm_model,
                "input": prompt,
                "temperature": 0,
                "max_output_tokens": 16,
            });
            let body = post_json(
                "responses",
                &self.config.responses_url,
                api_key,
                self.config.timeout_ms,
                &self.config.user_agent,
                &payload,
            )?;
            extract_output_text(&body)
                .ok_or_else(|| ProviderCallError::new("responses", "empty_results", None))?
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ProviderCallError::new("responses", "empty_results", None));
        }
        Ok(trimmed != "0")
    }
}

impl StatuteMatcher for EmbeddingStatuteMatcher {
    fn matches(&self, list: StatuteListId, charge: &str) -> bool {
        // Fail-open contract: a provider failure is "not matched, flag for
        // manual review", never a blocked cascade.
        self.try_matches(list, charge).unwrap_or(false)
    }
}

fn charge_digest(charge: &str) -> [u8; 32] {
    Sha256::digest(normalize(charge).as_bytes()).into()
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for component in vector.iter_mut() {
            *component /= norm;
        }
    }
}

fn top_k_candidates<'a>(
    entries: &'a [String],
    vectors: &[Vec<f32>],
    query: &[f32],
    k: usize,
) -> Vec<&'a String> {
    let mut scored: Vec<(f32, usize)> = vectors
        .iter()
        .enumerate()
        .map(|(index, vector)| (dot(vector, query), index))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored
        .into_iter()
        .take(k)
        .filter_map(|(_, index)| entries.get(index))
        .collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn post_json(
    provider: &'static str,
    endpoint: &str,
    api_key: &str,
    timeout_ms: u32,
    user_agent: &str,
    payload: &Value,
) -> Result<Value, ProviderCallError> {
    let agent = build_http_agent(timeout_ms, user_agent)
        .map_err(|_| ProviderCallError::new(provider, "config_invalid", None))?;
    let response = agent
        .post(endpoint)
        .set("Content-Type", "application/json")
        .set("Authorization", &format!("Bearer {api_key}"))
        .set("Accept", "application/json")
        .send_json(payload.clone())
        .map_err(|e| provider_error_from_ureq(provider, e))?;
    serde_json::from_reader(response.into_reader())
        .map_err(|_| ProviderCallError::new(provider, "json_parse", None))
}

fn build_http_agent(timeout_ms: u32, user_agent: &str) -> Result<ureq::Agent, String> {
    if timeout_ms == 0 {
        return Err("timeout must be > 0".to_string());
    }
    let timeout = Duration::from_millis(u64::from(timeout_ms).max(100));
    Ok(ureq::AgentBuilder::new()
        .timeout_connect(timeout)
        .timeout_read(timeout)
        .timeout_write(timeout)
        .user_agent(user_agent)
        .build())
}

fn provider_error_from_ureq(provider: &'static str, err: ureq::Error) -> ProviderCallError {
    match err {
        ureq::Error::Status(status, _) => {
            ProviderCallError::new(provider, "http_non_200", Some(status as u16))
        }
        ureq::Error::Transport(transport) => {
            let combined = format!("{:?} {}", transport.kind(), transport);
            ProviderCallError::new(provider, classify_transport_error_kind(&combined), None)
        }
    }
}

fn classify_transport_error_kind(raw: &str) -> &'static str {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("timeout") {
        "timeout"
    } else if lower.contains("tls") || lower.contains("ssl") {
        "tls"
    } else if lower.contains("dns") {
        "dns"
    } else if lower.contains("connection") || lower.contains("connect") {
        "connection"
    } else {
        "transport"
    }
}

fn extract_output_text(root: &Value) -> Option<String> {
    if let Some(text) = root.pointer("/output_text").and_then(Value::as_str) {
        return Some(text.to_string());
    }
    if let Some(output) = root.pointer("/output").and_then(Value::as_array) {
        let mut collected = String::new();
        for item in output {
            if let Some(content) = item.pointer("/content").and_then(Value::as_array) {
                for part in content {
                    if let Some(text) = part.pointer("/text").and_then(Value::as_str) {
                        collected.push_str(text);
                    }
                }
            }
        }
        if !collected.is_empty() {
            return Some(collected);
        }
    }
    root.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
}
