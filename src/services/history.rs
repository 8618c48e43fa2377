// src/services/history.rs
//
// Three independent history collections (analysis, price estimates,
// try-on), each a JSON array serialized into a single string value under a
// fixed key of a generic key-value store. Loads fail soft: a corrupt blob
// reads as "no history" and is never surfaced to the caller. Mixed-
// generation records coexist: legacy shapes are normalized on every read
// and never rewritten in place.
use async_trait::async_trait;
use log::warn;
use redis::{AsyncCommands, Client};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::errors::GarimpoError;
use crate::legacy::LegacyAnalysisRecord;
use crate::models::{AnalysisEntry, PriceEstimateEntry, TryOnHistoryItem};

pub const ANALYSIS_HISTORY_KEY: &str = "garimpo:analysis-history";
pub const PRICE_HISTORY_KEY: &str = "garimpo:price-history";
pub const TRYON_HISTORY_KEY: &str = "garimpo:tryon-history";

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, GarimpoError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), GarimpoError>;
    async fn delete(&self, key: &str) -> Result<(), GarimpoError>;
}

pub struct RedisStore {
    client: Client,
}

impl RedisStore {
    pub async fn new(redis_url: &str) -> Result<Self, GarimpoError> {
        let client = Client::open(redis_url).map_err(|e| GarimpoError::Storage(e.to_string()))?;

        let mut conn = client
            .get_async_connection()
            .await
            .map_err(|e| GarimpoError::Storage(e.to_string()))?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| GarimpoError::Storage(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, GarimpoError> {
        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| GarimpoError::Storage(e.to_string()))?;
        conn.get(key)
            .await
            .map_err(|e| GarimpoError::Storage(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), GarimpoError> {
        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| GarimpoError::Storage(e.to_string()))?;
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| GarimpoError::Storage(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), GarimpoError> {
        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| GarimpoError::Storage(e.to_string()))?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| GarimpoError::Storage(e.to_string()))
    }
}

/// In-memory store for tests and redis-less development.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, GarimpoError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), GarimpoError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), GarimpoError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

pub struct HistoryService {
    store: Arc<dyn KvStore>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Raw records of one collection. Deliberately untyped: prepend and
    /// delete rewrite the blob without normalizing old generations, so a
    /// legacy record stays byte-stable until the user deletes it.
    async fn load_raw(&self, key: &str) -> Vec<Value> {
        let blob = match self.store.get(key).await {
            Ok(Some(blob)) => blob,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("history load failed for {}: {}", key, e);
                return Vec::new();
            }
        };
        match serde_json::from_str(&blob) {
            Ok(records) => records,
            Err(e) => {
                warn!("corrupt history blob under {}: {}", key, e);
                Vec::new()
            }
        }
    }

    async fn write_raw(&self, key: &str, records: &[Value]) -> Result<(), GarimpoError> {
        let blob = serde_json::to_string(records)
            .map_err(|e| GarimpoError::Serialization(e.to_string()))?;
        self.store.set(key, &blob).await
    }

    async fn prepend<T: serde::Serialize>(
        &self,
        key: &str,
        entry: &T,
    ) -> Result<(), GarimpoError> {
        let value =
            serde_json::to_value(entry).map_err(|e| GarimpoError::Serialization(e.to_string()))?;
        let mut records = self.load_raw(key).await;
        records.insert(0, value);
        self.write_raw(key, &records).await
    }

    async fn delete_by_id(&self, key: &str, id: &str) -> Result<(), GarimpoError> {
        let records: Vec<Value> = self
            .load_raw(key)
            .await
            .into_iter()
            .filter(|r| r["id"].as_str() != Some(id))
            .collect();
        self.write_raw(key, &records).await
    }

    // --- analysis collection ---

    /// All analysis entries, newest first, every generation normalized to
    /// the canonical shape. Normalization is in-memory only.
    pub async fn load_analyses(&self) -> Vec<AnalysisEntry> {
        let records = self.load_raw(ANALYSIS_HISTORY_KEY).await;
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            match normalize_analysis_record(record) {
                Some(entry) => entries.push(entry),
                // One undecodable record poisons the blob; treat the whole
                // collection as unreadable rather than half of a history.
                None => return Vec::new(),
            }
        }
        entries
    }

    pub async fn find_analysis(&self, id: &str) -> Option<AnalysisEntry> {
        self.load_analyses().await.into_iter().find(|e| e.id == id)
    }

    pub async fn save_analysis(&self, entry: &AnalysisEntry) -> Result<(), GarimpoError> {
        self.prepend(ANALYSIS_HISTORY_KEY, entry).await
    }

    /// No cascade: price and try-on rows referencing this id stay behind
    /// as orphans and keep displaying from their denormalized snapshots.
    pub async fn delete_analysis(&self, id: &str) -> Result<(), GarimpoError> {
        self.delete_by_id(ANALYSIS_HISTORY_KEY, id).await
    }

    pub async fn clear_analyses(&self) -> Result<(), GarimpoError> {
        self.store.delete(ANALYSIS_HISTORY_KEY).await
    }

    // --- price estimate collection ---

    pub async fn load_price_history(&self) -> Vec<PriceEstimateEntry> {
        let records = self.load_raw(PRICE_HISTORY_KEY).await;
        match serde_json::from_value(Value::Array(records)) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("corrupt price history: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn price_history_for_item(&self, analysis_id: &str) -> Vec<PriceEstimateEntry> {
        self.load_price_history()
            .await
            .into_iter()
            .filter(|e| e.analysis_id == analysis_id)
            .collect()
    }

    pub async fn save_price_estimate(
        &self,
        entry: &PriceEstimateEntry,
    ) -> Result<(), GarimpoError> {
        self.prepend(PRICE_HISTORY_KEY, entry).await
    }

    pub async fn delete_price_estimate(&self, id: &str) -> Result<(), GarimpoError> {
        self.delete_by_id(PRICE_HISTORY_KEY, id).await
    }

    // --- try-on collection ---

    pub async fn load_tryon_history(&self) -> Vec<TryOnHistoryItem> {
        let records = self.load_raw(TRYON_HISTORY_KEY).await;
        match serde_json::from_value(Value::Array(records)) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("corrupt try-on history: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn tryon_history_for_item(&self, analysis_id: &str) -> Vec<TryOnHistoryItem> {
        self.load_tryon_history()
            .await
            .into_iter()
            .filter(|e| e.analysis_id == analysis_id)
            .collect()
    }

    pub async fn save_tryon_item(&self, item: &TryOnHistoryItem) -> Result<(), GarimpoError> {
        self.prepend(TRYON_HISTORY_KEY, item).await
    }

    pub async fn delete_tryon_item(&self, id: &str) -> Result<(), GarimpoError> {
        self.delete_by_id(TRYON_HISTORY_KEY, id).await
    }
}

/// Upcasts one raw analysis record to the canonical shape:
/// - flat Portuguese records (detected by `categoria`) go through the
///   legacy mapping tables;
/// - current records with the singular `imagePreview` field get it wrapped
///   into a one-element `imagePreviews` list, dropping the old field.
fn normalize_analysis_record(mut record: Value) -> Option<AnalysisEntry> {
    if record.get("categoria").is_some() {
        let legacy: LegacyAnalysisRecord = serde_json::from_value(record).ok()?;
        return Some(legacy.upcast());
    }

    if let Some(obj) = record.as_object_mut() {
        if !obj.contains_key("imagePreviews") {
            if let Some(Value::String(single)) = obj.remove("imagePreview") {
                obj.insert(
                    "imagePreviews".to_string(),
                    Value::Array(vec![Value::String(single)]),
                );
            }
        } else {
            obj.remove("imagePreview");
        }
    }

    serde_json::from_value(record).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_fixtures::black_dress;
    use chrono::Utc;

    fn service() -> (HistoryService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (HistoryService::new(store.clone() as Arc<dyn KvStore>), store)
    }

    fn entry(id: &str) -> AnalysisEntry {
        AnalysisEntry {
            id: id.into(),
            classification: black_dress(),
            image_previews: vec![format!("data:image/jpeg;base64,{}", id)],
            analyzed_at: Utc::now(),
            usage: None,
        }
    }

    fn price_entry(id: &str, analysis_id: &str) -> PriceEstimateEntry {
        PriceEstimateEntry {
            id: id.into(),
            analysis_id: analysis_id.into(),
            category: "clothing".into(),
            brand: Some("Farm".into()),
            condition: Some("very_good".into()),
            suggested_title: "Dress".into(),
            min_price: 80.0,
            max_price: 150.0,
            suggested_price: 110.0,
            justification: "ok".into(),
            estimated_at: Utc::now(),
            usage: None,
        }
    }

    #[tokio::test]
    async fn prepend_keeps_newest_first_and_round_trips() {
        let (history, _) = service();
        history.save_analysis(&entry("a1")).await.unwrap();
        history.save_analysis(&entry("a2")).await.unwrap();

        let loaded = history.load_analyses().await;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "a2");
        assert_eq!(loaded[1].id, "a1");
        assert_eq!(
            loaded[1].classification.suggested_title,
            "Black Sheath Cocktail Dress"
        );
    }

    #[tokio::test]
    async fn singular_preview_field_is_migrated_on_load_only() {
        let (history, store) = service();

        let mut record = serde_json::to_value(entry("old")).unwrap();
        let obj = record.as_object_mut().unwrap();
        obj.remove("imagePreviews");
        obj.insert(
            "imagePreview".into(),
            Value::String("data:image/jpeg;base64,single".into()),
        );
        store
            .set(ANALYSIS_HISTORY_KEY, &Value::Array(vec![record]).to_string())
            .await
            .unwrap();

        let loaded = history.load_analyses().await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].image_previews, vec!["data:image/jpeg;base64,single"]);

        // The blob itself still holds the old shape.
        let blob = store.get(ANALYSIS_HISTORY_KEY).await.unwrap().unwrap();
        let raw: Vec<Value> = serde_json::from_str(&blob).unwrap();
        assert!(raw[0].get("imagePreview").is_some());
        assert!(raw[0].get("imagePreviews").is_none());
    }

    #[tokio::test]
    async fn legacy_portuguese_records_coexist_with_current_ones() {
        let (history, store) = service();
        let legacy = serde_json::json!({
            "id": "legacy-1",
            "imagePreview": "data:image/jpeg;base64,abc",
            "titulo_sugerido": "Vestido Midi Preto",
            "descricao_sugerida": "Vestido tubinho.",
            "categoria": "vestido",
            "cor": "preto",
            "genero": "feminino"
        });
        store
            .set(ANALYSIS_HISTORY_KEY, &Value::Array(vec![legacy]).to_string())
            .await
            .unwrap();

        history.save_analysis(&entry("new-1")).await.unwrap();

        let loaded = history.load_analyses().await;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "new-1");
        assert_eq!(loaded[1].id, "legacy-1");
        assert_eq!(loaded[1].classification.suggested_title, "Vestido Midi Preto");
        assert_eq!(loaded[1].image_previews, vec!["data:image/jpeg;base64,abc"]);

        // Prepending rewrote the blob without converting the legacy record.
        let blob = store.get(ANALYSIS_HISTORY_KEY).await.unwrap().unwrap();
        let raw: Vec<Value> = serde_json::from_str(&blob).unwrap();
        assert!(raw[1].get("categoria").is_some());
    }

    #[tokio::test]
    async fn corrupt_blob_reads_as_empty_history() {
        let (history, store) = service();
        store
            .set(ANALYSIS_HISTORY_KEY, "{not valid json]]")
            .await
            .unwrap();
        assert!(history.load_analyses().await.is_empty());
        assert!(history.load_price_history().await.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_entry() {
        let (history, _) = service();
        history.save_price_estimate(&price_entry("p1", "a1")).await.unwrap();
        history.save_price_estimate(&price_entry("p2", "a1")).await.unwrap();
        history.save_price_estimate(&price_entry("p3", "a2")).await.unwrap();

        history.delete_price_estimate("p2").await.unwrap();

        let remaining = history.load_price_history().await;
        let ids: Vec<&str> = remaining.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["p3", "p1"]);
    }

    #[tokio::test]
    async fn per_item_queries_filter_by_analysis_id() {
        let (history, _) = service();
        history.save_price_estimate(&price_entry("p1", "a1")).await.unwrap();
        history.save_price_estimate(&price_entry("p2", "a2")).await.unwrap();

        let for_a1 = history.price_history_for_item("a1").await;
        assert_eq!(for_a1.len(), 1);
        assert_eq!(for_a1[0].id, "p1");

        // Orphans (no matching analysis entry) are still returned.
        assert!(history.find_analysis("a2").await.is_none());
        assert_eq!(history.price_history_for_item("a2").await.len(), 1);
    }

    #[tokio::test]
    async fn delete_analysis_does_not_cascade() {
        let (history, _) = service();
        history.save_analysis(&entry("a1")).await.unwrap();
        history.save_price_estimate(&price_entry("p1", "a1")).await.unwrap();

        history.delete_analysis("a1").await.unwrap();

        assert!(history.find_analysis("a1").await.is_none());
        assert_eq!(history.price_history_for_item("a1").await.len(), 1);
    }

    #[tokio::test]
    async fn clear_removes_the_key() {
        let (history, store) = service();
        history.save_analysis(&entry("a1")).await.unwrap();
        history.clear_analyses().await.unwrap();
        assert!(store.get(ANALYSIS_HISTORY_KEY).await.unwrap().is_none());
        assert!(history.load_analyses().await.is_empty());
    }

    #[tokio::test]
    async fn price_entries_read_portuguese_generation_from_store() {
        let (history, store) = service();
        let legacy = serde_json::json!([{
            "id": "p-old",
            "analysisId": "a1",
            "category": "vestido",
            "marca": "Farm",
            "qualidade": "tão boa quanto nova",
            "suggestedTitle": "Vestido Midi",
            "precoMinimo": 70,
            "precoMaximo": 140,
            "precoSugerido": 100,
            "justificativa": "referências do Enjoei",
            "estimatedAt": "2024-03-10T09:00:00Z"
        }]);
        store
            .set(PRICE_HISTORY_KEY, &legacy.to_string())
            .await
            .unwrap();

        let loaded = history.load_price_history().await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].suggested_price, 100.0);
        assert_eq!(loaded[0].brand.as_deref(), Some("Farm"));
    }
}
