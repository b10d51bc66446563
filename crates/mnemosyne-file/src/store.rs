//! JSONL journal store implementation.
//!
//! One append-only journal per target. Replace appends a new record under
//! the same identifier; the last record for an identifier wins on read.
//! When the active journal exceeds the configured size it is rotated
//! (renamed with a timestamp suffix) and old rotated journals are pruned;
//! rotated records remain readable.

use crate::config::FileStoreConfig;
use async_trait::async_trait;
use mnemosyne_core::{
    AuditEvent, AuditStore, EventId, EventQuery, JsonCodec, ReplacePolicy, Result, StoreError,
    StoreResolver, StoreTarget,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

/// One journal line: identifier, integrity checksum, canonical event.
#[derive(Debug, Serialize, Deserialize)]
struct Record {
    id: EventId,
    checksum: String,
    event: serde_json::Value,
}

/// Append-only JSONL audit store.
#[derive(Debug)]
pub struct FileStore {
    config: FileStoreConfig,
    codec: JsonCodec,
    resolver: StoreResolver,
    replace_policy: ReplacePolicy,
    next_id: AtomicU64,
    // Serializes journal writes; the guard is the scoped session for each
    // write operation.
    write_lock: tokio::sync::Mutex<()>,
}

impl FileStore {
    /// Creates a file store, ensuring the journal directory exists and
    /// resuming identifier assignment after the highest persisted one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created or
    /// scanned.
    pub fn new(config: FileStoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.dir).map_err(|source| StoreError::Io {
            path: config.dir.clone(),
            source,
        })?;
        let highest = scan_highest_id(&config.dir)?;

        Ok(Self {
            config,
            codec: JsonCodec::new(),
            resolver: StoreResolver::default(),
            replace_policy: ReplacePolicy::RequireExisting,
            next_id: AtomicU64::new(highest),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Sets the codec.
    #[must_use]
    pub fn with_codec(mut self, codec: JsonCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Sets the store resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: StoreResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Sets the replace policy. The default requires pre-existence.
    #[must_use]
    pub const fn with_replace_policy(mut self, policy: ReplacePolicy) -> Self {
        self.replace_policy = policy;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &FileStoreConfig {
        &self.config
    }

    /// Queries a target's journal with a filter.
    ///
    /// Scans rotated journals oldest-first, then the active journal, with
    /// the last record per identifier winning.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on read failure and
    /// [`StoreError::Corrupted`] if a matched record fails its checksum.
    pub async fn query(&self, target: &StoreTarget, query: &EventQuery) -> Result<Vec<AuditEvent>> {
        let mut latest: HashMap<EventId, Record> = HashMap::new();
        for path in self.journal_files(target).await? {
            for record in read_records(&path).await? {
                latest.insert(record.id.clone(), record);
            }
        }

        let mut matched = Vec::new();
        for record in latest.into_values() {
            let event = self.verify_and_decode(record)?;
            if query.matches(&event) {
                matched.push(event);
            }
        }
        matched.sort_by_key(|event| event.occurred_at);
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    fn assign_id(&self) -> EventId {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        EventId::new(format!("events/{n}-A"))
    }

    /// Path of a target's active journal. Target names must stay inside
    /// the journal directory: ASCII alphanumerics, `-` and `_` only.
    fn journal_path(&self, target: &StoreTarget) -> Result<PathBuf> {
        let name = target.as_str();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::Config {
                message: format!("invalid journal target name '{name}'"),
            });
        }
        Ok(self.config.dir.join(format!("{name}.jsonl")))
    }

    /// Journals holding records for a target: rotated oldest-first, the
    /// active journal last.
    async fn journal_files(&self, target: &StoreTarget) -> Result<Vec<PathBuf>> {
        let active = self.journal_path(target)?;
        let mut rotated = self.rotated_journals(target).await?;
        rotated.push(active);
        Ok(rotated)
    }

    /// Rotated journals for a target, sorted oldest-first (timestamped
    /// names sort chronologically).
    async fn rotated_journals(&self, target: &StoreTarget) -> Result<Vec<PathBuf>> {
        let prefix = format!("{}.", target.as_str());
        let active_name = format!("{}.jsonl", target.as_str());
        let mut paths = Vec::new();

        let mut entries = fs::read_dir(&self.config.dir)
            .await
            .map_err(|source| StoreError::Io {
                path: self.config.dir.clone(),
                source,
            })?;
        while let Some(entry) = entries.next_entry().await.map_err(|source| StoreError::Io {
            path: self.config.dir.clone(),
            source,
        })? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(&prefix) && name.ends_with(".jsonl") && name != active_name {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Rotates the active journal if it exceeds the size threshold.
    /// Caller holds the write lock.
    async fn maybe_rotate(&self, target: &StoreTarget) -> Result<()> {
        let active = self.journal_path(target)?;
        let Ok(meta) = fs::metadata(&active).await else {
            return Ok(()); // no journal yet
        };
        if meta.len() < self.config.max_file_bytes {
            return Ok(());
        }

        let ts = chrono::Utc::now().format("%Y%m%dT%H%M%S%.6f").to_string();
        let mut rotated = self.config.dir.join(format!("{}.{ts}.jsonl", target.as_str()));
        let mut counter = 1u32;
        while rotated.exists() {
            rotated = self
                .config
                .dir
                .join(format!("{}.{ts}-{counter}.jsonl", target.as_str()));
            counter += 1;
        }
        fs::rename(&active, &rotated)
            .await
            .map_err(|source| StoreError::Io {
                path: active.clone(),
                source,
            })?;
        debug!(%target, rotated = %rotated.display(), "Rotated journal");

        self.prune_rotated(target).await
    }

    /// Deletes rotated journals beyond the retention limits.
    async fn prune_rotated(&self, target: &StoreTarget) -> Result<()> {
        let mut rotated = self.rotated_journals(target).await?;

        if self.config.retention_days > 0 {
            let cutoff = chrono::Utc::now()
                - chrono::Duration::days(i64::from(self.config.retention_days));
            let mut kept = Vec::with_capacity(rotated.len());
            for path in rotated {
                if file_modified_time(&path).is_some_and(|mtime| mtime < cutoff) {
                    let _ = fs::remove_file(&path).await;
                    debug!(pruned = %path.display(), "Pruned expired journal");
                } else {
                    kept.push(path);
                }
            }
            rotated = kept;
        }

        while rotated.len() > self.config.max_rotated_files {
            let oldest = rotated.remove(0);
            let _ = fs::remove_file(&oldest).await;
            debug!(pruned = %oldest.display(), "Pruned rotated journal");
        }
        Ok(())
    }

    /// Appends one record line to a target's active journal. Caller holds
    /// the write lock.
    async fn append(&self, target: &StoreTarget, record: &Record) -> Result<()> {
        self.maybe_rotate(target).await?;

        let path = self.journal_path(target)?;
        let mut line = serde_json::to_string(record)
            .map_err(|source| mnemosyne_core::CodecError::Encode { source })
            .map_err(StoreError::from)?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        file.flush()
            .await
            .map_err(|source| StoreError::Io { path, source })?;
        Ok(())
    }

    /// Finds the latest record for an identifier across a target's
    /// journals.
    async fn load_latest(&self, target: &StoreTarget, id: &EventId) -> Result<Option<Record>> {
        let mut latest = None;
        for path in self.journal_files(target).await? {
            for record in read_records(&path).await? {
                if record.id == *id {
                    latest = Some(record);
                }
            }
        }
        Ok(latest)
    }

    /// Checks a record's checksum and decodes its event.
    fn verify_and_decode(&self, record: Record) -> Result<AuditEvent> {
        let bytes = serde_json::to_vec(&record.event).map_err(|e| StoreError::Corrupted {
            id: record.id.clone(),
            reason: format!("stored event is not re-encodable: {e}"),
        })?;
        let actual = checksum(&bytes);
        if actual != record.checksum {
            return Err(StoreError::Corrupted {
                id: record.id,
                reason: format!("checksum mismatch: expected {}, got {actual}", record.checksum),
            });
        }
        self.codec.decode(&bytes).map_err(StoreError::from)
    }

    fn make_record(&self, id: EventId, event: &AuditEvent) -> Result<Record> {
        let encoded = self.codec.encode(event)?;
        let value = serde_json::from_slice(encoded.as_bytes())
            .map_err(|source| mnemosyne_core::CodecError::Decode { source })
            .map_err(StoreError::from)?;
        Ok(Record {
            id,
            checksum: checksum(encoded.as_bytes()),
            event: value,
        })
    }
}

#[async_trait]
impl AuditStore for FileStore {
    fn codec(&self) -> &JsonCodec {
        &self.codec
    }

    async fn insert(&self, event: &AuditEvent) -> Result<EventId> {
        let target = self.resolver.resolve(event);
        let id = self.assign_id();
        let record = self.make_record(id.clone(), event)?;

        let _guard = self.write_lock.lock().await;
        self.append(&target, &record).await?;

        debug!(%target, %id, kind = %event.kind, "Appended event");
        Ok(id)
    }

    async fn replace(&self, id: &EventId, event: &AuditEvent) -> Result<()> {
        let target = self.resolver.resolve(event);
        let record = self.make_record(id.clone(), event)?;

        let _guard = self.write_lock.lock().await;
        if self.replace_policy == ReplacePolicy::RequireExisting
            && self.load_latest(&target, id).await?.is_none()
        {
            return Err(StoreError::NotFound {
                target,
                id: id.clone(),
            });
        }
        self.append(&target, &record).await?;

        debug!(%target, %id, "Replaced event");
        Ok(())
    }

    async fn get(&self, id: &EventId) -> Result<AuditEvent> {
        self.get_from(self.resolver.default_target(), id).await
    }

    async fn get_from(&self, target: &StoreTarget, id: &EventId) -> Result<AuditEvent> {
        match self.load_latest(target, id).await? {
            Some(record) => self.verify_and_decode(record),
            None => Err(StoreError::NotFound {
                target: target.clone(),
                id: id.clone(),
            }),
        }
    }
}

/// Hex SHA-256 of canonical event bytes.
fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Reads the records of one journal. Lines that do not parse are skipped
/// with a warning: a torn tail from a crash must not make the whole
/// journal unreadable.
async fn read_records(path: &Path) -> Result<Vec<Record>> {
    let file = match fs::File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut records = Vec::new();
    let mut lines = BufReader::new(file).lines();
    while let Some(line) = lines.next_line().await.map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })? {
        match serde_json::from_str::<Record>(&line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping malformed journal line"),
        }
    }
    Ok(records)
}

/// Highest identifier sequence number already persisted under a directory.
fn scan_highest_id(dir: &Path) -> Result<u64> {
    let mut highest = 0;
    let entries = std::fs::read_dir(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.extension().is_some_and(|ext| ext == "jsonl") {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        for line in content.lines() {
            if let Ok(record) = serde_json::from_str::<Record>(line) {
                if let Some(n) = id_sequence(&record.id) {
                    highest = highest.max(n);
                }
            }
        }
    }
    Ok(highest)
}

/// Sequence number of an `events/{n}-{node}` identifier.
fn id_sequence(id: &EventId) -> Option<u64> {
    id.as_str()
        .strip_prefix("events/")?
        .split('-')
        .next()?
        .parse()
        .ok()
}

/// File modification time as a UTC timestamp.
fn file_modified_time(path: &Path) -> Option<chrono::DateTime<chrono::Utc>> {
    let meta = std::fs::metadata(path).ok()?;
    let modified = meta.modified().ok()?;
    Some(chrono::DateTime::from(modified))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> FileStore {
        FileStore::new(FileStoreConfig::new(dir)).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        let event = AuditEvent::new("Connect").with_field("ConnectionId", "abc123");
        let id = store.insert(&event).await.unwrap();
        assert_eq!(id.as_str(), "events/1-A");

        let loaded = store.get(&id).await.unwrap();
        assert_eq!(loaded.field_str("ConnectionId"), Some("abc123"));
    }

    #[tokio::test]
    async fn test_get_unknown_id_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        let err = store.get(&EventId::new("events/404-A")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_replace_appends_and_last_record_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        let id = store
            .insert(&AuditEvent::new("Connect").with_field("Attempts", 1))
            .await
            .unwrap();
        store
            .replace(&id, &AuditEvent::new("Connect").with_field("Attempts", 2))
            .await
            .unwrap();

        let loaded = store.get(&id).await.unwrap();
        assert_eq!(loaded.field("Attempts"), Some(&serde_json::json!(2)));
    }

    #[tokio::test]
    async fn test_replace_requires_existing_by_default() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        let err = store
            .replace(&EventId::new("events/9-A"), &AuditEvent::new("Connect"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_id_assignment_resumes_after_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let store = store_in(tmp.path());
            store.insert(&AuditEvent::new("Connect")).await.unwrap();
            store.insert(&AuditEvent::new("Connect")).await.unwrap();
        }

        let reopened = store_in(tmp.path());
        let id = reopened.insert(&AuditEvent::new("Connect")).await.unwrap();
        assert_eq!(id.as_str(), "events/3-A");
    }

    #[tokio::test]
    async fn test_rotation_keeps_records_retrievable() {
        let tmp = tempfile::tempdir().unwrap();
        let config = FileStoreConfig::new(tmp.path())
            .with_max_file_bytes(256)
            .with_max_rotated_files(50);
        let store = FileStore::new(config).unwrap();

        let mut ids = Vec::new();
        for i in 0..20 {
            let id = store
                .insert(&AuditEvent::new("Connect").with_field("Seq", i))
                .await
                .unwrap();
            ids.push(id);
        }

        // Rotation happened; every record is still readable.
        let rotated = store
            .rotated_journals(&StoreTarget::new("events"))
            .await
            .unwrap();
        assert!(!rotated.is_empty());
        for (i, id) in ids.iter().enumerate() {
            let event = store.get(id).await.unwrap();
            assert_eq!(event.field("Seq"), Some(&serde_json::json!(i)));
        }
    }

    #[tokio::test]
    async fn test_rotation_prunes_old_journals() {
        let tmp = tempfile::tempdir().unwrap();
        let config = FileStoreConfig::new(tmp.path())
            .with_max_file_bytes(200)
            .with_max_rotated_files(2);
        let store = FileStore::new(config).unwrap();

        for i in 0..30 {
            store
                .insert(&AuditEvent::new("Connect").with_field("Seq", i))
                .await
                .unwrap();
        }

        let rotated = store
            .rotated_journals(&StoreTarget::new("events"))
            .await
            .unwrap();
        assert!(rotated.len() <= 2, "expected at most 2 rotated journals");
    }

    #[tokio::test]
    async fn test_tampered_record_is_corrupted() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        let id = store
            .insert(&AuditEvent::new("Connect").with_field("Amount", 100))
            .await
            .unwrap();

        // Tamper with the stored amount without updating the checksum.
        let path = tmp.path().join("events.jsonl");
        let content = std::fs::read_to_string(&path).unwrap().replace("100", "999");
        std::fs::write(&path, content).unwrap();

        let err = store.get(&id).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupted { .. }));
    }

    #[tokio::test]
    async fn test_query_last_record_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        let id = store
            .insert(&AuditEvent::new("Connect").with_field("Attempts", 1))
            .await
            .unwrap();
        store
            .replace(&id, &AuditEvent::new("Connect").with_field("Attempts", 2))
            .await
            .unwrap();
        store.insert(&AuditEvent::new("Disconnect")).await.unwrap();

        let target = StoreTarget::new("events");
        let all = store.query(&target, &EventQuery::new()).await.unwrap();
        assert_eq!(all.len(), 2);

        let connects = store
            .query(&target, &EventQuery::new().kind("Connect"))
            .await
            .unwrap();
        assert_eq!(connects.len(), 1);
        assert_eq!(connects[0].field("Attempts"), Some(&serde_json::json!(2)));
    }

    #[tokio::test]
    async fn test_invalid_target_name_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path()).with_resolver(StoreResolver::fixed("../escape"));

        let err = store.insert(&AuditEvent::new("Connect")).await.unwrap_err();
        assert!(matches!(err, StoreError::Config { .. }));
    }

    #[tokio::test]
    async fn test_malformed_line_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        let id = store.insert(&AuditEvent::new("Connect")).await.unwrap();

        // Simulate a torn tail write.
        let path = tmp.path().join("events.jsonl");
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{\"id\":\"events/2-");
        std::fs::write(&path, content).unwrap();

        assert!(store.get(&id).await.is_ok());
    }
}
