use crate::semantic::{Candidate, EmbeddingVector};
use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fmt::Display,
    fs::OpenOptions,
    path::{Path, PathBuf},
    str::FromStr,
    sync::{Arc, RwLock},
    time::Instant,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Post,
    User,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Post => write!(f, "post"),
            EntityKind::User => write!(f, "user"),
        }
    }
}

impl FromStr for EntityKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(EntityKind::Post),
            "user" => Ok(EntityKind::User),
            other => Err(anyhow!("unknown entity kind {other:?}")),
        }
    }
}

/// A stored post or user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub kind: EntityKind,
    /// Attributes returned to callers as-is
    pub attributes: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<EmbeddingVector>,
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    pub fn into_candidate(self) -> Candidate {
        Candidate {
            id: self.id,
            payload: self.attributes,
            embedding: self.embedding,
        }
    }
}

/// What a history entry was searching for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    News,
    Posts,
    Users,
}

impl Display for SearchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchKind::News => write!(f, "news"),
            SearchKind::Posts => write!(f, "posts"),
            SearchKind::Users => write!(f, "users"),
        }
    }
}

impl FromStr for SearchKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "news" => Ok(SearchKind::News),
            "posts" => Ok(SearchKind::Posts),
            "users" => Ok(SearchKind::Users),
            other => Err(anyhow!("unknown search kind {other:?}")),
        }
    }
}

impl From<EntityKind> for SearchKind {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Post => SearchKind::Posts,
            EntityKind::User => SearchKind::Users,
        }
    }
}

/// One completed search. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryEntry {
    pub id: String,
    pub user_id: String,
    pub kind: SearchKind,
    pub query: String,
    pub results: Value,
    pub created_at: DateTime<Utc>,
}

pub trait SearchStore: Send + Sync {
    /// Up to `limit` of the most recently saved entities of `kind` that
    /// have a stored embedding.
    fn candidates(&self, kind: EntityKind, limit: usize) -> anyhow::Result<Vec<Candidate>>;
    /// Insert a new entity or replace the one with the same id and kind.
    fn upsert(&self, entity: Entity) -> anyhow::Result<Entity>;
    fn append_history(&self, entry: SearchHistoryEntry) -> anyhow::Result<()>;
    /// Entries of `user_id`, newest first.
    fn history(&self, user_id: &str, limit: usize) -> anyhow::Result<Vec<SearchHistoryEntry>>;
}

const ENTITY_HEADERS: [&str; 5] = ["id", "kind", "attributes", "embedding", "updated_at"];
const HISTORY_HEADERS: [&str; 6] = ["id", "user_id", "kind", "query", "results", "created_at"];

/// CSV-backed store: `entities.csv` is rewritten on every change,
/// `history.csv` is only ever appended to.
#[derive(Debug, Clone)]
pub struct BackendCsv {
    entities: Arc<RwLock<Vec<Entity>>>,
    history: Arc<RwLock<Vec<SearchHistoryEntry>>>,
    entities_path: PathBuf,
    history_path: PathBuf,
}

fn ensure_csv(path: &Path, headers: &[&str]) -> anyhow::Result<()> {
    if !path.exists() {
        log::info!("Creating new store file at {}", path.display());
        let mut csv_wrt = csv::Writer::from_path(path)?;
        csv_wrt.write_record(headers)?;
        csv_wrt.flush()?;
    }
    Ok(())
}

fn field<'a>(record: &'a csv::StringRecord, idx: usize, name: &str) -> anyhow::Result<&'a str> {
    record
        .get(idx)
        .ok_or_else(|| anyhow!("couldnt get record {name}"))
}

fn parse_time(value: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

impl BackendCsv {
    pub fn load(base_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(base_dir)?;

        let entities_path = base_dir.join("entities.csv");
        let history_path = base_dir.join("history.csv");
        ensure_csv(&entities_path, &ENTITY_HEADERS)?;
        ensure_csv(&history_path, &HISTORY_HEADERS)?;

        let now = Instant::now();
        let entities = Self::read_entities(&entities_path)
            .with_context(|| format!("reading {}", entities_path.display()))?;
        let history = Self::read_history(&history_path)
            .with_context(|| format!("reading {}", history_path.display()))?;

        log::debug!(
            "loaded {} entities and {} history entries in {}ms",
            entities.len(),
            history.len(),
            now.elapsed().as_micros() as f64 / 1000.0
        );

        Ok(Self {
            entities: Arc::new(RwLock::new(entities)),
            history: Arc::new(RwLock::new(history)),
            entities_path,
            history_path,
        })
    }

    fn read_entities(path: &Path) -> anyhow::Result<Vec<Entity>> {
        let mut csv_reader = csv::Reader::from_path(path)?;
        let mut entities = vec![];

        for record in csv_reader.records() {
            let record = record?;
            let embedding = field(&record, 3, "embedding")?;

            entities.push(Entity {
                id: field(&record, 0, "id")?.to_string(),
                kind: field(&record, 1, "kind")?.parse()?,
                attributes: serde_json::from_str(field(&record, 2, "attributes")?)?,
                embedding: if embedding.is_empty() {
                    None
                } else {
                    Some(EmbeddingVector::from(serde_json::from_str::<Vec<f32>>(embedding)?))
                },
                updated_at: parse_time(field(&record, 4, "updated_at")?)?,
            });
        }

        Ok(entities)
    }

    fn read_history(path: &Path) -> anyhow::Result<Vec<SearchHistoryEntry>> {
        let mut csv_reader = csv::Reader::from_path(path)?;
        let mut history = vec![];

        for record in csv_reader.records() {
            let record = record?;
            history.push(SearchHistoryEntry {
                id: field(&record, 0, "id")?.to_string(),
                user_id: field(&record, 1, "user_id")?.to_string(),
                kind: field(&record, 2, "kind")?.parse()?,
                query: field(&record, 3, "query")?.to_string(),
                results: serde_json::from_str(field(&record, 4, "results")?)?,
                created_at: parse_time(field(&record, 5, "created_at")?)?,
            });
        }

        Ok(history)
    }

    fn save_entities(&self, entities: &[Entity]) -> anyhow::Result<()> {
        let temp_path = self.entities_path.with_extension("csv-tmp");
        let mut csv_wrt = csv::Writer::from_path(&temp_path)?;
        csv_wrt.write_record(ENTITY_HEADERS)?;
        for entity in entities {
            let embedding = match &entity.embedding {
                Some(embedding) => serde_json::to_string(embedding)?,
                None => String::new(),
            };
            csv_wrt.write_record([
                &entity.id,
                &entity.kind.to_string(),
                &serde_json::to_string(&entity.attributes)?,
                &embedding,
                &entity.updated_at.to_rfc3339(),
            ])?;
        }
        csv_wrt.flush()?;
        std::fs::rename(&temp_path, &self.entities_path)?;
        Ok(())
    }
}

impl SearchStore for BackendCsv {
    fn candidates(&self, kind: EntityKind, limit: usize) -> anyhow::Result<Vec<Candidate>> {
        let entities = self
            .entities
            .read()
            .map_err(|_| anyhow!("entity store lock poisoned"))?;

        Ok(entities
            .iter()
            .rev()
            .filter(|e| e.kind == kind && e.embedding.is_some())
            .take(limit)
            .cloned()
            .map(Entity::into_candidate)
            .collect())
    }

    fn upsert(&self, entity: Entity) -> anyhow::Result<Entity> {
        let mut entities = self
            .entities
            .write()
            .map_err(|_| anyhow!("entity store lock poisoned"))?;

        // a replaced entity moves to the end, keeping the list in save order
        let mut updated: Vec<Entity> = entities
            .iter()
            .filter(|e| !(e.id == entity.id && e.kind == entity.kind))
            .cloned()
            .collect();
        updated.push(entity.clone());

        // memory only changes once the file does
        self.save_entities(&updated)?;
        *entities = updated;
        Ok(entity)
    }

    fn append_history(&self, entry: SearchHistoryEntry) -> anyhow::Result<()> {
        let mut history = self
            .history
            .write()
            .map_err(|_| anyhow!("history store lock poisoned"))?;

        let file = OpenOptions::new().append(true).open(&self.history_path)?;
        let mut csv_wrt = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        csv_wrt.write_record([
            &entry.id,
            &entry.user_id,
            &entry.kind.to_string(),
            &entry.query,
            &serde_json::to_string(&entry.results)?,
            &entry.created_at.to_rfc3339(),
        ])?;
        csv_wrt.flush()?;

        history.push(entry);
        Ok(())
    }

    fn history(&self, user_id: &str, limit: usize) -> anyhow::Result<Vec<SearchHistoryEntry>> {
        let history = self
            .history
            .read()
            .map_err(|_| anyhow!("history store lock poisoned"))?;

        Ok(history
            .iter()
            .rev()
            .filter(|entry| entry.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
