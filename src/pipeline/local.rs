use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use super::{
    Pipeline, PipelineError, PipelineOptions, PipelineResult, SearchHit, SearchMode, SearchResult,
};

pub const DEFAULT_KB_BASE_DIR: &str = "data/knowledge_bases";
pub const DEFAULT_TOP_K: usize = 5;

const RAW_DIR: &str = "raw";
const METADATA_FILE: &str = "metadata.json";

/// How stored documents are cut into searchable pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunking {
    Lines,
    Paragraphs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbMetadata {
    pub name: String,
    pub provider: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub files: Vec<String>,
}

/// Pipeline over a plain knowledge-base directory:
/// `{kb_base_dir}/{kb}/raw/*` plus `{kb_base_dir}/{kb}/metadata.json`.
#[derive(Debug, Clone)]
pub struct LocalPipeline {
    name: String,
    kb_base_dir: PathBuf,
    chunking: Chunking,
}

impl LocalPipeline {
    pub fn new(name: impl Into<String>, kb_base_dir: Option<&Path>, chunking: Chunking) -> Self {
        Self {
            name: name.into(),
            kb_base_dir: kb_base_dir
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_KB_BASE_DIR)),
            chunking,
        }
    }

    pub fn chunking(&self) -> Chunking {
        self.chunking
    }

    fn kb_dir(&self, kb_name: &str) -> PipelineResult<PathBuf> {
        let valid = !kb_name.is_empty()
            && kb_name != "."
            && kb_name != ".."
            && !kb_name.contains(['/', '\\']);
        if !valid {
            return Err(PipelineError::InvalidKbName(kb_name.to_string()));
        }
        Ok(self.kb_base_dir.join(kb_name))
    }

    async fn read_metadata(&self, kb_dir: &Path) -> PipelineResult<Option<KbMetadata>> {
        match fs::read_to_string(kb_dir.join(METADATA_FILE)).await {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn chunks<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let pieces: Vec<&str> = match self.chunking {
            Chunking::Lines => text.lines().collect(),
            Chunking::Paragraphs => text.split("\n\n").collect(),
        };
        pieces
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }
}

fn terms(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn score(chunk: &str, source: &str, terms: &[String], mode: SearchMode) -> f32 {
    let lower = chunk.to_lowercase();
    let mut score = terms
        .iter()
        .map(|t| lower.matches(t.as_str()).count() as f32)
        .sum::<f32>();
    if mode == SearchMode::Hybrid && score > 0.0 {
        let source = source.to_lowercase();
        score += terms.iter().filter(|t| source.contains(t.as_str())).count() as f32 * 0.5;
    }
    score
}

#[async_trait]
impl Pipeline for LocalPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn kb_base_dir(&self) -> &Path {
        &self.kb_base_dir
    }

    #[instrument(level = "debug", skip(self, files), fields(pipeline = %self.name))]
    async fn initialize(&self, kb_name: &str, files: Vec<PathBuf>) -> PipelineResult<bool> {
        let kb_dir = self.kb_dir(kb_name)?;
        let raw_dir = kb_dir.join(RAW_DIR);
        fs::create_dir_all(&raw_dir).await?;

        let now = Utc::now().to_rfc3339();
        let mut metadata = self.read_metadata(&kb_dir).await?.unwrap_or(KbMetadata {
            name: kb_name.to_string(),
            provider: self.name.clone(),
            created_at: now.clone(),
            updated_at: now.clone(),
            files: Vec::new(),
        });

        for file in &files {
            let Some(file_name) = file.file_name() else {
                warn!("Skipping path without a file name: {:?}", file);
                continue;
            };
            fs::copy(file, raw_dir.join(file_name)).await?;
            let file_name = file_name.to_string_lossy().into_owned();
            if !metadata.files.contains(&file_name) {
                metadata.files.push(file_name);
            }
        }
        metadata.provider = self.name.clone();
        metadata.updated_at = now;
        fs::write(
            kb_dir.join(METADATA_FILE),
            serde_json::to_vec_pretty(&metadata)?,
        )
        .await?;

        info!(
            "Initialized knowledge base '{}' with {} file(s)",
            kb_name,
            files.len()
        );
        Ok(true)
    }

    #[instrument(level = "debug", skip(self, options), fields(pipeline = %self.name))]
    async fn search(
        &self,
        query: &str,
        kb_name: &str,
        mode: SearchMode,
        options: &PipelineOptions,
    ) -> PipelineResult<SearchResult> {
        let kb_dir = self.kb_dir(kb_name)?;
        if !fs::try_exists(&kb_dir).await? {
            return Err(PipelineError::KnowledgeBaseNotFound(kb_name.to_string()));
        }
        let top_k = options
            .get("top_k")
            .and_then(serde_json::Value::as_u64)
            .map(|k| k as usize)
            .unwrap_or(DEFAULT_TOP_K);
        let terms = terms(query);

        let mut hits = Vec::new();
        let raw_dir = kb_dir.join(RAW_DIR);
        if fs::try_exists(&raw_dir).await? {
            let mut entries = fs::read_dir(&raw_dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let source = entry.file_name().to_string_lossy().into_owned();
                let text = match fs::read_to_string(entry.path()).await {
                    Ok(text) => text,
                    Err(e) => {
                        debug!("Skipping unreadable document {}: {}", source, e);
                        continue;
                    }
                };
                for chunk in self.chunks(&text) {
                    let score = score(chunk, &source, &terms, mode);
                    if score > 0.0 {
                        hits.push(SearchHit {
                            source: source.clone(),
                            text: chunk.to_string(),
                            score,
                        });
                    }
                }
            }
        }
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.source.cmp(&b.source))
        });
        hits.truncate(top_k);

        let content = hits
            .iter()
            .map(|h| h.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        debug!("search '{}' in '{}' -> {} hit(s)", query, kb_name, hits.len());
        Ok(SearchResult {
            query: query.to_string(),
            kb_name: kb_name.to_string(),
            mode,
            provider: self.name.clone(),
            content,
            sources: hits,
        })
    }

    async fn delete(&self, kb_name: &str) -> PipelineResult<bool> {
        let kb_dir = self.kb_dir(kb_name)?;
        match fs::remove_dir_all(&kb_dir).await {
            Ok(()) => {
                info!("Deleted knowledge base '{}'", kb_name);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
