use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(Uuid);

impl BlockId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for BlockId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Intro,
    #[default]
    Verse,
    PreChorus,
    Chorus,
    Bridge,
    Hook,
    Outro,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Intro => "intro",
            BlockKind::Verse => "verse",
            BlockKind::PreChorus => "pre-chorus",
            BlockKind::Chorus => "chorus",
            BlockKind::Bridge => "bridge",
            BlockKind::Hook => "hook",
            BlockKind::Outro => "outro",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "intro" => Ok(BlockKind::Intro),
            "verse" => Ok(BlockKind::Verse),
            "pre-chorus" | "prechorus" => Ok(BlockKind::PreChorus),
            "chorus" => Ok(BlockKind::Chorus),
            "bridge" => Ok(BlockKind::Bridge),
            "hook" => Ok(BlockKind::Hook),
            "outro" => Ok(BlockKind::Outro),
            other => Err(format!("unknown block type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub content: String,
}

impl Block {
    pub fn empty(kind: BlockKind) -> Self {
        Self {
            id: BlockId::new(),
            kind,
            content: String::new(),
        }
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created: DateTime<Utc>,
    pub blocks: Vec<Block>,
}

impl Document {
    /// New document holding a single empty block of `first_block`.
    pub fn new(title: impl Into<String>, first_block: BlockKind) -> Self {
        Self {
            id: DocumentId::new(),
            title: title.into(),
            created: Utc::now(),
            blocks: vec![Block::empty(first_block)],
        }
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    pub fn word_count(&self) -> usize {
        self.blocks.iter().map(Block::word_count).sum()
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id,
            title: self.title.clone(),
            created: self.created,
            block_count: self.blocks.len(),
        }
    }
}

/// List-display projection of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub title: String,
    pub created: DateTime<Utc>,
    pub block_count: usize,
}

/// Derived display state for the open document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentStats {
    pub words: usize,
    pub blocks: usize,
}

impl DocumentStats {
    pub fn of(doc: &Document) -> Self {
        Self {
            words: doc.word_count(),
            blocks: doc.blocks.len(),
        }
    }
}

/// All documents of the journal, keyed by id. Serialized as a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentCollection {
    documents: HashMap<DocumentId, Document>,
}

impl DocumentCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get(&id)
    }

    pub fn get_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
        self.documents.get_mut(&id)
    }

    pub fn contains(&self, id: DocumentId) -> bool {
        self.documents.contains_key(&id)
    }

    pub fn insert(&mut self, doc: Document) {
        self.documents.insert(doc.id, doc);
    }

    pub fn remove(&mut self, id: DocumentId) -> Option<Document> {
        self.documents.remove(&id)
    }

    /// Documents in display order: creation time, then id.
    pub fn ordered(&self) -> Vec<&Document> {
        let mut docs: Vec<&Document> = self.documents.values().collect();
        docs.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        docs
    }

    pub fn find_by_title(&self, title: &str) -> Option<&Document> {
        self.ordered().into_iter().find(|d| d.title == title)
    }

    /// Structural checks serde cannot express: every map key matches its
    /// document id and block ids are unique within each document.
    pub fn validate(&self) -> Result<(), String> {
        for (key, doc) in &self.documents {
            if *key != doc.id {
                return Err(format!("document key {key} does not match id {}", doc.id));
            }
            let mut seen = HashSet::with_capacity(doc.blocks.len());
            for block in &doc.blocks {
                if !seen.insert(block.id) {
                    return Err(format!("duplicate block id {} in {}", block.id, doc.id));
                }
            }
        }
        Ok(())
    }
}
