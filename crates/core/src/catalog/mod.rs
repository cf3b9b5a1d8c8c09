use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{PortfolioError, Result};

const BUILTIN_PROJECTS: &str = include_str!("../../data/projects.json");

/// Pseudo-category that matches every entry.
pub const ALL_CATEGORIES: &str = "all";

/// One portfolio project. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCatalogEntry {
    pub id: u32,
    pub title: String,
    pub category: String,
    pub year: String,
    #[serde(default)]
    pub poster: Option<String>,
    pub description: String,
    pub role: String,
    pub duration: String,
    pub client: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}

/// Ordered list of projects as shown on the work page.
#[derive(Debug, Clone, Default)]
pub struct ProjectCatalog {
    entries: Vec<ProjectCatalogEntry>,
}

impl ProjectCatalog {
    /// Rejects catalogs that reuse an id.
    pub fn new(entries: Vec<ProjectCatalogEntry>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for entry in &entries {
            if !seen.insert(entry.id) {
                return Err(PortfolioError::msg(format!(
                    "project id {} appears more than once",
                    entry.id
                )));
            }
        }
        Ok(Self { entries })
    }

    /// The sample projects shipped with the site.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_PROJECTS)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::new(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn entries(&self) -> &[ProjectCatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&ProjectCatalogEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Like [`ProjectCatalog::get`] but with a typed error.
    pub fn require(&self, id: u32) -> Result<&ProjectCatalogEntry> {
        self.get(id).ok_or(PortfolioError::UnknownProject(id))
    }

    /// `"all"` followed by each distinct category in order of first use.
    pub fn categories(&self) -> Vec<&str> {
        let mut categories = vec![ALL_CATEGORIES];
        for entry in &self.entries {
            if !categories.contains(&entry.category.as_str()) {
                categories.push(&entry.category);
            }
        }
        categories
    }

    pub fn filter<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a ProjectCatalogEntry> {
        self.entries
            .iter()
            .filter(move |entry| category == ALL_CATEGORIES || entry.category == category)
    }
}
