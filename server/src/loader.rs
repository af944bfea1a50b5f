use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::Deserialize;
use time::macros::format_description;
use time::Date;

use guidex_core::model::{Category, RecordId, Subcategory, Update};
use guidex_core::reload::SharedIndex;

use crate::catalog::Catalog;

/// One folder row of the guide file, as exported from the maintained
/// spreadsheet. Missing columns deserialize as empty strings.
#[derive(Debug, Deserialize)]
pub struct FolderRow {
    #[serde(default)]
    pub main_folder: String,
    #[serde(default)]
    pub sub_folder: String,
    #[serde(default)]
    pub document_type: String,
    #[serde(default)]
    pub identification_rules: String,
    #[serde(default)]
    pub supporting_information: String,
}

/// One row of the updates sheet.
#[derive(Debug, Deserialize)]
pub struct UpdateRow {
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub main_folder: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct GuideFile {
    #[serde(default)]
    pub folders: Vec<FolderRow>,
    #[serde(default)]
    pub updates: Vec<UpdateRow>,
}

/// Parsed rows turned into authoritative records with per-load ids.
#[derive(Debug, Default)]
pub struct Dataset {
    pub categories: Vec<Category>,
    pub subcategories: Vec<Subcategory>,
    pub updates: Vec<Update>,
}

/// Accept an ISO date, optionally followed by a time-of-day, then fall
/// back to the day-month-year form older exports carry. Anything else is
/// unparseable and the row gets dropped.
fn parse_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let date_part = raw.split_whitespace().next().unwrap_or(raw);
    let iso = format_description!("[year]-[month]-[day]");
    let dmy = format_description!("[day]-[month]-[year]");
    Date::parse(date_part, iso)
        .or_else(|_| Date::parse(date_part, dmy))
        .ok()
}

/// Derive records from rows. A category is created the first time its
/// main-folder name appears; a row without a sub-folder contributes only
/// its category; a row with neither folder is skipped. Update rows whose
/// date cannot be parsed are dropped with a warning.
pub fn build_dataset(file: GuideFile) -> Dataset {
    let mut categories: Vec<Category> = Vec::new();
    let mut subcategories: Vec<Subcategory> = Vec::new();

    for row in file.folders {
        let main_folder = row.main_folder.trim();
        let sub_folder = row.sub_folder.trim();
        if main_folder.is_empty() && sub_folder.is_empty() {
            continue;
        }

        let category_id = match categories.iter().find(|c| c.name == main_folder) {
            Some(category) => category.id,
            None => {
                let id = categories.len() as RecordId + 1;
                categories.push(Category { id, name: main_folder.to_string() });
                id
            }
        };

        if !sub_folder.is_empty() {
            subcategories.push(Subcategory {
                id: subcategories.len() as RecordId + 1,
                name: sub_folder.to_string(),
                document_type: row.document_type,
                identification_rules: row.identification_rules,
                supporting_information: row.supporting_information,
                category_id,
            });
        }
    }

    let mut updates: Vec<Update> = Vec::new();
    for row in file.updates {
        let Some(date) = parse_date(&row.date) else {
            tracing::warn!(reference = %row.reference, raw = %row.date, "skipping update row with unparseable date");
            continue;
        };
        updates.push(Update {
            id: updates.len() as RecordId + 1,
            reference: row.reference,
            date,
            main_folder: row.main_folder,
            category: row.category,
            description: row.description,
        });
    }

    Dataset { categories, subcategories, updates }
}

/// Read the guide file, rebuild the search index from its folder rows,
/// and swap the catalog to the new records. On any error the previous
/// catalog and index generation keep serving.
pub fn load_data(path: &Path, catalog: &Catalog, index: &SharedIndex) -> Result<String> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("guide data file not found at {}", path.display()))?;
    let file: GuideFile = serde_json::from_str(&raw)
        .with_context(|| format!("guide data file {} is not valid JSON", path.display()))?;

    let dataset = build_dataset(file);
    tracing::info!(
        categories = dataset.categories.len(),
        subcategories = dataset.subcategories.len(),
        updates = dataset.updates.len(),
        "guide data loaded"
    );

    index.rebuild(&dataset.subcategories);
    catalog.replace(dataset.categories, dataset.subcategories, dataset.updates);
    Ok("Data loaded successfully and search index updated.".to_string())
}

/// Modification-time watcher for the guide file. `changed` reports true
/// once per observed mtime move; the first call only records a baseline.
pub struct FileWatch {
    path: PathBuf,
    last_modified: Mutex<Option<SystemTime>>,
}

impl FileWatch {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_modified: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn changed(&self) -> bool {
        let Ok(meta) = fs::metadata(&self.path) else {
            return false;
        };
        let Ok(modified) = meta.modified() else {
            return false;
        };
        let mut last = self.last_modified.lock();
        match *last {
            Some(prev) if prev == modified => false,
            Some(_) => {
                *last = Some(modified);
                true
            }
            None => {
                *last = Some(modified);
                false
            }
        }
    }
}
