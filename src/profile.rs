//! Field-mapping profiles and the builder that assembles them from
//! classifier detections.

use anyhow::{Context, Result};
use chrono::Local;
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    classify::{DataType, DetectionResult},
    cli::{ProfileArgs, ProfileCommands},
    store::ProfileStore,
    table,
};

pub const DEFAULT_PROFILE_DESCRIPTION: &str = "Perfil generado automáticamente";

/// Detections at or above this confidence mark their field as required.
const REQUIRED_CONFIDENCE: f64 = 0.8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub keywords: Vec<String>,
    pub data_type: DataType,
    pub required: bool,
}

/// A named, persistable set of field definitions. Identity is the id;
/// updates replace the whole document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub description: String,
    pub fields: Vec<Field>,
    pub created_at: String,
    pub updated_at: String,
}

impl Profile {
    pub fn new(name: impl Into<String>, description: impl Into<String>, fields: Vec<Field>) -> Self {
        let now = timestamp();
        Self {
            id: format!("profile_{}", Uuid::new_v4()),
            name: name.into(),
            description: description.into(),
            fields,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Refreshes `updated_at` ahead of a replace-on-update write.
    pub fn touch(&mut self) {
        self.updated_at = timestamp();
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Builds an unsaved profile from classifier detections, one field per
/// detection. Detections sharing a suggested field are kept as separate
/// fields; their keyword sets are meant to be merged by a human editor
/// later.
pub fn build_profile(detections: &[DetectionResult], name: &str, description: &str) -> Profile {
    let fields = detections
        .iter()
        .map(|detection| Field {
            name: detection.suggested_field.name().to_string(),
            keywords: detection.keywords.clone(),
            data_type: detection.data_type,
            required: detection.confidence >= REQUIRED_CONFIDENCE,
        })
        .collect();
    let description = if description.is_empty() {
        DEFAULT_PROFILE_DESCRIPTION
    } else {
        description
    };
    Profile::new(name, description, fields)
}

pub fn execute(args: &ProfileArgs) -> Result<()> {
    match &args.command {
        ProfileCommands::List(list) => {
            let store = ProfileStore::open(&list.data_dir)?;
            let profiles = store.list()?;
            if list.json {
                println!("{}", serde_json::to_string_pretty(&profiles)?);
            } else {
                print_profiles(&profiles);
            }
            Ok(())
        }
        ProfileCommands::Show(show) => {
            let store = ProfileStore::open(&show.data_dir)?;
            let profile = store.get(&show.id)?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(())
        }
        ProfileCommands::Import(import) => {
            let contents = std::fs::read_to_string(&import.file)
                .with_context(|| format!("Reading profile from {:?}", import.file))?;
            let mut profile: Profile = serde_json::from_str(&contents)
                .with_context(|| format!("Parsing profile JSON from {:?}", import.file))?;
            profile.touch();
            let store = ProfileStore::open(&import.data_dir)?;
            store.put(&profile)?;
            info!("Imported profile '{}' with id {}", profile.name, profile.id);
            Ok(())
        }
        ProfileCommands::Delete(delete) => {
            let store = ProfileStore::open(&delete.data_dir)?;
            if store.delete(&delete.id)? {
                info!("Deleted profile {}", delete.id);
            } else {
                info!("Profile {} did not exist", delete.id);
            }
            Ok(())
        }
        ProfileCommands::Search(search) => {
            let store = ProfileStore::open(&search.data_dir)?;
            let profiles = store.search(&search.query)?;
            if search.json {
                println!("{}", serde_json::to_string_pretty(&profiles)?);
            } else {
                print_profiles(&profiles);
            }
            Ok(())
        }
    }
}

fn print_profiles(profiles: &[Profile]) {
    let headers = vec![
        "id".to_string(),
        "name".to_string(),
        "fields".to_string(),
        "created".to_string(),
    ];
    let rows = profiles
        .iter()
        .map(|profile| {
            vec![
                profile.id.clone(),
                profile.name.clone(),
                profile.fields.len().to_string(),
                profile.created_at.clone(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    info!("{} profile(s)", profiles.len());
}
