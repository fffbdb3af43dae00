//! JSON-file-backed stores for profiles, comparison reports, and batch jobs.
//!
//! Every store opens against an explicit data directory handed in by the
//! caller and creates its subtree eagerly at open time. Concurrent writes to
//! the same identifier are last-writer-wins; locking is a caller concern.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::warn;

use crate::{
    batch::BatchJob,
    compare::ComparisonReport,
    error::{Error, Result},
    profile::Profile,
};

const PROFILES_DIR: &str = "profiles";
const REPORTS_DIR: &str = "comparison_reports";
const BATCH_JOBS_DIR: &str = "batch_jobs";

pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    pub fn open(data_dir: &Path) -> Result<Self> {
        let root = data_dir.join(PROFILES_DIR);
        fs::create_dir_all(&root).map_err(|err| Error::persistence(&root, err))?;
        Ok(Self { root })
    }

    /// All stored profiles, newest first. Files that fail to parse are
    /// skipped with a warning so one corrupt document cannot hide the rest.
    pub fn list(&self) -> Result<Vec<Profile>> {
        let mut profiles = Vec::new();
        let entries =
            fs::read_dir(&self.root).map_err(|err| Error::persistence(&self.root, err))?;
        for entry in entries {
            let entry = entry.map_err(|err| Error::persistence(&self.root, err))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match read_json::<Profile>(&path) {
                Ok(profile) => profiles.push(profile),
                Err(err) => warn!("Skipping unreadable profile {path:?}: {err}"),
            }
        }
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(profiles)
    }

    pub fn get(&self, id: &str) -> Result<Profile> {
        let path = self.document_path(id);
        if !path.exists() {
            return Err(Error::NotFound(format!("profile {id}")));
        }
        read_json(&path)
    }

    pub fn put(&self, profile: &Profile) -> Result<()> {
        write_json(&self.document_path(&profile.id), profile)
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        let path = self.document_path(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|err| Error::persistence(&path, err))?;
        Ok(true)
    }

    /// Case-insensitive search over profile names and descriptions.
    pub fn search(&self, query: &str) -> Result<Vec<Profile>> {
        let needle = query.to_lowercase();
        Ok(self
            .list()?
            .into_iter()
            .filter(|profile| {
                profile.name.to_lowercase().contains(&needle)
                    || profile.description.to_lowercase().contains(&needle)
            })
            .collect())
    }

    fn document_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }
}

pub struct ReportStore {
    root: PathBuf,
}

impl ReportStore {
    pub fn open(data_dir: &Path) -> Result<Self> {
        let root = data_dir.join(REPORTS_DIR);
        fs::create_dir_all(&root).map_err(|err| Error::persistence(&root, err))?;
        Ok(Self { root })
    }

    pub fn put(&self, key: &str, report: &ComparisonReport) -> Result<()> {
        write_json(&self.root.join(format!("{key}.json")), report)
    }

    pub fn get(&self, key: &str) -> Result<ComparisonReport> {
        let path = self.root.join(format!("{key}.json"));
        if !path.exists() {
            return Err(Error::NotFound(format!("report {key}")));
        }
        read_json(&path)
    }
}

pub struct BatchJobStore {
    root: PathBuf,
}

impl BatchJobStore {
    pub fn open(data_dir: &Path) -> Result<Self> {
        let root = data_dir.join(BATCH_JOBS_DIR);
        fs::create_dir_all(&root).map_err(|err| Error::persistence(&root, err))?;
        Ok(Self { root })
    }

    pub fn save(&self, name: &str, job: &BatchJob) -> Result<()> {
        write_json(&self.root.join(format!("{name}.json")), job)
    }

    pub fn load(&self, name: &str) -> Result<BatchJob> {
        let path = self.root.join(format!("{name}.json"));
        if !path.exists() {
            return Err(Error::NotFound(format!("batch job {name}")));
        }
        read_json(&path)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).map_err(|err| Error::persistence(path, err))?;
    serde_json::from_str(&contents).map_err(|err| Error::persistence(path, err))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let contents =
        serde_json::to_string_pretty(value).map_err(|err| Error::persistence(path, err))?;
    fs::write(path, contents).map_err(|err| Error::persistence(path, err))
}
