//! Durable storage collaborator
//!
//! The core only requires these load/save contracts; durability itself is a
//! collaborator concern. [`JsonFileRepository`] keeps the registered user set
//! and the latest catalog snapshot as JSON files in a data directory.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::catalog::PriceCatalog;
use crate::user::User;

const USERS_FILE: &str = "users.json";
const CATALOG_FILE: &str = "catalog.json";

pub trait Repository: Send + Sync {
    /// Missing storage yields an empty user set, not an error.
    fn load_users(&self) -> Result<Vec<User>>;

    /// Replaces the stored user set wholesale.
    fn save_users(&self, users: &[User]) -> Result<()>;

    /// `None` when no snapshot has ever been stored.
    fn load_catalog(&self) -> Result<Option<PriceCatalog>>;

    fn save_catalog(&self, catalog: &PriceCatalog) -> Result<()>;
}

pub struct JsonFileRepository {
    data_dir: PathBuf,
}

impl JsonFileRepository {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn users_path(&self) -> PathBuf {
        self.data_dir.join(USERS_FILE)
    }

    fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(CATALOG_FILE)
    }
}

impl Repository for JsonFileRepository {
    fn load_users(&self) -> Result<Vec<User>> {
        let path = self.users_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path).with_context(|| format!("open {}", path.display()))?;
        let users = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parse {}", path.display()))?;
        Ok(users)
    }

    fn save_users(&self, users: &[User]) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("create {}", self.data_dir.display()))?;
        let path = self.users_path();
        let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), users)
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    fn load_catalog(&self) -> Result<Option<PriceCatalog>> {
        let path = self.catalog_path();
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(&path).with_context(|| format!("open {}", path.display()))?;
        let catalog = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parse {}", path.display()))?;
        Ok(Some(catalog))
    }

    fn save_catalog(&self, catalog: &PriceCatalog) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("create {}", self.data_dir.display()))?;
        let path = self.catalog_path();
        let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), catalog)
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}
