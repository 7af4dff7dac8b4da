mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::document::Element;
use crate::storage::StateStorage;

/// Component name under which the artifact model is stored.
pub const ARTIFACTS_COMPONENT: &str = "ArtifactManager";

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "artifact-manifest")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("artifacts.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Component state operations
    // ============================================================

    pub fn load_component(&self, component: &str) -> Result<Option<Element>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt =
            conn.prepare("SELECT document FROM component_state WHERE component = ?")?;

        let mut rows = stmt.query([component])?;
        if let Some(row) = rows.next()? {
            let document: String = row.get(0)?;
            let state = Element::from_json(&document)
                .with_context(|| format!("Corrupt state for component {}", component))?;
            Ok(Some(state))
        } else {
            Ok(None)
        }
    }

    pub fn save_component(&self, component: &str, state: &Element) -> Result<DateTime<Utc>> {
        let document = serde_json::to_string(state)?;
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();

        conn.execute(
            "INSERT INTO component_state (component, document, saved_at) VALUES (?, ?, ?)
             ON CONFLICT(component) DO UPDATE SET document = excluded.document, saved_at = excluded.saved_at",
            (component, &document, now.to_rfc3339()),
        )?;

        Ok(now)
    }

    pub fn component_saved_at(&self, component: &str) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare("SELECT saved_at FROM component_state WHERE component = ?")?;

        let mut rows = stmt.query([component])?;
        if let Some(row) = rows.next()? {
            Ok(Some(parse_datetime(row.get::<_, String>(0)?)))
        } else {
            Ok(None)
        }
    }

    pub fn delete_component(&self, component: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM component_state WHERE component = ?", [component])?;
        Ok(rows > 0)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// The artifact document stored as one row of a SQLite database.
pub struct DatabaseStorage {
    db: Database,
    component: String,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self::for_component(db, ARTIFACTS_COMPONENT)
    }

    pub fn for_component(db: Database, component: impl Into<String>) -> Self {
        Self {
            db,
            component: component.into(),
        }
    }
}

impl StateStorage for DatabaseStorage {
    fn load(&self) -> Result<Option<Element>> {
        self.db.load_component(&self.component)
    }

    fn save(&self, state: &Element) -> Result<()> {
        let saved_at = self.db.save_component(&self.component, state)?;
        tracing::info!("Saved {} at {}", self.component, saved_at.to_rfc3339());
        Ok(())
    }
}
