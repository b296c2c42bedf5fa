use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use itertools::Itertools;
use log::debug;
use rusqlite::{params, Connection};

use crate::app_dirs::AppDirs;
use crate::error::HistoryResult;
use crate::recorder::SessionRecord;
use crate::session::{ImageSet, PracticeMode};
use crate::util::mean;

/// Persistence for the session history log, most recent session first.
pub trait HistoryStore {
    fn load(&self) -> HistoryResult<Vec<SessionRecord>>;
    fn save(&mut self, records: &[SessionRecord]) -> HistoryResult<()>;

    fn prepend(&mut self, record: SessionRecord) -> HistoryResult<()> {
        let mut records = self.load()?;
        records.insert(0, record);
        self.save(&records)
    }

    fn clear(&mut self) -> HistoryResult<()> {
        self.save(&[])
    }
}

impl<T: HistoryStore + ?Sized> HistoryStore for Box<T> {
    fn load(&self) -> HistoryResult<Vec<SessionRecord>> {
        (**self).load()
    }

    fn save(&mut self, records: &[SessionRecord]) -> HistoryResult<()> {
        (**self).save(records)
    }

    fn prepend(&mut self, record: SessionRecord) -> HistoryResult<()> {
        (**self).prepend(record)
    }

    fn clear(&mut self) -> HistoryResult<()> {
        (**self).clear()
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryHistoryStore {
    records: Vec<SessionRecord>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> HistoryResult<Vec<SessionRecord>> {
        Ok(self.records.clone())
    }

    fn save(&mut self, records: &[SessionRecord]) -> HistoryResult<()> {
        self.records = records.to_vec();
        Ok(())
    }
}

/// History kept in a SQLite database under the state directory.
#[derive(Debug)]
pub struct SqliteHistoryStore {
    conn: Connection,
}

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS session_history (
        position INTEGER PRIMARY KEY,
        id TEXT NOT NULL,
        date TEXT NOT NULL,
        mode TEXT NOT NULL,
        total_duration_secs INTEGER NOT NULL,
        images_completed INTEGER NOT NULL,
        image_set TEXT NOT NULL
    )
"#;

impl SqliteHistoryStore {
    /// Opens (creating if needed) the history database at the default location.
    pub fn new() -> HistoryResult<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("lineflow_history.db"));
        Self::open(db_path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> HistoryResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path.as_ref())?;
        debug!("opened history database {}", path.as_ref().display());
        Self::with_connection(conn)
    }

    pub fn in_memory() -> HistoryResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> HistoryResult<Self> {
        conn.execute(CREATE_TABLE, [])?;
        Ok(Self { conn })
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn load(&self) -> HistoryResult<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, date, mode, total_duration_secs, images_completed, image_set
            FROM session_history
            ORDER BY position ASC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, date, mode, total, images, image_set) = row?;
            let date = DateTime::parse_from_rfc3339(&date)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        1,
                        "date".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);
            records.push(SessionRecord {
                id,
                date,
                mode: serde_json::from_value::<PracticeMode>(serde_json::Value::String(mode))?,
                total_duration_secs: total.max(0) as u64,
                images_completed: images.max(0) as usize,
                image_set: serde_json::from_value::<ImageSet>(serde_json::Value::String(
                    image_set,
                ))?,
            });
        }

        Ok(records)
    }

    fn save(&mut self, records: &[SessionRecord]) -> HistoryResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM session_history", [])?;

        for (position, record) in records.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO session_history
                (position, id, date, mode, total_duration_secs, images_completed, image_set)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    position as i64,
                    record.id,
                    record.date.to_rfc3339(),
                    record.mode.to_string(),
                    record.total_duration_secs as i64,
                    record.images_completed as i64,
                    record.image_set.to_string(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

/// Writes the history as CSV, one row per session.
pub fn export_csv<P: AsRef<Path>>(records: &[SessionRecord], path: P) -> HistoryResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Totals shown above the history list.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    pub sessions: usize,
    pub total_secs: u64,
    pub total_images: usize,
    pub mean_session_secs: Option<f64>,
    pub sessions_by_mode: BTreeMap<PracticeMode, usize>,
}

impl HistorySummary {
    pub fn from_records(records: &[SessionRecord]) -> Self {
        let durations: Vec<f64> = records
            .iter()
            .map(|r| r.total_duration_secs as f64)
            .collect();

        Self {
            sessions: records.len(),
            total_secs: records.iter().map(|r| r.total_duration_secs).sum(),
            total_images: records.iter().map(|r| r.images_completed).sum(),
            mean_session_secs: mean(&durations),
            sessions_by_mode: records.iter().map(|r| r.mode).counts().into_iter().collect(),
        }
    }

    /// The mode practised most often; ties go to the mode listed first.
    pub fn favourite_mode(&self) -> Option<PracticeMode> {
        self.sessions_by_mode
            .iter()
            .sorted_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)))
            .map(|(mode, _)| *mode)
            .next()
    }
}
