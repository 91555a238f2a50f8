use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, Row, params};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use super::{NameRegistry, NameVisitor};
use crate::constants::sqlite::{BUSY_TIMEOUT_MS, CACHE_SIZE_KB, NAMES_TABLE};
use crate::data::{Authorship, IndexName, Name};
use crate::errors::NameIndexError;
use crate::types::DatasetKey;
use crate::vocab::{NameType, NomCode, NomStatus, Origin, Rank};

const NAME_COLUMNS: &str = "id, dataset_key, created_ms, scientific_name, authorship, genus, \
     infrageneric_epithet, specific_epithet, infraspecific_epithet, combination_authorship, \
     basionym_authorship, rank, code, name_type, origin, nom_status, published_in_id, \
     published_in_page";

impl From<rusqlite::Error> for NameIndexError {
    fn from(err: rusqlite::Error) -> Self {
        NameIndexError::registry(err.to_string())
    }
}

/// Store of record on a SQLite database file.
///
/// Every call opens its own connection, so the registry is freely shared
/// between threads; WAL mode lets readers run beside the single writer.
#[derive(Debug, Clone)]
pub struct SqliteNameRegistry {
    db_path: PathBuf,
}

impl SqliteNameRegistry {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, NameIndexError> {
        let db_path = path.into();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let conn = open_connection(&db_path, true)?;
        initialize_schema(&conn)?;
        drop(conn);
        debug!(path = %db_path.display(), "opened sqlite name registry");
        Ok(Self { db_path })
    }

    /// Database file backing the registry.
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, NameIndexError>,
    ) -> Result<T, NameIndexError> {
        let conn = open_connection(&self.db_path, false)?;
        f(&conn)
    }

    fn stream_query(
        &self,
        sql: &str,
        dataset_key: DatasetKey,
        since_ms: Option<i64>,
        visitor: &mut NameVisitor<'_>,
    ) -> Result<(), NameIndexError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let mut rows = match since_ms {
                Some(since_ms) => stmt.query(params![dataset_key, since_ms])?,
                None => stmt.query(params![dataset_key])?,
            };
            while let Some(row) = rows.next()? {
                visitor(decode_row(row)?)?;
            }
            Ok(())
        })
    }
}

impl NameRegistry for SqliteNameRegistry {
    fn count_by_dataset(&self, dataset_key: DatasetKey) -> Result<usize, NameIndexError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {NAMES_TABLE} WHERE dataset_key = ?1"),
                params![dataset_key],
                |row| row.get(0),
            )?;
            usize::try_from(count)
                .map_err(|_| NameIndexError::registry(format!("negative row count {count}")))
        })
    }

    fn stream_by_dataset(
        &self,
        dataset_key: DatasetKey,
        visitor: &mut NameVisitor<'_>,
    ) -> Result<(), NameIndexError> {
        let sql = format!(
            "SELECT {NAME_COLUMNS} FROM {NAMES_TABLE} WHERE dataset_key = ?1 ORDER BY rowid ASC"
        );
        self.stream_query(&sql, dataset_key, None, visitor)
    }

    fn stream_since(
        &self,
        dataset_key: DatasetKey,
        since: DateTime<Utc>,
        visitor: &mut NameVisitor<'_>,
    ) -> Result<(), NameIndexError> {
        let sql = format!(
            "SELECT {NAME_COLUMNS} FROM {NAMES_TABLE} \
             WHERE dataset_key = ?1 AND created_ms > ?2 ORDER BY created_ms ASC, rowid ASC"
        );
        self.stream_query(&sql, dataset_key, Some(since.timestamp_millis()), visitor)
    }

    fn insert(&self, record: &IndexName) -> Result<(), NameIndexError> {
        let name = &record.name;
        let combination = serde_json::to_string(&name.combination_authorship)
            .map_err(|err| NameIndexError::registry(format!("encode authorship: {err}")))?;
        let basionym = serde_json::to_string(&name.basionym_authorship)
            .map_err(|err| NameIndexError::registry(format!("encode authorship: {err}")))?;
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {NAMES_TABLE} ({NAME_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
                ),
                params![
                    record.id,
                    record.dataset_key,
                    record.created.timestamp_millis(),
                    name.scientific_name,
                    name.authorship,
                    name.genus,
                    name.infrageneric_epithet,
                    name.specific_epithet,
                    name.infraspecific_epithet,
                    combination,
                    basionym,
                    name.rank.as_str(),
                    name.code.map(|code| code.as_str()),
                    name.name_type.as_str(),
                    name.origin.map(|origin| origin.as_str()),
                    name.nom_status.map(|status| status.as_str()),
                    name.published_in_id,
                    name.published_in_page,
                ],
            )?;
            Ok(())
        })
    }

    fn delete_by_dataset(&self, dataset_key: DatasetKey) -> Result<usize, NameIndexError> {
        let deleted = self.with_conn(|conn| {
            Ok(conn.execute(
                &format!("DELETE FROM {NAMES_TABLE} WHERE dataset_key = ?1"),
                params![dataset_key],
            )?)
        })?;
        debug!(dataset_key, deleted, "deleted names from sqlite registry");
        Ok(deleted)
    }
}

fn open_connection(path: &Path, create: bool) -> Result<Connection, NameIndexError> {
    let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE;
    if create {
        flags |= OpenFlags::SQLITE_OPEN_CREATE;
    }
    let conn = Connection::open_with_flags(path, flags)?;
    apply_pragmas(&conn)?;
    conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
    Ok(conn)
}

fn apply_pragmas(conn: &Connection) -> Result<(), NameIndexError> {
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "FULL")?;
    conn.pragma_update(None, "cache_size", CACHE_SIZE_KB)?;
    Ok(())
}

fn initialize_schema(conn: &Connection) -> Result<(), NameIndexError> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {NAMES_TABLE} (
            id TEXT PRIMARY KEY NOT NULL,
            dataset_key INTEGER NOT NULL,
            created_ms INTEGER NOT NULL,
            scientific_name TEXT NOT NULL,
            authorship TEXT,
            genus TEXT,
            infrageneric_epithet TEXT,
            specific_epithet TEXT,
            infraspecific_epithet TEXT,
            combination_authorship TEXT NOT NULL,
            basionym_authorship TEXT NOT NULL,
            rank TEXT NOT NULL,
            code TEXT,
            name_type TEXT NOT NULL,
            origin TEXT,
            nom_status TEXT,
            published_in_id TEXT,
            published_in_page TEXT
        );
        CREATE INDEX IF NOT EXISTS {NAMES_TABLE}_dataset_idx ON {NAMES_TABLE} (dataset_key);
        CREATE INDEX IF NOT EXISTS {NAMES_TABLE}_created_idx ON {NAMES_TABLE} (dataset_key, created_ms);"
    ))?;
    Ok(())
}

fn decode_row(row: &Row<'_>) -> Result<IndexName, NameIndexError> {
    let created_ms: i64 = row.get(2)?;
    let created = DateTime::from_timestamp_millis(created_ms)
        .ok_or_else(|| NameIndexError::registry(format!("invalid created_ms {created_ms}")))?;
    let combination: String = row.get(9)?;
    let basionym: String = row.get(10)?;
    let name = Name {
        scientific_name: row.get(3)?,
        authorship: row.get(4)?,
        genus: row.get(5)?,
        infrageneric_epithet: row.get(6)?,
        specific_epithet: row.get(7)?,
        infraspecific_epithet: row.get(8)?,
        combination_authorship: decode_authorship(&combination)?,
        basionym_authorship: decode_authorship(&basionym)?,
        rank: parse_label::<Rank>(row.get(11)?)?,
        code: row
            .get::<_, Option<String>>(12)?
            .map(parse_label::<NomCode>)
            .transpose()?,
        name_type: parse_label::<NameType>(row.get(13)?)?,
        origin: row
            .get::<_, Option<String>>(14)?
            .map(parse_label::<Origin>)
            .transpose()?,
        nom_status: row
            .get::<_, Option<String>>(15)?
            .map(parse_label::<NomStatus>)
            .transpose()?,
        published_in_id: row.get(16)?,
        published_in_page: row.get(17)?,
    };
    Ok(IndexName {
        id: row.get(0)?,
        dataset_key: row.get(1)?,
        created,
        name,
    })
}

fn decode_authorship(json: &str) -> Result<Authorship, NameIndexError> {
    serde_json::from_str(json)
        .map_err(|err| NameIndexError::registry(format!("corrupt authorship column: {err}")))
}

fn parse_label<T>(label: String) -> Result<T, NameIndexError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    T::from_str(&label).map_err(|err| NameIndexError::registry(err.to_string()))
}
