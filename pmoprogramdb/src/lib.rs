//! Module de persistance SQLite des programmes
//!
//! Ce crate fournit l'implémentation de [`ProgramPersistence`] utilisée par
//! le recorder : dédoublonnage par clé naturelle `(station, source_id)`,
//! requêtes filtrées par statut et mise à jour du statut par identité.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use pmoprogram::{
    jst, Error, Program, ProgramPersistence, Result, SaveOutcome, Status, StreamType,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS programs (
    uuid TEXT PRIMARY KEY,
    station TEXT NOT NULL,
    source_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    episode TEXT,
    start_at INTEGER NOT NULL,
    end_at INTEGER,
    status TEXT NOT NULL,
    stream_type TEXT NOT NULL,
    playlist_url TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (station, source_id)
);

CREATE INDEX IF NOT EXISTS idx_programs_queue
    ON programs (stream_type, status, start_at);

CREATE TRIGGER IF NOT EXISTS trigger_programs_updated_at AFTER UPDATE ON programs
BEGIN
    UPDATE programs SET updated_at = datetime('now') WHERE rowid = NEW.rowid;
END;
";

const COLUMNS: &str =
    "uuid, station, source_id, title, episode, start_at, end_at, status, stream_type, playlist_url";

/// Base de données SQLite des programmes
///
/// La connexion est protégée par un `Mutex` ; chaque appel est court et
/// n'ouvre pas de transaction multi-requêtes.
#[derive(Debug)]
pub struct ProgramDB {
    conn: Mutex<Connection>,
}

impl ProgramDB {
    /// Ouvre (ou crée) la base et installe le schéma
    ///
    /// # Arguments
    ///
    /// * `path` - Chemin vers le fichier SQLite
    ///
    /// # Exemple
    ///
    /// ```rust,no_run
    /// use pmoprogramdb::ProgramDB;
    /// use std::path::Path;
    ///
    /// let db = ProgramDB::init(Path::new("programs.sqlite3")).unwrap();
    /// ```
    pub fn init(path: &Path) -> rusqlite::Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Base en mémoire, pratique pour les tests
    pub fn in_memory() -> rusqlite::Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::persistence("program database mutex poisoned"))
    }

    /// Compte le nombre total de programmes
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM programs", [], |row| row.get(0))
            .map_err(Error::persistence)?;
        Ok(count as usize)
    }

    /// Récupère tous les programmes, triés par date de début
    pub fn get_all(&self) -> Result<Vec<Program>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {COLUMNS} FROM programs ORDER BY start_at ASC, rowid ASC");
        let mut stmt = conn.prepare(&sql).map_err(Error::persistence)?;
        let programs = stmt
            .query_map([], program_from_row)
            .map_err(Error::persistence)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::persistence)?;
        Ok(programs)
    }

    /// Récupère un programme par son identité
    pub fn get(&self, program: &Program) -> Result<Program> {
        let conn = self.lock()?;
        let sql = format!("SELECT {COLUMNS} FROM programs WHERE uuid = ?1");
        conn.query_row(&sql, [program.id.to_string()], program_from_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    Error::not_found(format!("program {} not found", program.id))
                }
                other => Error::persistence(other),
            })
    }

    fn query_programs(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        what: &str,
    ) -> Result<Vec<Program>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(Error::persistence)?;
        let programs = stmt
            .query_map(params, program_from_row)
            .map_err(Error::persistence)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::persistence)?;

        if programs.is_empty() {
            return Err(Error::not_found(format!("no program found ({what})")));
        }
        Ok(programs)
    }
}

#[async_trait]
impl ProgramPersistence for ProgramDB {
    async fn save(&self, program: &Program) -> Result<SaveOutcome> {
        let conn = self.lock()?;
        let sql = format!(
            "INSERT INTO programs ({COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT (station, source_id) DO NOTHING"
        );

        // Premier arrivé, premier servi : une entrée déjà connue n'est jamais réconciliée
        let changed = conn
            .execute(
                &sql,
                params![
                    program.id.to_string(),
                    program.station.as_str(),
                    program.source_id,
                    program.title,
                    program.episode,
                    program.start.timestamp(),
                    program.end.map(|end| end.timestamp()),
                    program.status.as_str(),
                    program.stream_type.as_str(),
                    program.playlist_url,
                ],
            )
            .map_err(Error::persistence)?;

        if changed == 0 {
            debug!(station = %program.station, source_id = program.source_id, "program already stored");
            Ok(SaveOutcome::AlreadyPresent)
        } else {
            Ok(SaveOutcome::Inserted)
        }
    }

    async fn load_ondemand_scheduled(&self, limit: usize) -> Result<Vec<Program>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM programs
             WHERE stream_type = ?1 AND status = ?2
             ORDER BY start_at ASC, rowid ASC
             LIMIT ?3"
        );
        self.query_programs(
            &sql,
            params![
                StreamType::Ondemand.as_str(),
                Status::Scheduled.as_str(),
                i64::try_from(limit).unwrap_or(i64::MAX),
            ],
            "scheduled ondemand",
        )
    }

    async fn load_broadcast_start_in(
        &self,
        now: DateTime<FixedOffset>,
        window: Duration,
    ) -> Result<Vec<Program>> {
        let from = now.timestamp();
        let until = from.saturating_add(i64::try_from(window.as_secs()).unwrap_or(i64::MAX));
        let sql = format!(
            "SELECT {COLUMNS} FROM programs
             WHERE stream_type = ?1 AND status = ?2 AND start_at > ?3 AND start_at <= ?4
             ORDER BY start_at ASC, rowid ASC"
        );
        self.query_programs(
            &sql,
            params![
                StreamType::Broadcast.as_str(),
                Status::Scheduled.as_str(),
                from,
                until,
            ],
            "scheduled broadcast in window",
        )
    }

    async fn change_status(&self, program: &Program, new_status: Status) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE programs SET status = ?1 WHERE uuid = ?2",
                params![new_status.as_str(), program.id.to_string()],
            )
            .map_err(Error::persistence)?;

        if changed == 0 {
            return Err(Error::not_found(format!("program {} not found", program.id)));
        }
        debug!(program_id = %program.id, status = %new_status, "status changed");
        Ok(())
    }
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn timestamp(idx: usize, secs: i64) -> rusqlite::Result<DateTime<FixedOffset>> {
    DateTime::from_timestamp(secs, 0)
        .map(|utc| utc.with_timezone(&jst::offset()))
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
}

fn program_from_row(row: &Row<'_>) -> rusqlite::Result<Program> {
    let uuid: String = row.get(0)?;
    let station: String = row.get(1)?;
    let status: String = row.get(7)?;
    let stream_type: String = row.get(8)?;
    let end_at: Option<i64> = row.get(6)?;

    Ok(Program {
        id: uuid.parse().map_err(|e| conversion_error(0, e))?,
        station: station.parse().map_err(|e| conversion_error(1, e))?,
        source_id: row.get(2)?,
        title: row.get(3)?,
        episode: row.get(4)?,
        start: timestamp(5, row.get(5)?)?,
        end: end_at.map(|secs| timestamp(6, secs)).transpose()?,
        status: status.parse().map_err(|e| conversion_error(7, e))?,
        stream_type: stream_type.parse().map_err(|e| conversion_error(8, e))?,
        playlist_url: row.get(9)?,
    })
}
