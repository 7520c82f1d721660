//! Verdict cache
//!
//! Durable SQLite-backed memo of definitive verdicts, keyed by an identity
//! of the query text. The identity hashes the statements as written, with
//! premises sorted; aliases and advisory hints stay out of the key, so the
//! same text resubmitted under different alias maps hits the same entry.
//!
//! The cache is strictly an accelerator: any storage failure is reported
//! as a warning and degrades to a miss, never to a query failure.

use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{EntailError, EntailResult};

/// Shape hashed into the identity. Field order is part of the format;
/// changing it invalidates every stored entry.
#[derive(Serialize)]
struct Identity<'a> {
    premises: Vec<&'a str>,
    conclusion: Option<&'a str>,
}

/// Identity hash over the raw statement text of a query.
///
/// Premises are sorted so reordered premise lists collide; `conclusion`
/// is `None` for satisfiability queries, which keeps them distinct from
/// proofs over the same premises.
pub fn identity<S: AsRef<str>>(premises: &[S], conclusion: Option<&str>) -> String {
    let mut sorted: Vec<&str> = premises.iter().map(|s| s.as_ref()).collect();
    sorted.sort_unstable();
    let shape = Identity { premises: sorted, conclusion };
    // Serialization of borrowed strings cannot fail
    let payload = serde_json::to_string(&shape).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(hex, "{:02x}", byte);
    }
    hex
}

pub struct ProofCache {
    conn: Mutex<Connection>,
}

impl ProofCache {
    /// Open or create a cache database at `path`
    pub fn open(path: &Path) -> EntailResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| EntailError::cache(format!("cannot open cache at {}: {}", path.display(), e)))?;
        Self::from_connection(conn)
    }

    /// In-memory cache, used by tests and `--no-cache` fallbacks
    pub fn in_memory() -> EntailResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| EntailError::cache(format!("cannot open in-memory cache: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> EntailResult<Self> {
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS proof_cache (
                identity_hash TEXT PRIMARY KEY,
                verdict TEXT NOT NULL,
                created_at REAL NOT NULL
            )",
            [],
        )
        .map_err(|e| EntailError::cache(format!("cannot create cache schema: {}", e)))?;
        Ok(ProofCache { conn: Mutex::new(conn) })
    }

    /// Look up a stored verdict. Every failure path degrades to a miss.
    pub fn lookup(&self, identity: &str) -> Option<String> {
        let conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(_) => return None,
        };
        let result = conn.query_row(
            "SELECT verdict FROM proof_cache WHERE identity_hash = ?1",
            [identity],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(verdict) => Some(verdict),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(err) => {
                eprintln!("warning: cache lookup failed: {}", err);
                None
            }
        }
    }

    /// Store a verdict. Failures are reported and swallowed.
    pub fn store(&self, identity: &str, verdict: &str) {
        let conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(_) => return,
        };
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let result = conn.execute(
            "INSERT OR REPLACE INTO proof_cache (identity_hash, verdict, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![identity, verdict, now],
        );
        if let Err(err) = result {
            eprintln!("warning: cache store failed: {}", err);
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        let conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(_) => return 0,
        };
        conn.query_row("SELECT COUNT(*) FROM proof_cache", [], |row| row.get::<_, i64>(0))
            .map(|count| count as usize)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry
    pub fn clear(&self) -> EntailResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| EntailError::cache("cache lock poisoned"))?;
        conn.execute("DELETE FROM proof_cache", [])
            .map_err(|e| EntailError::cache(format!("cannot clear cache: {}", e)))?;
        Ok(())
    }

    /// Oldest-first listing of entries, for diagnostics
    pub fn entries(&self) -> Vec<(String, String)> {
        let conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(_) => return Vec::new(),
        };
        let mut stmt = match conn.prepare("SELECT identity_hash, verdict FROM proof_cache ORDER BY created_at") {
            Ok(stmt) => stmt,
            Err(_) => return Vec::new(),
        };
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)));
        match rows {
            Ok(rows) => rows.filter_map(|r| r.ok()).collect(),
            Err(_) => Vec::new(),
        }
    }
}
