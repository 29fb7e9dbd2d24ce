//! SQLite-backed session cache.

use std::path::Path;
use std::sync::Mutex;

use petvault_common::{Identity, UserProfile};
use rusqlite::{params, Connection, TransactionBehavior};

use super::{CacheError, CachedSession, SessionCache};

const KEY_IDENTITY: &str = "identity";
const KEY_PROFILE: &str = "profile";

/// SQLite key-value store holding the serialized session pair.
pub struct SqliteSessionCache {
    conn: Mutex<Connection>,
}

impl SqliteSessionCache {
    pub fn new(database_url: &str) -> Result<Self, CacheError> {
        // Parse sqlite: prefix if present
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        // Create parent directories if needed
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent).map_err(|e| CacheError::Io(e.to_string()))?;
            }
        }

        let conn = Connection::open(path).map_err(|e| CacheError::Database(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS session_cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| CacheError::Database(e.to_string()))?;

        tracing::info!("Session cache initialized with database: {}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn remove_both(conn: &Connection) -> Result<(), CacheError> {
        conn.execute(
            "DELETE FROM session_cache WHERE key IN (?1, ?2)",
            params![KEY_IDENTITY, KEY_PROFILE],
        )
        .map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(())
    }
}

impl SessionCache for SqliteSessionCache {
    fn load(&self) -> Result<Option<CachedSession>, CacheError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());

        let mut stmt = conn
            .prepare("SELECT key, value FROM session_cache WHERE key IN (?1, ?2)")
            .map_err(|e| CacheError::Database(e.to_string()))?;

        let mut identity_json: Option<String> = None;
        let mut profile_json: Option<String> = None;

        let rows = stmt
            .query_map(params![KEY_IDENTITY, KEY_PROFILE], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| CacheError::Database(e.to_string()))?;

        for row in rows {
            let (key, value) = row.map_err(|e| CacheError::Database(e.to_string()))?;
            match key.as_str() {
                KEY_IDENTITY => identity_json = Some(value),
                KEY_PROFILE => profile_json = Some(value),
                _ => {}
            }
        }
        drop(stmt);

        match (identity_json, profile_json) {
            (Some(identity_json), Some(profile_json)) => {
                let identity: Identity = match serde_json::from_str(&identity_json) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(error = %e, "undeserializable cached identity; clearing");
                        Self::remove_both(&conn)?;
                        return Ok(None);
                    }
                };
                let profile: UserProfile = match serde_json::from_str(&profile_json) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(error = %e, "undeserializable cached profile; clearing");
                        Self::remove_both(&conn)?;
                        return Ok(None);
                    }
                };
                Ok(Some(CachedSession { identity, profile }))
            }
            (None, None) => Ok(None),
            // One half without the other is a broken write; repair by
            // clearing both.
            _ => {
                tracing::warn!("partial session cache entry; clearing");
                Self::remove_both(&conn)?;
                Ok(None)
            }
        }
    }

    fn save(&self, identity: &Identity, profile: &UserProfile) -> Result<(), CacheError> {
        let identity_json =
            serde_json::to_string(identity).map_err(|e| CacheError::Io(e.to_string()))?;
        let profile_json =
            serde_json::to_string(profile).map_err(|e| CacheError::Io(e.to_string()))?;

        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| CacheError::Database(e.to_string()))?;

        tx.execute(
            "INSERT OR REPLACE INTO session_cache (key, value) VALUES (?1, ?2)",
            params![KEY_IDENTITY, identity_json],
        )
        .map_err(|e| CacheError::Database(e.to_string()))?;
        tx.execute(
            "INSERT OR REPLACE INTO session_cache (key, value) VALUES (?1, ?2)",
            params![KEY_PROFILE, profile_json],
        )
        .map_err(|e| CacheError::Database(e.to_string()))?;

        tx.commit().map_err(|e| CacheError::Database(e.to_string()))
    }

    fn clear(&self) -> Result<(), CacheError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        Self::remove_both(&conn)
    }
}
