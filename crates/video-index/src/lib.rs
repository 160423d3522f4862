//! SQLite persistence for the local video library.
//!
//! One row per discovered video, keyed by `file_path`. The scanner feeds the
//! table through batched upserts; the UI layer reads it through the one-shot
//! queries or re-runs a query whenever the change signal ticks.
//!
//! Rescans must not clobber what the user has done with a video, so the
//! upsert merges on conflict: descriptive and technical fields are
//! overwritten, `added_time` plus the play/favorite/tags state survive, and
//! `thumbnail_path` is only replaced when the new scan actually produced one.
//!
//! Uses WAL mode so scan writes don't block concurrent readers.

mod error;
mod record;

pub use error::{IndexError, Result};
pub use record::{NameCursor, Page, TimeCursor, VideoRecord};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::debug;

const SELECT_COLS: &str = "id, file_path, file_name, folder_path, file_size, mime_type, \
     duration_ms, width, height, bitrate, frame_rate, thumbnail_path, \
     last_play_position, play_count, last_play_time, is_favorite, tags, \
     added_time, modified_time";

/// Shared handle to the library database.
///
/// Construct one per process and pass it by `Arc` to whoever needs it; all
/// methods take `&self`. Every committed write bumps the version visible
/// through [`VideoLibrary::subscribe`].
pub struct VideoLibrary {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    changes: watch::Sender<u64>,
}

impl VideoLibrary {
    /// Open (or create) the database at `db_path`, creating parent
    /// directories as needed.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA synchronous=NORMAL;")?;

        let (changes, _) = watch::channel(0);
        let db = Self {
            conn: Mutex::new(conn),
            db_path,
            changes,
        };
        db.create_tables()?;
        Ok(db)
    }

    /// Open the database at the platform-default location
    /// (`<local data dir>/vidvault/library.db`).
    pub fn open_default() -> Result<Self> {
        let base = dirs::data_local_dir()
            .ok_or_else(|| IndexError::InvalidArgument("no local data directory".into()))?;
        Self::open(base.join("vidvault").join("library.db"))
    }

    /// The database file path.
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Data-version signal: the value ticks after every committed write.
    /// Re-run whatever query you hold when it changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn create_tables(&self) -> Result<()> {
        self.conn.lock().execute_batch(
            "
            CREATE TABLE IF NOT EXISTS videos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_path TEXT NOT NULL UNIQUE,
                file_name TEXT NOT NULL,
                folder_path TEXT NOT NULL DEFAULT '',
                file_size INTEGER NOT NULL DEFAULT 0,
                mime_type TEXT NOT NULL DEFAULT 'video/*',
                duration_ms INTEGER NOT NULL DEFAULT 0,
                width INTEGER NOT NULL DEFAULT 0,
                height INTEGER NOT NULL DEFAULT 0,
                bitrate INTEGER NOT NULL DEFAULT 0,
                frame_rate REAL NOT NULL DEFAULT 0,
                thumbnail_path TEXT,
                last_play_position INTEGER NOT NULL DEFAULT 0,
                play_count INTEGER NOT NULL DEFAULT 0,
                last_play_time INTEGER NOT NULL DEFAULT 0,
                is_favorite INTEGER NOT NULL DEFAULT 0,
                tags TEXT,
                added_time INTEGER NOT NULL DEFAULT 0,
                modified_time INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_videos_folder ON videos(folder_path);
            CREATE INDEX IF NOT EXISTS idx_videos_added ON videos(added_time);
            CREATE INDEX IF NOT EXISTS idx_videos_play_time ON videos(last_play_time);
            ",
        )?;
        Ok(())
    }

    fn notify(&self) {
        self.changes.send_modify(|v| *v = v.wrapping_add(1));
    }

    // -- Writes --

    /// Insert or merge a record, keyed by `file_path`. Returns the row id.
    pub fn upsert(&self, rec: &VideoRecord) -> Result<i64> {
        let id = upsert_in(&self.conn.lock(), rec)?;
        self.notify();
        Ok(id)
    }

    /// Upsert a batch inside one transaction. A rejected write aborts and
    /// rolls back the whole batch.
    pub fn upsert_batch(&self, records: &[VideoRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        {
            let mut conn = self.conn.lock();
            let tx = conn.transaction()?;
            for rec in records {
                upsert_in(&tx, rec)?;
            }
            tx.commit()?;
        }
        debug!(count = records.len(), "batch upsert committed");
        self.notify();
        Ok(records.len())
    }

    /// Remove a row by id. Returns whether a row was removed.
    pub fn delete_by_id(&self, id: i64) -> Result<bool> {
        let n = self
            .conn
            .lock()
            .execute("DELETE FROM videos WHERE id = ?1", params![id])?;
        if n > 0 {
            self.notify();
        }
        Ok(n > 0)
    }

    /// Remove a row by file path. Returns whether a row was removed.
    pub fn delete_by_path(&self, file_path: &str) -> Result<bool> {
        let n = self
            .conn
            .lock()
            .execute("DELETE FROM videos WHERE file_path = ?1", params![file_path])?;
        if n > 0 {
            self.notify();
        }
        Ok(n > 0)
    }

    /// Remove every row. Returns the number removed.
    pub fn delete_all(&self) -> Result<usize> {
        let n = self.conn.lock().execute("DELETE FROM videos", [])?;
        if n > 0 {
            self.notify();
        }
        Ok(n)
    }

    /// Record one play event: bumps `play_count` by exactly one and stores
    /// the resume position and event time. A missing id is a no-op.
    pub fn record_play_event(&self, id: i64, position_ms: i64, timestamp_ms: i64) -> Result<()> {
        if position_ms < 0 || timestamp_ms < 0 {
            return Err(IndexError::InvalidArgument(
                "play position and timestamp must be non-negative".into(),
            ));
        }
        let n = self.conn.lock().execute(
            "UPDATE videos SET last_play_position = ?1, last_play_time = ?2, \
             play_count = play_count + 1 WHERE id = ?3",
            params![position_ms, timestamp_ms, id],
        )?;
        if n > 0 {
            self.notify();
        }
        Ok(())
    }

    /// Set or clear the favorite flag.
    pub fn set_favorite(&self, id: i64, is_favorite: bool) -> Result<()> {
        let n = self.conn.lock().execute(
            "UPDATE videos SET is_favorite = ?1 WHERE id = ?2",
            params![is_favorite, id],
        )?;
        if n > 0 {
            self.notify();
        }
        Ok(())
    }

    // -- One-shot reads --

    pub fn get_by_id(&self, id: i64) -> Result<Option<VideoRecord>> {
        let conn = self.conn.lock();
        let rec = conn
            .query_row(
                &format!("SELECT {SELECT_COLS} FROM videos WHERE id = ?1"),
                params![id],
                row_to_record,
            )
            .optional()?;
        Ok(rec)
    }

    pub fn get_by_path(&self, file_path: &str) -> Result<Option<VideoRecord>> {
        let conn = self.conn.lock();
        let rec = conn
            .query_row(
                &format!("SELECT {SELECT_COLS} FROM videos WHERE file_path = ?1"),
                params![file_path],
                row_to_record,
            )
            .optional()?;
        Ok(rec)
    }

    pub fn exists(&self, file_path: &str) -> Result<bool> {
        let exists: bool = self.conn.lock().query_row(
            "SELECT EXISTS(SELECT 1 FROM videos WHERE file_path = ?1)",
            params![file_path],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Every record, newest first.
    pub fn all(&self) -> Result<Vec<VideoRecord>> {
        self.query_many(
            &format!("SELECT {SELECT_COLS} FROM videos ORDER BY added_time DESC, id DESC"),
            [],
        )
    }

    /// Records in one folder, by file name ascending regardless of
    /// insertion order.
    pub fn by_folder(&self, folder_path: &str) -> Result<Vec<VideoRecord>> {
        self.query_many(
            &format!(
                "SELECT {SELECT_COLS} FROM videos WHERE folder_path = ?1 \
                 ORDER BY file_name ASC, id ASC"
            ),
            params![folder_path],
        )
    }

    /// Favorited records, newest first.
    pub fn favorites(&self) -> Result<Vec<VideoRecord>> {
        self.query_many(
            &format!(
                "SELECT {SELECT_COLS} FROM videos WHERE is_favorite = 1 \
                 ORDER BY added_time DESC, id DESC"
            ),
            [],
        )
    }

    /// Most recently played records, bounded by `limit` (> 0).
    pub fn recent(&self, limit: i64) -> Result<Vec<VideoRecord>> {
        if limit <= 0 {
            return Err(IndexError::InvalidArgument(format!(
                "recent() limit must be positive, got {limit}"
            )));
        }
        self.query_many(
            &format!(
                "SELECT {SELECT_COLS} FROM videos WHERE last_play_time > 0 \
                 ORDER BY last_play_time DESC, id DESC LIMIT ?1"
            ),
            params![limit],
        )
    }

    /// Substring search over file names, by file name ascending.
    pub fn search(&self, query: &str) -> Result<Vec<VideoRecord>> {
        self.query_many(
            &format!(
                "SELECT {SELECT_COLS} FROM videos \
                 WHERE file_name LIKE ?1 ESCAPE '\\' \
                 ORDER BY file_name ASC, id ASC"
            ),
            params![like_pattern(query)],
        )
    }

    /// Distinct folder paths, ascending.
    pub fn folders(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT DISTINCT folder_path FROM videos ORDER BY folder_path ASC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn count(&self) -> Result<i64> {
        let n = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM videos", [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn count_by_folder(&self, folder_path: &str) -> Result<i64> {
        let n = self.conn.lock().query_row(
            "SELECT COUNT(*) FROM videos WHERE folder_path = ?1",
            params![folder_path],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    // -- Paged reads (keyset cursors, stable ordering) --

    /// Page through the whole library, `added_time` descending with id as
    /// the tiebreak.
    pub fn page_all(&self, after: Option<TimeCursor>, limit: i64) -> Result<Page<VideoRecord, TimeCursor>> {
        let fetch = page_fetch(limit)?;
        let items = match after {
            Some(c) => self.query_many(
                &format!(
                    "SELECT {SELECT_COLS} FROM videos \
                     WHERE added_time < ?1 OR (added_time = ?1 AND id < ?2) \
                     ORDER BY added_time DESC, id DESC LIMIT ?3"
                ),
                params![c.added_time, c.id, fetch],
            )?,
            None => self.query_many(
                &format!(
                    "SELECT {SELECT_COLS} FROM videos \
                     ORDER BY added_time DESC, id DESC LIMIT ?1"
                ),
                params![fetch],
            )?,
        };
        Ok(time_page(items, limit))
    }

    /// Page through one folder, file name ascending.
    pub fn page_by_folder(
        &self,
        folder_path: &str,
        after: Option<NameCursor>,
        limit: i64,
    ) -> Result<Page<VideoRecord, NameCursor>> {
        let fetch = page_fetch(limit)?;
        let items = match after {
            Some(c) => self.query_many(
                &format!(
                    "SELECT {SELECT_COLS} FROM videos WHERE folder_path = ?1 \
                     AND (file_name > ?2 OR (file_name = ?2 AND id > ?3)) \
                     ORDER BY file_name ASC, id ASC LIMIT ?4"
                ),
                params![folder_path, c.file_name, c.id, fetch],
            )?,
            None => self.query_many(
                &format!(
                    "SELECT {SELECT_COLS} FROM videos WHERE folder_path = ?1 \
                     ORDER BY file_name ASC, id ASC LIMIT ?2"
                ),
                params![folder_path, fetch],
            )?,
        };
        Ok(name_page(items, limit))
    }

    /// Page through search results, file name ascending.
    pub fn page_search(
        &self,
        query: &str,
        after: Option<NameCursor>,
        limit: i64,
    ) -> Result<Page<VideoRecord, NameCursor>> {
        let fetch = page_fetch(limit)?;
        let pattern = like_pattern(query);
        let items = match after {
            Some(c) => self.query_many(
                &format!(
                    "SELECT {SELECT_COLS} FROM videos \
                     WHERE file_name LIKE ?1 ESCAPE '\\' \
                     AND (file_name > ?2 OR (file_name = ?2 AND id > ?3)) \
                     ORDER BY file_name ASC, id ASC LIMIT ?4"
                ),
                params![pattern, c.file_name, c.id, fetch],
            )?,
            None => self.query_many(
                &format!(
                    "SELECT {SELECT_COLS} FROM videos \
                     WHERE file_name LIKE ?1 ESCAPE '\\' \
                     ORDER BY file_name ASC, id ASC LIMIT ?2"
                ),
                params![pattern, fetch],
            )?,
        };
        Ok(name_page(items, limit))
    }

    fn query_many<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<VideoRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, row_to_record)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

/// Current time as epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn upsert_in(conn: &Connection, rec: &VideoRecord) -> rusqlite::Result<i64> {
    let tags = if rec.tags.is_empty() {
        None
    } else {
        serde_json::to_string(&rec.tags).ok()
    };
    conn.query_row(
        "INSERT INTO videos (
            file_path, file_name, folder_path, file_size, mime_type,
            duration_ms, width, height, bitrate, frame_rate,
            thumbnail_path, last_play_position, play_count, last_play_time,
            is_favorite, tags, added_time, modified_time
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        ON CONFLICT(file_path) DO UPDATE SET
            file_name = excluded.file_name,
            folder_path = excluded.folder_path,
            file_size = excluded.file_size,
            mime_type = excluded.mime_type,
            duration_ms = excluded.duration_ms,
            width = excluded.width,
            height = excluded.height,
            bitrate = excluded.bitrate,
            frame_rate = excluded.frame_rate,
            thumbnail_path = COALESCE(excluded.thumbnail_path, videos.thumbnail_path),
            modified_time = excluded.modified_time
        RETURNING id",
        params![
            rec.file_path,
            rec.file_name,
            rec.folder_path,
            rec.file_size,
            rec.mime_type,
            rec.duration_ms,
            rec.width,
            rec.height,
            rec.bitrate,
            rec.frame_rate,
            rec.thumbnail_path,
            rec.last_play_position,
            rec.play_count,
            rec.last_play_time,
            rec.is_favorite,
            tags,
            rec.added_time,
            rec.modified_time,
        ],
        |row| row.get(0),
    )
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<VideoRecord> {
    let tags: Option<String> = row.get(16)?;
    Ok(VideoRecord {
        id: row.get(0)?,
        file_path: row.get(1)?,
        file_name: row.get(2)?,
        folder_path: row.get(3)?,
        file_size: row.get(4)?,
        mime_type: row.get(5)?,
        duration_ms: row.get(6)?,
        width: row.get(7)?,
        height: row.get(8)?,
        bitrate: row.get(9)?,
        frame_rate: row.get(10)?,
        thumbnail_path: row.get(11)?,
        last_play_position: row.get(12)?,
        play_count: row.get(13)?,
        last_play_time: row.get(14)?,
        is_favorite: row.get(15)?,
        tags: tags
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default(),
        added_time: row.get(17)?,
        modified_time: row.get(18)?,
    })
}

fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn page_fetch(limit: i64) -> Result<i64> {
    if limit <= 0 {
        return Err(IndexError::InvalidArgument(format!(
            "page limit must be positive, got {limit}"
        )));
    }
    // One extra row tells us whether another page exists.
    Ok(limit + 1)
}

fn time_page(mut items: Vec<VideoRecord>, limit: i64) -> Page<VideoRecord, TimeCursor> {
    let next = if items.len() as i64 > limit {
        items.truncate(limit as usize);
        items.last().map(VideoRecord::time_cursor)
    } else {
        None
    };
    Page { items, next }
}

fn name_page(mut items: Vec<VideoRecord>, limit: i64) -> Page<VideoRecord, NameCursor> {
    let next = if items.len() as i64 > limit {
        items.truncate(limit as usize);
        items.last().map(VideoRecord::name_cursor)
    } else {
        None
    };
    Page { items, next }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (VideoLibrary, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = VideoLibrary::open(dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    fn sample(path: &str) -> VideoRecord {
        VideoRecord {
            file_path: path.to_string(),
            file_name: path.rsplit('/').next().unwrap_or(path).to_string(),
            folder_path: path.rsplit_once('/').map(|(d, _)| d).unwrap_or("").to_string(),
            file_size: 5_000_000,
            mime_type: "video/mp4".to_string(),
            duration_ms: 120_000,
            width: 1920,
            height: 1080,
            bitrate: 4_000_000,
            frame_rate: 29.97,
            thumbnail_path: Some(format!("/cache/{}.jpg", path.len())),
            added_time: 1_700_000_000_000,
            modified_time: 1_700_000_000_000,
            ..Default::default()
        }
    }

    #[test]
    fn upsert_assigns_id_and_loads_back() {
        let (db, _dir) = test_db();
        let id = db.upsert(&sample("/videos/movie.mp4")).unwrap();
        assert!(id > 0);

        let rec = db.get_by_id(id).unwrap().unwrap();
        assert_eq!(rec.file_path, "/videos/movie.mp4");
        assert_eq!(rec.width, 1920);
        assert!(db.exists("/videos/movie.mp4").unwrap());
        assert!(!db.exists("/videos/other.mp4").unwrap());
    }

    #[test]
    fn upsert_same_path_keeps_single_row() {
        let (db, _dir) = test_db();
        let first = db.upsert(&sample("/videos/movie.mp4")).unwrap();

        let mut changed = sample("/videos/movie.mp4");
        changed.file_size = 9_999_999;
        let second = db.upsert(&changed).unwrap();

        assert_eq!(first, second);
        assert_eq!(db.count().unwrap(), 1);
        let rec = db.get_by_path("/videos/movie.mp4").unwrap().unwrap();
        assert_eq!(rec.file_size, 9_999_999);
    }

    #[test]
    fn rescan_upsert_preserves_usage_state() {
        let (db, _dir) = test_db();
        let mut rec = sample("/videos/movie.mp4");
        rec.tags = vec!["holiday".to_string(), "family".to_string()];
        let id = db.upsert(&rec).unwrap();

        db.set_favorite(id, true).unwrap();
        db.record_play_event(id, 42_000, 1_700_000_100_000).unwrap();

        // A fresh scan knows nothing about usage state.
        let mut rescan = sample("/videos/movie.mp4");
        rescan.file_size = 6_000_000;
        rescan.duration_ms = 121_000;
        rescan.added_time = 1_800_000_000_000; // scanner's "now", must not win
        db.upsert(&rescan).unwrap();

        let rec = db.get_by_id(id).unwrap().unwrap();
        assert_eq!(rec.file_size, 6_000_000);
        assert_eq!(rec.duration_ms, 121_000);
        assert!(rec.is_favorite);
        assert_eq!(rec.play_count, 1);
        assert_eq!(rec.last_play_position, 42_000);
        assert_eq!(rec.tags, vec!["holiday", "family"]);
        assert_eq!(rec.added_time, 1_700_000_000_000);
    }

    #[test]
    fn failed_thumbnail_does_not_erase_existing_artifact() {
        let (db, _dir) = test_db();
        let id = db.upsert(&sample("/videos/movie.mp4")).unwrap();

        let mut rescan = sample("/videos/movie.mp4");
        rescan.thumbnail_path = None;
        db.upsert(&rescan).unwrap();

        let rec = db.get_by_id(id).unwrap().unwrap();
        assert!(rec.thumbnail_path.is_some());
    }

    #[test]
    fn play_events_are_monotonic() {
        let (db, _dir) = test_db();
        let id = db.upsert(&sample("/videos/movie.mp4")).unwrap();

        for i in 1..=5 {
            db.record_play_event(id, i * 1000, 1_700_000_000_000 + i).unwrap();
        }

        let rec = db.get_by_id(id).unwrap().unwrap();
        assert_eq!(rec.play_count, 5);
        assert_eq!(rec.last_play_position, 5000);
        assert_eq!(rec.last_play_time, 1_700_000_000_005);
    }

    #[test]
    fn play_event_rejects_negative_position() {
        let (db, _dir) = test_db();
        let id = db.upsert(&sample("/videos/movie.mp4")).unwrap();
        let err = db.record_play_event(id, -1, 0).unwrap_err();
        assert!(matches!(err, IndexError::InvalidArgument(_)));
    }

    #[test]
    fn folder_listing_sorted_by_name_regardless_of_insertion_order() {
        let (db, _dir) = test_db();
        for name in ["zebra.mp4", "alpha.mp4", "mango.mp4"] {
            db.upsert(&sample(&format!("/videos/{name}"))).unwrap();
        }

        let recs = db.by_folder("/videos").unwrap();
        let names: Vec<_> = recs.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["alpha.mp4", "mango.mp4", "zebra.mp4"]);
        assert_eq!(db.count_by_folder("/videos").unwrap(), 3);
    }

    #[test]
    fn recent_requires_positive_limit() {
        let (db, _dir) = test_db();
        assert!(matches!(
            db.recent(0).unwrap_err(),
            IndexError::InvalidArgument(_)
        ));
        assert!(matches!(
            db.recent(-5).unwrap_err(),
            IndexError::InvalidArgument(_)
        ));
    }

    #[test]
    fn recent_orders_by_last_play_time() {
        let (db, _dir) = test_db();
        let a = db.upsert(&sample("/videos/a.mp4")).unwrap();
        let b = db.upsert(&sample("/videos/b.mp4")).unwrap();
        let _never_played = db.upsert(&sample("/videos/c.mp4")).unwrap();

        db.record_play_event(a, 0, 100).unwrap();
        db.record_play_event(b, 0, 200).unwrap();

        let recent = db.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, b);
        assert_eq!(recent[1].id, a);

        let limited = db.recent(1).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, b);
    }

    #[test]
    fn search_matches_substring_and_escapes_wildcards() {
        let (db, _dir) = test_db();
        db.upsert(&sample("/videos/summer_trip.mp4")).unwrap();
        db.upsert(&sample("/videos/winter.mp4")).unwrap();
        db.upsert(&sample("/videos/100%_legit.mp4")).unwrap();

        let hits = db.search("trip").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_name, "summer_trip.mp4");

        // A literal % must not act as a wildcard.
        let hits = db.search("100%").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_name, "100%_legit.mp4");

        assert!(db.search("nothing").unwrap().is_empty());
    }

    #[test]
    fn favorites_only_returns_flagged_rows() {
        let (db, _dir) = test_db();
        let a = db.upsert(&sample("/videos/a.mp4")).unwrap();
        db.upsert(&sample("/videos/b.mp4")).unwrap();

        db.set_favorite(a, true).unwrap();
        let favs = db.favorites().unwrap();
        assert_eq!(favs.len(), 1);
        assert_eq!(favs[0].id, a);

        db.set_favorite(a, false).unwrap();
        assert!(db.favorites().unwrap().is_empty());
    }

    #[test]
    fn folders_are_distinct_and_sorted() {
        let (db, _dir) = test_db();
        db.upsert(&sample("/videos/b/one.mp4")).unwrap();
        db.upsert(&sample("/videos/a/two.mp4")).unwrap();
        db.upsert(&sample("/videos/a/three.mp4")).unwrap();

        assert_eq!(db.folders().unwrap(), vec!["/videos/a", "/videos/b"]);
    }

    #[test]
    fn deletes() {
        let (db, _dir) = test_db();
        let id = db.upsert(&sample("/videos/a.mp4")).unwrap();
        db.upsert(&sample("/videos/b.mp4")).unwrap();

        assert!(db.delete_by_id(id).unwrap());
        assert!(!db.delete_by_id(id).unwrap());
        assert!(db.delete_by_path("/videos/b.mp4").unwrap());
        assert_eq!(db.count().unwrap(), 0);

        db.upsert(&sample("/videos/c.mp4")).unwrap();
        db.upsert(&sample("/videos/d.mp4")).unwrap();
        assert_eq!(db.delete_all().unwrap(), 2);
    }

    #[test]
    fn paging_walks_the_full_set_without_overlap() {
        let (db, _dir) = test_db();
        for i in 0..10 {
            let mut rec = sample(&format!("/videos/clip_{i}.mp4"));
            // Same added_time for all rows: the id tiebreak must keep the
            // ordering stable.
            rec.added_time = 1_700_000_000_000;
            db.upsert(&rec).unwrap();
        }

        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let page = db.page_all(cursor, 3).unwrap();
            assert!(page.items.len() <= 3);
            seen.extend(page.items.iter().map(|r| r.id));
            match page.next {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }

        assert_eq!(seen.len(), 10);
        let mut deduped = seen.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), 10);
        // added_time DESC, id DESC: newest insert first.
        assert!(seen.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn folder_paging_orders_by_name() {
        let (db, _dir) = test_db();
        for name in ["delta.mp4", "alpha.mp4", "echo.mp4", "bravo.mp4", "charlie.mp4"] {
            db.upsert(&sample(&format!("/videos/{name}"))).unwrap();
        }

        let first = db.page_by_folder("/videos", None, 2).unwrap();
        let names: Vec<_> = first.items.iter().map(|r| r.file_name.clone()).collect();
        assert_eq!(names, vec!["alpha.mp4", "bravo.mp4"]);

        let second = db.page_by_folder("/videos", first.next, 2).unwrap();
        let names: Vec<_> = second.items.iter().map(|r| r.file_name.clone()).collect();
        assert_eq!(names, vec!["charlie.mp4", "delta.mp4"]);

        let last = db.page_by_folder("/videos", second.next, 2).unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(last.next.is_none());
    }

    #[test]
    fn search_paging() {
        let (db, _dir) = test_db();
        for i in 0..5 {
            db.upsert(&sample(&format!("/videos/clip_{i}.mp4"))).unwrap();
        }
        db.upsert(&sample("/videos/other.mp4")).unwrap();

        let page = db.page_search("clip", None, 3).unwrap();
        assert_eq!(page.items.len(), 3);
        let rest = db.page_search("clip", page.next, 3).unwrap();
        assert_eq!(rest.items.len(), 2);
        assert!(rest.next.is_none());
    }

    #[test]
    fn writes_tick_the_change_signal() {
        let (db, _dir) = test_db();
        let rx = db.subscribe();
        let before = *rx.borrow();

        db.upsert(&sample("/videos/a.mp4")).unwrap();
        assert!(*rx.borrow() > before);

        let mid = *rx.borrow();
        db.delete_by_path("/videos/a.mp4").unwrap();
        assert!(*rx.borrow() > mid);

        // A write that touches nothing stays silent.
        let quiet = *rx.borrow();
        db.delete_by_path("/videos/missing.mp4").unwrap();
        assert_eq!(*rx.borrow(), quiet);
    }

    #[test]
    fn tags_round_trip_through_json_column() {
        let (db, _dir) = test_db();
        let mut rec = sample("/videos/a.mp4");
        rec.tags = vec!["one".into(), "two".into()];
        let id = db.upsert(&rec).unwrap();
        assert_eq!(db.get_by_id(id).unwrap().unwrap().tags, vec!["one", "two"]);

        let plain = db.upsert(&sample("/videos/b.mp4")).unwrap();
        assert!(db.get_by_id(plain).unwrap().unwrap().tags.is_empty());
    }
}
