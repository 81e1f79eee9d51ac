use chrono::Utc;
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::data::{Cursor, Photo, PhotoPage, SortOrder};
use crate::error::StoreError;

/// Narrow contract the pipeline uses to talk to the gallery
///
/// Calls are blocking; async callers run them on the blocking pool.
pub trait AssetStore: Send + Sync {
    /// Create an album asset from a finished file
    fn save_to_album(&self, path: &Path) -> Result<Photo, StoreError>;

    /// Fetch one page sorted by creation time; `cursor` comes from the previous page
    fn list_album_page(
        &self,
        cursor: Option<&Cursor>,
        page_size: usize,
        order: SortOrder,
    ) -> Result<PhotoPage, StoreError>;

    /// Delete every listed asset; fails if any of them could not be removed
    fn delete_assets(&self, ids: &[String]) -> Result<(), StoreError>;
}

/// The Album manages the SQLite catalog of saved photos.
/// Saved files are copied into the album directory so the capture cache
/// can be cleared independently.
pub struct Album {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    album_dir: PathBuf,
    sequence: AtomicU64,
}

impl Album {
    /// Open (or create) the catalog at `db_path`, storing files in `album_dir`
    pub fn open(db_path: &Path, album_dir: &Path) -> Result<Self, StoreError> {
        for dir in [db_path.parent(), Some(album_dir)].into_iter().flatten() {
            fs::create_dir_all(dir).map_err(|e| {
                StoreError::QueryFailed(format!("cannot create {}: {}", dir.display(), e))
            })?;
        }

        let conn = Connection::open(db_path)?;
        log::info!("📁 Album catalog opened at: {}", db_path.display());

        let album = Album {
            conn: Mutex::new(conn),
            db_path: db_path.to_path_buf(),
            album_dir: album_dir.to_path_buf(),
            sequence: AtomicU64::new(0),
        };
        album.init_schema()?;

        Ok(album)
    }

    /// Create the photos table and its sort index if they don't exist
    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS photos (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                uri             TEXT NOT NULL,
                filename        TEXT NOT NULL,
                source_path     TEXT NOT NULL,
                created_at      INTEGER NOT NULL
            )",
            [],
        )?;

        // Keyset pagination walks (created_at, id) in both directions
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_photos_created_at
             ON photos(created_at, id)",
            [],
        )?;

        Ok(())
    }

    /// Get a count of photos in the album
    pub fn photo_count(&self) -> Result<i64, StoreError> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
        Ok(count)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::QueryFailed("album connection poisoned".into()))
    }
}

impl AssetStore for Album {
    fn save_to_album(&self, path: &Path) -> Result<Photo, StoreError> {
        let save_failed = |reason: String| StoreError::SaveFailed {
            path: path.to_path_buf(),
            reason,
        };

        if !path.is_file() {
            return Err(save_failed("file does not exist".into()));
        }

        let now = Utc::now().timestamp_millis();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg")
            .to_ascii_lowercase();
        let filename = format!("WaterMark_{}_{}.{}", now, seq, extension);
        let dest = self.album_dir.join(&filename);

        fs::copy(path, &dest).map_err(|e| save_failed(format!("copy failed: {}", e)))?;

        let uri = format!("file://{}", dest.display());
        let inserted = self.conn().and_then(|conn| {
            conn.execute(
                "INSERT INTO photos (uri, filename, source_path, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![uri, filename, path.to_string_lossy(), now],
            )?;
            Ok(conn.last_insert_rowid())
        });

        let id = match inserted {
            Ok(id) => id,
            Err(e) => {
                // Don't leave an orphaned copy behind
                let _ = fs::remove_file(&dest);
                return Err(save_failed(e.to_string()));
            }
        };

        log::info!("📸 Saved {} to album as #{}", path.display(), id);
        Ok(Photo {
            id: id.to_string(),
            uri,
            filename,
            creation_time: now,
        })
    }

    fn list_album_page(
        &self,
        cursor: Option<&Cursor>,
        page_size: usize,
        order: SortOrder,
    ) -> Result<PhotoPage, StoreError> {
        let after = cursor.map(decode_cursor).transpose()?;
        let limit = page_size.max(1);

        let sql = match order {
            SortOrder::Ascending => {
                "SELECT id, uri, filename, created_at FROM photos
                 WHERE ?1 IS NULL OR created_at > ?1 OR (created_at = ?1 AND id > ?2)
                 ORDER BY created_at ASC, id ASC
                 LIMIT ?3"
            }
            SortOrder::Descending => {
                "SELECT id, uri, filename, created_at FROM photos
                 WHERE ?1 IS NULL OR created_at < ?1 OR (created_at = ?1 AND id < ?2)
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?3"
            }
        };

        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        // One extra row tells us whether another page exists
        let rows = stmt.query_map(
            params![
                after.map(|(created_at, _)| created_at),
                after.map(|(_, id)| id),
                (limit + 1) as i64
            ],
            |row| {
                let id: i64 = row.get(0)?;
                Ok((
                    id,
                    Photo {
                        id: id.to_string(),
                        uri: row.get(1)?,
                        filename: row.get(2)?,
                        creation_time: row.get(3)?,
                    },
                ))
            },
        )?;

        let mut rows = rows.collect::<Result<Vec<_>, _>>()?;
        let has_more = rows.len() > limit;
        rows.truncate(limit);

        let cursor = if has_more {
            rows.last()
                .map(|(id, photo)| encode_cursor(photo.creation_time, *id))
        } else {
            None
        };
        let items = rows.into_iter().map(|(_, photo)| photo).collect();

        Ok(PhotoPage {
            items,
            cursor,
            has_more,
        })
    }

    fn delete_assets(&self, ids: &[String]) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let mut failures = Vec::new();

        for raw_id in ids {
            let Ok(id) = raw_id.parse::<i64>() else {
                failures.push(format!("{}: not an album id", raw_id));
                continue;
            };

            let uri: Option<String> = conn
                .query_row("SELECT uri FROM photos WHERE id = ?1", params![id], |row| {
                    row.get(0)
                })
                .ok();

            match conn.execute("DELETE FROM photos WHERE id = ?1", params![id]) {
                Ok(0) => failures.push(format!("{}: no such photo", raw_id)),
                Ok(_) => {
                    if let Some(uri) = uri {
                        let file = uri.strip_prefix("file://").unwrap_or(&uri);
                        if let Err(e) = fs::remove_file(file) {
                            log::warn!("⚠️  Deleted #{} but could not remove {}: {}", id, file, e);
                        }
                    }
                }
                Err(e) => failures.push(format!("{}: {}", raw_id, e)),
            }
        }

        if failures.is_empty() {
            log::info!("🗑️  Deleted {} photos", ids.len());
            Ok(())
        } else {
            Err(StoreError::DeleteFailed(failures.join("; ")))
        }
    }
}

fn encode_cursor(created_at: i64, id: i64) -> Cursor {
    Cursor::new(format!("{}:{}", created_at, id))
}

fn decode_cursor(cursor: &Cursor) -> Result<(i64, i64), StoreError> {
    let malformed = || StoreError::QueryFailed(format!("malformed cursor {:?}", cursor.as_str()));
    let (created_at, id) = cursor.as_str().split_once(':').ok_or_else(malformed)?;
    Ok((
        created_at.parse().map_err(|_| malformed())?,
        id.parse().map_err(|_| malformed())?,
    ))
}

// Implement Debug for better error messages
impl std::fmt::Debug for Album {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Album")
            .field("db_path", &self.db_path)
            .field("album_dir", &self.album_dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn album_with(count: usize) -> (tempfile::TempDir, Album) {
        let dir = tempfile::tempdir().unwrap();
        let album = Album::open(&dir.path().join("album.db"), &dir.path().join("album")).unwrap();
        for i in 0..count {
            let src = dir.path().join(format!("cap{}.jpg", i));
            fs::write(&src, b"jpeg bytes").unwrap();
            album.save_to_album(&src).unwrap();
        }
        (dir, album)
    }

    fn walk(album: &Album, page_size: usize, order: SortOrder) -> Vec<Photo> {
        let mut all = Vec::new();
        let mut cursor = None;
        loop {
            let page = album.list_album_page(cursor.as_ref(), page_size, order).unwrap();
            all.extend(page.items);
            if !page.has_more {
                assert!(page.cursor.is_none());
                break;
            }
            cursor = page.cursor;
        }
        all
    }

    #[test]
    fn test_save_copies_file_and_issues_ids() {
        let (dir, album) = album_with(2);
        assert_eq!(album.photo_count().unwrap(), 2);

        let page = album.list_album_page(None, 10, SortOrder::Descending).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_ne!(page.items[0].id, page.items[1].id);
        for photo in &page.items {
            assert!(photo.filename.starts_with("WaterMark_"));
            let path = photo.uri.strip_prefix("file://").unwrap();
            assert!(Path::new(path).starts_with(dir.path().join("album")));
            assert!(Path::new(path).exists());
        }
    }

    #[test]
    fn test_save_missing_file_fails() {
        let (dir, album) = album_with(0);
        let err = album.save_to_album(&dir.path().join("ghost.jpg")).unwrap_err();
        assert!(matches!(err, StoreError::SaveFailed { .. }));
    }

    #[test]
    fn test_pages_cover_everything_once_in_order() {
        let (_dir, album) = album_with(7);

        for order in [SortOrder::Ascending, SortOrder::Descending] {
            let all = walk(&album, 3, order);
            assert_eq!(all.len(), 7);

            let ids: HashSet<_> = all.iter().map(|p| p.id.clone()).collect();
            assert_eq!(ids.len(), 7);

            let keys: Vec<(i64, i64)> = all
                .iter()
                .map(|p| (p.creation_time, p.id.parse().unwrap()))
                .collect();
            let mut sorted = keys.clone();
            sorted.sort();
            if !order.is_ascending() {
                sorted.reverse();
            }
            assert_eq!(keys, sorted);
        }
    }

    #[test]
    fn test_exact_page_boundary_has_no_more() {
        let (_dir, album) = album_with(4);
        let first = album.list_album_page(None, 2, SortOrder::Ascending).unwrap();
        assert!(first.has_more);
        let second = album
            .list_album_page(first.cursor.as_ref(), 2, SortOrder::Ascending)
            .unwrap();
        assert_eq!(second.items.len(), 2);
        assert!(!second.has_more);
    }

    #[test]
    fn test_malformed_cursor_is_query_failure() {
        let (_dir, album) = album_with(1);
        let err = album
            .list_album_page(Some(&Cursor::new("page-two")), 5, SortOrder::Descending)
            .unwrap_err();
        assert!(matches!(err, StoreError::QueryFailed(_)));
    }

    #[test]
    fn test_delete_removes_rows_and_files() {
        let (_dir, album) = album_with(3);
        let page = album.list_album_page(None, 10, SortOrder::Descending).unwrap();
        let victim = page.items[0].clone();

        album.delete_assets(&[victim.id.clone()]).unwrap();

        assert_eq!(album.photo_count().unwrap(), 2);
        assert!(!Path::new(victim.uri.strip_prefix("file://").unwrap()).exists());
    }

    #[test]
    fn test_partial_delete_reports_failure() {
        let (_dir, album) = album_with(2);
        let page = album.list_album_page(None, 10, SortOrder::Descending).unwrap();

        let err = album
            .delete_assets(&[page.items[0].id.clone(), "9999".into(), "temp-1".into()])
            .unwrap_err();

        assert!(matches!(err, StoreError::DeleteFailed(_)));
        assert_eq!(album.photo_count().unwrap(), 1);
    }
}
