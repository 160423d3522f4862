//! Row types and paging cursors for the video index.

use serde::{Deserialize, Serialize};

/// One indexed video. `file_path` is the identity; everything else is
/// descriptive, technical, or usage state. Numeric technical fields use 0
/// as the "unknown" sentinel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Storage-assigned surrogate key. 0 until the record has been upserted.
    pub id: i64,
    pub file_path: String,
    pub file_name: String,
    pub folder_path: String,
    pub file_size: i64,
    pub mime_type: String,

    pub duration_ms: i64,
    pub width: i64,
    pub height: i64,
    pub bitrate: i64,
    pub frame_rate: f64,

    /// Absent when thumbnail generation failed or was skipped.
    pub thumbnail_path: Option<String>,

    pub last_play_position: i64,
    pub play_count: i64,
    /// Epoch ms of the last play event, 0 = never played.
    pub last_play_time: i64,
    pub is_favorite: bool,
    pub tags: Vec<String>,

    /// Epoch ms, set once at first insert and preserved on rescans.
    pub added_time: i64,
    /// Source file's last-modified time, epoch ms.
    pub modified_time: i64,
}

/// Keyset cursor for listings ordered by `added_time` descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeCursor {
    pub added_time: i64,
    pub id: i64,
}

/// Keyset cursor for listings ordered by `file_name` ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameCursor {
    pub file_name: String,
    pub id: i64,
}

/// One page of results. `next` is present only when more rows remain.
#[derive(Debug, Clone)]
pub struct Page<T, C> {
    pub items: Vec<T>,
    pub next: Option<C>,
}

impl VideoRecord {
    pub(crate) fn time_cursor(&self) -> TimeCursor {
        TimeCursor {
            added_time: self.added_time,
            id: self.id,
        }
    }

    pub(crate) fn name_cursor(&self) -> NameCursor {
        NameCursor {
            file_name: self.file_name.clone(),
            id: self.id,
        }
    }
}
