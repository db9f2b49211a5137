//! JSON export/import and full database snapshots.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row,
};
use tracing::{info, warn};

use crate::{Result, Storage, StoreError};

/// Timestamp suffix used in backup file names.
pub const BACKUP_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const SQL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupDocument {
    pub backup_timestamp: String,
    #[serde(default)]
    pub anime: Vec<BackupTitle>,
    #[serde(default)]
    pub groups: Vec<BackupGroup>,
    #[serde(default)]
    pub users: Vec<BackupUser>,
    #[serde(default)]
    pub mandatory_channels: Vec<BackupChannel>,
    #[serde(default)]
    pub anime_groups: Vec<BackupTitleGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupTitle {
    pub code: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photo_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub parts: Vec<BackupPart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPart {
    #[serde(default)]
    pub anime_code: Option<i64>,
    pub part_number: i64,
    pub file_id: String,
    #[serde(default)]
    pub media_kind: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupGroup {
    pub group_id: i64,
    #[serde(default)]
    pub link: Option<String>,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupUser {
    pub user_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
    #[serde(default)]
    pub blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupChannel {
    pub channel_id: String,
    #[serde(default)]
    pub link: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupTitleGroup {
    pub anime_code: i64,
    pub group_chat_id: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub titles: usize,
    pub parts: usize,
    pub groups: usize,
    pub users: usize,
    pub channels: usize,
    pub links: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackupSummary {
    pub titles: i64,
    pub parts: i64,
    pub groups: i64,
    pub users: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
    pub summary: Option<BackupSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullBackup {
    pub database: PathBuf,
    pub json: PathBuf,
}

impl BackupDocument {
    pub fn summary(&self) -> BackupSummary {
        BackupSummary {
            titles: self.anime.len() as i64,
            parts: self.anime.iter().map(|t| t.parts.len() as i64).sum(),
            groups: self.groups.len() as i64,
            users: self.users.len() as i64,
        }
    }
}

impl Storage {
    pub async fn export_document(&self) -> Result<BackupDocument> {
        let part_rows = sqlx::query(
            "SELECT title_code, part_number, file_id, media_kind, created_at
             FROM parts ORDER BY title_code ASC, part_number ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut parts_by_title: HashMap<i64, Vec<BackupPart>> = HashMap::new();
        for r in part_rows {
            let code = r.get::<i64, _>(0);
            parts_by_title.entry(code).or_default().push(BackupPart {
                anime_code: Some(code),
                part_number: r.get::<i64, _>(1),
                file_id: r.get::<String, _>(2),
                media_kind: Some(r.get::<String, _>(3)),
                created_at: Some(r.get::<String, _>(4)),
            });
        }

        let anime = sqlx::query(
            "SELECT code, description, cover_file_id, created_at, updated_at
             FROM titles ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|r| {
            let code = r.get::<i64, _>(0);
            BackupTitle {
                code,
                description: r.get::<String, _>(1),
                photo_id: r.get::<Option<String>, _>(2),
                created_at: Some(r.get::<String, _>(3)),
                updated_at: Some(r.get::<String, _>(4)),
                parts: parts_by_title.remove(&code).unwrap_or_default(),
            }
        })
        .collect();

        let groups = sqlx::query(
            "SELECT chat_id, link, name, created_at FROM distribution_groups ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|r| BackupGroup {
            group_id: r.get::<i64, _>(0),
            link: r.get::<Option<String>, _>(1),
            name: r.get::<String, _>(2),
            created_at: Some(r.get::<String, _>(3)),
        })
        .collect();

        let users = sqlx::query(
            "SELECT user_id, username, first_name, last_name, created_at, last_seen, blocked
             FROM users ORDER BY user_id ASC",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|r| BackupUser {
            user_id: r.get::<i64, _>(0),
            username: r.get::<Option<String>, _>(1),
            first_name: r.get::<Option<String>, _>(2),
            last_name: r.get::<Option<String>, _>(3),
            created_at: Some(r.get::<String, _>(4)),
            last_seen: Some(r.get::<String, _>(5)),
            blocked: r.get::<bool, _>(6),
        })
        .collect();

        let mandatory_channels = sqlx::query(
            "SELECT chat_ref, link, name FROM mandatory_channels ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|r| BackupChannel {
            channel_id: r.get::<String, _>(0),
            link: r.get::<Option<String>, _>(1),
            name: r.get::<String, _>(2),
        })
        .collect();

        let anime_groups = sqlx::query(
            "SELECT tg.title_code, g.chat_id
             FROM title_groups tg JOIN distribution_groups g ON g.id = tg.group_id
             ORDER BY tg.id ASC",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|r| BackupTitleGroup {
            anime_code: r.get::<i64, _>(0),
            group_chat_id: r.get::<i64, _>(1),
        })
        .collect();

        Ok(BackupDocument {
            backup_timestamp: Utc::now().to_rfc3339(),
            anime,
            groups,
            users,
            mandatory_channels,
            anime_groups,
        })
    }

    /// Merges a backup into the database in one transaction.
    pub async fn import_document(&self, document: &BackupDocument) -> Result<ImportReport> {
        validate_document(document)?;

        let mut report = ImportReport::default();
        let mut tx = self.pool.begin().await?;

        for user in &document.users {
            sqlx::query(
                "INSERT INTO users (user_id, username, first_name, last_name, blocked, created_at, last_seen)
                 VALUES (?, ?, ?, ?, ?, COALESCE(?, CURRENT_TIMESTAMP), COALESCE(?, CURRENT_TIMESTAMP))
                 ON CONFLICT(user_id) DO UPDATE SET
                    username = excluded.username,
                    first_name = excluded.first_name,
                    last_name = excluded.last_name,
                    blocked = excluded.blocked,
                    last_seen = excluded.last_seen",
            )
            .bind(user.user_id)
            .bind(user.username.as_deref())
            .bind(user.first_name.as_deref())
            .bind(user.last_name.as_deref())
            .bind(user.blocked)
            .bind(normalize_timestamp(user.created_at.as_deref()))
            .bind(normalize_timestamp(user.last_seen.as_deref()))
            .execute(&mut *tx)
            .await?;
            report.users += 1;
        }

        for group in &document.groups {
            sqlx::query(
                "INSERT INTO distribution_groups (chat_id, link, name, created_at)
                 VALUES (?, ?, ?, COALESCE(?, CURRENT_TIMESTAMP))
                 ON CONFLICT(chat_id) DO UPDATE SET link = excluded.link, name = excluded.name",
            )
            .bind(group.group_id)
            .bind(group.link.as_deref())
            .bind(&group.name)
            .bind(normalize_timestamp(group.created_at.as_deref()))
            .execute(&mut *tx)
            .await?;
            report.groups += 1;
        }

        for channel in &document.mandatory_channels {
            sqlx::query(
                "INSERT INTO mandatory_channels (chat_ref, link, name) VALUES (?, ?, ?)
                 ON CONFLICT(chat_ref) DO UPDATE SET link = excluded.link, name = excluded.name",
            )
            .bind(&channel.channel_id)
            .bind(channel.link.as_deref())
            .bind(&channel.name)
            .execute(&mut *tx)
            .await?;
            report.channels += 1;
        }

        for title in &document.anime {
            sqlx::query(
                "INSERT INTO titles (code, description, cover_file_id, created_at, updated_at)
                 VALUES (?, ?, ?, COALESCE(?, CURRENT_TIMESTAMP), COALESCE(?, CURRENT_TIMESTAMP))
                 ON CONFLICT(code) DO UPDATE SET
                    description = excluded.description,
                    cover_file_id = excluded.cover_file_id,
                    updated_at = excluded.updated_at",
            )
            .bind(title.code)
            .bind(&title.description)
            .bind(title.photo_id.as_deref())
            .bind(normalize_timestamp(title.created_at.as_deref()))
            .bind(normalize_timestamp(title.updated_at.as_deref()))
            .execute(&mut *tx)
            .await?;
            report.titles += 1;

            for (number, part) in (1_i64..).zip(ordered_parts(title)) {
                let kind = part.media_kind.as_deref().unwrap_or("video");
                sqlx::query(
                    "INSERT INTO parts (title_code, part_number, file_id, media_kind, created_at)
                     VALUES (?, ?, ?, ?, COALESCE(?, CURRENT_TIMESTAMP))
                     ON CONFLICT(title_code, part_number) DO UPDATE SET
                        file_id = excluded.file_id,
                        media_kind = excluded.media_kind",
                )
                .bind(title.code)
                .bind(number)
                .bind(&part.file_id)
                .bind(kind)
                .bind(normalize_timestamp(part.created_at.as_deref()))
                .execute(&mut *tx)
                .await?;
                report.parts += 1;
            }
        }

        for link in &document.anime_groups {
            report.links += sqlx::query(
                "INSERT OR IGNORE INTO title_groups (title_code, group_id)
                 SELECT t.code, g.id FROM titles t, distribution_groups g
                 WHERE t.code = ? AND g.chat_id = ?",
            )
            .bind(link.anime_code)
            .bind(link.group_chat_id)
            .execute(&mut *tx)
            .await?
            .rows_affected() as usize;
        }

        tx.commit().await?;
        info!(
            titles = report.titles,
            parts = report.parts,
            groups = report.groups,
            users = report.users,
            "backup imported"
        );
        Ok(report)
    }

    pub async fn export_json_file(&self, path: &Path) -> Result<BackupDocument> {
        let document = self.export_document().await?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&document)?)?;
        Ok(document)
    }

    pub async fn import_json_file(&self, path: &Path) -> Result<ImportReport> {
        let raw = fs::read_to_string(path)?;
        let document: BackupDocument = serde_json::from_str(&raw)?;
        self.import_document(&document).await
    }

    /// Writes a consistent copy of the live database to `path`.
    pub async fn vacuum_into(&self, path: &Path) -> Result<()> {
        if path.exists() {
            return Err(StoreError::duplicate("backup file", path.display()));
        }
        sqlx::query("VACUUM INTO ?")
            .bind(path.to_string_lossy().into_owned())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Database snapshot plus JSON export, both stamped with the current time.
    pub async fn create_full_backup(&self, dir: &Path) -> Result<FullBackup> {
        fs::create_dir_all(dir)?;
        let stamp = Utc::now().format(BACKUP_STAMP_FORMAT).to_string();

        let database = dir.join(format!("catalog_{stamp}.db"));
        self.vacuum_into(&database).await?;

        let json = dir.join(format!("catalog_backup_{stamp}.json"));
        self.export_json_file(&json).await?;

        info!(database = %database.display(), json = %json.display(), "full backup written");
        Ok(FullBackup { database, json })
    }
}

/// Backup files in `dir`, newest first.
pub async fn list_backups(dir: &Path) -> Result<Vec<BackupEntry>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_backup = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("json") | Some("db")
        );
        if !is_backup {
            continue;
        }

        let metadata = fs::metadata(&path)?;
        let summary = match backup_summary(&path).await {
            Ok(summary) => Some(summary),
            Err(error) => {
                warn!(path = %path.display(), %error, "unreadable backup file");
                None
            }
        };
        entries.push(BackupEntry {
            size_bytes: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            summary,
            path,
        });
    }

    entries.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.path.cmp(&a.path)));
    Ok(entries)
}

/// Row counts of a JSON export or a database snapshot.
pub async fn backup_summary(path: &Path) -> Result<BackupSummary> {
    if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
        let raw = fs::read_to_string(path)?;
        let document: BackupDocument = serde_json::from_str(&raw)?;
        return Ok(document.summary());
    }

    let options = SqliteConnectOptions::new().filename(path).read_only(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    let count = |sql: &'static str| {
        let pool = pool.clone();
        async move { sqlx::query_scalar::<_, i64>(sql).fetch_one(&pool).await }
    };
    let summary = BackupSummary {
        titles: count("SELECT COUNT(*) FROM titles").await?,
        parts: count("SELECT COUNT(*) FROM parts").await?,
        groups: count("SELECT COUNT(*) FROM distribution_groups").await?,
        users: count("SELECT COUNT(*) FROM users").await?,
    };
    pool.close().await;
    Ok(summary)
}

fn validate_document(document: &BackupDocument) -> Result<()> {
    for title in &document.anime {
        if title.code <= 0 {
            return Err(StoreError::InvalidBackup(format!(
                "title code {} is not positive",
                title.code
            )));
        }
        if let Some(part) = title.parts.iter().find(|p| p.part_number <= 0) {
            return Err(StoreError::InvalidBackup(format!(
                "title {} has part number {}",
                title.code, part.part_number
            )));
        }
        let ordered = ordered_parts(title);
        if let Some(pair) = ordered
            .windows(2)
            .find(|pair| pair[0].part_number == pair[1].part_number)
        {
            return Err(StoreError::InvalidBackup(format!(
                "title {} repeats part number {}",
                title.code, pair[0].part_number
            )));
        }
    }
    Ok(())
}

/// Parts in ascending number order; import stores them as 1..N in this order.
fn ordered_parts(title: &BackupTitle) -> Vec<&BackupPart> {
    let mut parts: Vec<&BackupPart> = title.parts.iter().collect();
    parts.sort_by_key(|part| part.part_number);
    parts
}

/// Accepts RFC 3339 and plain SQL timestamps; anything else falls back to now.
fn normalize_timestamp(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(
            parsed
                .with_timezone(&Utc)
                .format(SQL_TIMESTAMP_FORMAT)
                .to_string(),
        );
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|parsed| parsed.format(SQL_TIMESTAMP_FORMAT).to_string())
}

#[cfg(test)]
#[path = "tests/backup_tests.rs"]
mod tests;
