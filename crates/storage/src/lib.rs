use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite, SqliteConnection,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{
    CatalogStats, ChannelId, ChatId, GroupId, MediaKind, TitleCode, UserId, UserProfile,
};

pub mod backup;
mod error;

pub use error::{Result, StoreError};

/// Upper bound on rows returned by [`Storage::search_titles`].
pub const SEARCH_LIMIT: i64 = 20;

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub profile: UserProfile,
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTitle {
    pub code: TitleCode,
    pub description: String,
    pub cover_file_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPart {
    pub title_code: TitleCode,
    pub number: u32,
    pub file_id: String,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredGroup {
    pub id: GroupId,
    pub chat_id: ChatId,
    pub link: Option<String>,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredChannel {
    pub id: ChannelId,
    pub chat_ref: String,
    pub link: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleViews {
    pub code: TitleCode,
    pub description: String,
    pub views: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTitle {
    pub code: TitleCode,
    pub description: String,
    pub cover_file_id: Option<String>,
    pub parts: Vec<NewPart>,
    pub group_ids: Vec<GroupId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPart {
    pub number: u32,
    pub file_id: String,
    pub kind: MediaKind,
}

/// Mandatory channel entry as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSeed {
    pub chat: String,
    #[serde(default)]
    pub link: Option<String>,
    pub name: String,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `sqlite::memory:` opens a fresh database.
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(connect_options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    pub async fn upsert_user(&self, profile: &UserProfile) -> Result<StoredUser> {
        let row = sqlx::query(
            "INSERT INTO users (user_id, username, first_name, last_name) VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET last_seen = CURRENT_TIMESTAMP
             RETURNING user_id, username, first_name, last_name, blocked, created_at, last_seen",
        )
        .bind(profile.id.0)
        .bind(profile.username.as_deref())
        .bind(profile.first_name.as_deref())
        .bind(profile.last_name.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(user_from_row(&row))
    }

    pub async fn user(&self, user_id: UserId) -> Result<Option<StoredUser>> {
        let row = sqlx::query(
            "SELECT user_id, username, first_name, last_name, blocked, created_at, last_seen
             FROM users WHERE user_id = ?",
        )
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn list_users(&self) -> Result<Vec<StoredUser>> {
        let rows = sqlx::query(
            "SELECT user_id, username, first_name, last_name, blocked, created_at, last_seen
             FROM users ORDER BY created_at ASC, user_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(user_from_row).collect())
    }

    pub async fn set_user_blocked(&self, user_id: UserId, blocked: bool) -> Result<()> {
        let updated = sqlx::query("UPDATE users SET blocked = ? WHERE user_id = ?")
            .bind(blocked)
            .bind(user_id.0)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(StoreError::not_found("user", user_id));
        }
        Ok(())
    }

    /// Users that should receive broadcasts.
    pub async fn broadcast_recipients(&self) -> Result<Vec<UserId>> {
        let rows = sqlx::query("SELECT user_id FROM users WHERE blocked = 0 ORDER BY user_id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| UserId(r.get::<i64, _>(0)))
            .collect())
    }

    pub async fn create_title(&self, title: &NewTitle) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO titles (code, description, cover_file_id) VALUES (?, ?, ?)")
            .bind(title.code.0)
            .bind(&title.description)
            .bind(title.cover_file_id.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(|error| StoreError::from_insert(error, "title", title.code))?;

        for part in &title.parts {
            insert_part(&mut tx, title.code, part).await?;
        }

        for group_id in &title.group_ids {
            link_title_group(&mut tx, title.code, *group_id).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn title_by_code(&self, code: TitleCode) -> Result<Option<StoredTitle>> {
        let row = sqlx::query(
            "SELECT code, description, cover_file_id, created_at, updated_at
             FROM titles WHERE code = ?",
        )
        .bind(code.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(title_from_row))
    }

    pub async fn title_exists(&self, code: TitleCode) -> Result<bool> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM titles WHERE code = ?)")
            .bind(code.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists != 0)
    }

    pub async fn update_title_description(&self, code: TitleCode, description: &str) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE titles SET description = ?, updated_at = CURRENT_TIMESTAMP WHERE code = ?",
        )
        .bind(description)
        .bind(code.0)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(StoreError::not_found("title", code));
        }
        Ok(())
    }

    pub async fn update_title_cover(&self, code: TitleCode, cover_file_id: &str) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE titles SET cover_file_id = ?, updated_at = CURRENT_TIMESTAMP WHERE code = ?",
        )
        .bind(cover_file_id)
        .bind(code.0)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(StoreError::not_found("title", code));
        }
        Ok(())
    }

    /// Removes a title together with its parts and group links.
    pub async fn delete_title(&self, code: TitleCode) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM title_groups WHERE title_code = ?")
            .bind(code.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM parts WHERE title_code = ?")
            .bind(code.0)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM titles WHERE code = ?")
            .bind(code.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(StoreError::not_found("title", code));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Newest titles first whose description contains `needle`.
    pub async fn search_titles(&self, needle: &str) -> Result<Vec<StoredTitle>> {
        let pattern = format!("%{}%", escape_like(needle.trim()));
        let rows = sqlx::query(
            "SELECT code, description, cover_file_id, created_at, updated_at
             FROM titles WHERE description LIKE ? ESCAPE '\\'
             ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(pattern)
        .bind(SEARCH_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(title_from_row).collect())
    }

    pub async fn list_parts(&self, code: TitleCode) -> Result<Vec<StoredPart>> {
        let rows = sqlx::query(
            "SELECT title_code, part_number, file_id, media_kind
             FROM parts WHERE title_code = ? ORDER BY part_number ASC",
        )
        .bind(code.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(part_from_row).collect())
    }

    pub async fn part(&self, code: TitleCode, number: u32) -> Result<Option<StoredPart>> {
        let row = sqlx::query(
            "SELECT title_code, part_number, file_id, media_kind
             FROM parts WHERE title_code = ? AND part_number = ?",
        )
        .bind(code.0)
        .bind(i64::from(number))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(part_from_row))
    }

    /// Appends a part after the current last one and returns its number.
    pub async fn append_part(&self, code: TitleCode, file_id: &str, kind: MediaKind) -> Result<u32> {
        let mut tx = self.pool.begin().await?;

        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM titles WHERE code = ?)")
            .bind(code.0)
            .fetch_one(&mut *tx)
            .await?;
        if exists == 0 {
            return Err(StoreError::not_found("title", code));
        }

        let last: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(part_number), 0) FROM parts WHERE title_code = ?")
                .bind(code.0)
                .fetch_one(&mut *tx)
                .await?;
        let number = u32::try_from(last + 1).unwrap_or(u32::MAX);

        let part = NewPart {
            number,
            file_id: file_id.to_string(),
            kind,
        };
        insert_part(&mut tx, code, &part).await?;

        tx.commit().await?;
        Ok(number)
    }

    /// Inserts a part at an explicit position in `1..=count + 1`, moving the
    /// part already there and every later one up by one.
    pub async fn add_part(&self, code: TitleCode, part: &NewPart) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM titles WHERE code = ?)")
            .bind(code.0)
            .fetch_one(&mut *tx)
            .await?;
        if exists == 0 {
            return Err(StoreError::not_found("title", code));
        }

        let count: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(part_number), 0) FROM parts WHERE title_code = ?")
                .bind(code.0)
                .fetch_one(&mut *tx)
                .await?;
        let number = i64::from(part.number);
        if number < 1 || number > count + 1 {
            return Err(StoreError::PartOutOfRange {
                code,
                number: part.number,
                max: count + 1,
            });
        }

        // Descending order keeps every intermediate state unique.
        let later: Vec<i64> = sqlx::query_scalar(
            "SELECT part_number FROM parts WHERE title_code = ? AND part_number >= ?
             ORDER BY part_number DESC",
        )
        .bind(code.0)
        .bind(number)
        .fetch_all(&mut *tx)
        .await?;

        for current in later {
            sqlx::query("UPDATE parts SET part_number = ? WHERE title_code = ? AND part_number = ?")
                .bind(current + 1)
                .bind(code.0)
                .bind(current)
                .execute(&mut *tx)
                .await?;
        }

        insert_part(&mut tx, code, part).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Deletes one part and closes the gap by moving every later part down.
    pub async fn delete_part(&self, code: TitleCode, number: u32) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM parts WHERE title_code = ? AND part_number = ?")
            .bind(code.0)
            .bind(i64::from(number))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(StoreError::not_found("part", format!("{code}#{number}")));
        }

        // Ascending order keeps every intermediate state unique.
        let later: Vec<i64> = sqlx::query_scalar(
            "SELECT part_number FROM parts WHERE title_code = ? AND part_number > ?
             ORDER BY part_number ASC",
        )
        .bind(code.0)
        .bind(i64::from(number))
        .fetch_all(&mut *tx)
        .await?;

        for current in later {
            sqlx::query("UPDATE parts SET part_number = ? WHERE title_code = ? AND part_number = ?")
                .bind(current - 1)
                .bind(code.0)
                .bind(current)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn create_group(
        &self,
        chat_id: ChatId,
        link: Option<&str>,
        name: &str,
    ) -> Result<GroupId> {
        let rec = sqlx::query(
            "INSERT INTO distribution_groups (chat_id, link, name) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(chat_id.0)
        .bind(link)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| StoreError::from_insert(error, "group", chat_id))?;
        Ok(GroupId(rec.get::<i64, _>(0)))
    }

    pub async fn list_groups(&self) -> Result<Vec<StoredGroup>> {
        let rows = sqlx::query(
            "SELECT id, chat_id, link, name, created_at
             FROM distribution_groups ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(group_from_row).collect())
    }

    pub async fn group(&self, group_id: GroupId) -> Result<Option<StoredGroup>> {
        let row = sqlx::query(
            "SELECT id, chat_id, link, name, created_at FROM distribution_groups WHERE id = ?",
        )
        .bind(group_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(group_from_row))
    }

    pub async fn group_by_chat(&self, chat_id: ChatId) -> Result<Option<StoredGroup>> {
        let row = sqlx::query(
            "SELECT id, chat_id, link, name, created_at FROM distribution_groups WHERE chat_id = ?",
        )
        .bind(chat_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(group_from_row))
    }

    pub async fn delete_group(&self, group_id: GroupId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM title_groups WHERE group_id = ?")
            .bind(group_id.0)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM distribution_groups WHERE id = ?")
            .bind(group_id.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(StoreError::not_found("group", group_id));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Links a title to a group. Returns `false` when nothing changed.
    pub async fn add_title_group(&self, code: TitleCode, group_id: GroupId) -> Result<bool> {
        if !self.title_exists(code).await? {
            return Err(StoreError::not_found("title", code));
        }
        let mut conn = self.pool.acquire().await?;
        link_title_group(&mut conn, code, group_id).await
    }

    pub async fn title_groups(&self, code: TitleCode) -> Result<Vec<StoredGroup>> {
        let rows = sqlx::query(
            "SELECT g.id, g.chat_id, g.link, g.name, g.created_at
             FROM distribution_groups g
             JOIN title_groups tg ON tg.group_id = g.id
             WHERE tg.title_code = ?
             ORDER BY tg.id ASC",
        )
        .bind(code.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(group_from_row).collect())
    }

    /// Inserts a channel or replaces link and name of an existing one.
    pub async fn upsert_mandatory_channel(
        &self,
        chat_ref: &str,
        link: Option<&str>,
        name: &str,
    ) -> Result<ChannelId> {
        let rec = sqlx::query(
            "INSERT INTO mandatory_channels (chat_ref, link, name) VALUES (?, ?, ?)
             ON CONFLICT(chat_ref) DO UPDATE SET link = excluded.link, name = excluded.name
             RETURNING id",
        )
        .bind(chat_ref)
        .bind(link)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(ChannelId(rec.get::<i64, _>(0)))
    }

    pub async fn list_mandatory_channels(&self) -> Result<Vec<StoredChannel>> {
        let rows = sqlx::query("SELECT id, chat_ref, link, name FROM mandatory_channels ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(channel_from_row).collect())
    }

    pub async fn delete_mandatory_channel(&self, channel_id: ChannelId) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM mandatory_channels WHERE id = ?")
            .bind(channel_id.0)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(StoreError::not_found("mandatory channel", channel_id));
        }
        Ok(())
    }

    /// Seeds channels from configuration when none exist yet.
    pub async fn seed_mandatory_channels(&self, seeds: &[ChannelSeed]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mandatory_channels")
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            return Ok(0);
        }

        let mut inserted = 0;
        for seed in seeds {
            inserted += sqlx::query(
                "INSERT INTO mandatory_channels (chat_ref, link, name) VALUES (?, ?, ?)
                 ON CONFLICT(chat_ref) DO NOTHING",
            )
            .bind(&seed.chat)
            .bind(seed.link.as_deref())
            .bind(&seed.name)
            .execute(&mut *tx)
            .await?
            .rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn record_view(
        &self,
        user_id: UserId,
        code: TitleCode,
        part_number: Option<u32>,
    ) -> Result<()> {
        sqlx::query("INSERT INTO view_history (user_id, title_code, part_number) VALUES (?, ?, ?)")
            .bind(user_id.0)
            .bind(code.0)
            .bind(part_number.map(i64::from))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn most_viewed(&self, limit: i64) -> Result<Vec<TitleViews>> {
        let rows = sqlx::query(
            "SELECT t.code, t.description, COUNT(v.id) AS views
             FROM titles t
             JOIN view_history v ON v.title_code = t.code
             GROUP BY t.code, t.description
             ORDER BY views DESC, t.code ASC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| TitleViews {
                code: TitleCode(r.get::<i64, _>(0)),
                description: r.get::<String, _>(1),
                views: r.get::<i64, _>(2),
            })
            .collect())
    }

    pub async fn count_titles(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM titles").await
    }

    pub async fn count_parts(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM parts").await
    }

    pub async fn count_groups(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM distribution_groups").await
    }

    pub async fn count_users(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM users").await
    }

    pub async fn stats(&self) -> Result<CatalogStats> {
        Ok(CatalogStats {
            users: self.count_users().await?,
            active_users_7d: self
                .count("SELECT COUNT(*) FROM users WHERE last_seen >= datetime('now', '-7 days')")
                .await?,
            titles: self.count_titles().await?,
            parts: self.count_parts().await?,
            groups: self.count_groups().await?,
            mandatory_channels: self.count("SELECT COUNT(*) FROM mandatory_channels").await?,
        })
    }

    async fn count(&self, sql: &'static str) -> Result<i64> {
        Ok(sqlx::query_scalar(sql).fetch_one(&self.pool).await?)
    }
}

async fn insert_part(conn: &mut SqliteConnection, code: TitleCode, part: &NewPart) -> Result<()> {
    sqlx::query(
        "INSERT INTO parts (title_code, part_number, file_id, media_kind) VALUES (?, ?, ?, ?)",
    )
    .bind(code.0)
    .bind(i64::from(part.number))
    .bind(&part.file_id)
    .bind(part.kind.as_str())
    .execute(&mut *conn)
    .await
    .map_err(|error| StoreError::from_insert(error, "part", format!("{code}#{}", part.number)))?;
    Ok(())
}

/// Links only groups that still exist; duplicates are ignored.
async fn link_title_group(
    conn: &mut SqliteConnection,
    code: TitleCode,
    group_id: GroupId,
) -> Result<bool> {
    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO title_groups (title_code, group_id)
         SELECT ?, id FROM distribution_groups WHERE id = ?",
    )
    .bind(code.0)
    .bind(group_id.0)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    Ok(inserted > 0)
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn user_from_row(r: &SqliteRow) -> StoredUser {
    StoredUser {
        profile: UserProfile {
            id: UserId(r.get::<i64, _>("user_id")),
            username: r.get::<Option<String>, _>("username"),
            first_name: r.get::<Option<String>, _>("first_name"),
            last_name: r.get::<Option<String>, _>("last_name"),
        },
        blocked: r.get::<bool, _>("blocked"),
        created_at: r.get::<DateTime<Utc>, _>("created_at"),
        last_seen: r.get::<DateTime<Utc>, _>("last_seen"),
    }
}

fn title_from_row(r: &SqliteRow) -> StoredTitle {
    StoredTitle {
        code: TitleCode(r.get::<i64, _>("code")),
        description: r.get::<String, _>("description"),
        cover_file_id: r.get::<Option<String>, _>("cover_file_id"),
        created_at: r.get::<DateTime<Utc>, _>("created_at"),
        updated_at: r.get::<DateTime<Utc>, _>("updated_at"),
    }
}

fn part_from_row(r: &SqliteRow) -> StoredPart {
    StoredPart {
        title_code: TitleCode(r.get::<i64, _>("title_code")),
        number: u32::try_from(r.get::<i64, _>("part_number")).unwrap_or_default(),
        file_id: r.get::<String, _>("file_id"),
        kind: r
            .get::<String, _>("media_kind")
            .parse()
            .unwrap_or(MediaKind::Video),
    }
}

fn group_from_row(r: &SqliteRow) -> StoredGroup {
    StoredGroup {
        id: GroupId(r.get::<i64, _>("id")),
        chat_id: ChatId(r.get::<i64, _>("chat_id")),
        link: r.get::<Option<String>, _>("link"),
        name: r.get::<String, _>("name"),
        created_at: r.get::<DateTime<Utc>, _>("created_at"),
    }
}

fn channel_from_row(r: &SqliteRow) -> StoredChannel {
    StoredChannel {
        id: ChannelId(r.get::<i64, _>("id")),
        chat_ref: r.get::<String, _>("chat_ref"),
        link: r.get::<Option<String>, _>("link"),
        name: r.get::<String, _>("name"),
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent)?;
    Ok(())
}

pub(crate) fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.contains(":memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
