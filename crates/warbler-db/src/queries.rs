use std::collections::HashSet;

use chrono::Utc;
use rusqlite::{Connection, Row, params};

use crate::migrations::{DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL};
use crate::models::{MessageRow, NewUser, UserRow, UserStats, UserUpdate};
use crate::{Database, Result};

const USER_COLUMNS: &str =
    "u.id, u.username, u.email, u.password, u.image_url, u.header_image_url, u.bio, u.location";

// JOIN users to fetch the author columns in a single query (eliminates N+1)
const MESSAGE_SELECT: &str = "SELECT m.id, m.text, m.timestamp, m.user_id, u.username, u.image_url
     FROM messages m
     JOIN users u ON m.user_id = u.id";

impl Database {
    // -- Users --

    pub fn insert_user(&self, user: &NewUser) -> Result<UserRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password, image_url) VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.username,
                    user.email,
                    user.password_hash,
                    user.image_url.as_deref().unwrap_or(DEFAULT_IMAGE_URL),
                ],
            )?;
            fetch_user(conn, conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    /// All users, or those whose username contains `search`.
    pub fn list_users(&self, search: Option<&str>) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users u
                 WHERE ?1 IS NULL OR instr(u.username, ?1) > 0
                 ORDER BY u.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([search], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_user(&self, id: i64, update: &UserUpdate) -> Result<UserRow> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users
                 SET username = ?1, email = ?2, image_url = ?3, header_image_url = ?4, bio = ?5,
                     location = ?6
                 WHERE id = ?7",
                params![
                    update.username,
                    update.email,
                    update.image_url.as_deref().unwrap_or(DEFAULT_IMAGE_URL),
                    update
                        .header_image_url
                        .as_deref()
                        .unwrap_or(DEFAULT_HEADER_IMAGE_URL),
                    update.bio,
                    update.location,
                    id,
                ],
            )?;
            fetch_user(conn, id)
        })
    }

    /// Delete a user along with their messages, likes and follows.
    /// Returns false if no such user existed.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM likes
                 WHERE user_id = ?1
                    OR message_id IN (SELECT id FROM messages WHERE user_id = ?1)",
                [id],
            )?;
            tx.execute(
                "DELETE FROM follows WHERE user_being_followed_id = ?1 OR user_following_id = ?1",
                [id],
            )?;
            tx.execute("DELETE FROM messages WHERE user_id = ?1", [id])?;
            let deleted = tx.execute("DELETE FROM users WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(deleted > 0)
        })
    }

    pub fn user_stats(&self, id: i64) -> Result<UserStats> {
        self.with_conn(|conn| {
            let stats = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM messages WHERE user_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE user_following_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE user_being_followed_id = ?1),
                    (SELECT COUNT(*) FROM likes WHERE user_id = ?1)",
                [id],
                |row| {
                    Ok(UserStats {
                        messages: row.get(0)?,
                        following: row.get(1)?,
                        followers: row.get(2)?,
                        likes: row.get(3)?,
                    })
                },
            )?;
            Ok(stats)
        })
    }

    // -- Follows --

    /// Record that `follower_id` follows `followed_id`. Following twice is a no-op.
    pub fn follow(&self, follower_id: i64, followed_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO follows (user_being_followed_id, user_following_id)
                 VALUES (?1, ?2)",
                [followed_id, follower_id],
            )?;
            Ok(())
        })
    }

    /// Returns true if a follow row was removed.
    pub fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
                [followed_id, follower_id],
            )?;
            Ok(removed > 0)
        })
    }

    /// Is `user_id` following `other_id`?
    pub fn is_following(&self, user_id: i64, other_id: i64) -> Result<bool> {
        self.with_conn(|conn| follow_exists(conn, other_id, user_id))
    }

    /// Is `user_id` followed by `other_id`?
    pub fn is_followed_by(&self, user_id: i64, other_id: i64) -> Result<bool> {
        self.with_conn(|conn| follow_exists(conn, user_id, other_id))
    }

    /// Users that `user_id` follows.
    pub fn following(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM follows f
                 JOIN users u ON u.id = f.user_being_followed_id
                 WHERE f.user_following_id = ?1
                 ORDER BY u.username"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Users following `user_id`.
    pub fn followers(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM follows f
                 JOIN users u ON u.id = f.user_following_id
                 WHERE f.user_being_followed_id = ?1
                 ORDER BY u.username"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn following_ids(&self, user_id: i64) -> Result<HashSet<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT user_being_followed_id FROM follows WHERE user_following_id = ?1")?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<HashSet<_>, _>>()?;
            Ok(ids)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, user_id: i64, text: &str) -> Result<MessageRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (text, timestamp, user_id) VALUES (?1, ?2, ?3)",
                params![text, Utc::now(), user_id],
            )?;
            fetch_message(conn, conn.last_insert_rowid())
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!("{MESSAGE_SELECT} WHERE m.id = ?1");
            conn.query_row(&sql, [id], message_from_row).optional()
        })
    }

    /// Most recent messages written by `user_id`, newest first.
    pub fn user_messages(&self, user_id: i64, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{MESSAGE_SELECT}
                 WHERE m.user_id = ?1
                 ORDER BY m.timestamp DESC, m.id DESC
                 LIMIT ?2"
            );
            query_messages(conn, &sql, params![user_id, limit])
        })
    }

    /// Home timeline: messages by `user_id` and everyone they follow, newest first.
    pub fn timeline(&self, user_id: i64, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{MESSAGE_SELECT}
                 WHERE m.user_id = ?1
                    OR m.user_id IN (
                        SELECT user_being_followed_id FROM follows WHERE user_following_id = ?1
                    )
                 ORDER BY m.timestamp DESC, m.id DESC
                 LIMIT ?2"
            );
            query_messages(conn, &sql, params![user_id, limit])
        })
    }

    /// Delete a message and every like that references it in one transaction.
    /// Returns false if no such message existed.
    pub fn delete_message(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM likes WHERE message_id = ?1", [id])?;
            let deleted = tx.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(deleted > 0)
        })
    }

    pub fn count_messages(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
            Ok(count)
        })
    }

    // -- Likes --

    /// Toggle a like: removes if exists, inserts if not.
    /// Returns true when the like was added.
    pub fn toggle_like(&self, user_id: i64, message_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND message_id = ?2",
                [user_id, message_id],
            )?;
            if removed == 0 {
                tx.execute(
                    "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2)",
                    [user_id, message_id],
                )?;
            }
            tx.commit()?;
            Ok(removed == 0)
        })
    }

    /// Has `user_id` liked `message_id`?
    pub fn is_liked_by(&self, message_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM likes WHERE message_id = ?1 AND user_id = ?2)",
                [message_id, user_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Messages liked by `user_id`, most recently liked first.
    pub fn liked_messages(&self, user_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{MESSAGE_SELECT}
                 JOIN likes l ON l.message_id = m.id
                 WHERE l.user_id = ?1
                 ORDER BY l.id DESC"
            );
            query_messages(conn, &sql, params![user_id])
        })
    }

    pub fn liked_message_ids(&self, user_id: i64) -> Result<HashSet<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT message_id FROM likes WHERE user_id = ?1")?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<HashSet<_>, _>>()?;
            Ok(ids)
        })
    }

    pub fn count_likes_for_message(&self, message_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE message_id = ?1",
                [message_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        image_url: row.get(4)?,
        header_image_url: row.get(5)?,
        bio: row.get(6)?,
        location: row.get(7)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        text: row.get(1)?,
        timestamp: row.get(2)?,
        user_id: row.get(3)?,
        author_username: row.get(4)?,
        author_image_url: row.get(5)?,
    })
}

fn fetch_user(conn: &Connection, id: i64) -> Result<UserRow> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1");
    Ok(conn.query_row(&sql, [id], user_from_row)?)
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1");
    conn.query_row(&sql, [id], user_from_row).optional()
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.username = ?1");
    conn.query_row(&sql, [username], user_from_row).optional()
}

fn fetch_message(conn: &Connection, id: i64) -> Result<MessageRow> {
    let sql = format!("{MESSAGE_SELECT} WHERE m.id = ?1");
    Ok(conn.query_row(&sql, [id], message_from_row)?)
}

fn query_messages(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn follow_exists(conn: &Connection, followed_id: i64, following_id: i64) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM follows WHERE user_being_followed_id = ?1 AND user_following_id = ?2
         )",
        [followed_id, following_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
