use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::config::DatabaseLocation;
use crate::database::{FriendRepository, NewUser, User, UserRepository};
use crate::err::DbError;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        age INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS friendships (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        friend_id INTEGER NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE,
        FOREIGN KEY (friend_id) REFERENCES users (id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_friendships_user_id ON friendships (user_id);
";

/// Pooled SQLite storage. Cloning shares the pool.
#[derive(Clone)]
pub struct SqliteDatabase {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteDatabase {
    pub fn open(location: &DatabaseLocation, pool_size: u32) -> Result<Self, DbError> {
        match location {
            DatabaseLocation::Memory => Self::open_in_memory(),
            DatabaseLocation::File(path) => {
                Self::with_manager(SqliteConnectionManager::file(path), pool_size)
            }
        }
    }

    /// Every in-memory connection is its own database, so the pool is capped
    /// at one connection and that connection is never recycled.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::with_manager(SqliteConnectionManager::memory(), 1)
    }

    fn with_manager(manager: SqliteConnectionManager, pool_size: u32) -> Result<Self, DbError> {
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager.with_init(|c| {
                c.pragma_update(None, "foreign_keys", "ON")?;
                c.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
                c.pragma_update(None, "synchronous", "NORMAL")?;
                Ok(())
            }))?;

        // Create the tables if they don't exist
        let conn = pool.get()?;
        conn.execute_batch(SCHEMA)?;
        tracing::info!("SQLite schema ready");

        Ok(SqliteDatabase { pool })
    }

    /// Checkpoints the write-ahead log so nothing is left in the `-wal` file
    /// once the pool is dropped.
    pub async fn close(self) -> Result<(), DbError> {
        self.run(|conn| {
            conn.query_row("PRAGMA wal_checkpoint(TRUNCATE);", [], |_| Ok(()))?;
            Ok(())
        })
        .await?;
        tracing::info!("SQLite connection closed");
        Ok(())
    }

    /// Runs `f` on a pooled connection on the blocking thread pool.
    async fn run<T, F>(&self, f: F) -> Result<T, DbError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, DbError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut *conn)
        })
        .await?
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
    })
}

#[async_trait]
impl UserRepository for SqliteDatabase {
    async fn list_users(&self) -> Result<Vec<User>, DbError> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, age FROM users;")?;
            let users = stmt
                .query_map([], user_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
        .await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DbError> {
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO users (name, age) VALUES (?1, ?2);",
                params![user.name(), user.age()],
            )?;
            let id = conn.last_insert_rowid();
            tracing::debug!(id, "user created");
            Ok(user.with_id(id))
        })
        .await
    }

    async fn get_user(&self, id: i64) -> Result<User, DbError> {
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, name, age FROM users WHERE id = ?1;",
                params![id],
                user_from_row,
            )
            .optional()?
            .ok_or(DbError::NotFound("User"))
        })
        .await
    }

    async fn update_user(&self, id: i64, user: NewUser) -> Result<User, DbError> {
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE users SET name = ?1, age = ?2 WHERE id = ?3;",
                params![user.name(), user.age(), id],
            )?;
            if changed == 0 {
                return Err(DbError::NotFound("User"));
            }
            Ok(user.with_id(id))
        })
        .await
    }

    async fn delete_user(&self, id: i64) -> Result<(), DbError> {
        self.run(move |conn| {
            let changed = conn.execute("DELETE FROM users WHERE id = ?1;", params![id])?;
            if changed == 0 {
                return Err(DbError::NotFound("User"));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl FriendRepository for SqliteDatabase {
    async fn add_friend(&self, user_id: i64, friend_id: i64) -> Result<i64, DbError> {
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO friendships (user_id, friend_id) VALUES (?1, ?2);",
                params![user_id, friend_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn list_friends(&self, user_id: i64) -> Result<Vec<User>, DbError> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT users.id, users.name, users.age
                 FROM users
                 JOIN friendships ON users.id = friendships.friend_id
                 WHERE friendships.user_id = ?1;",
            )?;
            let friends = stmt
                .query_map(params![user_id], user_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(friends)
        })
        .await
    }

    async fn replace_friends(&self, user_id: i64, friend_ids: Vec<i64>) -> Result<(), DbError> {
        self.run(move |conn| {
            // Dropping `tx` on an early return rolls back the delete as well.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let removed = tx.execute(
                "DELETE FROM friendships WHERE user_id = ?1;",
                params![user_id],
            )?;
            {
                let mut insert =
                    tx.prepare("INSERT INTO friendships (user_id, friend_id) VALUES (?1, ?2);")?;
                for friend_id in &friend_ids {
                    insert.execute(params![user_id, friend_id])?;
                }
            }
            tx.commit()?;
            tracing::debug!(
                user_id,
                removed,
                inserted = friend_ids.len(),
                "friends replaced"
            );
            Ok(())
        })
        .await
    }

    async fn remove_friend(&self, user_id: i64, friend_id: i64) -> Result<(), DbError> {
        self.run(move |conn| {
            let changed = conn.execute(
                "DELETE FROM friendships WHERE user_id = ?1 AND friend_id = ?2;",
                params![user_id, friend_id],
            )?;
            if changed == 0 {
                return Err(DbError::NotFound("Friend"));
            }
            Ok(())
        })
        .await
    }
}
