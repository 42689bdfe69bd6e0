use sqlx::{Sqlite, prelude::FromRow};

use crate::Error;

/// A row of the `sessions` table.
///
/// `expires` and `created_at` are epoch milliseconds; `data` is the JSON
/// encoded [`crate::Session`].
#[derive(Clone, FromRow, Debug, PartialEq)]
pub struct SessionRecord {
    pub sid: String,
    pub expires: i64,
    pub data: String,
    pub created_at: i64,
}

impl SessionRecord {
    /// Loads the payload of a session that has not expired at `now`.
    pub async fn try_get_live_data(
        sid: &str,
        now: i64,
        executor: impl sqlx::Executor<'_, Database = Sqlite>,
    ) -> Result<Option<String>, Error> {
        let data = sqlx::query_scalar::<_, String>(
            r#"select data from sessions where sid = ? and expires > ?"#,
        )
        .bind(sid)
        .bind(now)
        .fetch_optional(executor)
        .await?;

        Ok(data)
    }

    /// Loads a row regardless of its expiry.
    pub async fn try_get(
        sid: &str,
        executor: impl sqlx::Executor<'_, Database = Sqlite>,
    ) -> Result<Option<SessionRecord>, Error> {
        let record = sqlx::query_as::<_, SessionRecord>(
            r#"select sid, expires, data, created_at from sessions where sid = ?"#,
        )
        .bind(sid)
        .fetch_optional(executor)
        .await?;

        Ok(record)
    }

    /// Inserts a row, or replaces `expires` and `data` of the existing row
    /// with the same sid. `created_at` is only written on insert.
    pub async fn upsert(
        sid: &str,
        expires: i64,
        data: &str,
        now: i64,
        executor: impl sqlx::Executor<'_, Database = Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            insert into sessions (sid, expires, data, created_at)
            values (?, ?, ?, ?)
            on conflict (sid) do update set
                expires = excluded.expires,
                data = excluded.data
            "#,
        )
        .bind(sid)
        .bind(expires)
        .bind(data)
        .bind(now)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Moves the expiry of an existing row. Returns the number of rows touched.
    pub async fn update_expires(
        sid: &str,
        expires: i64,
        executor: impl sqlx::Executor<'_, Database = Sqlite>,
    ) -> Result<u64, Error> {
        let result = sqlx::query(r#"update sessions set expires = ? where sid = ?"#)
            .bind(expires)
            .bind(sid)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(
        sid: &str,
        executor: impl sqlx::Executor<'_, Database = Sqlite>,
    ) -> Result<u64, Error> {
        let result = sqlx::query(r#"delete from sessions where sid = ?"#)
            .bind(sid)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_all(
        executor: impl sqlx::Executor<'_, Database = Sqlite>,
    ) -> Result<u64, Error> {
        let result = sqlx::query(r#"delete from sessions"#)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deletes every row whose expiry lies strictly before `now`.
    pub async fn delete_expired(
        now: i64,
        executor: impl sqlx::Executor<'_, Database = Sqlite>,
    ) -> Result<u64, Error> {
        let result = sqlx::query(r#"delete from sessions where expires < ?"#)
            .bind(now)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Counts all rows, expired or not.
    pub async fn count(
        executor: impl sqlx::Executor<'_, Database = Sqlite>,
    ) -> Result<u64, Error> {
        let count = sqlx::query_scalar::<_, i64>(r#"select count(*) from sessions"#)
            .fetch_one(executor)
            .await?;

        Ok(count.unsigned_abs())
    }

    /// Counts the rows that have not expired at `now`.
    pub async fn count_live(
        now: i64,
        executor: impl sqlx::Executor<'_, Database = Sqlite>,
    ) -> Result<u64, Error> {
        let count =
            sqlx::query_scalar::<_, i64>(r#"select count(*) from sessions where expires > ?"#)
                .bind(now)
                .fetch_one(executor)
                .await?;

        Ok(count.unsigned_abs())
    }

    /// Loads every row that has not expired at `now`, ordered by sid.
    pub async fn load_live(
        now: i64,
        executor: impl sqlx::Executor<'_, Database = Sqlite>,
    ) -> Result<Vec<SessionRecord>, Error> {
        let records = sqlx::query_as::<_, SessionRecord>(
            r#"
            select sid, expires, data, created_at from sessions
            where expires > ?
            order by sid
            "#,
        )
        .bind(now)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }
}
