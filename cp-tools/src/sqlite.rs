use crate::domain::{Client, Meeting, Payment, Task};
use crate::error::{Result, ToolError};
use crate::store::Store;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};

/// SQLite-backed store. Connections are opened per call inside
/// `spawn_blocking` so the async runtime never blocks on disk I/O.
#[derive(Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        init_schema(&conn)?;
        Ok(Self { path })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&path)?;
            f(&conn)
        })
        .await
        .map_err(|e| ToolError::Storage(format!("blocking task join failed: {e}")))?
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS clients (
  id           TEXT PRIMARY KEY,
  user_id      TEXT NOT NULL,
  name         TEXT NOT NULL,
  contact_name TEXT,
  phone        TEXT,
  segment      TEXT,
  status       TEXT
);
CREATE TABLE IF NOT EXISTS meetings (
  id           TEXT PRIMARY KEY,
  user_id      TEXT NOT NULL,
  client_id    TEXT NOT NULL,
  date         TEXT NOT NULL,
  time         TEXT NOT NULL,
  meeting_type TEXT NOT NULL DEFAULT 'online',
  notes        TEXT,
  created_at   TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS tasks (
  id          TEXT PRIMARY KEY,
  user_id     TEXT NOT NULL,
  title       TEXT NOT NULL,
  description TEXT,
  client_id   TEXT,
  due_date    TEXT,
  priority    TEXT NOT NULL DEFAULT 'medium',
  status      TEXT NOT NULL DEFAULT 'pendente'
);
CREATE TABLE IF NOT EXISTS payments (
  id          TEXT PRIMARY KEY,
  user_id     TEXT NOT NULL,
  client_id   TEXT NOT NULL,
  amount      REAL NOT NULL,
  due_date    TEXT NOT NULL,
  description TEXT,
  status      TEXT NOT NULL DEFAULT 'pendente'
);
CREATE INDEX IF NOT EXISTS idx_clients_user ON clients(user_id);
CREATE INDEX IF NOT EXISTS idx_meetings_user_date ON meetings(user_id, date);
CREATE INDEX IF NOT EXISTS idx_tasks_user_status ON tasks(user_id, status);
CREATE INDEX IF NOT EXISTS idx_payments_user_status ON payments(user_id, status);
"#,
    )?;
    Ok(())
}

const MEETING_SELECT: &str = r#"
SELECT m.id, m.client_id, COALESCE(c.name, ''), c.contact_name,
       m.date, m.time, m.meeting_type, m.notes, m.created_at
  FROM meetings m
  LEFT JOIN clients c ON c.id = m.client_id AND c.user_id = m.user_id
"#;

fn row_to_client(row: &rusqlite::Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get(0)?,
        name: row.get(1)?,
        contact_name: row.get(2)?,
        phone: row.get(3)?,
        segment: row.get(4)?,
        status: row.get(5)?,
    })
}

fn row_to_meeting(row: &rusqlite::Row<'_>) -> rusqlite::Result<Meeting> {
    let created_at: String = row.get(8)?;
    Ok(Meeting {
        id: row.get(0)?,
        client_id: row.get(1)?,
        client_name: row.get(2)?,
        contact_name: row.get(3)?,
        date: row.get(4)?,
        time: row.get(5)?,
        meeting_type: row.get(6)?,
        notes: row.get(7)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

fn days_overdue(due_date: &str) -> i64 {
    let Ok(due) = NaiveDate::parse_from_str(due_date, "%Y-%m-%d") else {
        return 0;
    };
    let today = Utc::now().date_naive();
    (today - due).num_days().max(0)
}

#[async_trait]
impl Store for SqliteStore {
    async fn clients(&self, user_id: &str) -> Result<Vec<Client>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, name, contact_name, phone, segment, status
                   FROM clients WHERE user_id = ?1 ORDER BY name",
            )?;
            let rows = stmt.query_map(params![user_id], row_to_client)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn search_clients(&self, user_id: &str, query: &str) -> Result<Vec<Client>> {
        let user_id = user_id.to_string();
        let pattern = format!("%{}%", query.to_lowercase());
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, name, contact_name, phone, segment, status
                   FROM clients
                  WHERE user_id = ?1 AND LOWER(name) LIKE ?2
                  ORDER BY name",
            )?;
            let rows = stmt.query_map(params![user_id, pattern], row_to_client)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn meeting_by_id(&self, user_id: &str, meeting_id: &str) -> Result<Option<Meeting>> {
        let user_id = user_id.to_string();
        let meeting_id = meeting_id.to_string();
        self.with_conn(move |conn| {
            let sql = format!("{MEETING_SELECT} WHERE m.user_id = ?1 AND m.id = ?2 LIMIT 1");
            let mut stmt = conn.prepare_cached(&sql)?;
            let mut rows = stmt.query_map(params![user_id, meeting_id], row_to_meeting)?;
            Ok(rows.next().transpose()?)
        })
        .await
    }

    async fn meetings_for_client_on_date(
        &self,
        user_id: &str,
        client_id: &str,
        date: &str,
    ) -> Result<Vec<Meeting>> {
        let user_id = user_id.to_string();
        let client_id = client_id.to_string();
        let date = date.to_string();
        self.with_conn(move |conn| {
            // Most recently created first; the head of the list is the
            // tie-break winner when a client has several meetings on a date.
            let sql = format!(
                "{MEETING_SELECT}
                  WHERE m.user_id = ?1 AND m.client_id = ?2 AND m.date = ?3
                  ORDER BY m.created_at DESC"
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params![user_id, client_id, date], row_to_meeting)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn upcoming_meetings(&self, user_id: &str) -> Result<Vec<Meeting>> {
        let user_id = user_id.to_string();
        let today = Utc::now().format("%Y-%m-%d").to_string();
        self.with_conn(move |conn| {
            let sql = format!(
                "{MEETING_SELECT}
                  WHERE m.user_id = ?1 AND m.date >= ?2
                  ORDER BY m.date, m.time
                  LIMIT 20"
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params![user_id, today], row_to_meeting)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn pending_tasks(&self, user_id: &str) -> Result<Vec<Task>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT t.id, t.title, t.description, t.client_id, c.name, t.due_date, t.priority
                   FROM tasks t
                   LEFT JOIN clients c ON c.id = t.client_id AND c.user_id = t.user_id
                  WHERE t.user_id = ?1 AND t.status = 'pendente'
                  ORDER BY t.due_date IS NULL, t.due_date",
            )?;
            let rows = stmt.query_map(params![user_id], |row| {
                Ok(Task {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    client_id: row.get(3)?,
                    client_name: row.get(4)?,
                    due_date: row.get(5)?,
                    priority: row.get(6)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn pending_payments(&self, user_id: &str) -> Result<Vec<Payment>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT p.id, p.client_id, COALESCE(c.name, ''), p.amount, p.due_date, p.description
                   FROM payments p
                   LEFT JOIN clients c ON c.id = p.client_id AND c.user_id = p.user_id
                  WHERE p.user_id = ?1 AND p.status = 'pendente'
                  ORDER BY p.due_date",
            )?;
            let rows = stmt.query_map(params![user_id], |row| {
                let due_date: String = row.get(4)?;
                Ok(Payment {
                    id: row.get(0)?,
                    client_id: row.get(1)?,
                    client_name: row.get(2)?,
                    amount: row.get(3)?,
                    days_overdue: days_overdue(&due_date),
                    due_date,
                    description: row.get(5)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SqliteStore::open(dir.path().join("copiloto.db")).expect("open store");
        let conn = Connection::open(dir.path().join("copiloto.db")).expect("open conn");
        conn.execute_batch(
            r#"
INSERT INTO clients (id, user_id, name, contact_name, phone, segment, status)
VALUES ('c1', 'u1', 'ACME', 'Joana', '+5511999990000', 'varejo', 'ativo');
INSERT INTO meetings (id, user_id, client_id, date, time, meeting_type, created_at)
VALUES ('m1', 'u1', 'c1', '2025-01-10', '14:00', 'online', '2025-01-01T10:00:00Z'),
       ('m2', 'u1', 'c1', '2025-01-10', '16:00', 'online', '2025-01-02T10:00:00Z');
INSERT INTO payments (id, user_id, client_id, amount, due_date, status)
VALUES ('p1', 'u1', 'c1', 1500.0, '2020-01-01', 'pendente');
"#,
        )
        .expect("seed");
        (dir, store)
    }

    #[tokio::test]
    async fn meeting_lookup_joins_client_fields() {
        let (_dir, store) = seeded_store();
        let meeting = store
            .meeting_by_id("u1", "m1")
            .await
            .expect("query")
            .expect("meeting exists");
        assert_eq!(meeting.client_name, "ACME");
        assert_eq!(meeting.contact_name.as_deref(), Some("Joana"));
    }

    #[tokio::test]
    async fn client_date_lookup_orders_by_created_at_desc() {
        let (_dir, store) = seeded_store();
        let meetings = store
            .meetings_for_client_on_date("u1", "c1", "2025-01-10")
            .await
            .expect("query");
        assert_eq!(meetings.len(), 2);
        assert_eq!(meetings[0].id, "m2");
    }

    #[tokio::test]
    async fn overdue_payments_carry_days_overdue() {
        let (_dir, store) = seeded_store();
        let payments = store.pending_payments("u1").await.expect("query");
        assert_eq!(payments.len(), 1);
        assert!(payments[0].days_overdue > 0);
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let (_dir, store) = seeded_store();
        let found = store.search_clients("u1", "acme").await.expect("query");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "c1");
    }
}
