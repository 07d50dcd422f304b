use crate::domain::{Client, Meeting, Payment, Task};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Data access seam for the query tools and the entity resolver. All reads
/// are scoped to the authenticated user.
#[async_trait]
pub trait Store: Send + Sync {
    async fn clients(&self, user_id: &str) -> Result<Vec<Client>>;

    /// Case-insensitive substring match on client name.
    async fn search_clients(&self, user_id: &str, query: &str) -> Result<Vec<Client>>;

    async fn meeting_by_id(&self, user_id: &str, meeting_id: &str) -> Result<Option<Meeting>>;

    /// Meetings for a client on an exact date, most recently created first.
    /// The caller takes the head of the list, so the ordering is the
    /// tie-break policy when several meetings share a date.
    async fn meetings_for_client_on_date(
        &self,
        user_id: &str,
        client_id: &str,
        date: &str,
    ) -> Result<Vec<Meeting>>;

    async fn upcoming_meetings(&self, user_id: &str) -> Result<Vec<Meeting>>;

    async fn pending_tasks(&self, user_id: &str) -> Result<Vec<Task>>;

    async fn pending_payments(&self, user_id: &str) -> Result<Vec<Payment>>;
}

#[derive(Debug, Default)]
struct UserData {
    clients: Vec<Client>,
    meetings: Vec<Meeting>,
    tasks: Vec<Task>,
    payments: Vec<Payment>,
}

/// In-memory store used by tests and local development.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_client(&self, user_id: &str, client: Client) {
        let mut users = self.users.write().expect("memory store lock");
        users.entry(user_id.to_string()).or_default().clients.push(client);
    }

    pub fn insert_meeting(&self, user_id: &str, meeting: Meeting) {
        let mut users = self.users.write().expect("memory store lock");
        users.entry(user_id.to_string()).or_default().meetings.push(meeting);
    }

    pub fn insert_task(&self, user_id: &str, task: Task) {
        let mut users = self.users.write().expect("memory store lock");
        users.entry(user_id.to_string()).or_default().tasks.push(task);
    }

    pub fn insert_payment(&self, user_id: &str, payment: Payment) {
        let mut users = self.users.write().expect("memory store lock");
        users.entry(user_id.to_string()).or_default().payments.push(payment);
    }

    fn read<T>(&self, user_id: &str, f: impl FnOnce(&UserData) -> T, empty: T) -> T {
        let users = self.users.read().expect("memory store lock");
        match users.get(user_id) {
            Some(data) => f(data),
            None => empty,
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn clients(&self, user_id: &str) -> Result<Vec<Client>> {
        Ok(self.read(user_id, |d| d.clients.clone(), vec![]))
    }

    async fn search_clients(&self, user_id: &str, query: &str) -> Result<Vec<Client>> {
        let needle = query.to_lowercase();
        Ok(self.read(
            user_id,
            |d| {
                d.clients
                    .iter()
                    .filter(|c| c.name.to_lowercase().contains(&needle))
                    .cloned()
                    .collect()
            },
            vec![],
        ))
    }

    async fn meeting_by_id(&self, user_id: &str, meeting_id: &str) -> Result<Option<Meeting>> {
        Ok(self.read(
            user_id,
            |d| d.meetings.iter().find(|m| m.id == meeting_id).cloned(),
            None,
        ))
    }

    async fn meetings_for_client_on_date(
        &self,
        user_id: &str,
        client_id: &str,
        date: &str,
    ) -> Result<Vec<Meeting>> {
        let mut matches = self.read(
            user_id,
            |d| {
                d.meetings
                    .iter()
                    .filter(|m| m.client_id == client_id && m.date == date)
                    .cloned()
                    .collect::<Vec<_>>()
            },
            vec![],
        );
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    async fn upcoming_meetings(&self, user_id: &str) -> Result<Vec<Meeting>> {
        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let mut matches = self.read(
            user_id,
            |d| {
                d.meetings
                    .iter()
                    .filter(|m| m.date.as_str() >= today.as_str())
                    .cloned()
                    .collect::<Vec<_>>()
            },
            vec![],
        );
        matches.sort_by(|a, b| (a.date.as_str(), a.time.as_str()).cmp(&(b.date.as_str(), b.time.as_str())));
        Ok(matches)
    }

    async fn pending_tasks(&self, user_id: &str) -> Result<Vec<Task>> {
        Ok(self.read(user_id, |d| d.tasks.clone(), vec![]))
    }

    async fn pending_payments(&self, user_id: &str) -> Result<Vec<Payment>> {
        Ok(self.read(user_id, |d| d.payments.clone(), vec![]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn meeting(id: &str, client_id: &str, date: &str, minutes_ago: i64) -> Meeting {
        Meeting {
            id: id.to_string(),
            client_id: client_id.to_string(),
            client_name: "ACME".to_string(),
            contact_name: None,
            date: date.to_string(),
            time: "10:00".to_string(),
            meeting_type: "online".to_string(),
            notes: None,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn client_date_lookup_prefers_most_recently_created() {
        let store = MemoryStore::new();
        store.insert_meeting("u1", meeting("m-old", "c1", "2025-01-10", 60));
        store.insert_meeting("u1", meeting("m-new", "c1", "2025-01-10", 5));
        store.insert_meeting("u1", meeting("m-other-day", "c1", "2025-01-11", 1));

        let found = store
            .meetings_for_client_on_date("u1", "c1", "2025-01-10")
            .await
            .expect("lookup");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, "m-new");
    }

    #[tokio::test]
    async fn reads_are_scoped_to_the_user() {
        let store = MemoryStore::new();
        store.insert_meeting("u1", meeting("m1", "c1", "2025-01-10", 0));
        let other = store.meeting_by_id("u2", "m1").await.expect("lookup");
        assert!(other.is_none());
    }
}
