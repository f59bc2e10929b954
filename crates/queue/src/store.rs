//! Persistence of the single crawl-queue row.
//!
//! The row is seeded by the cache crate's migrations, so load never has to
//! deal with an absent row; sequence columns start NULL and fresh state is
//! the caller's default.

use exn::ResultExt;
use mirror_cache::Database;
use sqlx::SqlitePool;

use crate::error::{ErrorKind, Result};
use crate::sequence::SequenceState;

/// Queue state as it crosses the database boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedQueue {
    pub run_id: i64,
    pub active_index: usize,
    pub forums: Option<SequenceState>,
    pub groups: Option<SequenceState>,
    pub users: Option<SequenceState>,
    pub posts: Option<SequenceState>,
}

#[derive(sqlx::FromRow)]
struct QueueRow {
    run_id: i64,
    active_sequence_idx: i64,
    forums_state: Option<String>,
    groups_state: Option<String>,
    users_state: Option<String>,
    posts_state: Option<String>,
}

fn decode(column: Option<String>) -> Result<Option<SequenceState>> {
    column
        .map(|json| serde_json::from_str(&json).or_raise(|| ErrorKind::InvalidState("sequence json")))
        .transpose()
}

fn encode(state: &SequenceState) -> Result<String> {
    serde_json::to_string(state).or_raise(|| ErrorKind::InvalidState("sequence json"))
}

/// Store over the `scrape_queue` row.
#[derive(Debug, Clone)]
pub struct QueueStore {
    pool: SqlitePool,
}

impl QueueStore {
    pub fn new(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }

    pub async fn load(&self) -> Result<PersistedQueue> {
        let row: QueueRow = sqlx::query_as(
            "SELECT run_id, active_sequence_idx, forums_state, groups_state, users_state, posts_state \
             FROM scrape_queue WHERE id = 1",
        )
        .fetch_one(&self.pool)
        .await
        .or_raise(|| ErrorKind::Database)?;
        Ok(PersistedQueue {
            run_id: row.run_id,
            active_index: usize::try_from(row.active_sequence_idx)
                .or_raise(|| ErrorKind::InvalidState("active index"))?,
            forums: decode(row.forums_state)?,
            groups: decode(row.groups_state)?,
            users: decode(row.users_state)?,
            posts: decode(row.posts_state)?,
        })
    }

    pub async fn save(
        &self,
        run_id: i64,
        active_index: usize,
        forums: &SequenceState,
        groups: &SequenceState,
        users: &SequenceState,
        posts: &SequenceState,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE scrape_queue \
             SET run_id = ?, active_sequence_idx = ?, \
                 forums_state = ?, groups_state = ?, users_state = ?, posts_state = ? \
             WHERE id = 1",
        )
        .bind(run_id)
        .bind(active_index as i64)
        .bind(encode(forums)?)
        .bind(encode(groups)?)
        .bind(encode(users)?)
        .bind(encode(posts)?)
        .execute(&self.pool)
        .await
        .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mirror_cache::Database;

    use super::*;

    #[tokio::test]
    async fn fresh_database_loads_the_seeded_row() {
        let db = Database::connect_in_memory().await.unwrap();
        let store = QueueStore::new(&db);
        let state = store.load().await.unwrap();
        assert_eq!(state.run_id, 1);
        assert_eq!(state.active_index, 0);
        assert_eq!(state.forums, None);
        db.close().await;
    }

    #[tokio::test]
    async fn saved_state_loads_back_intact() {
        let db = Database::connect_in_memory().await.unwrap();
        let store = QueueStore::new(&db);
        let forums = SequenceState::Probe { current_id: 4, max_known_id: Some(12) };
        let groups = SequenceState::Probe { current_id: 0, max_known_id: None };
        let mut users = SequenceState::harvest();
        if let SequenceState::Harvest { ids, urls, .. } = &mut users {
            ids.push(7);
            urls.insert(7, "https://board.example/alice-u7/".to_string());
        }
        let posts = SequenceState::Probe { current_id: 678, max_known_id: Some(901) };

        store.save(3, 2, &forums, &groups, &users, &posts).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.run_id, 3);
        assert_eq!(loaded.active_index, 2);
        assert_eq!(loaded.forums, Some(forums));
        assert_eq!(loaded.groups, Some(groups));
        assert_eq!(loaded.users, Some(users));
        assert_eq!(loaded.posts, Some(posts));
        db.close().await;
    }
}
