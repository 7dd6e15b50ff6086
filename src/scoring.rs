use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::store::{StoreHandle, USERS_PATH, user_points_path};

/// Identity sentinel for users who never picked a nickname. Earns no shared
/// leaderboard credit; such points live only on the user's own device.
pub const GUEST_IDENTITY: &str = "guest";
/// The admin identity is likewise excluded from leaderboard credit.
pub const ADMIN_IDENTITY: &str = "admin";

const RECENT_AWARDS_KEPT: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct RecentAward {
    pub identity: String,
    pub points: i64,
    pub awarded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub identity: String,
    pub points: i64,
}

/// Accumulates points per identity against the document store. Increments go
/// through the store's transactional primitive, never read-then-write, so
/// two devices awarding the same identity concurrently lose nothing.
pub struct ScoreLedger {
    store: StoreHandle,
    recent: RwLock<Vec<RecentAward>>,
}

impl ScoreLedger {
    pub fn new(store: StoreHandle) -> Self {
        Self {
            store,
            recent: RwLock::new(Vec::new()),
        }
    }

    /// Awards `points` to `identity` and returns the new total, or `None`
    /// when the identity is a sentinel (guest/admin) and nothing is written.
    #[tracing::instrument(skip(self))]
    pub async fn award(&self, identity: &str, points: i64) -> Result<Option<i64>, String> {
        if identity == GUEST_IDENTITY || identity == ADMIN_IDENTITY {
            tracing::debug!(
                user.identity = %identity,
                "Sentinel identity, skipping award"
            );
            return Ok(None);
        }

        let total = self
            .store
            .atomic_increment(user_points_path(identity), points)
            .await?;

        tracing::info!(
            user.identity = %identity,
            award.points = points,
            user.total = total,
            "Awarded points"
        );

        let mut recent = self.recent.write().await;
        recent.insert(
            0,
            RecentAward {
                identity: identity.to_string(),
                points,
                awarded_at: Utc::now(),
            },
        );
        recent.truncate(RECENT_AWARDS_KEPT);

        Ok(Some(total))
    }

    /// Every identity's total, sorted descending and truncated to `limit`.
    /// The sort is stable, so ties keep the store's key order.
    pub async fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let users = match self.store.snapshot(USERS_PATH).await {
            Some(value) => value,
            None => return Vec::new(),
        };

        let mut entries: Vec<LeaderboardEntry> = users
            .as_object()
            .map(|map| {
                map.iter()
                    .filter_map(|(identity, record)| {
                        record.get("points").and_then(|p| p.as_i64()).map(|points| {
                            LeaderboardEntry {
                                identity: identity.clone(),
                                points,
                            }
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        entries.sort_by(|a, b| b.points.cmp(&a.points));
        entries.truncate(limit);
        entries
    }

    pub async fn recent_awards(&self) -> Vec<RecentAward> {
        self.recent.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_award_accumulates() {
        let ledger = ScoreLedger::new(StoreHandle::spawn(32));

        assert_eq!(ledger.award("alice", 10).await.unwrap(), Some(10));
        assert_eq!(ledger.award("alice", 10).await.unwrap(), Some(20));
        assert_eq!(ledger.award("bob", 10).await.unwrap(), Some(10));
    }

    #[tokio::test]
    async fn test_sentinel_identities_are_no_ops() {
        let store = StoreHandle::spawn(32);
        let ledger = ScoreLedger::new(store.clone());

        assert_eq!(ledger.award(GUEST_IDENTITY, 10).await.unwrap(), None);
        assert_eq!(ledger.award(ADMIN_IDENTITY, 10).await.unwrap(), None);

        assert_eq!(store.snapshot(user_points_path(GUEST_IDENTITY)).await, None);
        assert!(ledger.leaderboard(10).await.is_empty());
        assert!(ledger.recent_awards().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_awards_lose_no_updates() {
        let ledger = std::sync::Arc::new(ScoreLedger::new(StoreHandle::spawn(32)));
        ledger.award("alice", 30).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let ledger = ledger.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..10 {
                    ledger.award("alice", 10).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let board = ledger.leaderboard(10).await;
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].points, 30 + 10 * 10 * 10);
    }

    #[tokio::test]
    async fn test_leaderboard_sorts_descending_and_truncates() {
        let ledger = ScoreLedger::new(StoreHandle::spawn(32));
        ledger.award("carol", 30).await.unwrap();
        ledger.award("alice", 10).await.unwrap();
        ledger.award("bob", 20).await.unwrap();
        ledger.award("dave", 10).await.unwrap();

        let board = ledger.leaderboard(3).await;
        assert_eq!(board.len(), 3);
        assert_eq!(board[0].identity, "carol");
        assert_eq!(board[1].identity, "bob");
        // alice and dave tie at 10; stable sort keeps store key order.
        assert_eq!(board[2].identity, "alice");
    }

    #[tokio::test]
    async fn test_recent_awards_newest_first_and_capped() {
        let ledger = ScoreLedger::new(StoreHandle::spawn(32));
        for i in 0..15 {
            ledger.award(&format!("user{}", i), 10).await.unwrap();
        }

        let recent = ledger.recent_awards().await;
        assert_eq!(recent.len(), RECENT_AWARDS_KEPT);
        assert_eq!(recent[0].identity, "user14");
        assert_eq!(recent[9].identity, "user5");
    }
}
