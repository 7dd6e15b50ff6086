use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tokio::sync::{broadcast, mpsc, oneshot};

pub const UNLOCKED_PATH: &str = "unlocked";
pub const USERS_PATH: &str = "users";
pub const MEDIA_PATH: &str = "media";

pub fn user_points_path(identity: &str) -> String {
    format!("{}/{}/points", USERS_PATH, identity)
}

pub fn media_path(question_id: u32) -> String {
    format!("{}/{}", MEDIA_PATH, question_id)
}

/// Pushed to every subscriber after a mutation. Carries the path that changed
/// and the value now stored there.
#[derive(Debug, Clone)]
pub struct StoreChange {
    pub path: String,
    pub value: Value,
}

#[derive(Debug)]
enum StoreCommand {
    Write {
        path: String,
        value: Value,
        respond_to: oneshot::Sender<()>,
    },
    AtomicIncrement {
        path: String,
        delta: i64,
        respond_to: oneshot::Sender<i64>,
    },
    Snapshot {
        path: String,
        respond_to: oneshot::Sender<Option<Value>>,
    },
    Subscribe {
        respond_to: oneshot::Sender<(Value, broadcast::Receiver<StoreChange>)>,
    },
}

/// Document store actor: a JSON tree behind an mpsc command channel. Writes
/// are last-writer-wins at the field level; increments are read-modify-write
/// serialized by the actor, so concurrent awards never lose updates.
struct DocumentStoreActor {
    receiver: mpsc::Receiver<StoreCommand>,
    root: Value,
    change_tx: broadcast::Sender<StoreChange>,
}

impl DocumentStoreActor {
    fn new(receiver: mpsc::Receiver<StoreCommand>, change_tx: broadcast::Sender<StoreChange>) -> Self {
        let mut root = Map::new();
        root.insert(UNLOCKED_PATH.to_string(), Value::Array(Vec::new()));
        root.insert(USERS_PATH.to_string(), Value::Object(Map::new()));
        root.insert(MEDIA_PATH.to_string(), Value::Object(Map::new()));

        DocumentStoreActor {
            receiver,
            root: Value::Object(root),
            change_tx,
        }
    }

    fn handle_command(&mut self, cmd: StoreCommand) {
        match cmd {
            StoreCommand::Write {
                path,
                value,
                respond_to,
            } => {
                tracing::debug!(store.path = %path, "Store write");
                set_at_path(&mut self.root, &path, value.clone());
                let _ = respond_to.send(());
                // Receivers may lag or be gone; push is best-effort.
                let _ = self.change_tx.send(StoreChange { path, value });
            }
            StoreCommand::AtomicIncrement {
                path,
                delta,
                respond_to,
            } => {
                let current = get_at_path(&self.root, &path)
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                let new_total = current + delta;
                tracing::debug!(
                    store.path = %path,
                    store.delta = delta,
                    store.total = new_total,
                    "Store atomic increment"
                );
                set_at_path(&mut self.root, &path, Value::from(new_total));
                let _ = respond_to.send(new_total);
                let _ = self.change_tx.send(StoreChange {
                    path,
                    value: Value::from(new_total),
                });
            }
            StoreCommand::Snapshot { path, respond_to } => {
                let _ = respond_to.send(get_at_path(&self.root, &path).cloned());
            }
            StoreCommand::Subscribe { respond_to } => {
                let _ = respond_to.send((self.root.clone(), self.change_tx.subscribe()));
            }
        }
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn get_at_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for segment in split_path(path) {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

fn set_at_path(root: &mut Value, path: &str, value: Value) {
    let segments: Vec<&str> = split_path(path).collect();
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for segment in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return,
        };
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        map.insert(last.to_string(), value);
    }
}

async fn run_store_actor(mut actor: DocumentStoreActor) {
    tracing::info!("Document store actor started");
    while let Some(cmd) = actor.receiver.recv().await {
        actor.handle_command(cmd);
    }
    tracing::info!("Document store actor stopped");
}

#[derive(Clone, Debug)]
pub struct StoreHandle {
    sender: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    pub fn spawn(buffer_size: usize) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (change_tx, _) = broadcast::channel(128);
        let actor = DocumentStoreActor::new(receiver, change_tx);
        tokio::spawn(run_store_actor(actor));
        Self { sender }
    }

    /// Path-scoped set, last-writer-wins.
    pub async fn write(&self, path: impl Into<String>, value: Value) -> Result<(), String> {
        let (respond_to, rx) = oneshot::channel();
        self.sender
            .send(StoreCommand::Write {
                path: path.into(),
                value,
                respond_to,
            })
            .await
            .map_err(|e| format!("Failed to send Write: {}", e))?;
        rx.await.map_err(|e| format!("Store no response: {}", e))
    }

    /// Transactional increment. Returns the new total.
    pub async fn atomic_increment(
        &self,
        path: impl Into<String>,
        delta: i64,
    ) -> Result<i64, String> {
        let (respond_to, rx) = oneshot::channel();
        self.sender
            .send(StoreCommand::AtomicIncrement {
                path: path.into(),
                delta,
                respond_to,
            })
            .await
            .map_err(|e| format!("Failed to send AtomicIncrement: {}", e))?;
        rx.await.map_err(|e| format!("Store no response: {}", e))
    }

    pub async fn snapshot(&self, path: impl Into<String>) -> Option<Value> {
        let (respond_to, rx) = oneshot::channel();
        if self
            .sender
            .send(StoreCommand::Snapshot {
                path: path.into(),
                respond_to,
            })
            .await
            .is_err()
        {
            return None;
        }
        rx.await.ok().flatten()
    }

    /// Synchronous snapshot plus async push. Unsubscribe by dropping the
    /// receiver.
    pub async fn subscribe(&self) -> Result<(Value, broadcast::Receiver<StoreChange>), String> {
        let (respond_to, rx) = oneshot::channel();
        self.sender
            .send(StoreCommand::Subscribe { respond_to })
            .await
            .map_err(|e| format!("Failed to send Subscribe: {}", e))?;
        rx.await.map_err(|e| format!("Store no response: {}", e))
    }

    pub async fn unlocked_ids(&self) -> BTreeSet<u32> {
        self.snapshot(UNLOCKED_PATH)
            .await
            .map(|v| unlocked_ids_from_value(&v))
            .unwrap_or_default()
    }

    pub async fn write_unlocked_ids(&self, ids: &BTreeSet<u32>) -> Result<(), String> {
        let value = Value::Array(ids.iter().map(|&id| Value::from(id)).collect());
        self.write(UNLOCKED_PATH, value).await
    }
}

/// Decodes the `unlocked` array. Non-numeric entries are dropped silently,
/// matching the swallow-and-default policy for malformed persisted state.
pub fn unlocked_ids_from_value(value: &Value) -> BTreeSet<u32> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_u64().map(|id| id as u32))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_then_snapshot() {
        let store = StoreHandle::spawn(32);
        store.write("media/4", json!("https://example.com")).await.unwrap();

        let value = store.snapshot("media/4").await;
        assert_eq!(value, Some(json!("https://example.com")));

        let media = store.snapshot(MEDIA_PATH).await.unwrap();
        assert_eq!(media, json!({ "4": "https://example.com" }));
    }

    #[tokio::test]
    async fn test_snapshot_missing_path() {
        let store = StoreHandle::spawn(32);
        assert_eq!(store.snapshot("users/nobody/points").await, None);
    }

    #[tokio::test]
    async fn test_write_is_last_writer_wins() {
        let store = StoreHandle::spawn(32);
        store.write("media/1", json!("first")).await.unwrap();
        store.write("media/1", json!("second")).await.unwrap();

        assert_eq!(store.snapshot("media/1").await, Some(json!("second")));
    }

    #[tokio::test]
    async fn test_increment_starts_from_zero() {
        let store = StoreHandle::spawn(32);
        let total = store
            .atomic_increment(user_points_path("alice"), 10)
            .await
            .unwrap();
        assert_eq!(total, 10);
    }

    #[tokio::test]
    async fn test_concurrent_increments_lose_no_updates() {
        let store = StoreHandle::spawn(32);
        store
            .write(user_points_path("alice"), json!(50))
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..5 {
                    store
                        .atomic_increment(user_points_path("alice"), 10)
                        .await
                        .unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let total = store.snapshot(user_points_path("alice")).await.unwrap();
        assert_eq!(total, json!(50 + 20 * 5 * 10));
    }

    #[tokio::test]
    async fn test_subscribe_receives_changes() {
        let store = StoreHandle::spawn(32);
        let (snapshot, mut changes) = store.subscribe().await.unwrap();
        assert_eq!(snapshot["unlocked"], json!([]));

        let ids: BTreeSet<u32> = [1, 3].into_iter().collect();
        store.write_unlocked_ids(&ids).await.unwrap();

        let change = changes.recv().await.unwrap();
        assert_eq!(change.path, UNLOCKED_PATH);
        assert_eq!(unlocked_ids_from_value(&change.value), ids);
    }

    #[test]
    fn test_unlocked_ids_from_value_drops_garbage() {
        let ids = unlocked_ids_from_value(&json!([1, "two", 3, null]));
        assert_eq!(ids, [1, 3].into_iter().collect());

        assert!(unlocked_ids_from_value(&json!({ "not": "an array" })).is_empty());
    }
}
