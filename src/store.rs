//! A small observable state container with optional persistence.
//!
//! The store owns the only copy of its state. Readers get clones or
//! [`Computed`] projections, writers hand in a partial update that is merged
//! through [`Mergeable`]. Every change notifies subscribers synchronously and
//! is then written to the configured [`StorageBackend`], if any. Storage
//! problems are logged and otherwise ignored.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::PersistenceError;

pub const DEFAULT_STORAGE_KEY: &str = "app_state";

/// State that can absorb a partial update.
pub trait Mergeable {
    type Partial;

    /// Overwrites the fields present in `partial`, keeps the others.
    fn merge(&mut self, partial: Self::Partial);
}

/// A named slot holding serialized state.
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

/// One `<key>.json` file per slot inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StorageBackend for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let io_err = |source| PersistenceError::Io {
            key: key.to_string(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        std::fs::write(self.path(key), value).map_err(io_err)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.slots.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.slots.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Clone)]
pub struct StoreOptions {
    pub storage: Option<Arc<dyn StorageBackend>>,
    pub key: String,
}

impl StoreOptions {
    pub fn persisted(storage: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        Self {
            storage: Some(storage),
            key: key.into(),
        }
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            storage: None,
            key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type Subscribers<T> = Mutex<Vec<(u64, Callback<T>)>>;

struct StoreInner<T> {
    initial: T,
    state: RwLock<T>,
    /// Held for a whole merge, notify and persist cycle so changes land in order.
    /// Reentrant because a subscriber may call `set_state` again.
    changes: ReentrantMutex<()>,
    subscribers: Subscribers<T>,
    next_id: Mutex<u64>,
    options: StoreOptions,
}

pub struct Store<T> {
    inner: Arc<StoreInner<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Store<T>
where
    T: Mergeable + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Builds a store, layering any persisted state over `initial`.
    pub fn new(initial: T, options: StoreOptions) -> Self {
        let state = restore(&initial, &options);
        Self {
            inner: Arc::new(StoreInner {
                initial,
                state: RwLock::new(state),
                changes: ReentrantMutex::new(()),
                subscribers: Mutex::new(Vec::new()),
                next_id: Mutex::new(0),
                options,
            }),
        }
    }

    pub fn get_state(&self) -> T {
        self.inner.state.read().clone()
    }

    pub fn set_state(&self, partial: T::Partial) {
        let _change = self.inner.changes.lock();
        let snapshot = {
            let mut state = self.inner.state.write();
            state.merge(partial);
            state.clone()
        };
        self.changed(&snapshot);
    }

    /// Puts the initial state back, persisting it like any other change.
    pub fn reset(&self) {
        let _change = self.inner.changes.lock();
        let snapshot = {
            let mut state = self.inner.state.write();
            *state = self.inner.initial.clone();
            state.clone()
        };
        self.changed(&snapshot);
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut next_id = self.inner.next_id.lock();
            *next_id += 1;
            *next_id
        };
        let callback: Callback<T> = Arc::new(callback);
        self.inner.subscribers.lock().push((id, callback));
        Subscription {
            id,
            store: Arc::downgrade(&self.inner),
        }
    }

    /// A read-only view derived from the state, recomputed on every read.
    pub fn computed<U, F>(&self, projection: F) -> Computed<T, U>
    where
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        Computed {
            store: self.clone(),
            projection: Arc::new(projection),
        }
    }

    fn changed(&self, snapshot: &T) {
        // callbacks may read the store again, so no lock is held while they run
        let callbacks: Vec<Callback<T>> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback(snapshot);
        }

        if let Err(err) = persist(snapshot, &self.inner.options) {
            log::error!("failed to persist state: {err}");
        }
    }
}

fn persist<T: Serialize>(state: &T, options: &StoreOptions) -> Result<(), PersistenceError> {
    let Some(storage) = &options.storage else {
        return Ok(());
    };
    let data = serde_json::to_string(state).map_err(|source| PersistenceError::Serialize {
        key: options.key.clone(),
        source,
    })?;
    storage.write(&options.key, &data)
}

fn restore<T>(initial: &T, options: &StoreOptions) -> T
where
    T: Clone + Serialize + DeserializeOwned,
{
    match load_persisted(initial, options) {
        Ok(Some(state)) => state,
        Ok(None) => initial.clone(),
        Err(err) => {
            log::error!("failed to load persisted state: {err}");
            initial.clone()
        }
    }
}

/// Shallow merge of the persisted JSON object over the serialized default.
fn load_persisted<T>(initial: &T, options: &StoreOptions) -> Result<Option<T>, PersistenceError>
where
    T: Serialize + DeserializeOwned,
{
    let Some(storage) = &options.storage else {
        return Ok(None);
    };
    let Some(data) = storage.read(&options.key)? else {
        return Ok(None);
    };
    let serde_err = |source| PersistenceError::Serialize {
        key: options.key.clone(),
        source,
    };

    let persisted: Value = serde_json::from_str(&data).map_err(serde_err)?;
    let mut merged = serde_json::to_value(initial).map_err(serde_err)?;
    match (&mut merged, persisted) {
        (Value::Object(base), Value::Object(overrides)) => base.extend(overrides),
        (merged, persisted) => *merged = persisted,
    }
    serde_json::from_value(merged).map(Some).map_err(serde_err)
}

/// Handle returned by [`Store::subscribe`].
pub struct Subscription<T> {
    id: u64,
    store: Weak<StoreInner<T>>,
}

impl<T> Subscription<T> {
    pub fn unsubscribe(self) {
        if let Some(store) = self.store.upgrade() {
            store.subscribers.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

pub struct Computed<T, U> {
    store: Store<T>,
    projection: Arc<dyn Fn(&T) -> U + Send + Sync>,
}

impl<T, U> Clone for Computed<T, U> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            projection: self.projection.clone(),
        }
    }
}

impl<T, U> Computed<T, U> {
    pub fn get(&self) -> U {
        (self.projection)(&self.store.inner.state.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Counters {
        a: i32,
        b: i32,
    }

    #[derive(Default)]
    struct CountersPatch {
        a: Option<i32>,
        b: Option<i32>,
    }

    impl Mergeable for Counters {
        type Partial = CountersPatch;

        fn merge(&mut self, partial: CountersPatch) {
            if let Some(a) = partial.a {
                self.a = a;
            }
            if let Some(b) = partial.b {
                self.b = b;
            }
        }
    }

    fn set_a(a: i32) -> CountersPatch {
        CountersPatch {
            a: Some(a),
            ..Default::default()
        }
    }

    struct BrokenStorage;

    impl StorageBackend for BrokenStorage {
        fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
            Err(PersistenceError::Io {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }

        fn write(&self, key: &str, _value: &str) -> Result<(), PersistenceError> {
            self.read(key).map(|_| ())
        }
    }

    #[test]
    fn set_state_merges_without_dropping_keys() {
        let store = Store::new(Counters { a: 0, b: 7 }, StoreOptions::default());
        store.set_state(set_a(1));
        assert_eq!(store.get_state(), Counters { a: 1, b: 7 });
    }

    #[test]
    fn subscriber_fires_once_per_set_state() {
        let store = Store::new(Counters::default(), StoreOptions::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let _sub = store.subscribe(move |state: &Counters| {
            assert_eq!(state.a, 1);
            seen.fetch_add(1, Ordering::SeqCst);
        });
        store.set_state(set_a(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        store.set_state(set_a(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = Store::new(Counters::default(), StoreOptions::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let sub = store.subscribe(move |_: &Counters| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        store.set_state(set_a(1));
        sub.unsubscribe();
        store.set_state(set_a(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscriber_may_read_the_store() {
        let store = Store::new(Counters::default(), StoreOptions::default());
        let reader = store.clone();
        let _sub = store.subscribe(move |state: &Counters| {
            assert_eq!(&reader.get_state(), state);
        });
        store.set_state(set_a(3));
    }

    #[test]
    fn computed_follows_the_state() {
        let store = Store::new(Counters::default(), StoreOptions::default());
        let sum = store.computed(|s: &Counters| s.a + s.b);
        assert_eq!(sum.get(), 0);
        store.set_state(CountersPatch {
            a: Some(2),
            b: Some(5),
        });
        assert_eq!(sum.get(), 7);
    }

    #[test]
    fn state_survives_a_new_store() {
        let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::default());
        let store = Store::new(
            Counters::default(),
            StoreOptions::persisted(storage.clone(), "counters"),
        );
        store.set_state(set_a(4));

        let again = Store::new(
            Counters { a: 0, b: 9 },
            StoreOptions::persisted(storage, "counters"),
        );
        // persisted keys win over the new defaults
        assert_eq!(again.get_state(), Counters { a: 4, b: 0 });
    }

    #[test]
    fn partial_persisted_object_is_layered_over_defaults() {
        let storage = Arc::new(MemoryStorage::default());
        storage.write("counters", r#"{"b": 3}"#).expect("memory write");
        let store = Store::new(
            Counters { a: 1, b: 0 },
            StoreOptions::persisted(storage, "counters"),
        );
        assert_eq!(store.get_state(), Counters { a: 1, b: 3 });
    }

    #[test]
    fn corrupt_slot_falls_back_to_initial() {
        let storage = Arc::new(MemoryStorage::default());
        storage.write("counters", "{not json").expect("memory write");
        let store = Store::new(
            Counters { a: 1, b: 2 },
            StoreOptions::persisted(storage, "counters"),
        );
        assert_eq!(store.get_state(), Counters { a: 1, b: 2 });
    }

    #[test]
    fn broken_storage_keeps_working_in_memory() {
        let store = Store::new(
            Counters::default(),
            StoreOptions::persisted(Arc::new(BrokenStorage), "counters"),
        );
        store.set_state(set_a(5));
        assert_eq!(store.get_state().a, 5);
    }

    #[test]
    fn reset_restores_initial_state() {
        let storage = Arc::new(MemoryStorage::default());
        let store = Store::new(
            Counters { a: 1, b: 1 },
            StoreOptions::persisted(storage.clone(), "counters"),
        );
        store.set_state(set_a(8));
        store.reset();
        assert_eq!(store.get_state(), Counters { a: 1, b: 1 });
        assert_eq!(
            storage.read("counters").expect("memory read").as_deref(),
            Some(r#"{"a":1,"b":1}"#)
        );
    }

    #[test]
    fn concurrent_changes_notify_and_persist_in_order() {
        use std::sync::mpsc;
        use std::time::Duration;

        let storage = Arc::new(MemoryStorage::default());
        let store = Store::new(
            Counters::default(),
            StoreOptions::persisted(storage.clone(), "counters"),
        );

        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let entered_tx = Mutex::new(entered_tx);
        let release_rx = Mutex::new(release_rx);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let order = seen.clone();
        let _sub = store.subscribe(move |state: &Counters| {
            order.lock().push(state.a);
            if state.a == 1 {
                let _ = entered_tx.lock().send(());
                let _ = release_rx.lock().recv();
            }
        });

        let first = {
            let store = store.clone();
            std::thread::spawn(move || store.set_state(set_a(1)))
        };
        entered_rx.recv().expect("first change reaches its subscriber");

        let second = {
            let store = store.clone();
            std::thread::spawn(move || store.set_state(set_a(2)))
        };
        // give the second writer a chance to overtake the first one
        std::thread::sleep(Duration::from_millis(50));
        release_tx.send(()).expect("subscriber waiting");

        first.join().expect("first writer");
        second.join().expect("second writer");

        assert_eq!(*seen.lock(), vec![1, 2]);
        assert_eq!(store.get_state().a, 2);
        assert_eq!(
            storage.read("counters").expect("memory read").as_deref(),
            Some(r#"{"a":2,"b":0}"#)
        );
        let reopened = Store::new(
            Counters::default(),
            StoreOptions::persisted(storage, "counters"),
        );
        assert_eq!(reopened.get_state(), store.get_state());
    }

    #[test]
    fn subscriber_may_change_the_store_again() {
        let store = Store::new(Counters::default(), StoreOptions::default());
        let writer = store.clone();
        let _sub = store.subscribe(move |state: &Counters| {
            if state.a == 1 && state.b == 0 {
                writer.set_state(CountersPatch {
                    b: Some(10),
                    ..Default::default()
                });
            }
        });
        store.set_state(set_a(1));
        assert_eq!(store.get_state(), Counters { a: 1, b: 10 });
    }

    #[test]
    fn file_storage_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().join("nested"));
        assert_eq!(storage.read("slot").expect("missing slot is fine"), None);
        storage.write("slot", "{}").expect("write");
        assert_eq!(storage.read("slot").expect("read").as_deref(), Some("{}"));
    }
}
