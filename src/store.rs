// Copyright 2023 Remi Bernotavicius

//! Client-side state. The session lives in memory only and must be re-verified against the
//! backend after every start, the meal filter and the notification bookmark survive restarts.

use crate::api::models::{RoomTypeId, UserRole, UserSession};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub const MEAL_FILTER_KEY: &str = "meal-filter-storage";
pub const NOTIFICATION_LAST_SEEN_KEY: &str = "notification-last-seen";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("couldn't access stored value: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored value is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A key-value store kept as one JSON document per key inside the data directory.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(key), serde_json::to_string_pretty(value)?)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.get(key) {
            Ok(value) => value.unwrap_or_default(),
            Err(error) => {
                log::warn!("ignoring stored {key:?}: {error}");
                T::default()
            }
        }
    }

    fn store<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(error) = self.set(key, value) {
            log::warn!("failed to persist {key:?}: {error}");
        }
    }
}

#[derive(Default, Debug)]
pub struct SessionStore {
    user: Option<UserSession>,
}

impl SessionStore {
    pub fn set(&mut self, user: UserSession) {
        log::debug!("session established for {}", user.username);
        self.user = Some(user);
    }

    pub fn clear(&mut self) {
        self.user = None;
    }

    pub fn user(&self) -> Option<&UserSession> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn role(&self) -> Option<UserRole> {
        self.user.as_ref().map(|u| u.role)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MealFilter {
    pub date: NaiveDate,
    pub room_type: Option<RoomTypeId>,
}

impl Default for MealFilter {
    fn default() -> Self {
        Self {
            date: chrono::Local::now().date_naive(),
            room_type: None,
        }
    }
}

/// Date and room-type selection shared by the dashboard and the notification panel.
pub struct MealFilterStore {
    storage: LocalStorage,
    filter: MealFilter,
}

impl MealFilterStore {
    pub fn load(storage: LocalStorage) -> Self {
        let filter = storage.load_or_default(MEAL_FILTER_KEY);
        Self { storage, filter }
    }

    pub fn date(&self) -> NaiveDate {
        self.filter.date
    }

    pub fn room_type(&self) -> Option<RoomTypeId> {
        self.filter.room_type
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.filter.date = date;
        self.storage.store(MEAL_FILTER_KEY, &self.filter);
    }

    pub fn set_room_type(&mut self, room_type: Option<RoomTypeId>) {
        self.filter.room_type = room_type;
        self.storage.store(MEAL_FILTER_KEY, &self.filter);
    }

    pub fn clear(&mut self) {
        self.filter = MealFilter::default();
        if let Err(error) = self.storage.remove(MEAL_FILTER_KEY) {
            log::warn!("failed to clear meal filter: {error}");
        }
    }
}

/// When the notification panel was last opened.
pub struct NotificationBookmark {
    storage: LocalStorage,
    last_seen: Option<DateTime<Utc>>,
}

impl NotificationBookmark {
    pub fn load(storage: LocalStorage) -> Self {
        let last_seen = storage.load_or_default(NOTIFICATION_LAST_SEEN_KEY);
        Self { storage, last_seen }
    }

    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_seen
    }

    pub fn mark_seen(&mut self, now: DateTime<Utc>) {
        self.last_seen = Some(now);
        self.storage.store(NOTIFICATION_LAST_SEEN_KEY, &now);
    }
}

#[test]
fn meal_filter_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path());

    let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let mut store = MealFilterStore::load(storage.clone());
    assert_eq!(store.room_type(), None);
    store.set_date(date);
    store.set_room_type(Some(RoomTypeId(3)));

    let reloaded = MealFilterStore::load(storage.clone());
    assert_eq!(reloaded.date(), date);
    assert_eq!(reloaded.room_type(), Some(RoomTypeId(3)));

    let stored: serde_json::Value = storage.get(MEAL_FILTER_KEY).unwrap().unwrap();
    assert_eq!(
        stored,
        serde_json::json!({"date": "2025-03-01", "roomType": 3})
    );
}

#[test]
fn cleared_meal_filter_starts_unfiltered() {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path());

    let mut store = MealFilterStore::load(storage.clone());
    store.set_room_type(Some(RoomTypeId(1)));
    store.clear();
    assert_eq!(store.room_type(), None);

    let reloaded = MealFilterStore::load(storage.clone());
    assert_eq!(reloaded.room_type(), None);
    assert_eq!(storage.get::<MealFilter>(MEAL_FILTER_KEY).unwrap(), None);
}

#[test]
fn malformed_meal_filter_falls_back_to_default() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("meal-filter-storage.json"), "{not json").unwrap();

    let store = MealFilterStore::load(LocalStorage::new(dir.path()));
    assert_eq!(store.room_type(), None);
}

#[test]
fn notification_bookmark_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path());

    let mut bookmark = NotificationBookmark::load(storage.clone());
    assert_eq!(bookmark.last_seen(), None);

    let now = "2025-03-01T08:30:00Z".parse::<DateTime<Utc>>().unwrap();
    bookmark.mark_seen(now);
    assert_eq!(NotificationBookmark::load(storage).last_seen(), Some(now));
}

#[test]
fn session_is_cleared() {
    let mut session = SessionStore::default();
    session.set(UserSession {
        user_id: crate::api::models::UserId(1),
        username: "gizi01".into(),
        name: "Dewi".into(),
        role: UserRole::Nutritionist,
    });
    assert!(session.is_authenticated());
    assert_eq!(session.role(), Some(UserRole::Nutritionist));

    session.clear();
    assert!(!session.is_authenticated());
    assert!(session.user().is_none());
}
