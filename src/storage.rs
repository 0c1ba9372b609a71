use crate::errors::StoreError;
use crate::models::{Entry, UpsertOutcome};
use crate::remote::{Remote, Revision};
use chrono::NaiveDate;
use tracing::info;

/// The diary collection plus the revision it was read at.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub entries: Vec<Entry>,
    pub revision: Option<Revision>,
}

/// Read-modify-write access to the diary document.
///
/// Every operation fetches the whole document. Writes replace the whole
/// document and are conditional on the revision read by the same operation.
pub struct DiaryStore {
    remote: Remote,
}

impl DiaryStore {
    pub fn new(remote: Remote) -> Self {
        Self { remote }
    }

    pub fn describe(&self) -> String {
        self.remote.describe()
    }

    pub async fn load(&self) -> Result<Vec<Entry>, StoreError> {
        Ok(self.snapshot().await?.entries)
    }

    pub async fn snapshot(&self) -> Result<Snapshot, StoreError> {
        let document = self.remote.fetch().await?;
        Ok(Snapshot {
            entries: parse_entries(&document.bytes)?,
            revision: Some(document.revision),
        })
    }

    /// Like `snapshot`, but an absent document reads as an empty diary.
    async fn snapshot_or_empty(&self) -> Result<Snapshot, StoreError> {
        match self.snapshot().await {
            Err(StoreError::NotFound) => Ok(Snapshot {
                entries: Vec::new(),
                revision: None,
            }),
            other => other,
        }
    }

    pub async fn get_by_date(&self, date: NaiveDate) -> Result<Option<Entry>, StoreError> {
        Ok(self.load().await?.into_iter().find(|entry| entry.date == date))
    }

    pub async fn upsert(&self, entry: Entry) -> Result<UpsertOutcome, StoreError> {
        let Snapshot {
            mut entries,
            revision,
        } = self.snapshot_or_empty().await?;

        let date = entry.date;
        let outcome = upsert_entry(&mut entries, entry);
        let message = format!("Update diary entry {date}");
        self.write(&entries, revision.as_ref(), &message).await?;

        info!(%date, ?outcome, "saved diary entry");
        Ok(outcome)
    }

    /// Replaces the whole document, creating it when absent.
    pub async fn replace_all(
        &self,
        entries: &[Entry],
        message: &str,
    ) -> Result<Revision, StoreError> {
        let current = self.remote_revision().await?;
        let revision = self.write(entries, current.as_ref(), message).await?;
        info!(entries = entries.len(), %revision, "replaced diary document");
        Ok(revision)
    }

    async fn remote_revision(&self) -> Result<Option<Revision>, StoreError> {
        match self.remote.fetch().await {
            Ok(document) => Ok(Some(document.revision)),
            Err(StoreError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn write(
        &self,
        entries: &[Entry],
        expected: Option<&Revision>,
        message: &str,
    ) -> Result<Revision, StoreError> {
        let payload = serde_json::to_vec_pretty(entries)?;
        self.remote.put(payload, expected, message).await
    }
}

pub fn parse_entries(bytes: &[u8]) -> Result<Vec<Entry>, StoreError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Replaces the entry with the same date wholesale, or appends it.
pub fn upsert_entry(entries: &mut Vec<Entry>, entry: Entry) -> UpsertOutcome {
    match entries.iter_mut().find(|existing| existing.date == entry.date) {
        Some(existing) => {
            *existing = entry;
            UpsertOutcome::Updated
        }
        None => {
            entries.push(entry);
            UpsertOutcome::Created
        }
    }
}

/// First date that appears more than once, if any.
pub fn duplicate_date(entries: &[Entry]) -> Option<NaiveDate> {
    let mut seen = std::collections::HashSet::new();
    entries
        .iter()
        .map(|entry| entry.date)
        .find(|date| !seen.insert(*date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::LocalFile;
    use crate::tags::{Activity, Mood, Weather};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
    }

    fn file_store() -> (DiaryStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = DiaryStore::new(Remote::File(LocalFile::new(dir.path().join("diary.json"))));
        (store, dir)
    }

    #[test]
    fn upsert_replaces_every_field() {
        let mut old = Entry::new(day(1), "first draft", 2);
        old.memo = "keep?".into();
        old.mood = Mood::Sad;
        old.activities.insert(Activity::Reading);
        let mut entries = vec![old, Entry::new(day(2), "other", 4)];

        let replacement = Entry::new(day(1), "rewritten", 5);
        assert_eq!(
            upsert_entry(&mut entries, replacement.clone()),
            UpsertOutcome::Updated
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], replacement);
        assert!(entries[0].memo.is_empty());
        assert!(entries[0].activities.is_empty());
        assert_eq!(entries[0].mood, Mood::Unset);
    }

    #[test]
    fn upsert_appends_new_dates() {
        let mut entries = vec![Entry::new(day(1), "a", 3)];
        assert_eq!(
            upsert_entry(&mut entries, Entry::new(day(3), "b", 3)),
            UpsertOutcome::Created
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(duplicate_date(&entries), None);
    }

    #[test]
    fn duplicate_date_finds_repeats() {
        let entries = vec![
            Entry::new(day(1), "a", 3),
            Entry::new(day(2), "b", 3),
            Entry::new(day(1), "c", 3),
        ];
        assert_eq!(duplicate_date(&entries), Some(day(1)));
    }

    #[tokio::test]
    async fn store_creates_then_updates_document() {
        let (store, _dir) = file_store();
        assert!(matches!(store.load().await, Err(StoreError::NotFound)));

        let mut entry = Entry::new(day(5), "rainy walk", 4);
        entry.weather = Weather::Rain;
        assert_eq!(store.upsert(entry.clone()).await.unwrap(), UpsertOutcome::Created);

        entry.content = "rainy walk, then tea".into();
        assert_eq!(store.upsert(entry.clone()).await.unwrap(), UpsertOutcome::Updated);

        let entries = store.load().await.unwrap();
        assert_eq!(entries, vec![entry.clone()]);
        assert_eq!(store.get_by_date(day(5)).await.unwrap(), Some(entry));
        assert_eq!(store.get_by_date(day(6)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn replace_all_overwrites_document() {
        let (store, _dir) = file_store();
        store.upsert(Entry::new(day(1), "old", 1)).await.unwrap();

        let restored = vec![Entry::new(day(2), "new", 5), Entry::new(day(3), "newer", 4)];
        store.replace_all(&restored, "Restore").await.unwrap();
        assert_eq!(store.load().await.unwrap(), restored);

        store.replace_all(&[], "Clear").await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }
}
