//! Link store backed by the embedded redb database
//!
//! Each mutating operation runs in a single write transaction. redb admits
//! one writer at a time, so the code check and the write that follows it in
//! [`LinkStore::insert`] and [`LinkStore::update`] cannot interleave with
//! another writer. A [`StoreError::CodeConflict`] from those methods is the
//! authoritative "code taken" signal; lookups done before the write are only
//! an early exit.

use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};

use crate::database::{TABLE_CODES, TABLE_LINKS, TABLE_OWNER_INDEX};
use crate::error::StoreError;
use crate::model::Link;

/// Handle to the link tables. Cloning is cheap.
#[derive(Clone)]
pub struct LinkStore {
    db: Arc<Database>,
}

fn decode(record: &str) -> Result<Link, StoreError> {
    Ok(serde_json::from_str::<Link>(record)?)
}

impl LinkStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Inserts a new link, claiming its short code.
    ///
    /// Fails with [`StoreError::CodeConflict`] if any link already holds the code.
    pub fn insert(&self, link: &Link) -> Result<(), StoreError> {
        let record = serde_json::to_string(link)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut codes = write_txn.open_table(TABLE_CODES)?;
            if codes.get(link.short_code.as_str())?.is_some() {
                return Err(StoreError::CodeConflict(link.short_code.clone()));
            }
            codes.insert(link.short_code.as_str(), link.id.as_str())?;

            let mut links = write_txn.open_table(TABLE_LINKS)?;
            links.insert(link.id.as_str(), record.as_str())?;

            let mut owners = write_txn.open_table(TABLE_OWNER_INDEX)?;
            owners.insert(
                (
                    link.owner_id.as_str(),
                    link.created_at.timestamp_micros(),
                    link.id.as_str(),
                ),
                link.id.as_str(),
            )?;
        }
        write_txn.commit()?;

        Ok(())
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Link>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let links = read_txn.open_table(TABLE_LINKS)?;

        let link = match links.get(id)? {
            Some(guard) => Some(decode(guard.value())?),
            None => None,
        };
        Ok(link)
    }

    pub fn get_by_code(&self, code: &str) -> Result<Option<Link>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let codes = read_txn.open_table(TABLE_CODES)?;

        let id = match codes.get(code)? {
            Some(guard) => guard.value().to_string(),
            None => return Ok(None),
        };

        let links = read_txn.open_table(TABLE_LINKS)?;
        let link = match links.get(id.as_str())? {
            Some(guard) => Some(decode(guard.value())?),
            None => None,
        };
        Ok(link)
    }

    /// Returns true when some link currently holds `code`
    pub fn code_exists(&self, code: &str) -> Result<bool, StoreError> {
        let read_txn = self.db.begin_read()?;
        let codes = read_txn.open_table(TABLE_CODES)?;

        let exists = codes.get(code)?.is_some();
        Ok(exists)
    }

    /// Looks up the link holding `code`, ignoring the link `exclude_id`
    pub fn find_by_code_excluding(
        &self,
        code: &str,
        exclude_id: &str,
    ) -> Result<Option<Link>, StoreError> {
        Ok(self.get_by_code(code)?.filter(|link| link.id != exclude_id))
    }

    /// Replaces the stored record with `link`, moving its code claim if the
    /// code changed.
    ///
    /// Returns `Ok(false)` if no link with `link.id` exists.
    pub fn update(&self, link: &Link) -> Result<bool, StoreError> {
        let record = serde_json::to_string(link)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut links = write_txn.open_table(TABLE_LINKS)?;
            let previous = match links.get(link.id.as_str())? {
                Some(guard) => decode(guard.value())?,
                None => return Ok(false),
            };

            if previous.short_code != link.short_code {
                let mut codes = write_txn.open_table(TABLE_CODES)?;
                let holder = codes
                    .get(link.short_code.as_str())?
                    .map(|guard| guard.value().to_string());
                if matches!(holder, Some(ref holder) if holder != &link.id) {
                    return Err(StoreError::CodeConflict(link.short_code.clone()));
                }
                codes.remove(previous.short_code.as_str())?;
                codes.insert(link.short_code.as_str(), link.id.as_str())?;
            }

            links.insert(link.id.as_str(), record.as_str())?;
        }
        write_txn.commit()?;

        Ok(true)
    }

    /// Deletes a link and releases its code.
    ///
    /// Returns `Ok(false)` if no link with `id` exists.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut links = write_txn.open_table(TABLE_LINKS)?;
            let removed = links.remove(id)?.map(|guard| guard.value().to_string());
            let Some(record) = removed else {
                return Ok(false);
            };
            let link = decode(&record)?;

            let mut codes = write_txn.open_table(TABLE_CODES)?;
            codes.remove(link.short_code.as_str())?;

            let mut owners = write_txn.open_table(TABLE_OWNER_INDEX)?;
            owners.remove((
                link.owner_id.as_str(),
                link.created_at.timestamp_micros(),
                link.id.as_str(),
            ))?;
        }
        write_txn.commit()?;

        Ok(true)
    }

    /// Lists one owner's links, newest first
    pub fn list_by_owner(
        &self,
        owner_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Link>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(TABLE_OWNER_INDEX)?;
        let links = read_txn.open_table(TABLE_LINKS)?;

        let mut ids = Vec::new();
        for entry in index
            .range((owner_id, i64::MIN, "")..(owner_id, i64::MAX, ""))?
            .rev()
            .skip(offset)
            .take(limit)
        {
            let (_, value) = entry?;
            ids.push(value.value().to_string());
        }

        let mut result = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(guard) = links.get(id.as_str())? {
                result.push(decode(guard.value())?);
            }
        }
        Ok(result)
    }
}
