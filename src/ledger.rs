// src/ledger.rs

//! Install ledger
//!
//! The ledger records which programs are installed, when they were built and
//! from which snapshot. An entry exists only for programs that were fully
//! built, linked and verified. Every mutation is written straight to disk
//! through [`atomic_write_file`], so a crash leaves either the old or the
//! new ledger.
//!
//! On disk the ledger is a YAML mapping kept in insertion order:
//!
//! ```yaml
//! ag:
//!   date: 2026-01-02T10:11:12Z
//!   hash: 0.30.0
//! ```

use crate::error::Result;
use crate::filesystem::atomic_write_file;
use crate::recipe::Recipe;
use chrono::{DateTime, Local, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One installed program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// When the install was registered
    pub date: DateTime<Utc>,
    /// Repository hash or version the program was built from
    pub hash: String,
}

impl LedgerEntry {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            date: Utc::now(),
            hash: hash.into(),
        }
    }

    /// Local build time for listings
    pub fn date_display(&self) -> String {
        self.date
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

/// Entries in insertion order, serialized as a mapping
#[derive(Debug, Clone, Default, PartialEq)]
struct Entries(Vec<(String, LedgerEntry)>);

impl Serialize for Entries {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, entry) in &self.0 {
            map.serialize_entry(name, entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Entries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = Entries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of program names to install records")
            }

            fn visit_unit<E: serde::de::Error>(self) -> std::result::Result<Entries, E> {
                Ok(Entries::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Entries, A::Error> {
                let mut entries: Vec<(String, LedgerEntry)> = Vec::new();
                while let Some((name, entry)) = access.next_entry::<String, LedgerEntry>()? {
                    match entries.iter_mut().find(|(n, _)| *n == name) {
                        Some(slot) => slot.1 = entry,
                        None => entries.push((name, entry)),
                    }
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_any(EntriesVisitor)
    }
}

/// The persisted record of installed programs
///
/// One instance is opened at startup and shared by every task. There is no
/// locking: two processes working on the same prefix is unsupported.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: Entries,
}

impl Ledger {
    /// Open the ledger at `path`, starting empty if the file does not exist
    pub fn open(path: &Path) -> Result<Self> {
        let entries = match fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => Entries::default(),
            Ok(content) => serde_yaml::from_str(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No ledger at {}, starting empty", path.display());
                Entries::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&LedgerEntry> {
        self.entries
            .0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, entry)| entry)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Record `recipe` as installed from its current hash
    pub fn add(&mut self, recipe: &dyn Recipe) -> Result<()> {
        let hash = recipe.cur_hash()?;
        info!("Registering {} at {}", recipe.name(), hash);
        self.restore(recipe.name(), LedgerEntry::new(hash))
    }

    /// Put back a previously removed entry unchanged
    pub fn restore(&mut self, name: &str, entry: LedgerEntry) -> Result<()> {
        let mut next = self.entries.clone();
        match next.0.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = entry,
            None => next.0.push((name.to_string(), entry)),
        }
        self.commit(next)
    }

    /// Drop `name` from the ledger, returning its entry
    pub fn remove(&mut self, name: &str) -> Result<Option<LedgerEntry>> {
        let Some(pos) = self.entries.0.iter().position(|(n, _)| n == name) else {
            return Ok(None);
        };
        let mut next = self.entries.clone();
        let (_, entry) = next.0.remove(pos);
        self.commit(next)?;
        Ok(Some(entry))
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LedgerEntry)> {
        self.entries.0.iter().map(|(n, e)| (n.as_str(), e))
    }

    /// Installed program names in insertion order
    pub fn names(&self) -> Vec<String> {
        self.entries.0.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.0.is_empty()
    }

    /// Write `next` to disk and only then adopt it in memory
    fn commit(&mut self, next: Entries) -> Result<()> {
        let content = serde_yaml::to_string(&next)?;
        atomic_write_file(&self.path, content.as_bytes())?;
        self.entries = next;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = (&'a str, &'a LedgerEntry);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
