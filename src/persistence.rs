//! Snapshot the store to disk and back
//!
//! The format is one csv line per entry: `key,value` for plain entries, or
//! `key,value,<rfc3339 timestamp>` when an expiry is armed. Keys and values
//! containing `,` or a newline cannot be represented and make SAVE fail.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::SystemTime;

use crate::store::{Entry, Store};

/// Render the live entries as csv. Already-expired entries are left out.
pub fn to_csv(store: &Store) -> io::Result<String> {
    let mut s = String::new();
    for (key, entry) in store.entries() {
        if has_delimiter(key) || has_delimiter(&entry.value) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("'{}' cannot be snapshotted: csv delimiter in key or value", key),
            ));
        }

        s.push_str(key);
        s.push(',');
        s.push_str(&entry.value);
        if let Some(at) = entry.expires_at {
            s.push(',');
            s.push_str(&humantime::format_rfc3339(at).to_string());
        }
        s.push('\n');
    }
    Ok(s)
}

/// Rebuild a store from csv. Entries whose deadline has already passed are
/// dropped instead of loaded.
pub fn from_csv(s: &str) -> io::Result<Store> {
    let mut store = Store::new();
    let now = SystemTime::now();

    for line in s.lines() {
        if line.is_empty() {
            continue;
        }
        let mut parts = line.splitn(3, ',');
        let key = parts
            .next()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| bad_line(line))?;
        let value = parts.next().ok_or_else(|| bad_line(line))?;
        let expires_at = match parts.next() {
            Some(stamp) => {
                Some(humantime::parse_rfc3339(stamp).map_err(|_| bad_line(line))?)
            }
            None => None,
        };

        if let Some(at) = expires_at {
            if at <= now {
                log::debug!("skipping expired snapshot entry '{}'", key);
                continue;
            }
        }
        store.insert_entry(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
    }
    Ok(store)
}

pub fn save(store: &Store, path: &Path) -> io::Result<()> {
    let csv = to_csv(store)?;
    let mut file = fs::File::create(path)?;
    file.write_all(csv.as_bytes())?;
    log::info!("snapshot written to {}", path.display());
    Ok(())
}

pub fn load(path: &Path) -> io::Result<Store> {
    let csv = fs::read_to_string(path)?;
    from_csv(&csv)
}

fn has_delimiter(s: &str) -> bool {
    s.contains(',') || s.contains('\n')
}

fn bad_line(line: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("malformed snapshot line: {:?}", line),
    )
}
