//! Record store: the sheet-like backing for certificate records.
//!
//! The store holds rows in insertion order, exactly like the worksheet it
//! models. Two implementations are provided: a JSON-file store for the running
//! application and an in-memory store for tests and demos. Code assignment
//! lives here because the store owns the history the next code is derived
//! from.

use crate::error::{CoaError, CoaResult};
use crate::record::CertificateRecord;
use coa_types::CertificateCode;
use std::fs;
use std::path::{Path, PathBuf};

/// Operations exposed by a certificate record store.
///
/// `update_at` addresses rows by 0-based position within `fetch_all` order.
pub trait RecordStore: Send + Sync {
    fn fetch_all(&self) -> CoaResult<Vec<CertificateRecord>>;

    fn fetch_by_code(&self, code: &str) -> CoaResult<Option<CertificateRecord>> {
        Ok(self
            .fetch_all()?
            .into_iter()
            .find(|record| record.code() == code))
    }

    fn append(&self, record: CertificateRecord) -> CoaResult<()>;

    fn update_at(&self, position: usize, record: CertificateRecord) -> CoaResult<()>;

    /// The next sequential code for the given year.
    fn next_code(&self, year: i32) -> CoaResult<CertificateCode> {
        let records = self.fetch_all()?;
        let last = records
            .iter()
            .rev()
            .map(|record| record.code())
            .find(|code| !code.trim().is_empty() && code.contains('-'));
        Ok(next_code_after(last, year))
    }
}

/// Derives the code that follows `last` for `year`.
///
/// The sequence resets to `0001` on year rollover; a missing or malformed
/// history also resets. Parsing here is deliberately lenient about zero
/// padding so that hand-edited history still advances instead of silently
/// restarting mid-year.
pub fn next_code_after(last: Option<&str>, year: i32) -> CertificateCode {
    let Some(last) = last else {
        return CertificateCode::first_of_year(year);
    };

    let Some((seq, yr)) = last.trim().split_once('-') else {
        return CertificateCode::first_of_year(year);
    };
    if seq.is_empty() || yr.is_empty() {
        return CertificateCode::first_of_year(year);
    }
    if !seq.bytes().all(|b| b.is_ascii_digit()) || !yr.bytes().all(|b| b.is_ascii_digit()) {
        return CertificateCode::first_of_year(year);
    }

    let (Ok(sequence), Ok(last_year)) = (seq.parse::<u32>(), yr.parse::<i32>()) else {
        return CertificateCode::first_of_year(year);
    };

    if last_year != year {
        CertificateCode::first_of_year(year)
    } else {
        CertificateCode::new(sequence + 1, year)
    }
}

/// Record store persisted as a JSON array-of-objects file.
///
/// Every operation re-reads the file, so external edits are picked up on the
/// next call; writes go through a sibling temp file and a rename so a crashed
/// writer never leaves a truncated store behind.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Opens a store backed by `records.json` under `data_dir`, creating the
    /// directory if needed.
    pub fn open(data_dir: &Path) -> CoaResult<Self> {
        fs::create_dir_all(data_dir).map_err(CoaError::DataDirCreation)?;
        Ok(Self {
            path: data_dir.join("records.json"),
        })
    }

    fn read_rows(&self) -> CoaResult<Vec<CertificateRecord>> {
        if !self.path.is_file() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path).map_err(CoaError::FileRead)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&contents).map_err(CoaError::Deserialization)
    }

    fn write_rows(&self, rows: &[CertificateRecord]) -> CoaResult<()> {
        let contents = serde_json::to_string_pretty(rows).map_err(CoaError::Serialization)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents).map_err(CoaError::FileWrite)?;
        fs::rename(&tmp, &self.path).map_err(CoaError::FileWrite)?;
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    fn fetch_all(&self) -> CoaResult<Vec<CertificateRecord>> {
        self.read_rows()
    }

    fn append(&self, record: CertificateRecord) -> CoaResult<()> {
        let mut rows = self.read_rows()?;
        rows.push(record);
        self.write_rows(&rows)
    }

    fn update_at(&self, position: usize, record: CertificateRecord) -> CoaResult<()> {
        let mut rows = self.read_rows()?;
        let slot = rows
            .get_mut(position)
            .ok_or(CoaError::PositionOutOfRange(position))?;
        *slot = record;
        self.write_rows(&rows)
    }
}

/// In-memory record store for tests and demos.
#[derive(Default)]
pub struct MemoryStore {
    rows: std::sync::Mutex<Vec<CertificateRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn fetch_all(&self) -> CoaResult<Vec<CertificateRecord>> {
        Ok(self.rows.lock().expect("store lock poisoned").clone())
    }

    fn append(&self, record: CertificateRecord) -> CoaResult<()> {
        self.rows.lock().expect("store lock poisoned").push(record);
        Ok(())
    }

    fn update_at(&self, position: usize, record: CertificateRecord) -> CoaResult<()> {
        let mut rows = self.rows.lock().expect("store lock poisoned");
        let slot = rows
            .get_mut(position)
            .ok_or(CoaError::PositionOutOfRange(position))?;
        *slot = record;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record_with_code(code: &str) -> CertificateRecord {
        CertificateRecord::from_fields([("CODIGO", code)])
    }

    #[test]
    fn test_next_code_same_year_increments() {
        assert_eq!(
            next_code_after(Some("0007-2025"), 2025).to_string(),
            "0008-2025"
        );
    }

    #[test]
    fn test_next_code_year_rollover_resets() {
        assert_eq!(
            next_code_after(Some("0007-2024"), 2025).to_string(),
            "0001-2025"
        );
    }

    #[test]
    fn test_next_code_without_history() {
        assert_eq!(next_code_after(None, 2025).to_string(), "0001-2025");
    }

    #[test]
    fn test_next_code_malformed_history_resets() {
        for bad in ["", "borrador", "7/2025", "x007-2025", "0007-"] {
            assert_eq!(
                next_code_after(Some(bad), 2025).to_string(),
                "0001-2025",
                "history {bad:?}"
            );
        }
    }

    #[test]
    fn test_store_next_code_uses_last_code_row() {
        let store = MemoryStore::new();
        store.append(record_with_code("0001-2025")).unwrap();
        store.append(record_with_code("0002-2025")).unwrap();
        // Trailing row without a code is skipped, like a half-filled sheet row.
        store.append(record_with_code("")).unwrap();
        assert_eq!(store.next_code(2025).unwrap().to_string(), "0003-2025");
    }

    #[test]
    fn test_json_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        assert!(store.fetch_all().unwrap().is_empty());
        store.append(record_with_code("0001-2025")).unwrap();
        store.append(record_with_code("0002-2025")).unwrap();

        let rows = store.fetch_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].code(), "0002-2025");

        let found = store.fetch_by_code("0001-2025").unwrap();
        assert!(found.is_some());
        assert!(store.fetch_by_code("9999-1999").unwrap().is_none());
    }

    #[test]
    fn test_json_store_update_at() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.append(record_with_code("0001-2025")).unwrap();

        let mut updated = record_with_code("0001-2025");
        updated.set("CONCLUSION", "APROBADO");
        store.update_at(0, updated).unwrap();

        let rows = store.fetch_all().unwrap();
        assert_eq!(rows[0].get("CONCLUSION"), "APROBADO");

        let err = store.update_at(5, record_with_code("0009-2025"));
        assert!(matches!(err, Err(CoaError::PositionOutOfRange(5))));
    }
}
