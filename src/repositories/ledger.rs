use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use thiserror::Error;

use crate::models::signup_models::{NewSignup, RegisterOutcome, SignupRecord, LEDGER_HEADER};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Ledger row could not be read or written: {0}")]
    Csv(#[from] csv::Error),
    #[error("Ledger is full ({size} bytes, limit {limit} bytes)")]
    CapacityExceeded { size: u64, limit: u64 },
    #[error("Ledger lock poisoned")]
    LockPoisoned,
    #[error("{email} is already in the ledger")]
    Duplicate { email: String },
}

/// Append-only store of waitlist signups.
///
/// `register` is the only entry point the intake handler uses: the duplicate
/// check and the append run inside one critical section so two submissions of
/// the same email can never both be written.
pub trait SignupLedger: Send + Sync {
    /// Case-insensitive lookup of an email among stored rows.
    fn exists(&self, email: &str) -> Result<bool, LedgerError>;

    /// Appends a record and returns its position. Rejects an email already
    /// present with `LedgerError::Duplicate`.
    fn append(&self, record: &SignupRecord) -> Result<u64, LedgerError>;

    /// Number of stored records, header excluded.
    fn count(&self) -> Result<u64, LedgerError>;

    fn register(&self, signup: NewSignup, at: DateTime<Utc>) -> Result<RegisterOutcome, LedgerError>;
}

/// CSV file ledger.
///
/// Writers are serialized twice: a mutex for threads of this process and an
/// exclusive `flock` on `<ledger>.lock` for other processes sharing the file.
pub struct CsvLedger {
    path: PathBuf,
    lock_path: PathBuf,
    max_bytes: u64,
    guard: Mutex<()>,
}

struct Scan {
    count: u64,
    found: bool,
}

impl CsvLedger {
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64) -> Self {
        let path = path.into();
        let mut lock_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Self {
            path,
            lock_path,
            max_bytes,
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Runs `f` while holding both the in-process and the cross-process lock.
    fn with_lock<T>(&self, f: impl FnOnce() -> Result<T, LedgerError>) -> Result<T, LedgerError> {
        let _held = self.guard.lock().map_err(|_| LedgerError::LockPoisoned)?;
        self.ensure_parent()?;
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;
        lock_file.lock_exclusive()?;
        let result = f();
        if let Err(e) = FileExt::unlock(&lock_file) {
            tracing::warn!("Failed to release ledger lock {}: {}", self.lock_path.display(), e);
        }
        result
    }

    fn ensure_parent(&self) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    fn current_size(&self) -> Result<u64, LedgerError> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn scan(&self, email: Option<&str>) -> Result<Scan, LedgerError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Scan { count: 0, found: false })
            }
            Err(e) => return Err(e.into()),
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(BufReader::new(file));
        let mut scan = Scan { count: 0, found: false };
        for row in reader.records() {
            let row = row?;
            scan.count += 1;
            if let (Some(wanted), Some(stored)) = (email, row.get(0)) {
                if stored.trim().eq_ignore_ascii_case(wanted) {
                    scan.found = true;
                }
            }
        }
        Ok(scan)
    }

    fn check_capacity(&self) -> Result<(), LedgerError> {
        let size = self.current_size()?;
        if size >= self.max_bytes {
            return Err(LedgerError::CapacityExceeded { size, limit: self.max_bytes });
        }
        Ok(())
    }

    /// Writes header (for a new file) and row with a single `write_all`.
    ///
    /// A file whose last row lacks its newline gets one first, and a failed
    /// write is truncated back to the previous length so no partial row stays.
    fn write_row(&self, record: &SignupRecord) -> Result<(), LedgerError> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        let prev_len = file.metadata()?.len();

        let mut bytes = Vec::new();
        if prev_len > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::Start(prev_len - 1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                tracing::warn!("Ledger {} did not end on a row boundary, closing the last row", self.path.display());
                bytes.push(b'\n');
            }
        }
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(bytes);
        if prev_len == 0 {
            writer.write_record(LEDGER_HEADER)?;
        }
        writer.serialize(record)?;
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;

        if let Err(e) = file.write_all(&bytes).and_then(|_| file.sync_data()) {
            if let Err(undo) = file.set_len(prev_len) {
                tracing::error!("Failed to roll back partial ledger write in {}: {}", self.path.display(), undo);
            }
            return Err(e.into());
        }
        Ok(())
    }
}

impl SignupLedger for CsvLedger {
    fn exists(&self, email: &str) -> Result<bool, LedgerError> {
        self.with_lock(|| Ok(self.scan(Some(email))?.found))
    }

    fn append(&self, record: &SignupRecord) -> Result<u64, LedgerError> {
        self.with_lock(|| {
            let scan = self.scan(Some(&record.email))?;
            if scan.found {
                return Err(LedgerError::Duplicate { email: record.email.clone() });
            }
            self.check_capacity()?;
            self.write_row(record)?;
            Ok(scan.count + 1)
        })
    }

    fn count(&self) -> Result<u64, LedgerError> {
        self.with_lock(|| Ok(self.scan(None)?.count))
    }

    fn register(&self, signup: NewSignup, at: DateTime<Utc>) -> Result<RegisterOutcome, LedgerError> {
        self.with_lock(|| {
            let scan = self.scan(Some(&signup.email))?;
            if scan.found {
                return Ok(RegisterOutcome::AlreadyExists);
            }
            self.check_capacity()?;
            let record = SignupRecord::new(signup, at);
            self.write_row(&record)?;
            Ok(RegisterOutcome::Appended { record, position: scan.count + 1 })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::signup_models::UNKNOWN_ADDRESS;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn signup(email: &str) -> NewSignup {
        NewSignup {
            email: email.to_string(),
            source: "website".to_string(),
            client_address: UNKNOWN_ADDRESS.to_string(),
            agent_string: "test-agent".to_string(),
        }
    }

    fn ledger_in(dir: &TempDir) -> CsvLedger {
        CsvLedger::new(dir.path().join("nested").join("waitlist.csv"), 10 * 1024 * 1024)
    }

    #[test]
    fn test_first_register_creates_file_with_header() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);
        let outcome = ledger.register(signup("first@example.com"), Utc::now()).unwrap();
        assert!(matches!(outcome, RegisterOutcome::Appended { position: 1, .. }));

        let contents = fs::read_to_string(ledger.path()).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("email,timestamp,source,ip_address,user_agent"));
        assert!(lines.next().unwrap().starts_with("first@example.com,"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_positions_increase_and_duplicates_are_skipped() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);
        ledger.register(signup("a@example.com"), Utc::now()).unwrap();
        let second = ledger.register(signup("b@example.com"), Utc::now()).unwrap();
        assert!(matches!(second, RegisterOutcome::Appended { position: 2, .. }));

        let again = ledger.register(signup("A@Example.com"), Utc::now()).unwrap();
        assert_eq!(again, RegisterOutcome::AlreadyExists);
        assert_eq!(ledger.count().unwrap(), 2);
        assert!(ledger.exists("b@example.com").unwrap());
        assert!(!ledger.exists("c@example.com").unwrap());
    }

    #[test]
    fn test_fields_with_delimiters_are_quoted() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);
        let mut entry = signup("quote@example.com");
        entry.source = "ad, \"spring\"".to_string();
        entry.agent_string = "Mozilla/5.0 (X11; Linux, x86_64)".to_string();
        ledger.register(entry, Utc::now()).unwrap();

        let mut reader = csv::Reader::from_path(ledger.path()).unwrap();
        let rows: Vec<SignupRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source, "ad, \"spring\"");
        assert_eq!(rows[0].agent_string, "Mozilla/5.0 (X11; Linux, x86_64)");
    }

    #[test]
    fn test_full_ledger_rejects_new_rows_but_still_reports_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("waitlist.csv");
        let ledger = CsvLedger::new(&path, 64);
        ledger.register(signup("early@example.com"), Utc::now()).unwrap();
        let padded = ledger.register(signup("padding-padding-padding@example.com"), Utc::now());
        assert!(matches!(padded, Err(LedgerError::CapacityExceeded { limit: 64, .. })));

        let before = fs::read(&path).unwrap();
        let dup = ledger.register(signup("early@example.com"), Utc::now()).unwrap();
        assert_eq!(dup, RegisterOutcome::AlreadyExists);
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_append_returns_position_and_rejects_duplicates() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);
        let record = SignupRecord::new(signup("direct@example.com"), Utc::now());
        assert_eq!(ledger.append(&record).unwrap(), 1);

        let mut shouty = record.clone();
        shouty.email = "DIRECT@example.com".to_string();
        assert!(matches!(ledger.append(&record), Err(LedgerError::Duplicate { .. })));
        assert!(matches!(ledger.append(&shouty), Err(LedgerError::Duplicate { .. })));
        assert_eq!(ledger.count().unwrap(), 1);

        let other = SignupRecord::new(signup("other@example.com"), Utc::now());
        assert_eq!(ledger.append(&other).unwrap(), 2);
    }

    #[test]
    fn test_row_after_unterminated_last_line_stays_separate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("waitlist.csv");
        fs::write(
            &path,
            "email,timestamp,source,ip_address,user_agent\nold@example.com,2026-01-01T00:00:00Z,web",
        )
        .unwrap();
        let ledger = CsvLedger::new(&path, 10 * 1024 * 1024);

        let outcome = ledger.register(signup("new@example.com"), Utc::now()).unwrap();
        assert!(matches!(outcome, RegisterOutcome::Appended { position: 2, .. }));
        assert!(ledger.exists("new@example.com").unwrap());
        assert!(ledger.exists("old@example.com").unwrap());

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "old@example.com,2026-01-01T00:00:00Z,web");
        assert!(lines[2].starts_with("new@example.com,"));
        assert!(contents.ends_with('\n'));
    }

    fn seed_exact(path: &Path, len: usize) -> Vec<u8> {
        let mut seeded = b"email,timestamp,source,ip_address,user_agent\nold@example.com,2026-01-01T00:00:00Z,website,unknown,".to_vec();
        assert!(seeded.len() < len);
        seeded.resize(len - 1, b'a');
        seeded.push(b'\n');
        fs::write(path, &seeded).unwrap();
        seeded
    }

    #[test]
    fn test_ledger_exactly_at_limit_rejects_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("waitlist.csv");
        let seeded = seed_exact(&path, 200);
        let ledger = CsvLedger::new(&path, 200);

        let result = ledger.register(signup("late@example.com"), Utc::now());
        assert!(matches!(result, Err(LedgerError::CapacityExceeded { size: 200, limit: 200 })));
        assert_eq!(fs::read(&path).unwrap(), seeded);
    }

    #[test]
    fn test_ledger_one_byte_under_limit_accepts_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("waitlist.csv");
        seed_exact(&path, 199);
        let ledger = CsvLedger::new(&path, 200);

        let outcome = ledger.register(signup("inside@example.com"), Utc::now()).unwrap();
        assert!(matches!(outcome, RegisterOutcome::Appended { position: 2, .. }));
    }

    #[test]
    fn test_concurrent_same_email_writes_one_row() {
        let dir = TempDir::new().unwrap();
        let ledger = Arc::new(ledger_in(&dir));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = ledger.clone();
                std::thread::spawn(move || ledger.register(signup("race@example.com"), Utc::now()).unwrap())
            })
            .collect();
        let appended = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| matches!(o, RegisterOutcome::Appended { .. }))
            .count();
        assert_eq!(appended, 1);
        assert_eq!(ledger.count().unwrap(), 1);
    }

    #[test]
    fn test_separate_handles_share_the_file_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("waitlist.csv");
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    // Each thread uses its own ledger value, as separate processes would.
                    let ledger = CsvLedger::new(path, 10 * 1024 * 1024);
                    ledger.register(signup(&format!("user{i}@example.com")), Utc::now()).unwrap()
                })
            })
            .collect();
        let mut positions: Vec<u64> = handles
            .into_iter()
            .map(|h| match h.join().unwrap() {
                RegisterOutcome::Appended { position, .. } => position,
                RegisterOutcome::AlreadyExists => panic!("distinct emails reported as duplicate"),
            })
            .collect();
        positions.sort_unstable();
        assert_eq!(positions, (1..=8).collect::<Vec<u64>>());
        assert_eq!(CsvLedger::new(&path, 1024).count().unwrap(), 8);
    }
}
