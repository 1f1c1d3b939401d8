//! Append-only cache of daily historical temperatures.
//!
//! The store holds one [`WeatherRecord`] per day, sorted and gap-free from
//! its first date to its last. It is persisted as a flat CSV file
//! (`date,temp_max,temp_min`) that is read once at startup and afterwards
//! only ever appended to.
//!
//! Opening an absent or empty file, or one whose first day is after the
//! start date, bootstraps it with the full range `[start, today]`; [`HistoricalStore::refresh`] later fetches just the
//! missing suffix. Both go through the same fetch/transform step and differ
//! only in the range.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::{AlmanacError, Result};
use crate::source::{Coordinates, HistoricalSource, WeatherRecord};

pub const CSV_HEADER: &str = "date,temp_max,temp_min";

#[derive(Debug)]
pub struct HistoricalStore {
    path: PathBuf,
    start: NaiveDate,
    records: Vec<WeatherRecord>,
    /// Most recent `today` a refresh has already run for.
    refreshed_through: Option<NaiveDate>,
    /// The file does not end with a newline (edited by hand).
    needs_newline: bool,
}

impl HistoricalStore {
    /// Load the store at `path`, bootstrapping it from `source` when the file
    /// is absent, holds no records, or begins after `start`.
    pub async fn open<S: HistoricalSource>(
        path: impl Into<PathBuf>,
        start: NaiveDate,
        at: Coordinates,
        today: NaiveDate,
        source: &S,
    ) -> Result<Self> {
        let path = path.into();
        let has_content = fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);
        if has_content {
            let store = Self::load(&path, start)?;
            match store.records.first().map(|r| r.date) {
                // refresh only extends the tail, so a late first row is a permanent hole
                Some(first) if first > start => warn!(
                    path = %path.display(),
                    %first,
                    %start,
                    "stored history begins after the start date; rebuilding"
                ),
                Some(_) => return Ok(store),
                None => {}
            }
        }
        Self::rebuild(path, start, at, today, source).await
    }

    /// Read the whole file. Rows must be strictly consecutive days.
    pub fn load(path: impl Into<PathBuf>, start: NaiveDate) -> Result<Self> {
        let path = path.into();
        let contents = fs::read_to_string(&path)?;
        let records = parse_csv(&contents)
            .map_err(|e| AlmanacError::Storage(format!("{}: {e}", path.display())))?;

        debug!(path = %path.display(), rows = records.len(), "loaded historical store");
        Ok(Self {
            path,
            start,
            records,
            refreshed_through: None,
            needs_newline: !contents.is_empty() && !contents.ends_with('\n'),
        })
    }

    /// Fetch `[start, today]` and write a fresh file in its place.
    ///
    /// The new file is written beside the old one and renamed over it, so a
    /// failed fetch or write leaves the previous file untouched.
    pub async fn rebuild<S: HistoricalSource>(
        path: impl Into<PathBuf>,
        start: NaiveDate,
        at: Coordinates,
        today: NaiveDate,
        source: &S,
    ) -> Result<Self> {
        let path = path.into();
        let records = if start <= today {
            fetch_records(source, at, start, today).await?
        } else {
            Vec::new()
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = tmp_path(&path);
        let mut contents = format!("{CSV_HEADER}\n");
        contents.push_str(&render_rows(&records));
        {
            let mut file = File::create(&tmp)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        info!(
            path = %path.display(),
            rows = records.len(),
            %start,
            end = %today,
            "bootstrapped historical store"
        );
        Ok(Self {
            path,
            start,
            records,
            refreshed_through: Some(today),
            needs_newline: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configured first day of the historical range.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn records(&self) -> &[WeatherRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    pub fn lookup(&self, date: NaiveDate) -> Option<&WeatherRecord> {
        self.records
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|idx| &self.records[idx])
    }

    /// Nothing left to fetch for `today`.
    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.last_date().is_some_and(|last| last >= today)
            || self.refreshed_through.is_some_and(|done| done >= today)
    }

    /// Extend coverage up to `today`, returning the number of days appended.
    ///
    /// A no-op when the store already reaches `today` or was refreshed for it.
    /// On any error nothing is appended, in memory or on disk.
    pub async fn refresh<S: HistoricalSource>(
        &mut self,
        at: Coordinates,
        today: NaiveDate,
        source: &S,
    ) -> Result<usize> {
        if self.is_current(today) {
            debug!(%today, "historical store is current");
            return Ok(0);
        }

        let from = match self.last_date() {
            Some(last) => last.succ_opt().ok_or_else(|| {
                AlmanacError::Storage(format!("no day follows {last}"))
            })?,
            None => self.start,
        };
        if from > today {
            self.refreshed_through = Some(today);
            return Ok(0);
        }

        let fresh = fetch_records(source, at, from, today).await?;
        let appended = fresh.len();
        self.append(fresh)?;
        self.refreshed_through = Some(today);

        info!(appended, %from, end = %today, "refreshed historical store");
        Ok(appended)
    }

    /// Write `fresh` to the end of the file in one call, then extend memory.
    fn append(&mut self, fresh: Vec<WeatherRecord>) -> Result<()> {
        if fresh.is_empty() {
            return Ok(());
        }

        let mut chunk = String::new();
        if self.needs_newline {
            chunk.push('\n');
        }
        chunk.push_str(&render_rows(&fresh));

        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        write_or_rewind(&mut file, chunk.as_bytes())?;

        self.needs_newline = false;
        self.records.extend(fresh);
        Ok(())
    }
}

/// An append target that can be cut back to an earlier length.
trait Rewind: Write {
    fn current_len(&self) -> io::Result<u64>;
    fn rewind_to(&mut self, len: u64) -> io::Result<()>;
}

impl Rewind for File {
    fn current_len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn rewind_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Write all of `chunk` or leave `out` at its previous length.
fn write_or_rewind<W: Rewind>(out: &mut W, chunk: &[u8]) -> io::Result<()> {
    let len = out.current_len()?;
    if let Err(e) = out.write_all(chunk).and_then(|()| out.flush()) {
        if let Err(undo) = out.rewind_to(len) {
            warn!(error = %undo, len, "could not truncate a partial append");
        }
        return Err(e);
    }
    Ok(())
}

/// The fetch/transform step shared by bootstrap and refresh.
async fn fetch_records<S: HistoricalSource>(
    source: &S,
    at: Coordinates,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<WeatherRecord>> {
    debug!(%from, %to, "fetching historical range");
    source
        .fetch_history(at, from, to)
        .await?
        .into_records(from, to)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn render_rows(records: &[WeatherRecord]) -> String {
    let mut out = String::with_capacity(records.len() * 24);
    for r in records {
        out.push_str(&format!(
            "{},{},{}\n",
            r.date.format("%Y-%m-%d"),
            r.temp_max,
            r.temp_min
        ));
    }
    out
}

fn parse_csv(contents: &str) -> std::result::Result<Vec<WeatherRecord>, String> {
    let mut lines = contents.lines().enumerate();
    match lines.next() {
        None => return Ok(Vec::new()),
        Some((_, header)) if header.trim() == CSV_HEADER => {}
        Some((_, header)) => return Err(format!("unexpected header '{}'", header.trim())),
    }

    let mut records: Vec<WeatherRecord> = Vec::new();
    for (idx, line) in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = parse_row(line).map_err(|e| format!("line {}: {e}", idx + 1))?;
        if let Some(prev) = records.last() {
            if prev.date.succ_opt() != Some(record.date) {
                return Err(format!(
                    "line {}: {} does not follow {}",
                    idx + 1,
                    record.date,
                    prev.date
                ));
            }
        }
        records.push(record);
    }
    Ok(records)
}

fn parse_row(line: &str) -> std::result::Result<WeatherRecord, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [date, max, min] = fields.as_slice() else {
        return Err(format!("expected 3 fields, got {}", fields.len()));
    };

    // pandas may write a midnight timestamp instead of a bare date
    let date = date.split_whitespace().next().unwrap_or_default();
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| format!("bad date '{date}': {e}"))?;
    let temp_max = max
        .parse::<f64>()
        .map_err(|e| format!("bad temp_max '{max}': {e}"))?;
    let temp_min = min
        .parse::<f64>()
        .map_err(|e| format!("bad temp_min '{min}': {e}"))?;

    Ok(WeatherRecord {
        date,
        temp_max,
        temp_min,
    })
}

// ── Tests ───────────────────────────────────────────────────────────────────
