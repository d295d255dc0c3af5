//! Adapters that turn already-extracted page text into raw incoming rows.
//!
//! Two strategies feed the same row contract: a free-text scan that looks for
//! timers and coordinates on any line, and a reader for the fixed incomings
//! table exported as tab-separated text.

use std::path::PathBuf;

use async_trait::async_trait;
use raidscope_types::{row::RawRow, RaidscopeError, Result};
use tracing::debug;

pub trait RowExtractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, text: &str) -> Vec<RawRow>;
}

#[async_trait]
pub trait RowSource: Send + Sync {
    /// Label used in logs and in empty-scan notifications.
    fn describe(&self) -> String;
    async fn fetch_rows(&self) -> Result<Vec<RawRow>>;
}

/// Scans arbitrary lines for a countdown timer plus village coordinates.
///
/// A line yields a row when it carries a countdown token (`H:MM:SS` or `MM:SS`).
/// The first coordinate (`x|y`, optionally parenthesised) is the source, the
/// second the target. Words before the first coordinate name the attacker.
/// A clock time right after one of [`ARRIVAL_MARKERS`] is the arrival time, and
/// a number followed by `field`/`fields` is the distance.
///
/// Any other clock token is read as the countdown, so an arrival time written
/// without a marker (`raider 1|1 2|2 14:32:10`) is taken for a countdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeTextExtractor;

/// Words that introduce an arrival time rather than a countdown.
pub const ARRIVAL_MARKERS: [&str; 4] = ["at", "arrives", "arrival", "arriving"];

impl RowExtractor for FreeTextExtractor {
    fn name(&self) -> &'static str {
        "free-text"
    }

    fn extract(&self, text: &str) -> Vec<RawRow> {
        text.lines().filter_map(scan_line).collect()
    }
}

fn scan_line(line: &str) -> Option<RawRow> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut row = RawRow::default();
    let mut coordinates = Vec::new();
    let mut attacker_words = Vec::new();

    for (idx, token) in tokens.iter().enumerate() {
        let previous = idx.checked_sub(1).map(|i| tokens[i]);
        if let Some(coordinate) = find_coordinate(token) {
            coordinates.push(coordinate);
            continue;
        }
        if is_clock_token(token) {
            let marker = previous
                .map(|p| p.trim_end_matches(':'))
                .filter(|p| ARRIVAL_MARKERS.iter().any(|m| p.eq_ignore_ascii_case(m)));
            match marker {
                // Keeps a day word such as `today at` or `on 17.10. at`.
                Some(m) if m.eq_ignore_ascii_case("at") => {
                    let start = idx.saturating_sub(2);
                    row.arrival = Some(tokens[start..=idx].join(" "));
                }
                Some(_) => row.arrival = Some((*token).to_owned()),
                None => row.countdown = Some((*token).to_owned()),
            }
            continue;
        }
        let next_is_unit = tokens
            .get(idx + 1)
            .is_some_and(|next| next.to_ascii_lowercase().starts_with("field"));
        if next_is_unit && token.parse::<f64>().is_ok() {
            row.distance = Some((*token).to_owned());
            continue;
        }
        if coordinates.is_empty() {
            attacker_words.push(*token);
        }
    }

    row.countdown.as_ref()?;
    let mut coordinates = coordinates.into_iter();
    row.source = coordinates.next();
    row.target = coordinates.next();
    if !attacker_words.is_empty() {
        row.attacker = Some(attacker_words.join(" "));
    }
    Some(row)
}

/// `x|y` with 1-3 digits on each side, anywhere inside the token.
fn find_coordinate(token: &str) -> Option<String> {
    let bar = token.find('|')?;
    let left: String = token[..bar]
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let right: String = token[bar + 1..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    let valid = |part: &str| (1..=3).contains(&part.len());
    (valid(&left) && valid(&right)).then(|| format!("{left}|{right}"))
}

/// Colon-separated digits with two to four parts, e.g. `1:23:45` or `14:02:11:250`.
fn is_clock_token(token: &str) -> bool {
    let parts: Vec<&str> = token.split(':').collect();
    (2..=4).contains(&parts.len())
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

/// Reads the incomings table exported as tab-separated text.
///
/// Columns: `id, attacker, source, target, distance, arrival, countdown`.
/// A header line starting with `id`, blank lines, `#` comments, and rows with
/// fewer than four columns are skipped. Missing trailing columns are absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncomingsTableExtractor;

impl RowExtractor for IncomingsTableExtractor {
    fn name(&self) -> &'static str {
        "incomings-table"
    }

    fn extract(&self, text: &str) -> Vec<RawRow> {
        text.lines()
            .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
            .filter_map(|line| {
                let cells: Vec<Option<String>> = line
                    .split('\t')
                    .map(|cell| {
                        let cell = cell.trim();
                        (!cell.is_empty()).then(|| cell.to_owned())
                    })
                    .collect();
                if cells.len() < 4 {
                    return None;
                }
                if cells[0]
                    .as_deref()
                    .is_some_and(|first| first.eq_ignore_ascii_case("id"))
                {
                    return None;
                }
                let cell = |idx: usize| cells.get(idx).cloned().flatten();
                Some(RawRow {
                    row_id: cell(0),
                    attacker: cell(1),
                    source: cell(2),
                    target: cell(3),
                    distance: cell(4),
                    arrival: cell(5),
                    countdown: cell(6),
                })
            })
            .collect()
    }
}

/// Re-reads a text dump on every fetch.
pub struct FileRowSource<E: RowExtractor> {
    path: PathBuf,
    extractor: E,
}

impl<E: RowExtractor> FileRowSource<E> {
    pub fn new(path: impl Into<PathBuf>, extractor: E) -> Self {
        Self {
            path: path.into(),
            extractor,
        }
    }
}

#[async_trait]
impl<E: RowExtractor> RowSource for FileRowSource<E> {
    fn describe(&self) -> String {
        format!("{} ({})", self.path.display(), self.extractor.name())
    }

    async fn fetch_rows(&self) -> Result<Vec<RawRow>> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|err| {
            scraper_error(format!("unable to read {}: {err}", self.path.display()))
        })?;
        let rows = self.extractor.extract(&text);
        debug!(
            path = %self.path.display(),
            extractor = self.extractor.name(),
            rows = rows.len(),
            "extracted rows"
        );
        Ok(rows)
    }
}

/// Fixed rows, for hosts that already hold extracted fields.
#[derive(Debug, Clone, Default)]
pub struct StaticRowSource {
    rows: Vec<RawRow>,
}

impl StaticRowSource {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl RowSource for StaticRowSource {
    fn describe(&self) -> String {
        "static rows".into()
    }

    async fn fetch_rows(&self) -> Result<Vec<RawRow>> {
        Ok(self.rows.clone())
    }
}

pub fn scraper_error(message: impl Into<String>) -> RaidscopeError {
    RaidscopeError::Scraper(message.into())
}
