//! Markdown comparison tables
//!
//! One table per unordered pair of roots in input order (A-B, A-C, B-C, ...),
//! or a single listing when only one root was given. Differences are always
//! absolute, with a missing side counted as 0 bytes.

use std::collections::HashSet;
use std::path::Path;

use crate::index::{DirectoryIndex, LabelledIndex};

const TITLE: &str = "# Directory comparison";
const SUBTITLE: &str = "> Results are shown below";
const PLACEHOLDER: &str = "-";

/// One rendered line of a comparison table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRow {
    pub key: String,
    /// One entry per compared side; `None` renders as the placeholder
    pub sizes: Vec<Option<u64>>,
    pub difference: u64,
}

impl ComparisonRow {
    fn listing(key: &Path, size: u64) -> Self {
        Self {
            key: key.to_string_lossy().into_owned(),
            sizes: vec![Some(size)],
            difference: size,
        }
    }

    fn pair(key: &Path, cur: Option<u64>, next: Option<u64>) -> Self {
        Self {
            key: key.to_string_lossy().into_owned(),
            sizes: vec![cur, next],
            difference: cur.unwrap_or(0).abs_diff(next.unwrap_or(0)),
        }
    }

    pub fn cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(self.sizes.len() + 4);
        cells.push(escape_cell(&self.key));
        for size in &self.sizes {
            cells.push(size.map_or_else(|| PLACEHOLDER.to_string(), |s| s.to_string()));
        }
        cells.push(self.difference.to_string());
        cells.push(format_kb(self.difference));
        cells.push(format_mb(self.difference));
        cells
    }
}

const KB: u128 = 1024;
const MB: u128 = KB * 1024;

/// Divide rounding halves up, so exact ties go to the larger value
fn div_round_half_up(n: u128, d: u128) -> u128 {
    (2 * n + d) / (2 * d)
}

/// Bytes to whole kilobytes, rounded to nearest
pub fn format_kb(bytes: u64) -> String {
    div_round_half_up(u128::from(bytes), KB).to_string()
}

/// Bytes to megabytes with two decimals
pub fn format_mb(bytes: u64) -> String {
    let hundredths = div_round_half_up(u128::from(bytes) * 100, MB);
    format!("{}.{:02}", hundredths / 100, hundredths % 100)
}

/// Backslashes first, so a trailing `\` cannot escape the cell separator
fn escape_cell(text: &str) -> String {
    text.replace('\\', "\\\\").replace('|', "\\|")
}

/// Rows for a single-root listing
pub fn listing_rows(index: &DirectoryIndex) -> Vec<ComparisonRow> {
    index
        .iter()
        .map(|(key, size)| ComparisonRow::listing(key, size))
        .collect()
}

/// Rows for `cur` against `next`: every key of `cur` first, then keys only
/// `next` has, each side in its own insertion order.
pub fn comparison_rows(cur: &DirectoryIndex, next: &DirectoryIndex) -> Vec<ComparisonRow> {
    let mut rows = Vec::with_capacity(cur.len().max(next.len()));
    let mut emitted = HashSet::with_capacity(cur.len());

    for (key, size) in cur.iter() {
        rows.push(ComparisonRow::pair(key, Some(size), next.get(key)));
        emitted.insert(key);
    }

    for (key, size) in next.iter() {
        if emitted.contains(key) {
            continue;
        }
        rows.push(ComparisonRow::pair(key, None, Some(size)));
    }

    rows
}

/// Unordered index pairs `(i, j)` with `i < j`, in input order
pub fn pairs(len: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..len).flat_map(move |i| ((i + 1)..len).map(move |j| (i, j)))
}

fn render_table(roots: &[&LabelledIndex], rows: &[ComparisonRow]) -> String {
    let labels: Vec<String> = roots.iter().map(|r| format!("dir {}", r.label)).collect();

    let mut headers = Vec::with_capacity(labels.len() + 4);
    headers.push("File name".to_string());
    headers.extend(labels.iter().map(|l| escape_cell(l)));
    headers.push("difference in bytes".to_string());
    headers.push("difference in KB".to_string());
    headers.push("difference in MB".to_string());

    let mut out = String::new();
    out.push_str(&format!("## {}\n\n", labels.join(" - ")));
    out.push_str(&table_line(&headers));
    out.push_str(&table_line(&vec!["-".to_string(); headers.len()]));
    for row in rows {
        out.push_str(&table_line(&row.cells()));
    }
    out
}

fn table_line(cells: &[String]) -> String {
    format!("|{}|\n", cells.join("|"))
}

/// Assemble the full markdown document
pub fn build_report(roots: &[LabelledIndex]) -> String {
    let mut sections = vec![format!("{TITLE}\n"), format!("{SUBTITLE}\n")];

    if let [only] = roots {
        sections.push(render_table(&[only], &listing_rows(&only.index)));
    } else {
        for (i, j) in pairs(roots.len()) {
            let (cur, next) = (&roots[i], &roots[j]);
            let rows = comparison_rows(&cur.index, &next.index);
            sections.push(render_table(&[cur, next], &rows));
        }
    }

    sections.join("\n")
}
