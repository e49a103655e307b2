//! Whitespace-only markdown tidying
//!
//! Blocks are separated by exactly one blank line and pipe tables are padded
//! so their columns line up. Cell text is never changed.

use console::measure_text_width;

const MIN_DELIMITER_WIDTH: usize = 3;

enum Block<'a> {
    Table(Vec<&'a str>),
    Text(Vec<&'a str>),
}

/// Tidy a markdown document
pub fn prettify(doc: &str) -> String {
    let rendered: Vec<String> = blocks(doc)
        .into_iter()
        .map(|block| match block {
            Block::Table(lines) => format_table(&lines),
            Block::Text(lines) => lines
                .iter()
                .map(|l| l.trim_end())
                .collect::<Vec<_>>()
                .join("\n"),
        })
        .collect();

    let mut out = rendered.join("\n\n");
    out.push('\n');
    out
}

fn blocks(doc: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut current: Option<Block<'_>> = None;

    for line in doc.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            blocks.extend(current.take());
            continue;
        }

        let is_row = trimmed.starts_with('|');
        // headings always stand alone
        let is_heading = trimmed.starts_with('#');

        current = match current.take() {
            Some(Block::Table(mut rows)) if is_row => {
                rows.push(trimmed);
                Some(Block::Table(rows))
            }
            Some(Block::Text(mut lines)) if !is_row && !is_heading => {
                lines.push(line);
                Some(Block::Text(lines))
            }
            previous => {
                blocks.extend(previous);
                if is_row {
                    Some(Block::Table(vec![trimmed]))
                } else {
                    Some(Block::Text(vec![line]))
                }
            }
        };

        if is_heading {
            blocks.extend(current.take());
        }
    }

    blocks.extend(current);
    blocks
}

/// Split a table row on unescaped pipes, trimming each cell
fn split_row(row: &str) -> Vec<String> {
    let inner = row.trim();
    let inner = inner.strip_prefix('|').unwrap_or(inner);

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut closed = false;
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        closed = false;
        match c {
            '\\' => {
                cell.push(c);
                if let Some(escaped) = chars.next() {
                    cell.push(escaped);
                }
            }
            '|' => {
                cells.push(std::mem::take(&mut cell).trim().to_string());
                closed = true;
            }
            _ => cell.push(c),
        }
    }
    // a closing pipe ends the row rather than opening an empty cell
    if !closed {
        cells.push(cell.trim().to_string());
    }
    cells
}

fn is_delimiter(cells: &[String]) -> bool {
    cells.iter().all(|c| {
        let body = c.trim_start_matches(':').trim_end_matches(':');
        !body.is_empty() && body.chars().all(|ch| ch == '-')
    })
}

fn format_table(lines: &[&str]) -> String {
    let rows: Vec<Vec<String>> = lines.iter().map(|l| split_row(l)).collect();
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);

    let mut widths = vec![MIN_DELIMITER_WIDTH; columns];
    for row in rows.iter().filter(|r| !is_delimiter(r)) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(measure_text_width(cell));
        }
    }

    rows.iter()
        .map(|row| {
            let delimiter = is_delimiter(row);
            let cells: Vec<String> = (0..columns)
                .map(|i| {
                    if delimiter {
                        "-".repeat(widths[i])
                    } else {
                        let cell = row.get(i).map(String::as_str).unwrap_or("");
                        let pad = widths[i] - measure_text_width(cell);
                        format!("{cell}{}", " ".repeat(pad))
                    }
                })
                .collect();
            format!("| {} |", cells.join(" | "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
