//! Rendering surface
//!
//! A [`Frame`] is a read-only snapshot of everything the user can see. The
//! session builds one after every state change and hands it to a
//! [`Surface`]. [`render_text`] lays a frame out as plain text; the terminal
//! surface prints that text.

use chrono::{DateTime, Local};
use explorer_common::checkpoint::{shorten_block_id, ExplorerLinks};
use explorer_common::Checkpoint;
use std::fmt::Write as _;
use std::io::{self, Write};

use crate::pagination::{PageControls, PageLabel};
use crate::view::ExplorerView;

pub const NO_DATA_LABEL: &str = "No data found";
pub const NO_CHECKPOINT_MESSAGE: &str = "No checkpoint data available";
pub const LOADING_LABEL: &str = "Loading...";

const TABLE_HEADERS: [&str; 7] = [
    "Batch TXID",
    "Epoch index",
    "Status",
    "Signet start block",
    "Signet end block",
    "Strata start block",
    "Strata end block",
];

/// Everything visible at one instant
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    pub view: ExplorerView,
    /// Address bar (`path?query`)
    pub location: Option<String>,
    /// Rows of the last good page; `None` before the first page arrives
    pub items: Option<&'a [Checkpoint]>,
    pub controls: PageControls,
    pub loading: bool,
    /// Inline error of the last failed fetch
    pub error: Option<&'a str>,
    pub alert: Option<&'a str>,
    pub environment: &'a str,
    pub updated_at: Option<DateTime<Local>>,
    pub links: &'a ExplorerLinks,
}

/// Something that can show a frame
pub trait Surface {
    fn draw(&mut self, frame: &Frame<'_>) -> io::Result<()>;
}

/// Prints every frame to a writer (stdout for the binary)
pub struct TerminalSurface<W: Write> {
    out: W,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Surface for TerminalSurface<W> {
    fn draw(&mut self, frame: &Frame<'_>) -> io::Result<()> {
        self.out.write_all(render_text(frame).as_bytes())?;
        self.out.flush()
    }
}

/// Lay out a frame as text
pub fn render_text(frame: &Frame<'_>) -> String {
    let mut out = String::new();

    let _ = write!(out, "== {} [{}]", frame.view.title(), frame.environment);
    if let Some(location) = &frame.location {
        let _ = write!(out, "  {}", location);
    }
    out.push('\n');

    if let Some(alert) = frame.alert {
        let _ = writeln!(out, "!! {}", alert);
    }
    if let Some(error) = frame.error {
        let _ = writeln!(out, "Error: {}", error);
    }

    match (frame.view, frame.items) {
        (_, None) if frame.loading => {
            let _ = writeln!(out, "{}", LOADING_LABEL);
        }
        (ExplorerView::Checkpoints, items) => {
            out.push_str(&checkpoint_table(items.unwrap_or_default()));
        }
        (ExplorerView::CheckpointDetail, items) => {
            match items.and_then(|items| items.first()) {
                Some(checkpoint) => out.push_str(&checkpoint_card(checkpoint, frame.links)),
                None => {
                    let _ = writeln!(out, "{}", NO_CHECKPOINT_MESSAGE);
                }
            }
        }
    }

    out.push_str(&footer(&frame.controls, frame.loading && frame.items.is_some()));
    if let Some(updated_at) = frame.updated_at {
        let _ = writeln!(out, "Updated {}", updated_at.format("%H:%M:%S"));
    }
    out
}

/// Pagination footer: `« ‹ [page] › »  Page X of Y`
///
/// Disabled controls are drawn as `·`.
pub fn footer(controls: &PageControls, loading: bool) -> String {
    let button = |enabled: bool, glyph: &'static str| if enabled { glyph } else { "·" };

    let input = match controls.label {
        PageLabel::PageOf { current, .. } if controls.input => format!("[{}]", current),
        _ => "[ ]".to_string(),
    };

    let mut line = format!(
        "{} {} {} {} {}  {}",
        button(controls.first, "«"),
        button(controls.previous, "‹"),
        input,
        button(controls.next, "›"),
        button(controls.last, "»"),
        page_label(&controls.label),
    );
    if loading {
        line.push_str("  ");
        line.push_str(LOADING_LABEL);
    }
    line.push('\n');
    line
}

pub fn page_label(label: &PageLabel) -> String {
    match label {
        PageLabel::PageOf { current, total } => format!("Page {} of {}", current, total),
        PageLabel::NoData => NO_DATA_LABEL.to_string(),
    }
}

fn table_row(checkpoint: &Checkpoint) -> [String; 7] {
    [
        shorten_block_id(checkpoint.batch_txid()),
        checkpoint.idx.to_string(),
        checkpoint.status_label().to_string(),
        checkpoint.l1_range.0.to_string(),
        checkpoint.l1_range.1.to_string(),
        checkpoint.l2_range.0.to_string(),
        checkpoint.l2_range.1.to_string(),
    ]
}

fn checkpoint_table(items: &[Checkpoint]) -> String {
    let rows: Vec<[String; 7]> = items.iter().map(table_row).collect();

    let mut widths = TABLE_HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", table_line(&TABLE_HEADERS, &widths));
    for row in &rows {
        let cells = row.each_ref().map(String::as_str);
        let _ = writeln!(out, "{}", table_line(&cells, &widths));
    }
    if rows.is_empty() {
        let _ = writeln!(out, "{}", NO_DATA_LABEL);
    }
    out
}

fn table_line(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

fn linked(height: u64, link: Option<reqwest::Url>) -> String {
    match link {
        Some(url) => format!("{} <{}>", height, url),
        None => height.to_string(),
    }
}

fn checkpoint_card(checkpoint: &Checkpoint, links: &ExplorerLinks) -> String {
    let (l1_start, l1_end) = checkpoint.l1_range;
    let (l2_start, l2_end) = checkpoint.l2_range;

    let fields = [
        ("Batch TXID", checkpoint.batch_txid().to_string()),
        ("Epoch index", checkpoint.idx.to_string()),
        ("Status", checkpoint.status_label().to_string()),
        ("Signet start block", linked(l1_start, links.l1_block(l1_start))),
        ("Signet end block", linked(l1_end, links.l1_block(l1_end))),
        ("Strata start block", linked(l2_start, links.l2_block(l2_start))),
        ("Strata end block", linked(l2_end, links.l2_block(l2_end))),
        ("Strata block id", shorten_block_id(&checkpoint.l2_blockid)),
    ];

    let label_width = fields.iter().map(|(label, _)| label.len() + 1).max().unwrap_or(0);
    let mut out = String::new();
    for (label, value) in fields {
        let _ = writeln!(
            out,
            "{:<width$} {}",
            format!("{}:", label),
            value,
            width = label_width
        );
    }
    out
}
