use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::format_due_date;
use crate::task::{Priority, Task};
use crate::view::ViewSummary;

const SHORT_ID_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true);
        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn print_task_table(&self, tasks: &[&Task]) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        let paint = self.color && io::stdout().is_terminal();
        write_task_table(out, tasks, paint)
    }

    pub fn print_summary(&self, summary: &ViewSummary) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", summary_line(summary))?;
        Ok(())
    }
}

pub fn short_id(task: &Task) -> String {
    task.id.simple().to_string()[..SHORT_ID_LEN].to_string()
}

pub fn summary_line(summary: &ViewSummary) -> String {
    format!(
        "{} shown, {} total ({} active, {} completed)",
        summary.visible, summary.total, summary.active, summary.completed
    )
}

fn write_task_table<W: Write>(writer: W, tasks: &[&Task], paint: bool) -> anyhow::Result<()> {
    let headers = vec![
        "ID".to_string(),
        "Done".to_string(),
        "Pri".to_string(),
        "Due".to_string(),
        "Text".to_string(),
        "Tags".to_string(),
    ];

    let rows = tasks
        .iter()
        .map(|task| {
            let id = colorize(&short_id(task), "33", paint);
            let done = if task.completed { "x" } else { "" }.to_string();
            let priority = match task.priority {
                Priority::High => colorize("H", "31", paint),
                Priority::Medium => "M".to_string(),
                Priority::Low => "L".to_string(),
            };
            // Malformed dates are shown verbatim so the user can fix them.
            let due = match (task.due(), task.due_date.as_deref()) {
                (Some(date), _) => format_due_date(date),
                (None, Some(raw)) => colorize(raw, "2", paint),
                (None, None) => String::new(),
            };
            let tags = task
                .tags
                .iter()
                .map(|tag| format!("#{tag}"))
                .collect::<Vec<_>>()
                .join(" ");

            vec![id, done, priority, due, task.text.clone(), tags]
        })
        .collect();

    write_table(writer, headers, rows)
}

fn colorize(text: &str, code: &str, paint: bool) -> String {
    if !paint {
        return text.to_string();
    }
    format!("\x1b[{code}m{text}\x1b[0m")
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
