use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::controller::Tabs;
use crate::task::Stage;
use crate::view::CategoryView;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    /// Colour needs both the `color` setting and a terminal on stdout.
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.color && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, writer, tabs, view), fields(category = %view.category, items = view.items.len()))]
    pub fn write_view<W: Write>(
        &self,
        mut writer: W,
        tabs: &Tabs,
        view: &CategoryView,
    ) -> anyhow::Result<()> {
        let bar = tabs
            .iter()
            .map(|(category, active)| {
                if active {
                    self.paint(&format!("[{category}]"), "1;36")
                } else {
                    format!(" {category} ")
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{bar}")?;
        writeln!(writer)?;

        if view.is_empty() {
            writeln!(writer, "No tasks in {}.", view.category)?;
            return Ok(());
        }

        let headers = vec!["ID".to_string(), "Stage".to_string(), "Task".to_string()];
        let rows = view
            .items
            .iter()
            .map(|item| {
                vec![
                    self.paint(&item.id().to_string(), "33"),
                    self.paint(item.stage.label(), stage_color(item.stage)),
                    item.text.text.clone(),
                ]
            })
            .collect();

        write_table(&mut writer, headers, rows)?;
        writeln!(writer)?;
        writeln!(
            writer,
            "{} task{}; move with `stage ID New|Ongoing|Finished`, remove with `delete ID`",
            view.items.len(),
            if view.items.len() == 1 { "" } else { "s" }
        )?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn stage_color(stage: Stage) -> &'static str {
    match stage {
        Stage::New => "34",
        Stage::Ongoing => "33",
        Stage::Finished => "32",
    }
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
        for (idx, cell) in row.iter().enumerate() {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TaskStore;
    use crate::task::{Category, Task};

    fn render(renderer: &Renderer, tabs: &Tabs, view: &CategoryView) -> String {
        let mut buf = Vec::new();
        renderer.write_view(&mut buf, tabs, view).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn table_lists_active_category() {
        let store = TaskStore::new(vec![
            Task::new(1, "Buy milk", Category::Personal, Stage::New),
            Task::new(12, "Plan sprint", Category::Personal, Stage::Ongoing),
            Task::new(3, "File report", Category::Work, Stage::New),
        ]);
        let tabs = Tabs::new(Category::Personal);
        let view = CategoryView::build(&store, tabs.active());

        let text = render(&Renderer::plain(), &tabs, &view);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], " Work  [Personal]");
        assert_eq!(lines[2].trim_end(), "ID Stage   Task");
        assert_eq!(lines[4].trim_end(), "1  New     Buy milk");
        assert_eq!(lines[5].trim_end(), "12 Ongoing Plan sprint");
        assert!(!text.contains("File report"));
        assert!(text.contains("2 tasks;"));
    }

    #[test]
    fn empty_category_says_so() {
        let tabs = Tabs::new(Category::Work);
        let view = CategoryView::build(&TaskStore::default(), Category::Work);
        let text = render(&Renderer::plain(), &tabs, &view);
        assert!(text.ends_with("No tasks in Work.\n"));
    }

    #[test]
    fn color_setting_off_disables_paint() {
        let cfg = Config {
            color: false,
            ..Config::default()
        };
        let renderer = Renderer::new(&cfg);
        assert_eq!(renderer.paint("New", "34"), "New");
    }

    #[test]
    fn colored_cells_keep_alignment() {
        let renderer = Renderer { color: true };
        let painted = renderer.paint("New", "34");
        assert_eq!(strip_ansi(&painted), "New");
        assert_ne!(painted, "New");
    }
}
