mod screen;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::warn;
use notedown_config::Config;
use notedown_engine::highlight::{HighlightRecord, HighlightSession, RenderedText};
use notedown_engine::{Editor, Mode};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use screen::Screen;
use std::{
    env,
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    process,
};

struct App {
    title: String,
    editor: Editor,
    highlights: HighlightSession,
    screen: Screen,
    outline_state: ListState,
}

impl App {
    fn new(title: String, text: &str, records: Vec<HighlightRecord>, config: &Config) -> Self {
        let editor = Editor::from_markdown(text, config.editor).with_embed_options(config.embeds);
        let mut app = Self {
            title,
            editor,
            highlights: HighlightSession::new(records, None, config.highlights),
            screen: Screen::default(),
            outline_state: ListState::default(),
        };
        app.reset_outline_selection();
        app.refresh();
        app
    }

    fn refresh(&mut self) {
        let snapshot = self.editor.snapshot();
        self.screen = Screen::build(&snapshot);
        self.highlights
            .paint(&RenderedText::from_snapshot(&snapshot), &mut self.screen);
    }

    fn reset_outline_selection(&mut self) {
        let first = (!self.editor.outline().is_empty()).then_some(0);
        self.outline_state.select(first);
    }

    fn next_heading(&mut self) {
        let len = self.editor.outline().len();
        if len == 0 {
            return;
        }
        let i = self.outline_state.selected().map_or(0, |i| (i + 1) % len);
        self.outline_state.select(Some(i));
    }

    fn previous_heading(&mut self) {
        let len = self.editor.outline().len();
        if len == 0 {
            return;
        }
        let i = match self.outline_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.outline_state.select(Some(i));
    }

    fn toggle_selected(&mut self) -> Result<()> {
        let Some(entry) = self
            .outline_state
            .selected()
            .and_then(|i| self.editor.outline().get(i).cloned())
        else {
            return Ok(());
        };
        self.editor.toggle_collapse(entry.key)?;
        self.refresh();
        Ok(())
    }

    fn toggle_mode(&mut self) -> Result<()> {
        self.editor.toggle_mode()?;
        self.reset_outline_selection();
        self.refresh();
        Ok(())
    }

    /// Content row to scroll to so the selected heading is on top.
    fn scroll_row(&self) -> usize {
        self.outline_state
            .selected()
            .and_then(|i| self.editor.outline().get(i).map(|e| e.key))
            .and_then(|key| self.screen.row_of(key))
            .unwrap_or(0)
    }
}

fn sidecar_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(".highlights.json");
    PathBuf::from(name)
}

fn load_highlights(file: &Path) -> Result<Vec<HighlightRecord>> {
    let path = sidecar_path(file);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content =
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            warn!("{e}, using defaults");
            Config::default()
        }
    }
}

fn export(file: &Path) -> Result<()> {
    let text =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let editor = Editor::from_markdown(&text, load_config().editor);
    print!("{}", editor.to_markdown());
    Ok(())
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} <file.md>");
    eprintln!("       {program} --export <file.md>");
    match Config::load() {
        Ok(Some(Config {
            notes_path: Some(notes),
            ..
        })) => eprintln!("Notes folder from config: {}", notes.display()),
        Ok(_) => eprintln!(
            "Set notes_path in {} to have it listed here",
            Config::config_path().display()
        ),
        Err(e) => eprintln!("Error: Failed to load config file: {e}"),
    }
    process::exit(1);
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off")).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map_or("notedown-cli", String::as_str);
    match args.as_slice() {
        [_, flag, file] if flag == "--export" => export(Path::new(file)),
        [_, file] if !file.starts_with('-') => view(Path::new(file)),
        _ => usage(program),
    }
}

fn view(file: &Path) -> Result<()> {
    let text =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let records = load_highlights(file)?;
    let config = load_config();
    let mut app = App::new(file.display().to_string(), &text, records, &config);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }
    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.next_heading(),
                KeyCode::Up | KeyCode::Char('k') => app.previous_heading(),
                KeyCode::Enter => app.toggle_selected()?,
                KeyCode::Char('r') => app.toggle_mode()?,
                _ => {}
            }
        }
    }
}

fn content_lines(app: &App) -> Vec<Line<'static>> {
    let mark = Style::default().bg(Color::Yellow).fg(Color::Black);
    app.screen
        .lines
        .iter()
        .enumerate()
        .map(|(row, line)| {
            let mut spans = Vec::new();
            let mut run = String::new();
            let mut marked = false;
            for (col, c) in line.text.chars().enumerate() {
                let here = app.screen.is_marked(row, col);
                if here != marked && !run.is_empty() {
                    let text = std::mem::take(&mut run);
                    spans.push(if marked { Span::styled(text, mark) } else { Span::raw(text) });
                }
                marked = here;
                run.push(c);
            }
            spans.push(if marked { Span::styled(run, mark) } else { Span::raw(run) });
            Line::from(spans)
        })
        .collect()
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[0]);

    let outline_items: Vec<ListItem> = app
        .editor
        .outline()
        .into_iter()
        .map(|entry| {
            let indent = "  ".repeat(entry.level.saturating_sub(1) as usize);
            let marker = if entry.collapsed { "▸ " } else { "▾ " };
            let style = if entry.hidden {
                Style::default().add_modifier(Modifier::DIM)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(
                format!("{indent}{marker}{}", entry.title),
                style,
            )))
        })
        .collect();

    let outline = List::new(outline_items)
        .block(Block::default().borders(Borders::ALL).title("Outline"))
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White));
    f.render_stateful_widget(outline, chunks[0], &mut app.outline_state);

    let mode = match app.editor.mode() {
        Mode::Rich => "rich",
        Mode::Raw => "raw",
    };
    let scroll = u16::try_from(app.scroll_row()).unwrap_or(u16::MAX);
    let content = Paragraph::new(content_lines(app))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} [{mode}]", app.title)),
        )
        .scroll((scroll, 0));
    f.render_widget(content, chunks[1]);

    let help = Line::from(vec![
        Span::raw("q: Quit | "),
        Span::raw("↑/k: Previous | "),
        Span::raw("↓/j: Next | "),
        Span::raw("Enter: Collapse/Expand | r: Raw/Rich"),
    ]);
    f.render_widget(Paragraph::new(help), rows[1]);
}
