use std::collections::VecDeque;
use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Bar, BarChart, BarGroup, Block, Borders, Cell, Clear, Gauge, Paragraph, Row, Table, Tabs, Wrap,
};
use ratatui::backend::CrosstermBackend;
use ratatui::{Frame, Terminal};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

use super::data_io::save_chart;
use super::error::AnalysisError;
use super::runtime::{FETCH_FAILURE_NOTICE, analyze};
use super::text::capitalize;
use super::types::{Analysis, AnalysisRequest, Cli};
use super::ui_utils::{centered_rect, max_scroll, share_style, truncate_middle};

const PLACEHOLDER: &str = "Press Enter to analyze a domain.";
const MESSAGE_LIMIT: usize = 10;
const PAGE_JUMP_STEP: u16 = 10;

#[derive(Debug)]
pub enum AnalysisEvent {
    Finished(Box<Analysis>),
    Failed(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ActiveTab {
    Technology,
    Analysis,
}

impl ActiveTab {
    fn as_index(self) -> usize {
        match self {
            ActiveTab::Technology => 0,
            ActiveTab::Analysis => 1,
        }
    }

    fn toggle(self) -> Self {
        match self {
            ActiveTab::Technology => ActiveTab::Analysis,
            ActiveTab::Analysis => ActiveTab::Technology,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SourceView {
    Html,
    Css,
    Js,
}

impl SourceView {
    fn as_index(self) -> usize {
        match self {
            SourceView::Html => 0,
            SourceView::Css => 1,
            SourceView::Js => 2,
        }
    }

    fn title(self) -> &'static str {
        match self {
            SourceView::Html => "HTML Structure",
            SourceView::Css => "CSS Styles",
            SourceView::Js => "Javascript Code",
        }
    }
}

/// What the event loop must do after a key press.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyAction {
    None,
    Quit,
    Analyze(AnalysisRequest),
    Save,
}

pub struct AppState {
    pub input: String,
    pub editing: bool,
    pub running: bool,
    pub analysis: Option<Analysis>,
    pub active_tab: ActiveTab,
    pub source_view: SourceView,
    pub scroll: u16,
    pub help_mode: bool,
    pub errors: VecDeque<String>,
    pub status_messages: VecDeque<String>,
}

impl AppState {
    pub fn new(input: String) -> Self {
        Self {
            input,
            editing: true,
            running: false,
            analysis: None,
            active_tab: ActiveTab::Technology,
            source_view: SourceView::Html,
            scroll: 0,
            help_mode: false,
            errors: VecDeque::new(),
            status_messages: VecDeque::new(),
        }
    }

    pub fn push_status(&mut self, message: String) {
        self.status_messages.push_front(message);
        while self.status_messages.len() > MESSAGE_LIMIT {
            self.status_messages.pop_back();
        }
    }

    pub fn push_error(&mut self, message: String) {
        self.errors.push_front(message);
        while self.errors.len() > MESSAGE_LIMIT {
            self.errors.pop_back();
        }
    }

    /// Text of the active source view, if an analysis is loaded.
    pub fn source_text(&self) -> Option<String> {
        let document = &self.analysis.as_ref()?.document;
        Some(match self.source_view {
            SourceView::Html => document.pretty_html.clone(),
            SourceView::Css => document.css_code(),
            SourceView::Js => document.js_code(),
        })
    }

    /// Starts an analysis unless one is already running. The previous
    /// result is dropped so a failure never shows stale metrics.
    fn request_analysis(&mut self) -> KeyAction {
        if self.running {
            self.push_status("analysis already running".to_string());
            return KeyAction::None;
        }
        match AnalysisRequest::from_input(&self.input) {
            Some(request) => {
                self.running = true;
                self.editing = false;
                self.analysis = None;
                self.scroll = 0;
                self.push_status(format!("analyzing {}", request.url()));
                KeyAction::Analyze(request)
            }
            None => {
                self.push_error(AnalysisError::EmptyInput.to_string());
                KeyAction::None
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> KeyAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return KeyAction::Quit;
        }

        if self.help_mode {
            if matches!(
                key.code,
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?') | KeyCode::Char('q')
            ) {
                self.help_mode = false;
            }
            return KeyAction::None;
        }

        if self.editing {
            match key.code {
                KeyCode::Enter => return self.request_analysis(),
                KeyCode::Esc => self.editing = false,
                KeyCode::Backspace => {
                    self.input.pop();
                }
                KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.input.clear();
                }
                KeyCode::Char(ch) => self.input.push(ch),
                _ => {}
            }
            return KeyAction::None;
        }

        match key.code {
            KeyCode::Char('q') => return KeyAction::Quit,
            KeyCode::Enter => return self.request_analysis(),
            KeyCode::Char('e') | KeyCode::Char('/') => self.editing = true,
            KeyCode::Char('?') => self.help_mode = true,
            KeyCode::Char('s') | KeyCode::Char('S') => return KeyAction::Save,
            KeyCode::Tab | KeyCode::BackTab => {
                self.active_tab = self.active_tab.toggle();
                self.scroll = 0;
            }
            KeyCode::Char('t') => self.active_tab = ActiveTab::Technology,
            KeyCode::Char('a') => self.active_tab = ActiveTab::Analysis,
            KeyCode::Char('1') => self.show_source(SourceView::Html),
            KeyCode::Char('2') => self.show_source(SourceView::Css),
            KeyCode::Char('3') => self.show_source(SourceView::Js),
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll = self.scroll.saturating_add(1),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(PAGE_JUMP_STEP),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(PAGE_JUMP_STEP),
            KeyCode::Home | KeyCode::Char('g') => self.scroll = 0,
            KeyCode::End | KeyCode::Char('G') => self.scroll = u16::MAX,
            _ => {}
        }
        KeyAction::None
    }

    fn show_source(&mut self, view: SourceView) {
        self.active_tab = ActiveTab::Technology;
        self.source_view = view;
        self.scroll = 0;
    }

    pub fn handle_analysis_event(&mut self, event: AnalysisEvent) {
        self.running = false;
        match event {
            AnalysisEvent::Finished(analysis) => {
                self.push_status(format!("analysis finished for {}", analysis.request.url()));
                self.analysis = Some(*analysis);
                self.active_tab = ActiveTab::Analysis;
            }
            AnalysisEvent::Failed(message) => {
                self.analysis = None;
                self.push_error(message);
            }
        }
    }
}

pub fn failure_message(err: &AnalysisError) -> String {
    if err.is_fetch_failure() {
        format!("{FETCH_FAILURE_NOTICE} ({err})")
    } else {
        err.to_string()
    }
}

fn spawn_analysis(
    client: &reqwest::Client,
    request: AnalysisRequest,
    tx: &UnboundedSender<AnalysisEvent>,
) {
    let client = client.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let event = match analyze(&client, request).await {
            Ok(analysis) => AnalysisEvent::Finished(Box::new(analysis)),
            Err(err) => {
                warn!(error = %err, "analysis failed");
                AnalysisEvent::Failed(failure_message(&err))
            }
        };
        let _ = tx.send(event);
    });
}

pub async fn run_tui(client: reqwest::Client, cli: Cli) -> Result<(), AnalysisError> {
    let (tx, mut rx) = mpsc::unbounded_channel::<AnalysisEvent>();
    let mut state = AppState::new(cli.url.clone().unwrap_or_default());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = draw_loop(&mut terminal, &client, &cli.output, &mut state, &tx, &mut rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn draw_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    client: &reqwest::Client,
    output_path: &str,
    state: &mut AppState,
    tx: &UnboundedSender<AnalysisEvent>,
    rx: &mut UnboundedReceiver<AnalysisEvent>,
) -> Result<(), AnalysisError> {
    let tick_rate = Duration::from_millis(120);

    loop {
        while let Ok(event) = rx.try_recv() {
            state.handle_analysis_event(event);
        }

        terminal.draw(|f| draw(f, state, output_path))?;

        if !event::poll(tick_rate)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match state.handle_key(key) {
            KeyAction::None => {}
            KeyAction::Quit => break,
            KeyAction::Analyze(request) => spawn_analysis(client, request, tx),
            KeyAction::Save => match state.analysis.as_ref() {
                Some(analysis) => match save_chart(output_path, &analysis.chart) {
                    Ok(()) => {
                        info!(path = output_path, "chart saved from shell");
                        state.push_status(format!("saved chart to {output_path}"));
                    }
                    Err(err) => state.push_error(format!("save failed: {err}")),
                },
                None => state.push_error("nothing to save yet".to_string()),
            },
        }
    }

    Ok(())
}

fn draw(f: &mut Frame<'_>, state: &mut AppState, output_path: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(12),
            Constraint::Length(4),
        ])
        .split(f.area());

    draw_input(f, state, chunks[0]);

    let hotkey_style = Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD);
    let tab_label_style = Style::default().fg(Color::Gray);
    let tabs = Tabs::new(vec![
        Line::from(vec![
            Span::styled("T", hotkey_style),
            Span::styled(" Technology", tab_label_style),
        ]),
        Line::from(vec![
            Span::styled("A", hotkey_style),
            Span::styled(" Analysis", tab_label_style),
        ]),
    ])
    .select(state.active_tab.as_index())
    .block(Block::default().title("View").borders(Borders::ALL))
    .highlight_style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(tabs, chunks[1]);

    match state.active_tab {
        ActiveTab::Technology => draw_technology(f, state, chunks[2]),
        ActiveTab::Analysis => draw_analysis(f, state, chunks[2]),
    }

    draw_footer(f, state, output_path, chunks[3]);

    if state.help_mode {
        draw_help(f);
    }
}

fn draw_input(f: &mut Frame<'_>, state: &AppState, area: Rect) {
    let border_style = if state.editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let title = if state.running {
        "Domain (analyzing...)"
    } else if state.editing {
        "Domain (enter to analyze, esc to leave)"
    } else {
        "Domain (e to edit)"
    };
    let mut spans = vec![Span::raw(state.input.clone())];
    if state.editing {
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
    }
    f.render_widget(
        Paragraph::new(Line::from(spans)).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(border_style),
        ),
        area,
    );
}

fn placeholder(title: &str) -> Paragraph<'_> {
    Paragraph::new(PLACEHOLDER)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().title(title).borders(Borders::ALL))
        .wrap(Wrap { trim: true })
}

fn draw_technology(f: &mut Frame<'_>, state: &mut AppState, area: Rect) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let hotkey_style = Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD);
    let labels = [SourceView::Html, SourceView::Css, SourceView::Js]
        .iter()
        .enumerate()
        .map(|(idx, view)| {
            Line::from(vec![
                Span::styled((idx + 1).to_string(), hotkey_style),
                Span::raw(format!(" {}", view.title())),
            ])
        })
        .collect::<Vec<_>>();
    f.render_widget(
        Tabs::new(labels)
            .select(state.source_view.as_index())
            .block(Block::default().borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Cyan)),
        parts[0],
    );

    let title = state.source_view.title();
    let Some(content) = state.source_text() else {
        f.render_widget(placeholder(title), parts[1]);
        return;
    };

    let viewport = parts[1].height.saturating_sub(2);
    state.scroll = state.scroll.min(max_scroll(&content, viewport));
    f.render_widget(
        Paragraph::new(content)
            .block(
                Block::default()
                    .title(format!("{title} (line {})", state.scroll.saturating_add(1)))
                    .borders(Borders::ALL),
            )
            .scroll((state.scroll, 0)),
        parts[1],
    );
}

/// Same wording as the chart's summary heading.
fn about_title(analysis: &Analysis) -> String {
    format!("About {}", capitalize(&analysis.document.domain_name))
}

fn draw_analysis(f: &mut Frame<'_>, state: &AppState, area: Rect) {
    let Some(analysis) = state.analysis.as_ref() else {
        f.render_widget(placeholder("Analysis"), area);
        return;
    };
    let report = &analysis.report;
    let metrics = &report.metrics;

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Percentage(50),
            Constraint::Percentage(50),
        ])
        .split(area);

    f.render_widget(
        Paragraph::new(vec![
            Line::from(vec![
                Span::styled("SEO Analysis on ", Style::default().fg(Color::Gray)),
                Span::styled(
                    report.url.clone(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(metrics.summary_text().to_string()),
        ])
        .block(
            Block::default()
                .title(about_title(analysis))
                .borders(Borders::ALL),
        )
        .wrap(Wrap { trim: true }),
        rows[0],
    );

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[2]);

    let header_block = Block::default().title("Header Tags").borders(Borders::ALL);
    if metrics.header_counts.is_empty() {
        f.render_widget(
            Paragraph::new("No header tags found").block(header_block),
            top[0],
        );
    } else {
        let bars = metrics
            .header_counts
            .iter()
            .map(|entry| {
                Bar::default()
                    .value(entry.count as u64)
                    .label(Line::from(entry.tag.as_str()))
            })
            .collect::<Vec<_>>();
        f.render_widget(
            BarChart::default()
                .block(header_block)
                .data(BarGroup::default().bars(&bars))
                .bar_width(5)
                .bar_gap(2)
                .bar_style(Style::default().fg(Color::LightBlue))
                .value_style(Style::default().fg(Color::Black).bg(Color::LightBlue)),
            top[0],
        );
    }

    let share_block = Block::default()
        .title("Technology Distribution")
        .borders(Borders::ALL);
    let share_area = share_block.inner(top[1]);
    f.render_widget(share_block, top[1]);
    let gauge_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(share_area);
    for (idx, (label, pct)) in metrics.technology_share.slices().into_iter().enumerate() {
        f.render_widget(
            Gauge::default()
                .block(Block::default().title(label).borders(Borders::ALL))
                .gauge_style(share_style(label))
                .ratio((pct / 100.0).clamp(0.0, 1.0))
                .label(format!("{pct:.1}%")),
            gauge_rows[idx],
        );
    }

    let bigram_rows = metrics
        .top_bigrams
        .iter()
        .map(|bigram| {
            Row::new(vec![
                Cell::from(bigram.label()),
                Cell::from(bigram.count.to_string()),
            ])
        })
        .collect::<Vec<_>>();
    f.render_widget(
        Table::new(bigram_rows, [Constraint::Min(16), Constraint::Length(7)])
            .header(
                Row::new(vec!["Bigram", "Count"])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .block(
                Block::default()
                    .title("Top 10 Bigrams")
                    .borders(Borders::ALL),
            ),
        bottom[0],
    );

    let link_width = usize::from(bottom[1].width.saturating_sub(8));
    let link_rows = metrics
        .top_links
        .iter()
        .enumerate()
        .map(|(idx, link)| {
            Row::new(vec![
                Cell::from((idx + 1).to_string()),
                Cell::from(truncate_middle(link, link_width)),
            ])
        })
        .collect::<Vec<_>>();
    f.render_widget(
        Table::new(link_rows, [Constraint::Length(3), Constraint::Min(10)])
            .header(
                Row::new(vec!["#", "Top Links"])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .block(Block::default().title("Top Links").borders(Borders::ALL)),
        bottom[1],
    );
}

fn draw_footer(f: &mut Frame<'_>, state: &AppState, output_path: &str, area: Rect) {
    let latest_error = state.errors.front().cloned();
    let latest_status = state
        .status_messages
        .front()
        .cloned()
        .unwrap_or_else(|| "ready".to_string());
    let border_style = if latest_error.is_some() && state.analysis.is_none() {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let mut lines = vec![Line::from(vec![
        Span::styled("Status ", Style::default().fg(Color::Gray)),
        Span::raw(latest_status),
        Span::styled("  |  ", Style::default().fg(Color::DarkGray)),
        Span::styled("s", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(" save {output_path}  ")),
        Span::styled("?", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" help  "),
        Span::styled("q", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" quit"),
    ])];
    if let Some(err) = latest_error {
        lines.push(Line::from(Span::styled(
            err,
            Style::default().fg(Color::LightRed),
        )));
    }

    f.render_widget(
        Paragraph::new(lines)
            .block(
                Block::default()
                    .title("Command Bar")
                    .borders(Borders::ALL)
                    .border_style(border_style),
            )
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn draw_help(f: &mut Frame<'_>) {
    let area = centered_rect(64, 60, f.area());
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(vec![
            Line::from("Input"),
            Line::from("  type a domain, enter: analyze"),
            Line::from("  esc: leave input, e or /: edit again"),
            Line::from("  ctrl+u: clear input"),
            Line::from(""),
            Line::from("Views"),
            Line::from("  tab: switch Technology / Analysis"),
            Line::from("  1 / 2 / 3: HTML, CSS, Javascript source"),
            Line::from("  up/down or j/k, pgup/pgdn, g/G: scroll"),
            Line::from(""),
            Line::from("Actions"),
            Line::from("  s: save the composite chart"),
            Line::from("  q or ctrl+c: quit"),
        ])
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .wrap(Wrap { trim: true }),
        area,
    );
}
