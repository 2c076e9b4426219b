use std::{
    collections::VecDeque,
    sync::mpsc::{Receiver, TryRecvError},
    time::Duration,
};

use anyhow::Result;
use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use overlay_display::DisplayState;
use overlay_types::{
    advice::AdviceKind,
    config::{FontSize, HotkeyConfig, OverlayConfig},
    events::{EventPayload, SystemEvent},
    view::{format_clock, ConnectionState, MatchView, OverlayView, WaitingReason},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

const MAX_LOG_ENTRIES: usize = 120;

pub enum UiMessage {
    Event(SystemEvent),
    Display(DisplayState),
    Config(Box<OverlayConfig>),
}

/// Hotkey actions handed back to the async side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand {
    ToggleVisibility,
    CycleMode,
    ResetPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotkeys {
    toggle: KeyCode,
    cycle_mode: KeyCode,
    reset_position: KeyCode,
}

impl Hotkeys {
    /// Unparsable bindings fall back to the default key for that action.
    pub fn from_config(config: &HotkeyConfig) -> Self {
        let defaults = HotkeyConfig::default();
        let resolve = |name: &str, binding: &str, fallback: &str| {
            parse_key(binding).unwrap_or_else(|| {
                warn!(hotkey = name, binding, "unsupported key binding, using {fallback}");
                parse_key(fallback).unwrap_or(KeyCode::Null)
            })
        };
        Self {
            toggle: resolve("toggle", &config.toggle, &defaults.toggle),
            cycle_mode: resolve("cycle_mode", &config.cycle_mode, &defaults.cycle_mode),
            reset_position: resolve(
                "reset_position",
                &config.reset_position,
                &defaults.reset_position,
            ),
        }
    }

    pub fn command_for(&self, key: KeyCode) -> Option<UiCommand> {
        if key == self.toggle {
            Some(UiCommand::ToggleVisibility)
        } else if key == self.cycle_mode {
            Some(UiCommand::CycleMode)
        } else if key == self.reset_position {
            Some(UiCommand::ResetPosition)
        } else {
            None
        }
    }
}

/// Accepts `F1`..`F24` and single characters.
pub fn parse_key(binding: &str) -> Option<KeyCode> {
    let binding = binding.trim();
    if let Some(number) = binding
        .strip_prefix('F')
        .or_else(|| binding.strip_prefix('f'))
    {
        if let Ok(n) = number.parse::<u8>() {
            return (1..=24).contains(&n).then_some(KeyCode::F(n));
        }
    }
    let mut chars = binding.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(KeyCode::Char(c)),
        _ => None,
    }
}

struct Screen {
    view: OverlayView,
    display: Option<DisplayState>,
    config: OverlayConfig,
    logs: VecDeque<String>,
    status: String,
}

impl Screen {
    fn new(config: OverlayConfig) -> Self {
        Self {
            view: OverlayView::waiting(ConnectionState::Idle, WaitingReason::ClientUnavailable),
            display: None,
            config,
            logs: VecDeque::with_capacity(MAX_LOG_ENTRIES),
            status: String::from("starting"),
        }
    }

    fn apply(&mut self, event: SystemEvent) {
        if let Some(view) = event.as_view() {
            self.view = view.clone();
        } else {
            self.status = summarize_status(&event);
            if self.logs.len() == MAX_LOG_ENTRIES {
                self.logs.pop_front();
            }
            self.logs.push_back(format_event(&event));
        }
    }

    fn visible(&self) -> bool {
        self.display.map_or(true, |display| display.visible)
    }
}

pub fn run(
    receiver: Receiver<UiMessage>,
    commands: UnboundedSender<UiCommand>,
    config: OverlayConfig,
    summary: String,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let res = run_loop(&mut terminal, receiver, commands, config, summary.as_str());

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    res
}

fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    receiver: Receiver<UiMessage>,
    commands: UnboundedSender<UiCommand>,
    config: OverlayConfig,
    summary: &str,
) -> Result<()> {
    let mut hotkeys = Hotkeys::from_config(&config.hotkeys);
    let mut screen = Screen::new(config);

    loop {
        let mut should_close = false;
        loop {
            match receiver.try_recv() {
                Ok(UiMessage::Event(event)) => screen.apply(event),
                Ok(UiMessage::Display(state)) => screen.display = Some(state),
                Ok(UiMessage::Config(config)) => {
                    hotkeys = Hotkeys::from_config(&config.hotkeys);
                    screen.config = *config;
                }
                Err(TryRecvError::Disconnected) => {
                    should_close = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
            }
        }
        if should_close {
            break;
        }

        terminal.draw(|f| render(f, &screen, summary))?;

        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    break;
                }
                if let Some(command) = hotkeys.command_for(key.code) {
                    if commands.send(command).is_err() {
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

fn render(f: &mut Frame, screen: &Screen, summary: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(8),
        ])
        .split(f.size());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "MacroOverlay",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::raw(screen.status.clone()),
        Span::raw("  "),
        Span::styled("config:", Style::default().fg(Color::Magenta)),
        Span::raw(" "),
        Span::raw(summary),
        Span::raw("  "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" quits"),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(header, chunks[0]);

    let display = &screen.config.display;
    let title = match screen.display {
        Some(state) => format!(
            "Overlay @ {},{} {}x{}{}",
            state.bounds.origin.x,
            state.bounds.origin.y,
            state.bounds.size.width,
            state.bounds.size.height,
            if state.click_through {
                " (click-through)"
            } else {
                ""
            }
        ),
        None => "Overlay".to_string(),
    };
    let body = if screen.visible() {
        view_lines(&screen.view, &screen.config)
    } else {
        vec![Line::from(Span::styled(
            format!("hidden, press {} to show", screen.config.hotkeys.toggle),
            Style::default().fg(Color::DarkGray),
        ))]
    };
    let mut text_style = Style::default();
    if display.font_size == FontSize::Large {
        text_style = text_style.add_modifier(Modifier::BOLD);
    }
    let overlay = Paragraph::new(body)
        .style(text_style)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(overlay, chunks[1]);

    let items: Vec<ListItem> = screen
        .logs
        .iter()
        .rev()
        .map(|entry| ListItem::new(entry.clone()))
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Events"));
    f.render_widget(list, chunks[2]);
}

/// Text content of the overlay panel for one view.
fn view_lines(view: &OverlayView, config: &OverlayConfig) -> Vec<Line<'static>> {
    match view {
        OverlayView::Waiting { reason, .. } => vec![Line::from(Span::styled(
            reason.message(),
            Style::default().fg(Color::Gray),
        ))],
        OverlayView::Match(view) => match_lines(view, config),
    }
}

fn match_lines(view: &MatchView, config: &OverlayConfig) -> Vec<Line<'static>> {
    let compact = config.display.compact_mode;
    let heading = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let mut lines = Vec::new();

    if let Some(game_time) = view.game_time {
        lines.push(Line::from(vec![
            Span::styled("Game time ", heading),
            Span::raw(format_clock(game_time)),
        ]));
    }

    if !compact {
        if let Some(player) = &view.player {
            lines.push(Line::from(format!(
                "{}  lvl {}  {}g",
                player.champion, player.level, player.gold
            )));
        }
    }

    if let Some(gold) = &view.gold {
        let color = match gold.difference {
            d if d > 0 => Color::Green,
            d if d < 0 => Color::Red,
            _ => Color::Gray,
        };
        let mut spans = Vec::new();
        if !compact {
            spans.push(Span::raw(format!("Team {}g  Enemy {}g  ", gold.team, gold.enemy)));
        }
        spans.push(Span::styled(gold.difference_label(), Style::default().fg(color)));
        lines.push(Line::from(spans));
    }

    if let Some(objectives) = &view.objectives {
        lines.push(Line::from(Span::styled("Objectives", heading)));
        let timers = if compact {
            &objectives.timers[..objectives.timers.len().min(1)]
        } else {
            &objectives.timers[..]
        };
        for timer in timers {
            let style = if timer.countdown == 0 {
                Style::default().fg(Color::Green)
            } else if timer.warning {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            let mut spans = vec![
                Span::raw(format!("  {:<7}", timer.kind.label())),
                Span::styled(timer.label.clone(), style),
            ];
            if let Some(gold) = timer.gold_value {
                spans.push(Span::raw(format!("  {gold}g")));
            }
            lines.push(Line::from(spans));
        }
        if let Some(next) = &objectives.next_best {
            lines.push(Line::from(format!("  Next: {next}")));
        }
        if let (false, Some(footer)) = (compact, &objectives.footer) {
            lines.push(Line::from(Span::styled(
                format!(
                    "  Plate {}g  Cannon wave {}g",
                    footer.tower_plate, footer.cannon_wave
                ),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    if let Some(advice) = &view.advice {
        let (marker, color) = match advice.verdict.kind {
            AdviceKind::Fight => ("▲", Color::Green),
            AdviceKind::Trade => ("◆", Color::Yellow),
            AdviceKind::Avoid => ("▼", Color::Red),
        };
        let mut spans = Vec::new();
        if advice.show_icon {
            spans.push(Span::styled(format!("{marker} "), Style::default().fg(color)));
        }
        spans.push(Span::styled(
            advice.verdict.message.clone(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        if advice.show_confidence {
            spans.push(Span::raw(format!(" ({:.0}%)", advice.verdict.confidence)));
        }
        lines.push(Line::from(spans));
    }

    if let (false, Some(rules)) = (compact, &view.rules) {
        lines.push(Line::from(Span::styled(
            format!("{} ({:?})", rules.champion, rules.phase),
            heading,
        )));
        if rules.rules.is_empty() {
            lines.push(Line::from("  no reminders right now"));
        }
        for rule in &rules.rules {
            lines.push(Line::from(format!("  • {}", rule.text)));
        }
    }

    lines
}

fn summarize_status(event: &SystemEvent) -> String {
    match &event.payload {
        EventPayload::Lifecycle(lifecycle) => format!("lifecycle: {:?}", lifecycle.phase),
        EventPayload::Connection(connection) => format!("client: {:?}", connection.state),
        EventPayload::View(_) => "view updated".to_string(),
        EventPayload::Display(display) => format!("display: {}", display.command),
        EventPayload::Telemetry(_) => "telemetry".to_string(),
        EventPayload::Ops(_) => "ops notice".to_string(),
        EventPayload::Unknown(_) => "unknown event".to_string(),
    }
}

fn format_event(event: &SystemEvent) -> String {
    let timestamp = event.timestamp.format("%H:%M:%S");
    match &event.payload {
        EventPayload::Lifecycle(lifecycle) => format!(
            "[{}] Lifecycle::{:?} {}",
            timestamp,
            lifecycle.phase,
            lifecycle.details.clone().unwrap_or_default()
        ),
        EventPayload::Connection(connection) => format!(
            "[{}] Connection::{:?} {}",
            timestamp,
            connection.state,
            connection.details.clone().unwrap_or_default()
        ),
        EventPayload::View(_) => format!("[{}] View updated", timestamp),
        EventPayload::Display(display) => format!(
            "[{}] Display {} {}",
            timestamp,
            display.command,
            if display.acknowledged { "ok" } else { "failed" }
        ),
        EventPayload::Telemetry(_) => format!("[{}] Telemetry update", timestamp),
        EventPayload::Ops(ops) => format!(
            "[{}] Ops {} [{}]",
            timestamp,
            ops.message,
            ops.tags.join(", ")
        ),
        EventPayload::Unknown(value) => format!("[{}] Unknown payload {}", timestamp, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_types::{
        advice::AdviceVerdict,
        events::LifecyclePhase,
        view::{AdviceSection, GoldStatus},
    };

    fn text(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect()
    }

    fn fight_view() -> OverlayView {
        OverlayView::Match(MatchView {
            game_time: Some(800),
            gold: Some(GoldStatus::new(15_000, 12_000)),
            advice: Some(AdviceSection {
                verdict: AdviceVerdict {
                    kind: AdviceKind::Fight,
                    message: "Force fights".into(),
                    confidence: 95.0,
                },
                show_confidence: true,
                show_icon: false,
            }),
            ..MatchView::default()
        })
    }

    #[test]
    fn parses_key_bindings() {
        assert_eq!(parse_key("F10"), Some(KeyCode::F(10)));
        assert_eq!(parse_key(" f12 "), Some(KeyCode::F(12)));
        assert_eq!(parse_key("h"), Some(KeyCode::Char('h')));
        assert_eq!(parse_key("F99"), None);
        assert_eq!(parse_key("Ctrl+H"), None);
        assert_eq!(parse_key("F"), Some(KeyCode::Char('F')));
    }

    #[test]
    fn hotkeys_map_to_commands() {
        let hotkeys = Hotkeys::from_config(&HotkeyConfig {
            toggle: "t".into(),
            cycle_mode: "nonsense".into(),
            ..HotkeyConfig::default()
        });
        assert_eq!(
            hotkeys.command_for(KeyCode::Char('t')),
            Some(UiCommand::ToggleVisibility)
        );
        assert_eq!(
            hotkeys.command_for(KeyCode::F(11)),
            Some(UiCommand::CycleMode)
        );
        assert_eq!(
            hotkeys.command_for(KeyCode::F(12)),
            Some(UiCommand::ResetPosition)
        );
        assert_eq!(hotkeys.command_for(KeyCode::F(10)), None);
    }

    #[test]
    fn waiting_view_shows_reason() {
        let view = OverlayView::waiting(ConnectionState::Connected, WaitingReason::NoActiveMatch);
        assert_eq!(
            text(&view_lines(&view, &OverlayConfig::default())),
            vec!["Waiting for a match to start...".to_string()]
        );
    }

    #[test]
    fn match_view_lines() {
        let lines = text(&view_lines(&fight_view(), &OverlayConfig::default()));
        assert_eq!(lines[0], "Game time 13:20");
        assert_eq!(lines[1], "Team 15000g  Enemy 12000g  +3000g");
        assert_eq!(lines[2], "Force fights (95%)");

        let mut compact = OverlayConfig::default();
        compact.display.compact_mode = true;
        let lines = text(&view_lines(&fight_view(), &compact));
        assert_eq!(lines[1], "+3000g");
    }

    #[test]
    fn lifecycle_events_update_status() {
        let mut screen = Screen::new(OverlayConfig::default());
        screen.apply(SystemEvent::lifecycle(LifecyclePhase::Ready, "ready"));
        assert_eq!(screen.status, "lifecycle: Ready");
        assert_eq!(screen.logs.len(), 1);

        screen.apply(SystemEvent::view(fight_view()));
        assert_eq!(screen.view, fight_view());
        assert_eq!(screen.logs.len(), 1);
        assert!(screen.visible());
    }
}
