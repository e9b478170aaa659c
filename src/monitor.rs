//! Interactive terminal monitor
//!
//! Full-screen view of a running [`Simulator`]: profile header, stat cards,
//! filter tabs and the newest events. A second panel shows the demonstration
//! rule table. Keys drive the simulator and the rule store directly; the
//! screen redraws whenever a new snapshot is published or a key is handled.
//!
//! | Key            | Action                          |
//! |----------------|---------------------------------|
//! | `s`            | start (clears the log)          |
//! | `space` / `p`  | pause or resume                 |
//! | `c`            | clear the log                   |
//! | `f` / `Tab`    | next filter tab                 |
//! | `+` / `-`      | activity level up / down        |
//! | `o` `b` `d`    | next OS / browser / device type |
//! | `i`            | edit the source address         |
//! | `r`            | switch traffic / rules panel    |
//! | `q` / `Esc`    | quit                            |
//!
//! In the rules panel:
//!
//! | Key            | Action                          |
//! |----------------|---------------------------------|
//! | `j` `k` / arrows | select rule                   |
//! | `a` / `e`      | add / edit rule at the prompt   |
//! | `t`            | enable or disable rule          |
//! | `x` / `Delete` | delete rule                     |
//! | `u` / `y`      | undo / redo                     |
//!
//! While the prompt is open, typed characters go to its buffer, `Enter`
//! applies it and `Esc` closes it.
//!
//! Rendering is split from drawing: [`render`] turns a snapshot into styled
//! lines and is pure, [`run`] owns the terminal.

use crate::core::error::Result;
use crate::core::generator::events_per_tick;
use crate::core::rules::{Rule, RuleDraft, RuleStore};
use crate::core::simulator::{RunState, SimulationSnapshot, Simulator};
use crate::core::traffic::{ProfileUpdate, TrafficEvent};
use crate::core::traffic_log::{LogFilter, format_bytes};
use crate::utils::fit;
use crate::validators::well_known_service;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Color, Print, PrintStyledContent, Stylize, style};
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, execute, queue};
use futures::StreamExt;
use std::io::Write;
use strum::IntoEnumIterator;
use uuid::Uuid;

pub const FOOTER_RUNNING: &str = "Monitoring traffic in real-time...";
pub const FOOTER_PAUSED: &str = "Monitoring paused";
pub const EMPTY_TABLE: &str = "No traffic logs to display";
pub const EMPTY_RULES: &str = "No firewall rules";

const KEY_HELP: &str =
    "s start  space pause/resume  c clear  f filter  +/- level  o/b/d profile  i address  r rules  q quit";
const RULES_KEY_HELP: &str =
    "j/k select  a add  e edit  t toggle  x delete  u undo  y redo  r traffic  q quit";
const PROMPT_HELP: &str = "Enter apply  Esc cancel";

/// Longest text the prompt accepts
const MAX_PROMPT_LEN: usize = 160;

/// Lines above the table (title, profile, blank, cards, blank, tabs, blank, header)
const HEADER_ROWS: usize = 8;
/// Lines below the table (blank, footer, status)
const FOOTER_ROWS: usize = 3;

/// User intent decoded from a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorAction {
    Start,
    Toggle,
    Clear,
    NextFilter,
    LevelUp,
    LevelDown,
    NextOperatingSystem,
    NextBrowser,
    NextDeviceType,
    EditAddress,
    SwitchPanel,
    SelectPrevious,
    SelectNext,
    AddRule,
    EditRule,
    ToggleRule,
    DeleteRule,
    Undo,
    Redo,
    /// A character typed at the prompt
    Input(char),
    Backspace,
    Submit,
    Cancel,
    Quit,
}

impl MonitorAction {
    /// Key map of the traffic panel. See [`MonitorView::decode`] for the
    /// panel and prompt aware version.
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        if is_interrupt(key) {
            return Some(Self::Quit);
        }

        let action = match key.code {
            KeyCode::Char('s' | 'S') => Self::Start,
            KeyCode::Char(' ' | 'p' | 'P') => Self::Toggle,
            KeyCode::Char('c' | 'C') => Self::Clear,
            KeyCode::Char('f' | 'F') | KeyCode::Tab => Self::NextFilter,
            KeyCode::Char('+' | '=') | KeyCode::Up => Self::LevelUp,
            KeyCode::Char('-' | '_') | KeyCode::Down => Self::LevelDown,
            KeyCode::Char('o' | 'O') => Self::NextOperatingSystem,
            KeyCode::Char('b' | 'B') => Self::NextBrowser,
            KeyCode::Char('d' | 'D') => Self::NextDeviceType,
            KeyCode::Char('i' | 'I') => Self::EditAddress,
            KeyCode::Char('r' | 'R') => Self::SwitchPanel,
            KeyCode::Char('q' | 'Q') | KeyCode::Esc => Self::Quit,
            _ => return None,
        };
        Some(action)
    }
}

fn is_interrupt(key: KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

/// Which table fills the lower part of the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Panel {
    #[default]
    Traffic,
    Rules,
}

/// What the prompt line edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTarget {
    SourceAddress,
    NewRule,
    EditRule(Uuid),
}

impl PromptTarget {
    fn label(self) -> &'static str {
        match self {
            PromptTarget::SourceAddress => "Source address",
            PromptTarget::NewRule => "New rule (name, port, protocol, action, source, destination)",
            PromptTarget::EditRule(_) => "Edit rule (name, port, protocol, action, source, destination)",
        }
    }
}

/// One line of text being typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub target: PromptTarget,
    pub buffer: String,
}

/// Result of the last action, shown under the footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Info(String),
    Error(String),
}

/// Presentation state that lives outside the simulator
#[derive(Debug, Clone)]
pub struct MonitorView {
    pub filter: LogFilter,
    pub panel: Panel,
    /// Rule table shown in the rules panel
    pub rules: RuleStore,
    /// Index of the highlighted rule
    pub selected: usize,
    pub prompt: Option<Prompt>,
    pub status: Option<Status>,
}

impl Default for MonitorView {
    fn default() -> Self {
        Self {
            filter: LogFilter::default(),
            panel: Panel::default(),
            rules: RuleStore::with_defaults(),
            selected: 0,
            prompt: None,
            status: None,
        }
    }
}

impl MonitorView {
    /// Decodes `key` for the current mode: the open prompt takes every
    /// printable key, the rules panel adds its own keys on top of
    /// [`MonitorAction::from_key`].
    pub fn decode(&self, key: KeyEvent) -> Option<MonitorAction> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        if self.prompt.is_some() {
            return match key.code {
                _ if is_interrupt(key) => Some(MonitorAction::Quit),
                KeyCode::Enter => Some(MonitorAction::Submit),
                KeyCode::Esc => Some(MonitorAction::Cancel),
                KeyCode::Backspace => Some(MonitorAction::Backspace),
                KeyCode::Char(c) => Some(MonitorAction::Input(c)),
                _ => None,
            };
        }
        if self.panel == Panel::Rules {
            let action = match key.code {
                KeyCode::Char('k' | 'K') | KeyCode::Up => Some(MonitorAction::SelectPrevious),
                KeyCode::Char('j' | 'J') | KeyCode::Down => Some(MonitorAction::SelectNext),
                KeyCode::Char('a' | 'A') => Some(MonitorAction::AddRule),
                KeyCode::Char('e' | 'E') | KeyCode::Enter => Some(MonitorAction::EditRule),
                KeyCode::Char('t' | 'T') => Some(MonitorAction::ToggleRule),
                KeyCode::Char('x' | 'X') | KeyCode::Delete => Some(MonitorAction::DeleteRule),
                KeyCode::Char('u' | 'U') => Some(MonitorAction::Undo),
                KeyCode::Char('y' | 'Y') => Some(MonitorAction::Redo),
                _ => None,
            };
            if action.is_some() {
                return action;
            }
        }
        MonitorAction::from_key(key)
    }

    /// Applies `action`. Returns `false` when the monitor should exit.
    pub fn handle(&mut self, action: MonitorAction, simulator: &Simulator) -> bool {
        if action == MonitorAction::Quit {
            return false;
        }
        match self.apply(action, simulator) {
            Ok(message) => self.status = message.map(Status::Info),
            Err(e) => {
                tracing::warn!(?action, "Monitor action failed: {e}");
                self.status = Some(Status::Error(e.to_string()));
            }
        }
        true
    }

    /// Runs one action; `Ok(Some(_))` carries a message for the status line
    fn apply(&mut self, action: MonitorAction, simulator: &Simulator) -> Result<Option<String>> {
        let profile = simulator.profile();
        match action {
            MonitorAction::Quit => {}
            MonitorAction::Start => simulator.start()?,
            MonitorAction::Toggle => {
                simulator.toggle()?;
            }
            MonitorAction::Clear => simulator.clear(),
            MonitorAction::NextFilter => self.filter = self.filter.next(),
            MonitorAction::LevelUp => simulator.update_profile(ProfileUpdate::ActivityLevel(
                profile.activity_level.increment(),
            ))?,
            MonitorAction::LevelDown => simulator.update_profile(ProfileUpdate::ActivityLevel(
                profile.activity_level.decrement(),
            ))?,
            MonitorAction::NextOperatingSystem => simulator.update_profile(
                ProfileUpdate::OperatingSystem(next_variant(profile.operating_system)),
            )?,
            MonitorAction::NextBrowser => {
                simulator.update_profile(ProfileUpdate::Browser(next_variant(profile.browser)))?;
            }
            MonitorAction::NextDeviceType => simulator
                .update_profile(ProfileUpdate::DeviceType(next_variant(profile.device_type)))?,
            MonitorAction::EditAddress => {
                self.open_prompt(PromptTarget::SourceAddress, profile.source_address);
            }
            MonitorAction::SwitchPanel => {
                self.panel = match self.panel {
                    Panel::Traffic => Panel::Rules,
                    Panel::Rules => Panel::Traffic,
                };
            }
            MonitorAction::SelectPrevious => self.selected = self.selected.saturating_sub(1),
            MonitorAction::SelectNext => {
                self.selected += 1;
                self.clamp_selection();
            }
            MonitorAction::AddRule => self.open_prompt(PromptTarget::NewRule, String::new()),
            MonitorAction::EditRule => {
                if let Some(rule) = self.selected_rule() {
                    let (id, line) = (rule.id, RuleDraft::from_rule(rule).to_line());
                    self.open_prompt(PromptTarget::EditRule(id), line);
                }
            }
            MonitorAction::ToggleRule => {
                if let Some(id) = self.selected_rule().map(|rule| rule.id) {
                    let enabled = self.rules.toggle(id)?;
                    let state = if enabled { "enabled" } else { "disabled" };
                    return Ok(Some(format!("Rule {state}")));
                }
            }
            MonitorAction::DeleteRule => {
                if let Some(id) = self.selected_rule().map(|rule| rule.id) {
                    self.rules.delete(id)?;
                    self.clamp_selection();
                    return Ok(Some("Rule deleted".to_string()));
                }
            }
            MonitorAction::Undo => {
                let message = match self.rules.undo() {
                    Some(description) => format!("Undo: {description}"),
                    None => "Nothing to undo".to_string(),
                };
                self.clamp_selection();
                return Ok(Some(message));
            }
            MonitorAction::Redo => {
                let message = match self.rules.redo() {
                    Some(description) => format!("Redo: {description}"),
                    None => "Nothing to redo".to_string(),
                };
                self.clamp_selection();
                return Ok(Some(message));
            }
            MonitorAction::Input(c) => {
                if let Some(prompt) = &mut self.prompt
                    && !c.is_control()
                    && prompt.buffer.chars().count() < MAX_PROMPT_LEN
                {
                    prompt.buffer.push(c);
                }
            }
            MonitorAction::Backspace => {
                if let Some(prompt) = &mut self.prompt {
                    prompt.buffer.pop();
                }
            }
            MonitorAction::Cancel => self.prompt = None,
            MonitorAction::Submit => {
                if let Some(prompt) = self.prompt.take() {
                    let result = self.submit(&prompt, simulator);
                    if result.is_err() {
                        // Keep the text so it can be corrected
                        self.prompt = Some(prompt);
                    }
                    return result;
                }
            }
        }
        Ok(None)
    }

    fn submit(&mut self, prompt: &Prompt, simulator: &Simulator) -> Result<Option<String>> {
        let input = prompt.buffer.trim();
        match prompt.target {
            PromptTarget::SourceAddress => {
                if input.is_empty() {
                    return Ok(None);
                }
                simulator.update_profile(ProfileUpdate::SourceAddress(input.to_string()))?;
                Ok(Some(format!("Source address set to {input}")))
            }
            PromptTarget::NewRule => {
                let id = self.rules.add(RuleDraft::parse_line(input)?)?;
                if let Some(index) = self.rules.rules().position(id) {
                    self.selected = index;
                }
                Ok(Some("Rule added".to_string()))
            }
            PromptTarget::EditRule(id) => {
                self.rules.update(id, RuleDraft::parse_line(input)?)?;
                Ok(Some("Rule updated".to_string()))
            }
        }
    }

    fn open_prompt(&mut self, target: PromptTarget, buffer: String) {
        self.prompt = Some(Prompt { target, buffer });
    }

    fn selected_rule(&self) -> Option<&Rule> {
        self.rules.rules().rules.get(self.selected)
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.rules.rules().len().saturating_sub(1));
    }
}

/// Variant after `current` in declaration order, wrapping around
fn next_variant<T: IntoEnumIterator + PartialEq + Copy>(current: T) -> T {
    let all: Vec<T> = T::iter().collect();
    let position = all.iter().position(|v| *v == current).unwrap_or(0);
    all[(position + 1) % all.len()]
}

/// One screen row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub color: Option<Color>,
}

impl Line {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
        }
    }

    fn colored(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color: Some(color),
        }
    }
}

/// Lays out one frame for a `width` x `height` terminal.
pub fn render(
    snapshot: &SimulationSnapshot,
    view: &MonitorView,
    width: usize,
    height: usize,
) -> Vec<Line> {
    let profile = &snapshot.profile;
    let summary = &snapshot.summary;
    let mut lines = Vec::with_capacity(height);

    let state = match snapshot.run_state {
        RunState::Idle => "IDLE",
        RunState::Running => "RUNNING",
        RunState::Paused => "PAUSED",
    };
    lines.push(Line::colored(
        format!(
            "FireGuard Traffic Monitor  [{state}]  level {}  {} event(s) every {}ms",
            profile.activity_level,
            events_per_tick(profile.activity_level),
            snapshot.tick_interval().as_millis()
        ),
        Color::Cyan,
    ));
    lines.push(Line::plain(format!(
        "{} ({})",
        profile.describe(),
        profile.source_address
    )));
    lines.push(Line::plain(""));
    lines.push(Line::plain(format!(
        "Total Traffic {}  |  Allowed {}  |  Blocked {}  |  Threats {}  |  Data {}",
        summary.total,
        summary.allowed,
        summary.blocked,
        summary.threats,
        format_bytes(summary.bytes)
    )));
    lines.push(Line::plain(""));

    let rows = height.saturating_sub(HEADER_ROWS + FOOTER_ROWS).max(1);
    let key_help = match view.panel {
        Panel::Traffic => {
            render_traffic(&mut lines, snapshot, view, rows);
            KEY_HELP
        }
        Panel::Rules => {
            render_rules(&mut lines, view, rows);
            RULES_KEY_HELP
        }
    };

    lines.push(Line::plain(""));
    let footer = if snapshot.run_state.is_running() {
        FOOTER_RUNNING
    } else {
        FOOTER_PAUSED
    };
    let help = if view.prompt.is_some() {
        PROMPT_HELP
    } else {
        key_help
    };
    lines.push(Line::plain(format!("{footer}    {help}")));

    if let Some(prompt) = &view.prompt {
        lines.push(Line::colored(
            format!("{}: {}_", prompt.target.label(), prompt.buffer),
            Color::Cyan,
        ));
    } else if let Some(status) = &view.status {
        lines.push(match status {
            Status::Info(message) => Line::colored(message.clone(), Color::Green),
            Status::Error(message) => Line::colored(message.clone(), Color::Red),
        });
    }

    for line in &mut lines {
        line.text = crate::utils::truncate_string(&line.text, width);
    }
    lines
}

fn render_traffic(
    lines: &mut Vec<Line>,
    snapshot: &SimulationSnapshot,
    view: &MonitorView,
    rows: usize,
) {
    let summary = &snapshot.summary;
    let tabs: Vec<String> = LogFilter::iter()
        .map(|filter| {
            let label = format!("{} ({})", filter.label(), summary.count_for(filter));
            if filter == view.filter {
                format!("[{label}]")
            } else {
                format!(" {label} ")
            }
        })
        .collect();
    lines.push(Line::plain(tabs.join(" ")));
    lines.push(Line::plain(""));
    lines.push(Line::colored(table_header(), Color::DarkGrey));

    let mut shown = snapshot.filtered(view.filter).take(rows).peekable();
    if shown.peek().is_none() {
        lines.push(Line::plain(EMPTY_TABLE));
    }
    for event in shown {
        let color = if event.is_threat() {
            Some(Color::Yellow)
        } else if event.is_blocked() {
            Some(Color::Red)
        } else {
            None
        };
        lines.push(Line {
            text: table_row(event),
            color,
        });
    }
}

fn render_rules(lines: &mut Vec<Line>, view: &MonitorView, rows: usize) {
    let ruleset = view.rules.rules();
    lines.push(Line::plain(format!(
        "Firewall Rules ({}, {} enabled)",
        ruleset.len(),
        ruleset.enabled_count()
    )));
    lines.push(Line::plain(""));
    lines.push(Line::colored(rules_header(), Color::DarkGrey));

    if ruleset.is_empty() {
        lines.push(Line::plain(EMPTY_RULES));
    }
    // Scroll just far enough to keep the selection on screen
    let skip = (view.selected + 1).saturating_sub(rows);
    for (index, rule) in ruleset.rules.iter().enumerate().skip(skip).take(rows) {
        let marker = if index == view.selected { '>' } else { ' ' };
        let color = (!rule.enabled).then_some(Color::DarkGrey);
        lines.push(Line {
            text: format!("{marker} {}", rules_row(rule)),
            color,
        });
    }
}

fn rules_header() -> String {
    format!(
        "  {} {} {} {} {} {} STATUS",
        fit("NAME", 18),
        fit("SOURCE", 15),
        fit("DESTINATION", 15),
        fit("PORT", 14),
        fit("PROTO", 5),
        fit("ACTION", 6),
    )
}

fn rules_row(rule: &Rule) -> String {
    let port = match well_known_service(&rule.port) {
        Some(service) => format!("{} ({service})", rule.port),
        None => rule.port.clone(),
    };
    format!(
        "{} {} {} {} {} {} {}",
        fit(&rule.name, 18),
        fit(&rule.source, 15),
        fit(&rule.destination, 15),
        fit(&port, 14),
        fit(rule.protocol.as_ref(), 5),
        fit(rule.action.display_name(), 6),
        if rule.enabled { "enabled" } else { "disabled" },
    )
}

fn table_header() -> String {
    format!(
        "{} {} {} {} {} {} {} {} {} THREAT",
        fit("TIME", 8),
        fit("SOURCE", 15),
        fit("DESTINATION", 15),
        fit("PORT", 5),
        fit("PROTO", 5),
        fit("APP", 8),
        fit("ACTIVITY", 22),
        fit("SIZE", 9),
        fit("ACTION", 7),
    )
}

fn table_row(event: &TrafficEvent) -> String {
    let time = event
        .timestamp
        .with_timezone(&chrono::Local)
        .format("%H:%M:%S")
        .to_string();
    format!(
        "{} {} {} {} {} {} {} {} {} {}",
        fit(&time, 8),
        fit(&event.source, 15),
        fit(&event.destination, 15),
        fit(&event.port.to_string(), 5),
        fit(event.protocol.as_ref(), 5),
        fit(event.application.as_deref().unwrap_or("-"), 8),
        fit(event.activity.as_deref().unwrap_or("-"), 22),
        fit(&format_bytes(event.bytes), 9),
        fit(event.disposition.as_ref(), 7),
        event.threat.as_deref().unwrap_or(""),
    )
}

fn draw(out: &mut impl Write, lines: &[Line]) -> std::io::Result<()> {
    queue!(out, terminal::Clear(ClearType::All))?;
    for (row, line) in lines.iter().enumerate() {
        let row = u16::try_from(row).unwrap_or(u16::MAX);
        queue!(out, cursor::MoveTo(0, row))?;
        match line.color {
            Some(color) => queue!(out, PrintStyledContent(style(&line.text).with(color)))?,
            None => queue!(out, Print(&line.text))?,
        }
    }
    out.flush()
}

/// Raw mode plus alternate screen, restored on drop
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> std::io::Result<Self> {
        terminal::enable_raw_mode()?;
        let guard = Self;
        execute!(
            std::io::stdout(),
            terminal::EnterAlternateScreen,
            cursor::Hide
        )?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(
            std::io::stdout(),
            cursor::Show,
            terminal::LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
    }
}

fn redraw(out: &mut impl Write, snapshot: &SimulationSnapshot, view: &MonitorView) -> Result<()> {
    let (cols, rows) = terminal::size()?;
    draw(out, &render(snapshot, view, usize::from(cols), usize::from(rows)))?;
    Ok(())
}

/// Runs the monitor until the user quits. The simulation is paused on exit.
///
/// # Errors
///
/// Returns `Err` if the terminal cannot be configured or written.
pub async fn run(simulator: Simulator) -> Result<()> {
    let _guard = TerminalGuard::enter()?;
    let mut stdout = std::io::stdout();
    let mut view = MonitorView::default();
    let mut updates = simulator.subscribe();
    let mut events = EventStream::new();

    tracing::info!("Monitor started");
    let snapshot = updates.borrow_and_update().clone();
    redraw(&mut stdout, &snapshot, &view)?;

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) => {
                    if let Some(action) = view.decode(key)
                        && !view.handle(action, &simulator)
                    {
                        break;
                    }
                }
                Some(Ok(Event::Resize(..))) => {}
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let snapshot = updates.borrow_and_update().clone();
        redraw(&mut stdout, &snapshot, &view)?;
    }

    simulator.pause();
    tracing::info!("Monitor stopped");
    Ok(())
}
