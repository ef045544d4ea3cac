use crate::{
    client::AppSnapshot,
    state::{
        self,
        Control,
        Phase,
    },
};
use color_eyre::eyre::{Result, eyre};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{prelude::*, widgets::*};
use std::io::stdout;
use tokio::sync::mpsc;

pub enum UserEvent {
    Quit,
    Refresh,
    ConfirmAdvance,
    ConfirmWithdraw,
    SetCost(String),
    SetCap(u64),
    Redraw,
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

#[derive(Clone, Debug, Default)]
enum Mode {
    #[default]
    Normal,
    CostModal(CostState),
    CapModal(CapState),
    AdvanceModal,
    WithdrawModal,
    QuitModal,
}

#[derive(Clone, Debug, Default)]
struct CostState {
    input: String,
}

#[derive(Clone, Debug, Default)]
struct CapState {
    value: u64,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    // Create a single persistent Terminal to preserve buffers across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Whether mutating controls should respond to input right now.
fn controls_active(snap: &AppSnapshot) -> bool {
    !snap.busy && snap.network_ok && snap.state.is_some()
}

pub type InputEventReceiver = mpsc::UnboundedReceiver<Event>;

/// Pump crossterm events from a dedicated thread so the async loop is never
/// parked on the keyboard and the periodic refresh keeps ticking.
pub fn input_event_stream() -> InputEventReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        loop {
            match event::read() {
                Ok(ev) => {
                    if tx.send(ev).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

pub async fn next_raw_event(events: &mut InputEventReceiver) -> Result<Event> {
    events
        .recv()
        .await
        .ok_or_else(|| eyre!("input event channel closed"))
}

pub fn interpret_event(
    state: &mut UiState,
    snap: &AppSnapshot,
    event: Event,
) -> Option<UserEvent> {
    let Event::Key(k) = event else {
        return None;
    };
    if k.kind != KeyEventKind::Press {
        return None;
    }
    // Raw mode delivers Ctrl-C as a plain key event
    if k.code == KeyCode::Char('c') && k.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(UserEvent::Quit);
    }
    // Modal handling
    match &mut state.mode {
        Mode::CostModal(cs) => match k.code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                let input = cs.input.clone();
                state.mode = Mode::Normal;
                Some(UserEvent::SetCost(input))
            }
            KeyCode::Backspace => {
                cs.input.pop();
                Some(UserEvent::Redraw)
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
                cs.input.push(c);
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::CapModal(cs) => match k.code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                let value = cs.value;
                state.mode = Mode::Normal;
                Some(UserEvent::SetCap(value))
            }
            KeyCode::Up | KeyCode::Char('+') => {
                cs.value = cs.value.saturating_add(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down | KeyCode::Char('-') => {
                cs.value = cs.value.saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Backspace => {
                cs.value /= 10;
                Some(UserEvent::Redraw)
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let d = u64::from(c.to_digit(10).unwrap_or(0));
                cs.value = cs.value.saturating_mul(10).saturating_add(d);
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::AdvanceModal => match k.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                state.mode = Mode::Normal;
                Some(UserEvent::ConfirmAdvance)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::WithdrawModal => match k.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                state.mode = Mode::Normal;
                Some(UserEvent::ConfirmWithdraw)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::QuitModal => match k.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                Some(UserEvent::Quit)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::Normal => match k.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                state.mode = Mode::QuitModal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('r') => Some(UserEvent::Refresh),
            KeyCode::Char('w') if controls_active(snap) => {
                state.mode = Mode::WithdrawModal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('c') if controls_active(snap) => {
                state.mode = Mode::CostModal(CostState::default());
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('x') if controls_active(snap) => {
                state.mode = Mode::CapModal(CapState::default());
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('s') if controls_active(snap) => {
                let advanceable = snap
                    .state
                    .as_ref()
                    .is_some_and(|s| s.phase.advance_label().is_some());
                if advanceable {
                    state.mode = Mode::AdvanceModal;
                    Some(UserEvent::Redraw)
                } else {
                    None
                }
            }
            _ => None,
        },
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    // Clear the whole frame to avoid leftover fragments
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // status
            Constraint::Length(6), // phase
            Constraint::Length(5), // sale parameters
            Constraint::Min(4),    // errors
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_status(f, chunks[0], snap);
    draw_phase(f, chunks[1], snap);
    draw_parameters(f, chunks[2], snap);
    draw_errors(f, chunks[3], snap);
    draw_help(f, chunks[4], snap);
    draw_modals(f, state, snap);
}

fn short_contract_id(id: &str) -> String {
    if id.len() > 14 {
        format!("{}...{}", &id[..8], &id[id.len() - 6..])
    } else {
        id.to_string()
    }
}

fn draw_status(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let network = if snap.network_ok {
        format!("chain {}", snap.connected_chain_id)
    } else {
        format!(
            "chain {} (WRONG NETWORK, collection targets {})",
            snap.connected_chain_id, snap.expected_chain_id
        )
    };
    let busy = if snap.busy { " | BUSY" } else { "" };
    let text = format!(
        "Contract: {} | Network: {}{}\n{}",
        short_contract_id(&snap.contract_id),
        network,
        busy,
        snap.status
    );
    let style = if snap.network_ok {
        Style::default()
    } else {
        Style::default().fg(Color::Red)
    };
    let p = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}

fn draw_phase(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let block = Block::default().borders(Borders::ALL).title("Sale Phase");
    let lines = match snap.state.as_ref() {
        None => vec![Line::styled(
            "No contract state yet",
            Style::default().fg(Color::DarkGray),
        )],
        Some(state) => {
            let mut lines = vec![
                Line::styled(
                    state.phase.label(),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
                Line::from(state.phase.description()),
            ];
            match state.phase.advance_label() {
                Some(label) => lines.push(Line::from(format!("Next: s = {label}"))),
                None => lines.push(Line::styled(
                    "Final phase reached",
                    Style::default().fg(Color::DarkGray),
                )),
            }
            lines
        }
    };
    let p = Paragraph::new(lines).block(block);
    f.render_widget(p, area);
}

fn draw_parameters(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Sale Parameters");
    let lines = match snap.state.as_ref() {
        None => vec![Line::styled(
            "Unknown",
            Style::default().fg(Color::DarkGray),
        )],
        Some(state) => vec![
            Line::from(format!(
                "Mint cost: {} | Max per tx: {}",
                state::format_units(u128::from(state.mint_cost)),
                state.max_mint_amount_per_tx
            )),
            Line::from(format!(
                "Contract balance: {}",
                state::format_units(u128::from(state.balance))
            )),
        ],
    };
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_errors(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let block = Block::default().borders(Borders::ALL).title("Errors");
    let mut lines: Vec<Line> = snap
        .errors
        .iter()
        .rev()
        .take(usize::from(area.height.saturating_sub(2)))
        .map(|e| Line::styled(e.as_str(), Style::default().fg(Color::Red)))
        .collect();
    if lines.is_empty() {
        lines.push(Line::styled("None", Style::default().fg(Color::DarkGray)));
    }
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_help(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let text = if snap.busy {
        String::from("Transaction in flight; controls disabled")
    } else {
        let mut parts = vec!["r refresh".to_string()];
        if let Some(state) = snap.state.as_ref().filter(|_| snap.network_ok) {
            for control in state.phase.controls() {
                parts.push(control_hint(*control, state.phase));
            }
        }
        parts.push("q/Esc quit".to_string());
        parts.join(" | ")
    };
    let style = if snap.busy {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    let help = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn control_hint(control: Control, phase: Phase) -> String {
    match control {
        Control::Withdraw => String::from("w withdraw"),
        Control::EditMintCost => String::from("c mint cost"),
        Control::EditMaxPerTx => String::from("x mint cap"),
        Control::StartWhitelisting
        | Control::StartPresale
        | Control::StartPublicSale => {
            format!("s {}", phase.advance_label().unwrap_or("advance"))
        }
    }
}

fn draw_modals(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    match &state.mode {
        Mode::Normal => {}
        Mode::CostModal(cs) => {
            let area = centered_rect(40, 30, f.area());
            let block = Block::default().borders(Borders::ALL).title("Set Mint Cost");
            let p = Paragraph::new(format!(
                "Cost: {}\nEnter=confirm Esc=cancel digits and '.' to edit",
                cs.input
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::CapModal(cs) => {
            let area = centered_rect(40, 30, f.area());
            let block = Block::default()
                .borders(Borders::ALL)
                .title("Set Max Mint Amount Per Tx");
            let p = Paragraph::new(format!(
                "Max per tx: {}\nEnter=confirm Esc=cancel +/- or digits to edit",
                cs.value
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::AdvanceModal => {
            let label = snap
                .state
                .as_ref()
                .and_then(|s| s.phase.advance_label())
                .unwrap_or("Advance");
            let area = centered_rect(50, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title(label);
            let p = Paragraph::new(format!("{label}? (Y/N)"));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::WithdrawModal => {
            let balance = snap
                .state
                .as_ref()
                .map(|s| state::format_units(u128::from(s.balance)))
                .unwrap_or_else(|| String::from("?"));
            let area = centered_rect(50, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Withdraw");
            let p = Paragraph::new(format!(
                "Withdraw the contract balance of {balance}? (Y/N)"
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::QuitModal => {
            let area = centered_rect(40, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
            let p = Paragraph::new("Quit the console? (Y/N)");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    vertical[1]
}
