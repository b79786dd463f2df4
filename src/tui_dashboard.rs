use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info};

use crate::actions;
use crate::config::DashboardConfig;
use crate::controller::{ViewState, ViewStateController};
use crate::error::{ConsoleError, ConsoleResult};
use crate::poller::PollSnapshot;
use crate::render::{InstanceCard, InstanceView, QrPanel};

const TOAST_TTL: Duration = Duration::from_secs(4);

/// Line-input prompts. Only one is open at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Login,
    PairPhone,
    WebhookUrl,
    NewInstanceName,
    NewInstanceToken { name: String },
    ConfirmDelete { id: String },
}

impl Prompt {
    fn title(&self) -> &'static str {
        match self {
            Prompt::Login => "Access token",
            Prompt::PairPhone => "Phone number to pair",
            Prompt::WebhookUrl => "Webhook URL (all events)",
            Prompt::NewInstanceName => "New instance name",
            Prompt::NewInstanceToken { .. } => "New instance token",
            Prompt::ConfirmDelete { .. } => "Type the instance id to delete it",
        }
    }

    fn masked(&self) -> bool {
        matches!(self, Prompt::Login | Prompt::NewInstanceToken { .. })
    }
}

/// What a keypress asks the console to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Login { admin: bool, token: String },
    Logout,
    Open(usize),
    Back,
    Connect,
    Disconnect,
    SessionLogout,
    Pair(String),
    SetWebhook(String),
    CreateInstance { name: String, token: String },
    AskDelete(usize),
    DeleteInstance(String),
    SaveQr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    shown_at: Instant,
}

/// Screen-local state: input buffer, selection, help and toasts.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub admin_mode: bool,
    pub prompt: Option<Prompt>,
    pub input: String,
    pub selected: usize,
    pub show_help: bool,
    pub toast: Option<Toast>,
    pub pairing_code: Option<String>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            admin_mode: false,
            prompt: Some(Prompt::Login),
            input: String::new(),
            selected: 0,
            show_help: false,
            toast: None,
            pairing_code: None,
        }
    }
}

impl DashboardState {
    /// Fresh state that opens with `err` in the footer, if any.
    pub fn starting_with(err: Option<&ConsoleError>) -> Self {
        let mut state = Self::default();
        if let Some(err) = err {
            state.error(err);
        }
        state
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast {
            message: message.into(),
            level: ToastLevel::Info,
            shown_at: Instant::now(),
        });
    }

    pub fn error(&mut self, err: &ConsoleError) {
        self.toast = Some(Toast {
            message: err.user_message(),
            level: ToastLevel::Error,
            shown_at: Instant::now(),
        });
    }

    fn expire_toast(&mut self) {
        if self.toast.as_ref().is_some_and(|t| t.shown_at.elapsed() >= TOAST_TTL) {
            self.toast = None;
        }
    }

    /// Keeps the login prompt open while logged out and closes it otherwise.
    pub fn sync_with(&mut self, state: ViewState, rows: usize) {
        match state {
            ViewState::LoggedOut => {
                if self.prompt.is_none() {
                    self.prompt = Some(Prompt::Login);
                    self.input.clear();
                }
                self.pairing_code = None;
            }
            _ => {
                if self.prompt == Some(Prompt::Login) {
                    self.prompt = None;
                    self.input.clear();
                }
            }
        }
        if rows == 0 {
            self.selected = 0;
        } else if self.selected >= rows {
            self.selected = rows - 1;
        }
    }

    fn open_prompt(&mut self, prompt: Prompt) {
        self.prompt = Some(prompt);
        self.input.clear();
    }

    pub fn handle_key(&mut self, key: KeyCode, state: ViewState, rows: usize) -> Option<Command> {
        if self.show_help {
            self.show_help = false;
            return None;
        }

        if let Some(prompt) = self.prompt.clone() {
            return self.handle_prompt_key(prompt, key);
        }

        match key {
            KeyCode::Char('q') => Some(Command::Quit),
            KeyCode::Char('h') | KeyCode::F(1) => {
                self.show_help = true;
                None
            }
            KeyCode::Char('l') => Some(Command::Logout),
            KeyCode::Up if state == ViewState::AdminOverview => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            KeyCode::Down if state == ViewState::AdminOverview => {
                if self.selected + 1 < rows {
                    self.selected += 1;
                }
                None
            }
            KeyCode::Enter if state == ViewState::AdminOverview && rows > 0 => {
                Some(Command::Open(self.selected))
            }
            KeyCode::Char('x') if state == ViewState::AdminOverview && rows > 0 => {
                Some(Command::AskDelete(self.selected))
            }
            KeyCode::Char('n') if state == ViewState::AdminOverview => {
                self.open_prompt(Prompt::NewInstanceName);
                None
            }
            KeyCode::Char('b') | KeyCode::Backspace | KeyCode::Esc
                if state == ViewState::AdminInstanceOpen =>
            {
                Some(Command::Back)
            }
            KeyCode::Char('c') if state.shows_instance() => Some(Command::Connect),
            KeyCode::Char('d') if state.shows_instance() => Some(Command::Disconnect),
            KeyCode::Char('o') if state.shows_instance() => Some(Command::SessionLogout),
            KeyCode::Char('s') if state.shows_instance() => Some(Command::SaveQr),
            KeyCode::Char('p') if state.shows_instance() => {
                self.open_prompt(Prompt::PairPhone);
                None
            }
            KeyCode::Char('w') if state.shows_instance() => {
                self.open_prompt(Prompt::WebhookUrl);
                None
            }
            _ => None,
        }
    }

    fn handle_prompt_key(&mut self, prompt: Prompt, key: KeyCode) -> Option<Command> {
        match key {
            KeyCode::Char(c) => {
                self.input.push(c);
                None
            }
            KeyCode::Backspace => {
                self.input.pop();
                None
            }
            KeyCode::Tab if prompt == Prompt::Login => {
                self.admin_mode = !self.admin_mode;
                None
            }
            KeyCode::Esc if prompt == Prompt::Login => Some(Command::Quit),
            KeyCode::Esc => {
                self.prompt = None;
                self.input.clear();
                None
            }
            KeyCode::Enter => {
                let value = std::mem::take(&mut self.input);
                self.prompt = None;
                match prompt {
                    Prompt::Login => {
                        // Stays open until the controller leaves LoggedOut.
                        self.prompt = Some(Prompt::Login);
                        Some(Command::Login {
                            admin: self.admin_mode,
                            token: value,
                        })
                    }
                    Prompt::PairPhone => Some(Command::Pair(value)),
                    Prompt::WebhookUrl => Some(Command::SetWebhook(value)),
                    Prompt::NewInstanceName => {
                        self.prompt = Some(Prompt::NewInstanceToken { name: value });
                        None
                    }
                    Prompt::NewInstanceToken { name } => Some(Command::CreateInstance { name, token: value }),
                    Prompt::ConfirmDelete { id } => {
                        if value.trim() == id {
                            Some(Command::DeleteInstance(id))
                        } else {
                            self.info("Delete cancelled");
                            None
                        }
                    }
                }
            }
            _ => None,
        }
    }
}

/// Everything one frame needs, detached from the controller.
#[derive(Debug, Clone)]
pub struct Screen {
    pub state: ViewState,
    pub view: InstanceView,
    pub poll_interval_ms: u64,
}

/// Terminal dashboard driving a [`ViewStateController`].
pub struct TuiDashboard {
    config: DashboardConfig,
    controller: ViewStateController,
    updates: mpsc::UnboundedReceiver<PollSnapshot>,
    ui: DashboardState,
    shutdown_receiver: broadcast::Receiver<()>,
}

impl TuiDashboard {
    pub fn new(
        config: DashboardConfig,
        mut controller: ViewStateController,
        startup_error: Option<ConsoleError>,
        shutdown_receiver: broadcast::Receiver<()>,
    ) -> ConsoleResult<Self> {
        let updates = controller
            .take_updates()
            .ok_or_else(|| ConsoleError::TerminalError("Snapshot stream already taken".to_string()))?;

        Ok(Self {
            config,
            controller,
            updates,
            ui: DashboardState::starting_with(startup_error.as_ref()),
            shutdown_receiver,
        })
    }

    pub async fn run(&mut self) -> ConsoleResult<()> {
        info!("🖥️  Starting dashboard");

        enable_raw_mode().map_err(|e| ConsoleError::TerminalError(format!("Failed to enable raw mode: {}", e)))?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
            .map_err(|e| ConsoleError::TerminalError(format!("Failed to setup terminal: {}", e)))?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)
            .map_err(|e| ConsoleError::TerminalError(format!("Failed to create terminal: {}", e)))?;

        let result = self.run_event_loop(&mut terminal).await;
        self.controller.shutdown();

        disable_raw_mode().map_err(|e| ConsoleError::TerminalError(format!("Failed to disable raw mode: {}", e)))?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)
            .map_err(|e| ConsoleError::TerminalError(format!("Failed to restore terminal: {}", e)))?;
        terminal
            .show_cursor()
            .map_err(|e| ConsoleError::TerminalError(format!("Failed to show cursor: {}", e)))?;

        info!("✅ Dashboard stopped");
        result
    }

    async fn run_event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> ConsoleResult<()> {
        let tick_rate = Duration::from_millis(self.config.tick_rate_ms);
        let mut last_tick = Instant::now().checked_sub(tick_rate).unwrap_or_else(Instant::now);
        let mut shutdown_rx = self.shutdown_receiver.resubscribe();

        loop {
            if last_tick.elapsed() >= tick_rate {
                self.ui.expire_toast();
                let screen = self.screen()?;
                self.ui.sync_with(screen.state, screen.view.rows.len());
                terminal
                    .draw(|f| draw_ui(f, &self.ui, &screen))
                    .map_err(|e| ConsoleError::TerminalError(format!("Failed to draw terminal: {}", e)))?;
                last_tick = Instant::now();
            }

            let timeout = tick_rate.checked_sub(last_tick.elapsed()).unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    while event::poll(Duration::from_millis(0))
                        .map_err(|e| ConsoleError::TerminalError(format!("Event poll failed: {}", e)))? {
                        let Event::Key(key) = event::read()
                            .map_err(|e| ConsoleError::TerminalError(format!("Failed to read event: {}", e)))? else {
                            continue;
                        };
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }

                        let state = self.controller.state();
                        let rows = self.controller.instances().len();
                        if let Some(command) = self.ui.handle_key(key.code, state, rows) {
                            if command == Command::Quit {
                                return Ok(());
                            }
                            self.execute(command).await;
                        }
                    }
                }
                Some(snapshot) = self.updates.recv() => {
                    self.controller.apply_snapshot(snapshot);
                }
                _ = shutdown_rx.recv() => {
                    info!("🔄 Dashboard received shutdown signal");
                    return Ok(());
                }
            }
        }
    }

    fn screen(&self) -> ConsoleResult<Screen> {
        Ok(Screen {
            state: self.controller.state(),
            view: self.controller.view()?,
            poll_interval_ms: self.controller.poll_interval_ms(),
        })
    }

    async fn execute(&mut self, command: Command) {
        debug!("Dashboard command {:?}", command);
        if let Err(e) = self.dispatch(command).await {
            error!("Command failed: {}", e);
            self.ui.error(&e);
        }
    }

    async fn dispatch(&mut self, command: Command) -> ConsoleResult<()> {
        match command {
            Command::Quit => {}
            Command::Login { admin: true, token } => {
                self.controller.login_admin(&token).await?;
            }
            Command::Login { admin: false, token } => {
                self.controller.login_regular(&token).await?;
            }
            Command::Logout => {
                self.controller.logout()?;
                self.ui = DashboardState::default();
            }
            Command::Open(index) => {
                let view = self.controller.view()?;
                let row = view
                    .rows
                    .get(index)
                    .ok_or_else(|| ConsoleError::ValidationError("No instance selected".to_string()))?;
                self.controller.open_instance(&row.id, &row.token)?;
                self.ui.pairing_code = None;
            }
            Command::Back => {
                self.controller.close_instance()?;
                self.ui.pairing_code = None;
            }
            Command::Connect => {
                self.controller.connect(None).await?;
                self.ui.info("Connecting, scan the QR code or pair with a code");
            }
            Command::Disconnect => {
                let token = self.controller.require_bearer_token()?;
                self.controller.api().disconnect(&token).await?;
                self.ui.info("Disconnected");
            }
            Command::SessionLogout => {
                let token = self.controller.require_bearer_token()?;
                self.controller.api().logout(&token).await?;
                self.ui.info("Session logged out");
            }
            Command::Pair(phone) => {
                let code = self.controller.pair_phone(&phone).await?;
                self.ui.info(format!("Pairing code: {}", code.linking_code));
                self.ui.pairing_code = Some(code.linking_code);
            }
            Command::SetWebhook(url) => {
                let token = self.controller.require_bearer_token()?;
                let hook = actions::set_webhook(self.controller.api().as_ref(), &token, &url, &["All"]).await?;
                self.ui.info(format!("Webhook set to {}", hook.webhook));
            }
            Command::CreateInstance { name, token } => {
                let admin_token = self.controller.require_admin_token()?;
                let form = crate::models::NewInstance {
                    name,
                    token,
                    events: vec!["All".to_string()],
                    webhook: None,
                    proxy_url: None,
                };
                actions::create_instance(self.controller.api().as_ref(), &admin_token, &form).await?;
                self.ui.info(format!("Instance {} created", form.name));
            }
            Command::AskDelete(index) => {
                let view = self.controller.view()?;
                if let Some(row) = view.rows.get(index) {
                    self.ui.open_prompt(Prompt::ConfirmDelete { id: row.id.clone() });
                }
            }
            Command::DeleteInstance(id) => {
                let admin_token = self.controller.require_admin_token()?;
                actions::delete_instance(self.controller.api().as_ref(), &admin_token, &id).await?;
                self.ui.info(format!("Instance {} deleted", id));
            }
            Command::SaveQr => {
                let view = self.controller.view()?;
                let card = view
                    .visible_card()
                    .ok_or_else(|| ConsoleError::ValidationError("No instance selected".to_string()))?;
                let QrPanel::Image(data_url) = &card.qr else {
                    return Err(ConsoleError::ValidationError("QR code not available yet".to_string()));
                };
                let bytes = actions::decode_qr_image(data_url)?;
                let path = format!("qr-{}.png", card.id);
                tokio::fs::write(&path, bytes).await?;
                self.ui.info(format!("QR code saved to {}", path));
            }
        }
        Ok(())
    }
}

pub fn draw_ui(f: &mut Frame, ui: &DashboardState, screen: &Screen) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
            Constraint::Length(3), // Footer
        ])
        .split(f.size());

    draw_header(f, chunks[0], screen);

    match screen.state {
        ViewState::LoggedOut => draw_login(f, chunks[1], ui),
        ViewState::AdminOverview => draw_instance_table(f, chunks[1], ui, &screen.view),
        ViewState::RegularActive | ViewState::AdminInstanceOpen => match screen.view.visible_card() {
            Some(card) => draw_instance_card(f, chunks[1], ui, card),
            None => {
                let waiting = Paragraph::new("Loading instance...")
                    .block(Block::default().borders(Borders::ALL))
                    .alignment(Alignment::Center);
                f.render_widget(waiting, chunks[1]);
            }
        },
    }

    draw_footer(f, chunks[2], ui, screen);

    if let Some(prompt) = &ui.prompt {
        if *prompt != Prompt::Login {
            draw_prompt(f, prompt, &ui.input);
        }
    }
    if ui.show_help {
        draw_help_popup(f);
    }
}

fn draw_header(f: &mut Frame, area: Rect, screen: &Screen) {
    let role = screen.state.role();
    let mut spans = vec![Span::styled(
        "📡 Gateway Console",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    if !role.label().is_empty() {
        let color = if role.label() == "ADMIN" { Color::Magenta } else { Color::Green };
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!(" {} ", role.label()),
            Style::default().fg(Color::Black).bg(color).add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn draw_login(f: &mut Frame, area: Rect, ui: &DashboardState) {
    let box_area = centered_rect(60, 50, area);
    f.render_widget(Clear, box_area);

    let mode = if ui.admin_mode { "Admin" } else { "User" };
    let text = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("Mode: ", Style::default().fg(Color::Gray)),
            Span::styled(mode, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::styled("  (Tab to switch)", Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Token: ", Style::default().fg(Color::Gray)),
            Span::raw("*".repeat(ui.input.chars().count())),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]),
    ];

    let login = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Login"))
        .alignment(Alignment::Center);
    f.render_widget(login, box_area);
}

fn draw_instance_table(f: &mut Frame, area: Rect, ui: &DashboardState, view: &InstanceView) {
    let block = Block::default().borders(Borders::ALL).title("Instances");

    if let Some(placeholder) = view.placeholder {
        let empty = Paragraph::new(placeholder).block(block).alignment(Alignment::Center);
        f.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec!["ID", "Name", "Token", "Connected", "Logged In"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    let rows = view.rows.iter().map(|row| {
        Row::new(vec![
            row.id.clone(),
            row.name.clone(),
            row.token.clone(),
            row.connected_label().to_string(),
            row.logged_in_label().to_string(),
        ])
    });
    let widths = [
        Constraint::Percentage(15),
        Constraint::Percentage(25),
        Constraint::Percentage(30),
        Constraint::Percentage(15),
        Constraint::Percentage(15),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    let mut state = TableState::default();
    state.select(Some(ui.selected));
    f.render_stateful_widget(table, area, &mut state);
}

fn draw_instance_card(f: &mut Frame, area: Rect, ui: &DashboardState, card: &InstanceCard) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let status_color = |ok: bool| if ok { Color::Green } else { Color::Red };
    let field = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(format!("{:<12}", label), Style::default().fg(Color::Gray)),
            Span::raw(value),
        ])
    };

    let mut lines = vec![
        field("Name", card.name.clone()),
        field("ID", card.id.clone()),
        field("Token", card.token.clone()),
        Line::from(vec![
            Span::styled(format!("{:<12}", "Connection"), Style::default().fg(Color::Gray)),
            Span::styled(card.connection_label, Style::default().fg(status_color(card.connected))),
        ]),
        Line::from(vec![
            Span::styled(format!("{:<12}", "Session"), Style::default().fg(Color::Gray)),
            Span::styled(card.login_label, Style::default().fg(status_color(card.logged_in))),
        ]),
        field("JID", card.jid.clone()),
        field("Webhook", card.webhook.clone()),
        field("Events", card.events.clone()),
        Line::from(""),
    ];
    let actions = card
        .actions
        .iter()
        .map(|a| a.label())
        .collect::<Vec<_>>()
        .join(" | ");
    lines.push(field("Actions", actions));

    let details = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(card.name.clone()))
        .wrap(Wrap { trim: true });
    f.render_widget(details, chunks[0]);

    let qr_text = match (&card.qr, &ui.pairing_code) {
        (QrPanel::Hidden, _) => vec![Line::from("Session is logged in")],
        (_, Some(code)) => vec![
            Line::from("Pairing code"),
            Line::from(""),
            Line::from(Span::styled(
                code.clone(),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
        ],
        (QrPanel::Waiting, None) => vec![Line::from("Waiting for QR code...")],
        (QrPanel::Image(_), None) => vec![
            Line::from("QR code ready"),
            Line::from(""),
            Line::from("Press s to save it as PNG"),
        ],
    };
    let qr = Paragraph::new(qr_text)
        .block(Block::default().borders(Borders::ALL).title("Pairing"))
        .alignment(Alignment::Center);
    f.render_widget(qr, chunks[1]);
}

fn draw_footer(f: &mut Frame, area: Rect, ui: &DashboardState, screen: &Screen) {
    let line = match &ui.toast {
        Some(toast) => {
            let color = match toast.level {
                ToastLevel::Info => Color::Green,
                ToastLevel::Error => Color::Red,
            };
            Line::from(Span::styled(toast.message.clone(), Style::default().fg(color)))
        }
        None => {
            let hints = match screen.state {
                ViewState::LoggedOut => "Enter login | Tab user/admin | Esc quit",
                ViewState::AdminOverview => "↑↓ select | Enter open | n new | x delete | l logout | q quit",
                ViewState::AdminInstanceOpen => "c connect | d disconnect | o logout session | p pair | w webhook | b back",
                ViewState::RegularActive => "c connect | d disconnect | o logout session | p pair | w webhook | l logout",
            };
            Line::from(vec![
                Span::styled(hints, Style::default().fg(Color::Gray)),
                Span::styled(
                    format!("  [{}ms]", screen.poll_interval_ms),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        }
    };

    let footer = Paragraph::new(line)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    f.render_widget(footer, area);
}

fn draw_prompt(f: &mut Frame, prompt: &Prompt, input: &str) {
    let area = centered_rect(50, 20, f.size());
    f.render_widget(Clear, area);

    let shown = if prompt.masked() {
        "*".repeat(input.chars().count())
    } else {
        input.to_string()
    };
    let popup = Paragraph::new(vec![Line::from(""), Line::from(format!("{}_", shown))])
        .block(Block::default().borders(Borders::ALL).title(prompt.title()))
        .alignment(Alignment::Center);
    f.render_widget(popup, area);
}

fn draw_help_popup(f: &mut Frame) {
    let popup_area = centered_rect(60, 70, f.size());
    f.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from("📡 Gateway Console"),
        Line::from(""),
        Line::from("Keyboard Shortcuts:"),
        Line::from("  q       - Quit"),
        Line::from("  h, F1   - Toggle this help"),
        Line::from("  l       - Log out of the console"),
        Line::from("  ↑↓ Enter - Select and open an instance"),
        Line::from("  n / x   - Create / delete an instance"),
        Line::from("  c / d   - Connect / disconnect the session"),
        Line::from("  p       - Pair with a phone number"),
        Line::from("  w       - Set the webhook"),
        Line::from("  b       - Back to the instance list"),
        Line::from(""),
        Line::from("Press any key to close"),
    ];

    let help_popup = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(help_popup, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
