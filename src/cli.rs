use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use gateway_console::actions;
use gateway_console::models::NewInstance;
use gateway_console::render::{render_instances, InstanceView, QrPanel};
use gateway_console::{
    Config, ConsoleError, ExpiringStore, GatewayApi, GatewayClient, MetricsCollector, StoreKey, SystemClock,
    ViewState, ViewStateController,
};

#[derive(Parser)]
#[command(name = "gateway-console-cli")]
#[command(about = "Gateway Console CLI - scriptable access to gateway instances")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Override the gateway base URL
    #[arg(long, env = "GATEWAY_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a token and verify it against the gateway
    Login {
        /// Access token
        token: String,
        /// Log in as administrator
        #[arg(long)]
        admin: bool,
    },
    /// Forget all stored credentials
    Logout,
    /// Show the restored session
    Whoami,
    /// Follow the active poller and print every snapshot
    Watch {
        /// Stop after this many snapshots
        #[arg(long)]
        count: Option<usize>,
    },
    /// Instance administration
    Instance {
        #[command(subcommand)]
        action: InstanceCommands,
    },
    /// Session of the selected instance
    Session {
        #[command(subcommand)]
        action: SessionCommands,
    },
    /// Webhook of the selected instance
    Webhook {
        #[command(subcommand)]
        action: WebhookCommands,
    },
    /// Send or delete messages
    Message {
        #[command(subcommand)]
        action: MessageCommands,
    },
    /// Look up users and contacts
    User {
        #[command(subcommand)]
        action: UserCommands,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
    /// Poll the restored session and print the collected metrics in Prometheus text format
    Metrics {
        /// Poll snapshots to collect before printing
        #[arg(long, default_value_t = 1)]
        polls: usize,
        /// Give up waiting for snapshots after this many seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

#[derive(Subcommand)]
enum InstanceCommands {
    /// List every instance (admin)
    List,
    /// Create an instance (admin)
    Create {
        /// Instance name
        name: String,
        /// Instance token
        token: String,
        /// Subscribed events
        #[arg(long, value_delimiter = ',', default_value = "All")]
        events: Vec<String>,
        /// Webhook URL
        #[arg(long)]
        webhook: Option<String>,
        /// Proxy URL
        #[arg(long)]
        proxy_url: Option<String>,
    },
    /// Delete an instance and its data (admin)
    Delete {
        /// Instance id
        id: String,
    },
    /// Select an instance for session commands (admin)
    Open {
        /// Instance id
        id: String,
    },
    /// Return to the instance list (admin)
    Close,
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Connect the session and poll faster until it logs in
    Connect,
    /// Disconnect the session
    Disconnect,
    /// Show session status
    Status,
    /// Log the session out of the network
    Logout,
    /// Request a pairing code for a phone number
    Pair {
        /// Phone number
        phone: String,
    },
    /// Fetch the login QR code
    Qr {
        /// Write the PNG here instead of printing the data URL
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum WebhookCommands {
    /// Show the configured webhook
    Get,
    /// Set the webhook URL and events
    Set {
        /// Webhook URL
        url: String,
        /// Subscribed events
        #[arg(long, value_delimiter = ',', default_value = "All")]
        events: Vec<String>,
    },
}

#[derive(Subcommand)]
enum MessageCommands {
    /// Send a text message
    Send {
        /// Recipient phone number
        phone: String,
        /// Message text
        body: String,
    },
    /// Delete a sent message
    Delete {
        /// Recipient phone number
        phone: String,
        /// Message id
        id: String,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Show profile information
    Info {
        /// Phone number
        phone: String,
    },
    /// Show the avatar URL
    Avatar {
        /// Phone number
        phone: String,
    },
    /// Export the address book as JSON
    Contacts {
        /// Output file
        #[arg(short, long, default_value = "contacts.json")]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration
    Validate,
    /// Generate default configuration
    Generate {
        /// Output file
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

/// Shared handles for one CLI invocation.
struct Console {
    config: Config,
    store: Arc<ExpiringStore>,
    metrics: Arc<MetricsCollector>,
    api: Arc<dyn GatewayApi>,
}

impl Console {
    async fn open(config: Config) -> Result<Self> {
        if let Some(parent) = Path::new(&config.storage.store_path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let store = Arc::new(ExpiringStore::open(&config.storage.store_path, Arc::new(SystemClock))?);
        let metrics = Arc::new(MetricsCollector::new()?);
        let api: Arc<dyn GatewayApi> = Arc::new(GatewayClient::new(&config)?.with_metrics(Arc::clone(&metrics)));

        Ok(Self {
            config,
            store,
            metrics,
            api,
        })
    }

    fn controller(&self) -> ViewStateController {
        ViewStateController::new(self.config.session.clone(), Arc::clone(&self.store), Arc::clone(&self.api))
            .with_metrics(Arc::clone(&self.metrics))
    }

    fn token(&self) -> Result<String> {
        self.store
            .get_string(StoreKey::Token)?
            .context("No instance selected; run `login` or `instance open` first")
    }

    fn admin_token(&self) -> Result<String> {
        self.store
            .get_string(StoreKey::AdminToken)?
            .context("Admin login required; run `login --admin` first")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug)?;

    let mut config = Config::load(&cli.config).await?;
    if let Some(base_url) = cli.base_url {
        config.gateway.base_url = base_url;
    }

    let command = match cli.command {
        Commands::Config { action } => return handle_config_command(action, &config).await,
        other => other,
    };

    config.validate()?;
    let console = Console::open(config).await?;

    let result = match command {
        Commands::Login { token, admin } => handle_login(&console, &token, admin).await,
        Commands::Logout => {
            console.controller().logout()?;
            println!("👋 Logged out");
            Ok(())
        }
        Commands::Whoami => handle_whoami(&console).await,
        Commands::Watch { count } => handle_watch(&console, count).await,
        Commands::Instance { action } => handle_instance_command(action, &console).await,
        Commands::Session { action } => handle_session_command(action, &console).await,
        Commands::Webhook { action } => handle_webhook_command(action, &console).await,
        Commands::Message { action } => handle_message_command(action, &console).await,
        Commands::User { action } => handle_user_command(action, &console).await,
        Commands::Metrics { polls, timeout_secs } => handle_metrics(&console, polls, timeout_secs).await,
        Commands::Config { .. } => Ok(()),
    };

    if let Err(e) = &result {
        if let Some(console_error) = e.downcast_ref::<ConsoleError>() {
            error!("{} ({})", console_error, console_error.severity().as_str());
        }
    }
    result
}

fn init_logging(debug: bool) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if debug {
        EnvFilter::new("gateway_console=debug,gateway_console_cli=debug,info")
    } else {
        EnvFilter::new("gateway_console=warn,gateway_console_cli=info,error")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

fn print_view(state: ViewState, view: &InstanceView) {
    println!("[{}] {:?}", state.role().label(), state);

    if state == ViewState::AdminOverview {
        if let Some(placeholder) = view.placeholder {
            println!("{}", placeholder);
            return;
        }
        println!("{:<12} {:<20} {:<24} {:<10} {:<10}", "ID", "NAME", "TOKEN", "CONNECTED", "LOGGED IN");
        for row in &view.rows {
            println!(
                "{:<12} {:<20} {:<24} {:<10} {:<10}",
                row.id,
                row.name,
                row.token,
                row.connected_label(),
                row.logged_in_label()
            );
        }
        return;
    }

    if let Some(card) = view.visible_card() {
        println!("Name:       {}", card.name);
        println!("ID:         {}", card.id);
        println!("Connection: {}", card.connection_label);
        println!("Session:    {}", card.login_label);
        println!("JID:        {}", card.jid);
        println!("Webhook:    {}", card.webhook);
        println!("Events:     {}", card.events);
        match &card.qr {
            QrPanel::Hidden => {}
            QrPanel::Waiting => println!("QR:         waiting"),
            QrPanel::Image(_) => println!("QR:         ready (session qr --output qr.png)"),
        }
        let actions = card.actions.iter().map(|a| a.label()).collect::<Vec<_>>();
        println!("Actions:    {}", actions.join(", "));
    }
}

async fn handle_login(console: &Console, token: &str, admin: bool) -> Result<()> {
    let mut controller = console.controller();
    let state = if admin {
        controller.login_admin(token).await?
    } else {
        controller.login_regular(token).await?
    };
    info!("✅ Logged in as {}", state.role().label());
    print_view(state, &controller.view()?);
    controller.shutdown();
    Ok(())
}

async fn handle_whoami(console: &Console) -> Result<()> {
    let mut controller = console.controller();
    let state = controller.restore().await?;
    if state == ViewState::LoggedOut {
        println!("Not logged in");
    } else {
        print_view(state, &controller.view()?);
    }
    controller.shutdown();
    Ok(())
}

async fn handle_metrics(console: &Console, polls: usize, timeout_secs: u64) -> Result<()> {
    let mut controller = console.controller();
    let mut updates = controller
        .take_updates()
        .context("Snapshot stream unavailable")?;

    let state = controller.restore().await?;
    if state == ViewState::LoggedOut {
        anyhow::bail!("Not logged in");
    }

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(timeout_secs);
    let mut seen = 0usize;
    while seen < polls {
        match tokio::time::timeout_at(deadline, updates.recv()).await {
            Ok(Some(snapshot)) => {
                if controller.apply_snapshot(snapshot) {
                    seen += 1;
                }
            }
            Ok(None) => break,
            Err(_) => {
                info!("⏱️  Stopped waiting after {} of {} snapshots", seen, polls);
                break;
            }
        }
    }
    controller.shutdown();

    print!("{}", console.metrics.gather()?);
    Ok(())
}

async fn handle_watch(console: &Console, count: Option<usize>) -> Result<()> {
    let mut controller = console.controller();
    let mut updates = controller
        .take_updates()
        .context("Snapshot stream unavailable")?;

    let state = controller.restore().await?;
    if state == ViewState::LoggedOut {
        anyhow::bail!("Not logged in");
    }
    print_view(state, &controller.view()?);

    let mut seen = 0usize;
    loop {
        tokio::select! {
            snapshot = updates.recv() => {
                let Some(snapshot) = snapshot else { break };
                if controller.apply_snapshot(snapshot) {
                    println!("--- {} ({}ms)", chrono::Local::now().format("%H:%M:%S"), controller.poll_interval_ms());
                    print_view(controller.state(), &controller.view()?);
                    seen += 1;
                    if count.is_some_and(|limit| seen >= limit) {
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("📡 Received shutdown signal");
                break;
            }
        }
    }

    controller.shutdown();
    Ok(())
}

async fn handle_instance_command(action: InstanceCommands, console: &Console) -> Result<()> {
    match action {
        InstanceCommands::List => {
            let instances = console.api.list_instances(&console.admin_token()?).await?;
            print_view(ViewState::AdminOverview, &render_instances(&instances, None));
        }
        InstanceCommands::Create {
            name,
            token,
            events,
            webhook,
            proxy_url,
        } => {
            let form = NewInstance {
                name,
                token,
                events,
                webhook,
                proxy_url,
            };
            let created = actions::create_instance(console.api.as_ref(), &console.admin_token()?, &form).await?;
            println!("✅ Instance created");
            println!("{}", serde_json::to_string_pretty(&created)?);
        }
        InstanceCommands::Delete { id } => {
            actions::delete_instance(console.api.as_ref(), &console.admin_token()?, &id).await?;
            println!("✅ Instance {} deleted", id);
        }
        InstanceCommands::Open { id } => {
            let mut controller = console.controller();
            if controller.restore().await? != ViewState::AdminOverview {
                anyhow::bail!("Instances can only be opened from the admin list");
            }
            let token = controller
                .instances()
                .iter()
                .find(|i| i.id == id)
                .map(|i| i.token.clone())
                .with_context(|| format!("Instance {} not found", id))?;
            controller.open_instance(&id, &token)?;
            println!("📂 Opened instance {}", id);
            controller.shutdown();
        }
        InstanceCommands::Close => {
            let mut controller = console.controller();
            controller.restore().await?;
            controller.close_instance()?;
            println!("📋 Back to the instance list");
            controller.shutdown();
        }
    }
    Ok(())
}

async fn handle_session_command(action: SessionCommands, console: &Console) -> Result<()> {
    match action {
        SessionCommands::Connect => {
            console.controller().connect(None).await?;
            println!("🔌 Connect requested; scan the QR code or pair with a code");
        }
        SessionCommands::Disconnect => {
            console.api.disconnect(&console.token()?).await?;
            println!("Disconnected");
        }
        SessionCommands::Status => {
            let instance = console.api.status(&console.token()?).await?;
            let id = instance.id.clone();
            print_view(ViewState::RegularActive, &render_instances(&[instance], Some(&id)));
        }
        SessionCommands::Logout => {
            console.api.logout(&console.token()?).await?;
            println!("Session logged out");
        }
        SessionCommands::Pair { phone } => {
            let code = console.controller().pair_phone(&phone).await?;
            println!("🔗 Pairing code: {}", code.linking_code);
        }
        SessionCommands::Qr { output } => {
            let qr = console.api.qr_code(&console.token()?).await?;
            match output {
                Some(path) => {
                    let bytes = actions::decode_qr_image(&qr.qr_code)?;
                    tokio::fs::write(&path, bytes).await?;
                    println!("✅ QR code written to {:?}", path);
                }
                None if qr.qr_code.is_empty() => println!("QR code not available yet"),
                None => println!("{}", qr.qr_code),
            }
        }
    }
    Ok(())
}

async fn handle_webhook_command(action: WebhookCommands, console: &Console) -> Result<()> {
    match action {
        WebhookCommands::Get => {
            let hook = console.api.get_webhook(&console.token()?).await?;
            if hook.webhook.is_empty() {
                println!("Webhook: Not configured");
            } else {
                println!("Webhook: {}", hook.webhook);
            }
            println!("Events:  {}", hook.subscribe.join(", "));
        }
        WebhookCommands::Set { url, events } => {
            let hook = actions::set_webhook(console.api.as_ref(), &console.token()?, &url, &events).await?;
            println!("✅ Webhook set to {} ({})", hook.webhook, hook.subscribe.join(", "));
        }
    }
    Ok(())
}

async fn handle_message_command(action: MessageCommands, console: &Console) -> Result<()> {
    match action {
        MessageCommands::Send { phone, body } => {
            let sent = actions::send_text(console.api.as_ref(), &console.token()?, &phone, &body).await?;
            println!("✉️  Message sent, id {}", sent.id);
        }
        MessageCommands::Delete { phone, id } => {
            actions::delete_message(console.api.as_ref(), &console.token()?, &phone, &id).await?;
            println!("🗑️  Message {} deleted", id);
        }
    }
    Ok(())
}

async fn handle_user_command(action: UserCommands, console: &Console) -> Result<()> {
    match action {
        UserCommands::Info { phone } => {
            let users = actions::user_info(console.api.as_ref(), &console.token()?, &phone).await?;
            if users.is_empty() {
                println!("No user information found");
            }
            for user in users {
                println!("Phone:         {}", user.phone);
                println!("Status:        {}", user.status);
                println!("Verified name: {}", user.verified_name);
                println!("Devices:       {}", user.devices);
            }
        }
        UserCommands::Avatar { phone } => {
            match actions::user_avatar(console.api.as_ref(), &console.token()?, &phone).await? {
                Some(url) => println!("{}", url),
                None => println!("No avatar available"),
            }
        }
        UserCommands::Contacts { output } => {
            let records = actions::export_contacts(console.api.as_ref(), &console.token()?).await?;
            actions::write_contacts(&records, &output).await?;
            println!("✅ Exported {} contacts to {:?}", records.len(), output);
        }
    }
    Ok(())
}

async fn handle_config_command(action: ConfigCommands, config: &Config) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let yaml = serde_yaml::to_string(config)?;
            println!("📋 Current Configuration:\n{}", yaml);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("✅ Configuration validation passed");
        }
        ConfigCommands::Generate { output, force } => {
            if output.exists() && !force {
                error!("Configuration file already exists. Use --force to overwrite.");
                return Ok(());
            }
            let default_config = Config::default();
            default_config.save(&output).await?;
            println!("✅ Default configuration generated: {:?}", output);
        }
    }
    Ok(())
}
