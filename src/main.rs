//! Reservas CLI
//!
//! Command-line front end for the reservation service:
//! - Book a reservation
//! - Unlock / lock the admin dashboard
//! - List, chart, calendar and export the reservations
//! - Watch new reservations arrive live

use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reservas::calendar::{self, MonthView};
use reservas::config::{generate_default_config, Config, LoggingConfig};
use reservas::render;
use reservas::{
    AccessGate, BookingFields, BookingForm, ChannelNotifier, ChartOrder, Command, Dashboard,
    ExportFormat, FileGateStore, HttpReservationApi, Notification, Notifier, ReservationApi,
    ReservationId, RunExit, SocketIoPush,
};

#[derive(Parser)]
#[command(name = "reservas")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reservation booking client and admin dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/reservas/config.toml, then ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Reservation service URL (overrides config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Book a reservation
    Book {
        #[arg(long)]
        nombre: String,
        #[arg(long)]
        email: String,
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        fecha: String,
        #[arg(long, default_value = "1")]
        personas: String,
        #[arg(long, default_value = "")]
        mensaje: String,
    },

    /// Unlock the admin dashboard
    Login {
        /// Passphrase (prompted when omitted)
        passphrase: Option<String>,
    },

    /// Lock the admin dashboard
    Logout,

    /// Show connection and dashboard status
    Status,

    /// List all reservations
    List,

    /// People per date chart
    Chart {
        /// Bar order: date or first-seen (default from config)
        #[arg(long)]
        order: Option<ChartOrder>,
        /// Width of the longest bar
        #[arg(long, default_value = "40")]
        width: usize,
    },

    /// Month calendar of reservations
    Calendar {
        /// Month to show (YYYY-MM, default: current month)
        #[arg(long)]
        month: Option<String>,
    },

    /// Export reservations to a spreadsheet
    Export {
        /// Output file or directory (default: export.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// xlsx or csv (default: from the output extension, else xlsx)
        #[arg(long)]
        format: Option<ExportFormat>,
    },

    /// Delete a reservation
    Delete {
        /// Reservation id
        id: String,
    },

    /// Live dashboard; reads commands from stdin
    Watch,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Prints notifications to stderr
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        eprintln!("{}", render::notification(&notification));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Config discovery logs before the configured subscriber exists
    let mut config = tracing::subscriber::with_default(bootstrap_subscriber(std::io::stderr), || {
        match &cli.config {
            Some(path) => Config::load_with_env(path),
            None => Ok(Config::load_default()),
        }
    })?;
    if let Some(url) = cli.api_url.clone() {
        config.api.base_url = url;
    }

    init_tracing(&config.logging);
    tracing::debug!(api = %config.api.base_url, "Reservas v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Book {
            nombre,
            email,
            fecha,
            personas,
            mensaje,
        } => {
            let fields = BookingFields {
                nombre,
                email,
                fecha,
                personas,
                mensaje,
            };
            let mut form = BookingForm::new(build_api(&config)?, Arc::new(ConsoleNotifier));
            match form.submit(&fields).await {
                Ok(ticket) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(ticket)?);
                    } else {
                        print!("{}", render::ticket(ticket));
                    }
                }
                Err(_) => std::process::exit(1),
            }
        }

        Commands::Login { passphrase } => {
            let passphrase = match passphrase {
                Some(p) => p,
                None => prompt("Clave de administrador: ")?,
            };
            let mut dashboard = build_dashboard(&config, false)?;
            if dashboard.unlock(&passphrase).await.is_err() {
                std::process::exit(1);
            }
            println!("Acceso concedido");
            print!("{}", render::summary(&dashboard.summary()));
        }

        Commands::Logout => {
            let mut dashboard = build_dashboard(&config, false)?;
            dashboard.lock_out()?;
            println!("Sesión cerrada");
        }

        Commands::Status => {
            let mut dashboard = build_dashboard(&config, false)?;
            println!("Reservas v{}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("API:        {}", config.api.base_url);
            println!(
                "Push:       {}",
                if config.push.enabled {
                    config.push.push_config(&config.api).endpoint()
                } else {
                    "disabled".to_string()
                }
            );
            if dashboard.resume().await {
                println!("Dashboard:  desbloqueado");
                println!();
                print!("{}", render::summary(&dashboard.summary()));
            } else {
                println!("Dashboard:  bloqueado");
            }
        }

        Commands::List => {
            let dashboard = unlocked_dashboard(&config).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(dashboard.reservations())?);
            } else {
                print!("{}", render::reservation_table(dashboard.reservations()));
            }
        }

        Commands::Chart { order, width } => {
            if let Some(order) = order {
                config.dashboard.chart_order = order;
            }
            let dashboard = unlocked_dashboard(&config).await?;
            let summary = dashboard.summary();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", render::summary(&summary));
                println!();
                print!("{}", render::chart(&summary.people_per_date, width));
            }
        }

        Commands::Calendar { month } => {
            let first = match month.as_deref() {
                Some(m) => parse_month(m)?,
                None => {
                    let today = chrono::Local::now().date_naive();
                    NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
                        .context("invalid current date")?
                }
            };
            let dashboard = unlocked_dashboard(&config).await?;
            let events = calendar::events(dashboard.reservations());
            let view = MonthView::containing(first, &events).context("month out of range")?;
            if cli.json {
                let days: Vec<_> = view.busy_days().flat_map(|(_, e)| e.iter()).collect();
                println!("{}", serde_json::to_string_pretty(&days)?);
            } else {
                print!("{}", render::month(&view));
            }
        }

        Commands::Export { output, format } => {
            let format = format
                .or_else(|| output.as_deref().and_then(ExportFormat::from_path))
                .unwrap_or_default();
            let dashboard = unlocked_dashboard(&config).await?;
            match dashboard.export(output.as_deref(), format) {
                Ok(path) => println!("Exported to {:?}", path),
                Err(_) => std::process::exit(1),
            }
        }

        Commands::Delete { id } => {
            let mut dashboard = unlocked_dashboard(&config).await?;
            if dashboard.remove(&ReservationId::from(id)).await.is_err() {
                std::process::exit(1);
            }
        }

        Commands::Watch => {
            watch(&config).await?;
        }

        Commands::Config { output } => {
            let content = generate_default_config();

            if let Some(path) = output {
                std::fs::write(&path, content)?;
                println!("Config written to {:?}", path);
            } else {
                print!("{}", content);
            }
        }
    }

    Ok(())
}

/// Subscriber used until the config has been read: warnings only
fn bootstrap_subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("reservas=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish()
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("reservas={}", logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn build_api(config: &Config) -> anyhow::Result<Arc<dyn ReservationApi>> {
    let api = HttpReservationApi::new(config.api.client_config())
        .context("failed to build reservation client")?;
    Ok(Arc::new(api))
}

fn build_gate(config: &Config) -> AccessGate {
    let store = FileGateStore::new(config.gate.state_path());
    AccessGate::new(Arc::new(store), config.gate.passphrase.clone())
}

fn build_dashboard(config: &Config, live: bool) -> anyhow::Result<Dashboard> {
    build_dashboard_with(config, live, Arc::new(ConsoleNotifier))
}

fn build_dashboard_with(
    config: &Config,
    live: bool,
    notifier: Arc<dyn Notifier>,
) -> anyhow::Result<Dashboard> {
    let mut dashboard = Dashboard::new(build_gate(config), build_api(config)?, notifier)
        .with_chart_order(config.dashboard.chart_order)
        .with_export_options(config.export.options());

    if live && config.push.enabled {
        let push = SocketIoPush::new(config.push.push_config(&config.api));
        dashboard = dashboard.with_push(Arc::new(push));
    }
    Ok(dashboard)
}

/// Snapshot dashboard for one-shot commands; exits when locked
async fn unlocked_dashboard(config: &Config) -> anyhow::Result<Dashboard> {
    let mut dashboard = build_dashboard(config, false)?;
    if !dashboard.resume().await {
        eprintln!("Dashboard bloqueado. Ejecuta `reservas login` primero.");
        std::process::exit(1);
    }
    Ok(dashboard)
}

async fn watch(config: &Config) -> anyhow::Result<()> {
    let (notifier, mut feed) = ChannelNotifier::new();
    let mut dashboard = build_dashboard_with(config, true, Arc::new(notifier))?;
    let mut view = dashboard.watch_summary();

    let printer = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(notification) = feed.recv() => {
                    eprintln!("{}", render::notification(&notification));
                }
                changed = view.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let summary = view.borrow_and_update().clone();
                    println!("{}", render::summary(&summary));
                }
                else => break,
            }
        }
    });

    if !dashboard.resume().await {
        drop(dashboard);
        let _ = printer.await;
        eprintln!("Dashboard bloqueado. Ejecuta `reservas login` primero.");
        std::process::exit(1);
    }

    eprintln!("Comandos: r recargar | d <id> eliminar | x [ruta] exportar | l bloquear | q salir");

    let (tx, rx) = mpsc::channel(16);
    spawn_stdin_reader(tx.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(Command::Shutdown).await;
        }
    });

    let exit = dashboard.run(rx).await;
    drop(dashboard);
    let _ = printer.await;

    match exit {
        RunExit::LockedOut => println!("Sesión cerrada"),
        RunExit::Shutdown => tracing::debug!("Watch stopped"),
    }
    Ok(())
}

/// Read dashboard commands from stdin on a plain thread
fn spawn_stdin_reader(tx: mpsc::Sender<Command>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Ok(Some(command)) => {
                    let last = matches!(command, Command::LockOut | Command::Shutdown);
                    if tx.blocking_send(command).is_err() || last {
                        return;
                    }
                }
                Ok(None) => {}
                Err(msg) => eprintln!("{}", msg),
            }
        }
        let _ = tx.blocking_send(Command::Shutdown);
    });
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(None);
    };
    let arg = parts.next();

    match head {
        "r" | "reload" => Ok(Some(Command::Reload)),
        "d" | "delete" => match arg {
            Some(id) => Ok(Some(Command::Remove(ReservationId::from(id)))),
            None => Err("uso: d <id>".to_string()),
        },
        "x" | "export" => {
            let target = arg.map(PathBuf::from);
            let format = target
                .as_deref()
                .and_then(ExportFormat::from_path)
                .unwrap_or_default();
            Ok(Some(Command::Export { target, format }))
        }
        "l" | "lock" => Ok(Some(Command::LockOut)),
        "q" | "quit" => Ok(Some(Command::Shutdown)),
        other => Err(format!("comando desconocido: {}", other)),
    }
}

fn parse_month(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")
        .with_context(|| format!("invalid month `{}` (expected YYYY-MM)", raw))
}

fn prompt(label: &str) -> anyhow::Result<String> {
    eprint!("{}", label);
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
