//! sara - drive a u-blox SARA module from the command line

mod settings;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use sara_modem::{available_ports, Modem, SerialStream};
use sara_protocol::{ModuleVariant, SocketProtocol};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "sara", version, about = "Drive u-blox SARA cellular modules")]
struct Cli {
    /// Settings file (default: ~/.config/sara/settings.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Serial port, overriding the settings file
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Module generation, overriding the settings file
    #[arg(long, value_enum, global = true)]
    variant: Option<VariantArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VariantArg {
    N211,
    R4,
}

impl From<VariantArg> for ModuleVariant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::N211 => ModuleVariant::SaraN211,
            VariantArg::R4 => ModuleVariant::SaraR4,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List serial ports
    Ports,
    /// Set up the module and print its state
    Info,
    /// Set up the module and attach to the network
    Connect {
        /// Numeric PLMN, overriding the settings file
        #[arg(long)]
        operator: Option<String>,
        /// Accept roaming registration
        #[arg(long)]
        roaming: bool,
    },
    /// Attach and send one UDP datagram
    Send {
        host: String,
        #[arg(value_name = "PORT")]
        remote_port: u16,
        message: String,
        /// Local port to send from
        #[arg(long)]
        local_port: Option<u16>,
        /// Wait for one reply datagram
        #[arg(long)]
        reply: bool,
    },
    /// Attach and wait for one UDP datagram
    Receive {
        /// Local port to listen on
        #[arg(long)]
        local_port: u16,
        /// Largest datagram to read
        #[arg(long, default_value_t = 512)]
        bufsize: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sara=info,sara_modem=info,sara_protocol=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        settings.port = port;
    }
    if let Some(variant) = cli.variant {
        settings.variant = variant.into();
    }

    match cli.command {
        Command::Ports => list_ports(),
        Command::Info => info(&settings).await,
        Command::Connect { operator, roaming } => {
            if let Some(operator) = operator {
                settings.operator = operator;
            }
            settings.roaming |= roaming;
            let mut modem = attach(&settings).await?;
            println!(
                "Registered, IP address {}",
                modem.update_ip_address().await?.unwrap_or_default()
            );
            Ok(())
        }
        Command::Send {
            host,
            remote_port,
            message,
            local_port,
            reply,
        } => {
            send(
                &settings,
                &host,
                remote_port,
                message.as_bytes(),
                local_port,
                reply,
            )
            .await
        }
        Command::Receive {
            local_port,
            bufsize,
        } => receive(&settings, local_port, bufsize).await,
    }
}

fn list_ports() -> anyhow::Result<()> {
    let ports = available_ports().context("Failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{}", port.describe());
    }
    Ok(())
}

async fn open(settings: &Settings) -> anyhow::Result<Modem<SerialStream>> {
    let mut modem = Modem::open(&settings.port, settings.variant, settings.modem.clone())
        .with_context(|| format!("Failed to open {}", settings.port))?;
    modem
        .setup(&settings.setup)
        .await
        .context("Module setup failed")?;
    Ok(modem)
}

async fn attach(settings: &Settings) -> anyhow::Result<Modem<SerialStream>> {
    let mut modem = open(settings).await?;
    modem
        .connect(&settings.operator, settings.roaming)
        .await
        .with_context(|| format!("Failed to connect to {}", settings.operator))?;
    Ok(modem)
}

async fn info(settings: &Settings) -> anyhow::Result<()> {
    let mut modem = open(settings).await?;

    println!("Module:        {}", modem.variant());
    if modem.profile().capabilities.imei {
        println!("IMEI:          {}", modem.imei().await?);
    }
    match modem.query_registration().await? {
        Some(status) => println!("Registration:  {:?} ({})", status, status.code()),
        None => println!("Registration:  unknown"),
    }
    println!("Connected:     {}", modem.query_signaling().await?);
    println!(
        "IP address:    {}",
        modem.update_ip_address().await?.unwrap_or_else(|| "none".into())
    );

    let radio = modem.update_radio_statistics().await?;
    println!("{:#?}", radio);
    Ok(())
}

async fn send(
    settings: &Settings,
    host: &str,
    port: u16,
    payload: &[u8],
    local_port: Option<u16>,
    reply: bool,
) -> anyhow::Result<()> {
    let mut modem = attach(settings).await?;
    let mut socket = modem.open_socket(SocketProtocol::Udp, local_port).await?;

    socket.send_to(payload, host, port).await?;
    println!("Sent {} bytes to {}:{}", payload.len(), host, port);

    if reply {
        match socket.recv_from(512).await? {
            Some(datagram) => print_datagram(&datagram),
            None => println!("No reply"),
        }
    }

    socket.close().await?;
    Ok(())
}

async fn receive(settings: &Settings, local_port: u16, bufsize: usize) -> anyhow::Result<()> {
    let mut modem = attach(settings).await?;
    let mut socket = modem
        .open_socket(SocketProtocol::Udp, Some(local_port))
        .await?;
    socket.bind(local_port).await?;

    match socket.recv_from(bufsize).await? {
        Some(datagram) => print_datagram(&datagram),
        None => println!("Nothing received"),
    }

    socket.close().await?;
    Ok(())
}

fn print_datagram(datagram: &sara_modem::Datagram) {
    println!(
        "{} bytes from {}:{}: {}",
        datagram.payload.len(),
        datagram.host,
        datagram.port,
        String::from_utf8_lossy(&datagram.payload)
    );
}
