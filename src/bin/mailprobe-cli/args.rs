use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use mailprobe::ProbeOptions;

#[derive(Parser)]
#[command(name = "mailprobe-cli", about = "Teste la délivrabilité d'adresses e-mail via SMTP")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,

    /// lit des requêtes JSON {"email": ...} depuis stdin (une par ligne)
    #[arg(long)]
    pub stdin: bool,

    /// format: human|json|ndjson
    #[arg(long, default_value = "human")]
    pub format: String,

    /// enveloppe MAIL FROM (par défaut postmaster@domaine)
    #[arg(long = "from")]
    pub mail_from: Option<String>,

    /// nom utilisé pour EHLO (par défaut l'adresse IP sortante)
    #[arg(long)]
    pub helo: Option<String>,

    /// port SMTP du MX
    #[arg(long, default_value_t = 25)]
    pub port: u16,

    /// délai par connexion et par commande (ms, 0 = aucun)
    #[arg(long = "timeout", default_value_t = 5_000)]
    pub timeout_ms: u64,

    /// n'essaie pas STARTTLS même si proposé
    #[arg(long = "no-starttls")]
    pub no_starttls: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// sonde une seule adresse
    Check { email: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
    Ndjson,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn clap_command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        match self.format.as_str() {
            "human" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            "ndjson" => Ok(OutputFormat::Ndjson),
            other => bail!("unknown --format '{other}', use: human|json|ndjson"),
        }
    }

    pub fn probe_options(&self) -> ProbeOptions {
        let timeout = Duration::from_millis(self.timeout_ms);
        ProbeOptions {
            port: self.port,
            helo_domain: self.helo.clone(),
            envelope_sender: self.mail_from.clone(),
            connect_timeout: timeout,
            command_timeout: timeout,
            starttls: !self.no_starttls,
        }
    }
}
