#[path = "mailprobe-cli/args.rs"]
mod args;
#[path = "mailprobe-cli/logging.rs"]
mod logging;
#[path = "mailprobe-cli/output.rs"]
mod output;

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use mailprobe::mx::LookupMx;
use mailprobe::service::{check_with_resolver, parse_request};
use mailprobe::{CheckRequest, CheckResponse, Prober};
use trust_dns_resolver::Resolver;

use crate::args::{Cli, Commands};
use crate::output::OutputRow;

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let format = cli.output_format()?;

    if cli.cmd.is_none() && !cli.stdin {
        Cli::clap_command().print_help()?;
        println!();
        return Ok(());
    }

    let prober = Prober::new(cli.probe_options()).context("prober setup")?;
    let resolver = Resolver::from_system_conf().context("system DNS configuration")?;
    let mut rows: Vec<OutputRow> = Vec::new();

    if cli.stdin {
        // une requête JSON par ligne, les lignes vides sont ignorées
        for line in io::stdin().lock().lines() {
            let line = line.context("read stdin")?;
            let body = line.trim();
            if body.is_empty() {
                continue;
            }
            rows.push(request_row(body, &resolver, &prober));
        }
    } else if let Some(Commands::Check { email }) = &cli.cmd {
        let request = CheckRequest {
            email: email.trim().to_string(),
        };
        let response = check_with_resolver(&request, &resolver, &prober)
            .unwrap_or_else(|err| CheckResponse::refused(&err));
        rows.push(OutputRow::new(email.as_str(), response));
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    output::emit(&mut out, &rows, format)?;
    drop(out);

    std::process::exit(output::exit_code(&rows));
}

/// One NDJSON request line to one output row, tagged with the address when
/// the line parses and with the raw line otherwise.
fn request_row<R: LookupMx + ?Sized>(body: &str, resolver: &R, prober: &Prober) -> OutputRow {
    match parse_request(body) {
        Ok(request) => {
            let response = check_with_resolver(&request, resolver, prober)
                .unwrap_or_else(|err| CheckResponse::refused(&err));
            OutputRow::new(request.email, response)
        }
        Err(err) => OutputRow::new(body, CheckResponse::refused(&err)),
    }
}
