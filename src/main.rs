use clap::{Parser, Subcommand};
use std::{error::Error, io, process::ExitCode, sync::Arc};
use tracing::info;
use tracing_subscriber::EnvFilter;

use kzt_price::config::{Config, DEFAULT_LOG_FILTER};
use kzt_price::console::{self, Console};
use kzt_price::{ConversionOutcome, ConversionService, HttpRateSource};

#[derive(Parser, Debug)]
#[command(name = "kzt-price", version)]
#[command(about = "Convert prices to KZT at the current exchange rate")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a single amount and exit
    Convert {
        /// Amount, dot or comma as decimal separator
        amount: String,
        /// Three-letter currency code
        currency: String,
    },
    /// List the mini-shop catalog
    Products,
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let args = Args::parse();
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_filter)
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(io::stderr)
        .init();
    info!(api = %config.api_base_url, timeout = ?config.request_timeout, "starting");

    let service = ConversionService::new(Arc::new(HttpRateSource::new(&config)?));
    let runtime = tokio::runtime::Runtime::new()?;

    match args.command {
        None => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            let mut console = Console::new(stdin.lock(), stdout.lock());
            runtime.block_on(console.run(&service))?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Products) => {
            for (i, product) in console::catalog().iter().enumerate() {
                println!("{}", console::format_product_line(i + 1, product));
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Convert { amount, currency }) => {
            let Some(amount) = console::parse_amount(&amount) else {
                eprintln!("Error: amount must be a number > 0");
                return Ok(ExitCode::FAILURE);
            };
            let Some(currency) = console::parse_currency_code(&currency) else {
                eprintln!("Error: currency must be 3 letters");
                return Ok(ExitCode::FAILURE);
            };

            match runtime.block_on(service.convert_to_kzt(amount, &currency)) {
                ConversionOutcome::Success(conversion) => {
                    println!("{}", console::format_rate_lines(&currency, &conversion));
                    println!("{}", console::format_total(amount, &currency, &conversion));
                    Ok(ExitCode::SUCCESS)
                }
                ConversionOutcome::Failure { message } => {
                    eprintln!("Error: {}", message);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}
