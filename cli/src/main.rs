//! CLI entry point.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use tachibana::api::OrderListFilter;
use tachibana::{Client, InquiryStatus, Market, Side, Subscription};
use tachibana_cli::commands::{self, OrderArgs, PlaceOptions};
use tachibana_cli::config::Config;
use tachibana_cli::error::{Error, Result};

#[derive(Parser)]
#[command(name = "tachibana")]
#[command(about = "Trade and watch orders on a Tachibana e-shiten account")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and out once to check credentials and endpoints
    LoginCheck,

    /// List orders
    Orders {
        /// Only this issue code
        #[arg(long)]
        issue: Option<String>,

        /// Business day, YYYYMMDD
        #[arg(long)]
        date: Option<String>,

        /// Only orders that can still be cancelled
        #[arg(long)]
        open: bool,

        /// One JSON object per line
        #[arg(long)]
        json: bool,
    },

    /// Show one order with its fills
    Detail {
        order_number: String,
        /// Business day of the order, YYYYMMDD
        date: String,
    },

    /// Cancel an order
    Cancel {
        order_number: String,
        /// Business day of the order, YYYYMMDD
        date: String,
    },

    /// Buy an issue
    Buy(OrderCommand),

    /// Sell an issue
    Sell(OrderCommand),

    /// Poll an order until it is fully contracted
    Watch {
        order_number: String,
        /// Business day of the order, YYYYMMDD
        date: String,
        /// Issue code, narrows the order list
        #[arg(long)]
        issue: Option<String>,
    },

    /// Print events from the event stream
    Stream {
        /// Issue codes to quote
        #[arg(long = "issue")]
        issues: Vec<String>,

        /// Market code for all issues
        #[arg(long, default_value = "00")]
        market: String,

        /// Quote columns to keep (default: all)
        #[arg(long = "column")]
        columns: Vec<String>,

        /// Event types to deliver, e.g. FD, EC, NS (default: all)
        #[arg(long = "event")]
        events: Vec<String>,

        /// Resume after this sequence number
        #[arg(long)]
        after: Option<u64>,

        /// Stop after this many events
        #[arg(long)]
        limit: Option<usize>,

        /// One JSON object per line
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct OrderCommand {
    issue: String,
    quantity: u64,
    /// Limit price, or `market`
    price: String,

    /// Market code
    #[arg(long, default_value = "00")]
    market: String,

    /// Execution condition code (0 anytime, 2 at open, 4 at close, 6 funari)
    #[arg(long, default_value = "0")]
    timing: String,

    /// Trade type code (0 cash, 2/6 margin open, 4/8 margin close)
    #[arg(long, default_value = "0")]
    trade_type: String,

    /// `today` or YYYYMMDD
    #[arg(long, default_value = "today")]
    expiry: String,

    /// Stop trigger price
    #[arg(long)]
    trigger: Option<String>,

    /// Price once the stop triggers (default: market)
    #[arg(long, requires = "trigger")]
    stop_price: Option<String>,

    /// The stop leg is one-cancels-other with the limit
    #[arg(long, requires = "trigger")]
    oco: bool,

    /// Skip confirmation prompt
    #[arg(long)]
    yes: bool,

    /// Poll the order after it is accepted
    #[arg(long)]
    track: bool,
}

impl OrderCommand {
    fn to_args(&self, side: Side) -> Result<(OrderArgs, PlaceOptions)> {
        let args = OrderArgs {
            issue_code: self.issue.clone(),
            side,
            quantity: self.quantity,
            price: commands::parse_price(&self.price)?,
            market: commands::parse_code(&self.market, "market")?,
            timing: commands::parse_code(&self.timing, "execution condition")?,
            trade_type: commands::parse_code(&self.trade_type, "trade type")?,
            expiry: commands::parse_expiry(&self.expiry)?,
            stop: commands::parse_stop(self.trigger.as_deref(), self.stop_price.as_deref(), self.oco)?,
        };
        if args.quantity == 0 {
            return Err(Error::Argument("quantity must be > 0".into()));
        }
        let opts = PlaceOptions {
            yes: self.yes,
            track: self.track,
        };
        Ok((args, opts))
    }
}

fn run(command: Command, client: &Client, config: &Config, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::LoginCheck => commands::login_check(client, config, out),
        Command::Orders {
            issue,
            date,
            open,
            json,
        } => {
            let filter = OrderListFilter {
                issue_code: issue,
                execution_date: date.as_deref().map(commands::parse_date).transpose()?,
                inquiry_status: open.then_some(InquiryStatus::Cancellable),
            };
            commands::list_orders(client, config, &filter, json, out)
        }
        Command::Detail { order_number, date } => {
            let key = commands::order_key(&order_number, &date)?;
            commands::show_detail(client, config, &key, out)
        }
        Command::Cancel { order_number, date } => {
            let key = commands::order_key(&order_number, &date)?;
            commands::cancel(client, config, &key, out)
        }
        Command::Buy(order) => {
            let (args, opts) = order.to_args(Side::Buy)?;
            commands::place(client, config, &args, opts, out)
        }
        Command::Sell(order) => {
            let (args, opts) = order.to_args(Side::Sell)?;
            commands::place(client, config, &args, opts, out)
        }
        Command::Watch {
            order_number,
            date,
            issue,
        } => {
            let key = commands::order_key(&order_number, &date)?;
            commands::watch(client, config, key, issue.as_deref(), out)
        }
        Command::Stream {
            issues,
            market,
            columns,
            events,
            after,
            limit,
            json,
        } => {
            let market: Market = commands::parse_code(&market, "market")?;
            let issue_refs: Vec<&str> = issues.iter().map(String::as_str).collect();
            let column_refs: Vec<&str> = columns.iter().map(String::as_str).collect();
            let mut subscription = Subscription::quotes(&issue_refs, market)
                .with_columns(&column_refs)
                .with_event_types(&commands::parse_event_types(&events)?);
            subscription.start_sequence = after;
            commands::stream(client, config, &subscription, limit, json, out)
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let client = match Client::new(config.client_config()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error creating client: {e}");
            process::exit(1);
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = run(cli.command, &client, &config, &mut out) {
        match &e {
            Error::Rejected(status) => {
                eprintln!("Rejected: {status}");
                process::exit(2);
            }
            Error::Aborted(msg) => {
                eprintln!("{msg}");
                process::exit(0);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}
