//! Zeus Bank CLI - the demo ledger in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{accounts, api, doctor, ledger, logs, settings, status};
use zeusbank_core::{LogEvent, TransactionType};

/// Zeus Bank - demo banking ledger
#[derive(Parser)]
#[command(name = "zb", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a new customer account
    Register {
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        username: Option<String>,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check credentials for a customer or the admin
    Login {
        username: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Edit your own profile
    Profile {
        /// Your account id
        user_id: String,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        username: Option<String>,
        /// Prompt for current and new password
        #[arg(long)]
        change_password: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage accounts (admin)
    Accounts {
        #[command(subcommand)]
        command: accounts::AccountCommands,
    },

    /// Send money to another account
    Transfer {
        /// Sender account number
        from: String,
        /// Recipient account number
        to: String,
        amount: String,
        #[arg(long)]
        memo: Option<String>,
        /// Force the transaction type (transfer or withdrawal)
        #[arg(long = "type")]
        tx_type: Option<TransactionType>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Withdraw money out of the bank
    Withdraw {
        /// Account number to withdraw from
        from: String,
        amount: String,
        #[arg(long)]
        memo: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Deposit money into an account (admin)
    Fund {
        account_number: String,
        amount: String,
        /// Defaults to "Admin deposit"
        #[arg(long)]
        memo: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the admin funding history
    Funding {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect and correct transactions (admin)
    Tx {
        #[command(subcommand)]
        command: ledger::TxCommands,
    },

    /// View and change policy settings (admin)
    Settings {
        #[command(subcommand)]
        command: settings::SettingsCommands,
    },

    /// Run one JSON request through the request dispatcher
    Api {
        /// Request JSON; read from stdin when omitted
        request: Option<String>,
        /// Print the response on one line
        #[arg(long)]
        compact: bool,
    },

    /// Show ledger status and summary
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run ledger consistency checks
    Doctor {
        /// Show verbose output
        #[arg(long, short)]
        verbose: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    /// Name recorded in the log; arguments are never logged
    fn name(&self) -> &'static str {
        match self {
            Commands::Register { .. } => "register",
            Commands::Login { .. } => "login",
            Commands::Profile { .. } => "profile",
            Commands::Accounts { .. } => "accounts",
            Commands::Transfer { .. } => "transfer",
            Commands::Withdraw { .. } => "withdraw",
            Commands::Fund { .. } => "fund",
            Commands::Funding { .. } => "funding",
            Commands::Tx { .. } => "tx",
            Commands::Settings { .. } => "settings",
            Commands::Api { .. } => "api",
            Commands::Status { .. } => "status",
            Commands::Doctor { .. } => "doctor",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let name = cli.command.name();

    let result = run(cli);

    let logger = commands::get_logger();
    match result {
        Ok(()) => {
            commands::log_event(&logger, LogEvent::new("command_executed").with_command(name));
            ExitCode::SUCCESS
        }
        Err(e) => {
            let kind = e
                .downcast_ref::<zeusbank_core::Error>()
                .map(|err| err.kind())
                .unwrap_or("internal");
            commands::log_event(
                &logger,
                LogEvent::new("command_failed")
                    .with_command(name)
                    .with_error(kind),
            );
            output::error(&format!("{}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Register {
            full_name,
            email,
            phone,
            username,
            password,
            json,
        } => accounts::register(accounts::RegisterArgs {
            full_name,
            email,
            phone,
            username,
            password,
            json,
        }),
        Commands::Login { username, password, json } => accounts::login(username, password, json),
        Commands::Profile {
            user_id,
            full_name,
            email,
            phone,
            username,
            change_password,
            json,
        } => accounts::profile(accounts::ProfileArgs {
            user_id,
            full_name,
            email,
            phone,
            username,
            change_password,
            json,
        }),
        Commands::Accounts { command } => accounts::run(command),
        Commands::Transfer { from, to, amount, memo, tx_type, json } => {
            ledger::transfer(ledger::TransferArgs { from, to, amount, memo, tx_type, json })
        }
        Commands::Withdraw { from, amount, memo, json } => ledger::withdraw(from, amount, memo, json),
        Commands::Fund { account_number, amount, memo, json } => {
            ledger::fund(account_number, amount, memo, json)
        }
        Commands::Funding { json } => ledger::funding(json),
        Commands::Tx { command } => ledger::run(command),
        Commands::Settings { command } => settings::run(command),
        Commands::Api { request, compact } => api::run(request, compact),
        Commands::Status { json } => status::run(json),
        Commands::Doctor { verbose, json } => doctor::run(verbose, json),
        Commands::Logs { command } => logs::run(command),
    }
}
