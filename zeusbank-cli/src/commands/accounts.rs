//! Account commands - registration, login and account administration

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::{Confirm, Input, Password};

use super::{format_money, get_context, parse_amount};
use crate::output;
use zeusbank_core::services::{ProfileUpdate, Session, UserUpdate};
use zeusbank_core::{AccountProfile, AccountStatus, NewAccount};

#[derive(Subcommand)]
pub enum AccountCommands {
    /// List accounts
    List {
        /// Only accounts with this status (active, pending, suspended)
        #[arg(long)]
        status: Option<AccountStatus>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one account by account number
    Show {
        account_number: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set an account's status to active
    Approve { account_number: String },
    /// Set an account's status to suspended
    Suspend { account_number: String },
    /// Edit an account (admin)
    Update {
        /// Owner id of the account
        user_id: String,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        status: Option<AccountStatus>,
        /// Overwrite the balance without booking a transaction
        #[arg(long, allow_hyphen_values = true)]
        balance: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an account; its transactions stay in the ledger
    Delete {
        user_id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub struct RegisterArgs {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub json: bool,
}

/// Fill in anything not passed as a flag interactively
pub fn register(args: RegisterArgs) -> Result<()> {
    let full_name = match args.full_name {
        Some(v) => v,
        None => Input::new().with_prompt("Full name").interact_text()?,
    };
    let email = match args.email {
        Some(v) => v,
        None => Input::new().with_prompt("Email").interact_text()?,
    };
    let username = match args.username {
        Some(v) => v,
        None => Input::new().with_prompt("Username").interact_text()?,
    };
    let password = match args.password {
        Some(v) => v,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?,
    };

    let ctx = get_context()?;
    let profile = ctx.account_service.register(NewAccount {
        full_name,
        email,
        phone: args.phone,
        username,
        password,
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    output::success("Registration successful");
    print_profile(&profile);
    Ok(())
}

pub fn login(username: String, password: Option<String>, json: bool) -> Result<()> {
    let password = match password {
        Some(v) => v,
        None => Password::new().with_prompt("Password").interact()?,
    };

    let ctx = get_context()?;
    let session = ctx.account_service.login(&username, &password)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
        return Ok(());
    }

    match session {
        Session::Admin { username } => output::success(&format!("Logged in as admin {}", username)),
        Session::Customer { user } => {
            output::success(&format!("Welcome back, {}", user.full_name));
            print_profile(&user);
        }
    }
    Ok(())
}

pub struct ProfileArgs {
    pub user_id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub username: Option<String>,
    pub change_password: bool,
    pub json: bool,
}

/// Customer self-service edit
pub fn profile(args: ProfileArgs) -> Result<()> {
    let (current_password, new_password) = if args.change_password {
        let current = Password::new().with_prompt("Current password").interact()?;
        let next = Password::new()
            .with_prompt("New password")
            .with_confirmation("Confirm new password", "Passwords do not match")
            .interact()?;
        (Some(current), Some(next))
    } else {
        (None, None)
    };

    let ctx = get_context()?;
    let updated = ctx.account_service.update_profile(
        &args.user_id,
        ProfileUpdate {
            full_name: args.full_name,
            email: args.email,
            phone: args.phone,
            username: args.username,
            current_password,
            new_password,
        },
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
        return Ok(());
    }
    output::success("Profile updated successfully");
    print_profile(&updated);
    Ok(())
}

pub fn run(command: AccountCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        AccountCommands::List { status, json } => {
            let users = ctx.account_service.list_users(status)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&users)?);
                return Ok(());
            }
            if users.is_empty() {
                println!("No accounts found.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Account", "Name", "Username", "Status", "Balance", "Id"]);
            for user in &users {
                table.add_row(vec![
                    user.account_number.clone(),
                    user.full_name.clone(),
                    user.username.clone(),
                    user.status.to_string(),
                    format_money(user.balance),
                    user.id.clone(),
                ]);
            }
            println!("{}", table);
        }
        AccountCommands::Show { account_number, json } => {
            let user = ctx.account_service.get_by_number(&account_number)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&user)?);
            } else {
                print_profile(&user);
            }
        }
        AccountCommands::Approve { account_number } => {
            ctx.account_service.set_status(&account_number, AccountStatus::Active)?;
            output::success(&format!("Account {} is now active", account_number));
        }
        AccountCommands::Suspend { account_number } => {
            ctx.account_service.set_status(&account_number, AccountStatus::Suspended)?;
            output::warning(&format!("Account {} is now suspended", account_number));
        }
        AccountCommands::Update {
            user_id,
            full_name,
            email,
            phone,
            status,
            balance,
            json,
        } => {
            let balance = balance.as_deref().map(parse_amount).transpose()?;
            let updated = ctx.account_service.update_user(
                &user_id,
                UserUpdate {
                    full_name,
                    email,
                    phone,
                    status,
                    balance,
                },
            )?;
            if json {
                println!("{}", serde_json::to_string_pretty(&updated)?);
            } else {
                output::success("User updated successfully");
                print_profile(&updated);
            }
        }
        AccountCommands::Delete { user_id, force } => {
            let user = ctx.account_service.get_user(&user_id)?;
            if !force
                && !Confirm::new()
                    .with_prompt(format!(
                        "Delete account {} ({})? Its transactions will be kept.",
                        user.account_number, user.full_name
                    ))
                    .default(false)
                    .interact()?
            {
                println!("Cancelled.");
                return Ok(());
            }
            ctx.account_service.delete_user(&user_id)?;
            output::success(&format!("Deleted account {}", user.account_number));
        }
    }

    Ok(())
}

fn print_profile(user: &AccountProfile) {
    let mut table = output::create_table();
    table.add_row(vec!["Account number", user.account_number.as_str()]);
    table.add_row(vec!["Name", user.full_name.as_str()]);
    table.add_row(vec!["Username", user.username.as_str()]);
    table.add_row(vec!["Email", user.email.as_str()]);
    table.add_row(vec!["Phone", user.phone.as_str()]);
    table.add_row(vec!["Id", user.id.as_str()]);
    println!("{}", table);

    let status = output::account_status_label(user.status);
    println!("Status: {}   Balance: {}", status, format_money(user.balance).bold());
}
