//! Command definitions and handlers.
//!
//! Handlers print results to stdout and backend errors inline. When the
//! session cannot be renewed the user is sent back to `clubdesk login`.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::debug;

use clubdesk_core::api::resources::DEFAULT_PER_PAGE;
use clubdesk_core::auth::LogoutReason;
use clubdesk_core::{ApiError, AuthService, Config, SessionStatus};

/// Exit code when the user has to log in again
const EXIT_LOGIN_REQUIRED: u8 = 2;

/// Exit code for any other failed request
const EXIT_REQUEST_FAILED: u8 = 1;

/// Width of the name column in listings
const NAME_WIDTH: usize = 32;

#[derive(Debug, Parser)]
#[command(name = "clubdesk", version, about = "Manage your sports clubs from the terminal")]
pub struct Cli {
    /// Backend root, e.g. https://clubs.example.com
    #[arg(long, global = true, env = "CLUBDESK_API_URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and remember the session
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List your clubs
    Clubs,
    /// List the groups of a club
    Groups { club_id: String },
    /// List or search the students of a club
    Students {
        club_id: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
        per_page: u32,
        #[arg(long, conflicts_with_all = ["page", "per_page"])]
        search: Option<String>,
    },
    /// Show the dashboard numbers of a club
    Dashboard { club_id: String },
    /// Show the public schedule of a club (no login needed)
    Schedule {
        club_id: String,
        /// First day, YYYY-MM-DD
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day, YYYY-MM-DD
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

pub async fn login(auth: &AuthService, config: &mut Config, email: Option<String>) -> Result<ExitCode> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;

    match auth.login(&email, &password).await {
        Ok(user) => {
            println!("Logged in as {}", user.display_name());
            remember_email(config, email);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => Ok(report(auth, err)),
    }
}

pub async fn signup(
    auth: &AuthService,
    config: &mut Config,
    email: String,
    name: String,
) -> Result<ExitCode> {
    let password = rpassword::prompt_password("Password (min 8 characters): ")
        .context("Failed to read password")?;

    match auth.signup(&email, &password, &name).await {
        Ok(user) => {
            println!("Welcome, {}", user.display_name());
            remember_email(config, email);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => Ok(report(auth, err)),
    }
}

pub fn logout(auth: &AuthService) -> Result<ExitCode> {
    auth.logout();
    println!("Logged out");
    Ok(ExitCode::SUCCESS)
}

/// Restore the stored session. Returns an exit code when the command cannot
/// proceed.
pub async fn restore(auth: &AuthService) -> Result<Option<ExitCode>> {
    match auth.restore().await {
        Ok(Some(user)) => {
            debug!(user_id = %user.id, "Using stored session");
            Ok(None)
        }
        Ok(None) => {
            eprintln!("Not logged in. Run `clubdesk login` first.");
            Ok(Some(ExitCode::from(EXIT_LOGIN_REQUIRED)))
        }
        Err(err) => Ok(Some(report(auth, err))),
    }
}

/// Run a command that needs a session.
pub async fn run(auth: &AuthService, command: Command) -> Result<ExitCode> {
    let result = dispatch(auth, command).await;
    Ok(match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(auth, err),
    })
}

async fn dispatch(auth: &AuthService, command: Command) -> Result<(), ApiError> {
    let client = auth.client();

    match command {
        Command::Whoami => {
            // Already fetched while restoring the session.
            let user = match auth.current_user() {
                Some(user) => user,
                None => auth.me().await?,
            };
            println!("{}", user.display_name());
            println!("Role: {}", user.role);
            if let Some(creds) = auth.session().credentials() {
                println!("Token age: {}m", creds.age().num_minutes().max(0));
            }
        }
        Command::Clubs => {
            let clubs = client.list_clubs().await?;
            if clubs.is_empty() {
                println!("No clubs yet.");
            }
            for club in clubs {
                println!(
                    "{}  {}  {}",
                    club.id,
                    pad(&club.name, NAME_WIDTH),
                    club.currency
                );
            }
        }
        Command::Groups { club_id } => {
            for group in client.list_groups(&club_id).await? {
                println!(
                    "{}  {}  {:>8.2}  {}",
                    group.id,
                    pad(&group.title, NAME_WIDTH),
                    group.price,
                    group.display_capacity()
                );
            }
        }
        Command::Students {
            club_id,
            page,
            per_page,
            search,
        } => match search {
            Some(query) => {
                for student in client.search_students(&club_id, &query).await? {
                    println!("{}  {}", student.id, student.name);
                }
            }
            None => {
                let page = client.list_students(&club_id, page, per_page).await?;
                for student in &page.items {
                    let contact = student
                        .parent_contact
                        .as_ref()
                        .map(|c| c.display())
                        .unwrap_or_default();
                    println!("{}  {}  {}", student.id, pad(&student.name, NAME_WIDTH), contact);
                }
                println!(
                    "Page {} of {} ({} students)",
                    page.meta.page.max(1),
                    page.meta.total_pages.max(1),
                    page.meta.total
                );
            }
        },
        Command::Dashboard { club_id } => {
            let stats = client.club_dashboard(&club_id).await?;
            println!("Students:              {}", stats.total_students);
            println!("Active subscriptions:  {}", stats.active_subscriptions);
            println!("Sessions today:        {}", stats.today_sessions);
            println!("Upcoming sessions:     {}", stats.upcoming_sessions);
            println!("Revenue this month:    {:.2}", stats.month_revenue);
            println!("Pending payments:      {}", stats.pending_payments);
        }
        Command::Schedule { club_id, from, to } => {
            let schedule = client.public_schedule(&club_id, from, to).await?;
            println!("{}", schedule.club.name);
            for session in schedule.sessions {
                println!(
                    "{}  {:>4}m  {}  {}",
                    session.start_at.format("%a %Y-%m-%d %H:%M"),
                    session.duration_minutes,
                    pad(&session.group_title, NAME_WIDTH),
                    session.location.unwrap_or_default()
                );
            }
        }
        Command::Login { .. } | Command::Signup { .. } | Command::Logout => {}
    }
    Ok(())
}

/// Print an error inline and pick the exit code. A forced logout sends the
/// user to the login command.
fn report(auth: &AuthService, err: ApiError) -> ExitCode {
    let forced_logout = matches!(
        auth.session().status(),
        SessionStatus::LoggedOut(LogoutReason::RefreshFailed | LogoutReason::RestoreFailed)
    );

    if err.requires_login() || forced_logout {
        eprintln!("Your session has expired. Run `clubdesk login` to sign in again.");
        return ExitCode::from(EXIT_LOGIN_REQUIRED);
    }

    eprintln!("Error: {}", err.user_message());
    ExitCode::from(EXIT_REQUEST_FAILED)
}

fn remember_email(config: &mut Config, email: String) {
    if config.last_email.as_deref() != Some(email.as_str()) {
        config.last_email = Some(email);
        if let Err(err) = config.save() {
            debug!(error = %err, "Failed to save config");
        }
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read input")?;
    let value = line.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("{} is required", label.trim_end_matches(": "));
    }
    Ok(value)
}

/// Pad or truncate to a fixed display width
fn pad(s: &str, width: usize) -> String {
    let count = s.chars().count();
    if count > width {
        let truncated: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        format!("{}{}", s, " ".repeat(width - count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad() {
        assert_eq!(pad("Judo", 6), "Judo  ");
        assert_eq!(pad("Brazilian Jiu-Jitsu", 10), "Brazili...");
        assert_eq!(pad("", 2), "  ");
    }

    #[test]
    fn test_parse_students_command() {
        let cli = Cli::try_parse_from(["clubdesk", "students", "c1", "--page", "3"]).expect("parse");
        match cli.command {
            Command::Students {
                club_id,
                page,
                per_page,
                search,
            } => {
                assert_eq!(club_id, "c1");
                assert_eq!(page, 3);
                assert_eq!(per_page, DEFAULT_PER_PAGE);
                assert!(search.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_search_conflicts_with_paging() {
        assert!(Cli::try_parse_from(["clubdesk", "students", "c1", "--search", "ana", "--page", "2"]).is_err());
    }

    #[test]
    fn test_schedule_dates_parse() {
        let cli = Cli::try_parse_from(["clubdesk", "schedule", "c1", "--from", "2025-12-01"])
            .expect("parse");
        match cli.command {
            Command::Schedule { from, to, .. } => {
                assert_eq!(from, NaiveDate::from_ymd_opt(2025, 12, 1));
                assert!(to.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
