mod application;
mod audit;
mod auth;
mod company;
mod config;
mod cursor;
mod db;
mod error;
mod job;
mod logging;
mod models;
mod rbac;
mod session;
mod status;
mod validate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::process::ExitCode;
use uuid::Uuid;

use auth::AuthSettings;
use config::Config;
use db::Database;
use error::{ErrorKind, TrackerError};
use models::{ApplicationDetail, ApplicationsFilter, Identity, JobWithCompany, NewJob, Role};
use session::{Session, SessionStore};
use status::ApplicationStatus;

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Job application tracking - companies, jobs, and your hiring pipeline")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Bearer token to use instead of the saved session
    #[arg(long, global = true, env = "JOBTRACK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Create an account and log in
    Signup {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "JOBTRACK_PASSWORD", hide_env_values = true)]
        password: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Log in and save the session
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "JOBTRACK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the saved session
    Logout,

    /// Show the logged-in identity
    Me,

    /// Manage companies
    Company {
        #[command(subcommand)]
        command: CompanyCommands,
    },

    /// Manage job postings
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Apply to a job
    Apply {
        /// Job ID
        job_id: Uuid,

        /// Where the posting was found
        #[arg(short, long)]
        source_url: Option<String>,
    },

    /// Show one of your applications
    Show {
        /// Application ID
        id: Uuid,
    },

    /// List your applications, newest first
    List {
        /// Page size (1-50)
        #[arg(short, long, default_value = "20")]
        first: i64,

        /// Continue after this cursor
        #[arg(short, long)]
        after: Option<String>,

        /// Only these statuses (repeatable)
        #[arg(short, long = "status")]
        statuses: Vec<ApplicationStatus>,

        /// Only this job
        #[arg(long)]
        job: Option<Uuid>,

        /// Only jobs at this company
        #[arg(long)]
        company: Option<Uuid>,

        /// Match job title or company name
        #[arg(long)]
        search: Option<String>,
    },

    /// Move an application to its next status
    Move {
        /// Application ID
        id: Uuid,

        /// Target status (e.g. RECRUITER_SCREEN, INTERVIEW_1, OFFER, WITHDRAWN)
        status: ApplicationStatus,
    },

    /// Add a note to an application
    Note {
        /// Application ID
        id: Uuid,

        body: String,
    },

    /// Show the audit trail of an application
    Activity {
        /// Application ID
        id: Uuid,
    },
}

#[derive(Subcommand)]
enum CompanyCommands {
    /// Create a company (you become its owner)
    Create {
        name: String,

        #[arg(short, long)]
        website: Option<String>,
    },

    /// List companies you belong to
    List,

    /// Give another user a role in a company (owners only)
    Grant {
        company_id: Uuid,

        /// Email of the user to grant
        email: String,

        /// OWNER, EDITOR or VIEWER
        #[arg(short, long, default_value = "VIEWER")]
        role: Role,
    },

    /// List members of a company
    Members { company_id: Uuid },
}

#[derive(Subcommand)]
enum JobCommands {
    /// Post a job at a company (owners and editors)
    Create {
        company_id: Uuid,

        title: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        location: Option<String>,
    },

    /// List jobs at your companies
    List {
        /// Only this company
        #[arg(short, long)]
        company: Option<Uuid>,
    },
}

struct App {
    db: Database,
    auth: AuthSettings,
    sessions: SessionStore,
    token: Option<String>,
    json: bool,
}

impl App {
    /// Resolves the caller from `--token` or the saved session.
    fn identity(&self) -> Result<Identity> {
        let token = match &self.token {
            Some(token) => token.clone(),
            None => self
                .sessions
                .load()?
                .map(|s| s.access_token)
                .ok_or(TrackerError::Unauthenticated)
                .context("Not logged in. Run 'jobtrack login' first.")?,
        };
        Ok(auth::authenticate(&self.db, &self.auth, &token)?)
    }

    fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn save_session(&self, access_token: String, email: &str) -> Result<()> {
        self.sessions.save(&Session {
            access_token,
            email: email.trim().to_lowercase(),
        })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            exit_code(&err)
        }
    }
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    let kind = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<TrackerError>())
        .map(TrackerError::kind);
    match kind {
        Some(ErrorKind::InvalidArgument) => ExitCode::from(2),
        Some(ErrorKind::NotFound) => ExitCode::from(3),
        Some(ErrorKind::Forbidden) => ExitCode::from(4),
        Some(ErrorKind::Unauthenticated) | Some(ErrorKind::InvalidCredentials) => ExitCode::from(5),
        Some(ErrorKind::Conflict) => ExitCode::from(6),
        Some(ErrorKind::Internal) | None => ExitCode::FAILURE,
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    logging::init(&config.log_level)?;

    let app = App {
        db: Database::open(&config.database_path)?,
        auth: AuthSettings::from_config(&config)?,
        sessions: SessionStore::default_location(),
        token: cli.token,
        json: cli.json,
    };

    if !matches!(cli.command, Commands::Init) {
        app.db.ensure_initialized()?;
    }

    match cli.command {
        Commands::Init => {
            app.db.init()?;
            match app.db.path() {
                Some(path) => println!("Database initialized at {}", path.display()),
                None => println!("Database initialized"),
            }
        }

        Commands::Signup {
            email,
            password,
            name,
        } => {
            let payload = auth::signup(&app.db, &app.auth, &email, &password, name.as_deref())?;
            app.save_session(payload.access_token.clone(), &email)?;
            if app.json {
                app.print_json(&payload)?;
            } else {
                println!("Signed up as {}. Session saved.", email.trim().to_lowercase());
            }
        }

        Commands::Login { email, password } => {
            let payload = auth::login(&app.db, &app.auth, &email, &password)?;
            app.save_session(payload.access_token.clone(), &email)?;
            if app.json {
                app.print_json(&payload)?;
            } else {
                println!("Logged in as {}.", email.trim().to_lowercase());
            }
        }

        Commands::Logout => {
            if app.sessions.clear()? {
                println!("Logged out. Removed {}", app.sessions.path().display());
            } else {
                println!("No saved session.");
            }
        }

        Commands::Me => {
            let me = auth::me(&app.identity()?);
            if app.json {
                app.print_json(&me)?;
            } else {
                println!("User ID: {}", me.user_id);
                println!("Email:   {}", me.email);
            }
        }

        Commands::Company { command } => {
            let actor = app.identity()?;
            match command {
                CompanyCommands::Create { name, website } => {
                    let company = company::create_company(&app.db, &actor, &name, website.as_deref())?;
                    if app.json {
                        app.print_json(&company)?;
                    } else {
                        println!("Created company '{}' ({})", company.name, company.id);
                    }
                }

                CompanyCommands::List => {
                    let companies = company::companies(&app.db, &actor)?;
                    if app.json {
                        app.print_json(&companies)?;
                    } else if companies.is_empty() {
                        println!("No companies found.");
                    } else {
                        println!("{:<36} {:<30} {:<30}", "ID", "NAME", "WEBSITE");
                        println!("{}", "-".repeat(98));
                        for company in companies {
                            println!(
                                "{:<36} {:<30} {:<30}",
                                company.id,
                                truncate(&company.name, 28),
                                truncate(&company.website.unwrap_or_default(), 28)
                            );
                        }
                    }
                }

                CompanyCommands::Grant {
                    company_id,
                    email,
                    role,
                } => {
                    let membership = company::grant_membership(&app.db, &actor, company_id, &email, role)?;
                    if app.json {
                        app.print_json(&membership)?;
                    } else {
                        println!("Granted {} to {}.", membership.role, email.trim().to_lowercase());
                    }
                }

                CompanyCommands::Members { company_id } => {
                    let members = company::members(&app.db, &actor, company_id)?;
                    if app.json {
                        app.print_json(&members)?;
                    } else {
                        println!("{:<8} {:<36} {:<30}", "ROLE", "USER ID", "EMAIL");
                        println!("{}", "-".repeat(76));
                        for member in members {
                            println!(
                                "{:<8} {:<36} {:<30}",
                                member.role,
                                member.user_id,
                                truncate(&member.email.unwrap_or_default(), 28)
                            );
                        }
                    }
                }
            }
        }

        Commands::Job { command } => {
            let actor = app.identity()?;
            match command {
                JobCommands::Create {
                    company_id,
                    title,
                    description,
                    location,
                } => {
                    let created = job::create_job(
                        &app.db,
                        &actor,
                        NewJob {
                            company_id,
                            title,
                            description,
                            location,
                        },
                    )?;
                    if app.json {
                        app.print_json(&created)?;
                    } else {
                        println!(
                            "Posted '{}' at {} ({})",
                            created.job.title, created.company.name, created.job.id
                        );
                    }
                }

                JobCommands::List { company } => {
                    let jobs = job::jobs(&app.db, &actor, company)?;
                    if app.json {
                        app.print_json(&jobs)?;
                    } else {
                        print_jobs(&jobs);
                    }
                }
            }
        }

        Commands::Apply { job_id, source_url } => {
            let actor = app.identity()?;
            let detail = application::create_application(&app.db, &actor, job_id, source_url.as_deref())?;
            if app.json {
                app.print_json(&detail)?;
            } else {
                println!(
                    "Applied to '{}' at {} (application {})",
                    detail.job.job.title, detail.job.company.name, detail.application.id
                );
            }
        }

        Commands::Show { id } => {
            let actor = app.identity()?;
            let detail = application::get_application(&app.db, &actor, id)?;
            if app.json {
                app.print_json(&detail)?;
            } else {
                print_application(&detail);
            }
        }

        Commands::List {
            first,
            after,
            statuses,
            job,
            company,
            search,
        } => {
            let actor = app.identity()?;
            let filter = ApplicationsFilter {
                statuses,
                company_id: company,
                job_id: job,
                search,
            };
            let page = application::applications_connection(&app.db, &actor, first, after.as_deref(), &filter)?;
            if app.json {
                app.print_json(&page)?;
            } else if page.edges.is_empty() {
                println!("No applications found.");
            } else {
                println!("{:<36} {:<17} {:<28} {:<20} {:<10}", "ID", "STATUS", "TITLE", "COMPANY", "APPLIED");
                println!("{}", "-".repeat(115));
                for edge in &page.edges {
                    let node = &edge.node;
                    println!(
                        "{:<36} {:<17} {:<28} {:<20} {:<10}",
                        node.application.id,
                        node.application.status,
                        truncate(&node.job.job.title, 26),
                        truncate(&node.job.company.name, 18),
                        node.application.applied_at.format("%Y-%m-%d")
                    );
                }
                if let Some(cursor) = page.page_info.end_cursor.as_deref().filter(|_| page.page_info.has_next_page) {
                    println!("\nMore results: jobtrack list --after {}", cursor);
                }
            }
        }

        Commands::Move { id, status } => {
            let actor = app.identity()?;
            let detail = application::move_status(&app.db, &actor, id, status)?;
            if app.json {
                app.print_json(&detail)?;
            } else {
                println!("Application {} is now {}.", detail.application.id, detail.application.status);
                if !detail.application.status.is_terminal() {
                    let next: Vec<&str> = detail
                        .application
                        .status
                        .allowed_transitions()
                        .iter()
                        .map(|s| s.as_str())
                        .collect();
                    println!("Next: {}", next.join(", "));
                }
            }
        }

        Commands::Note { id, body } => {
            let actor = app.identity()?;
            let note = application::add_note(&app.db, &actor, id, &body)?;
            if app.json {
                app.print_json(&note)?;
            } else {
                println!("Added note {} to application {}.", note.id, id);
            }
        }

        Commands::Activity { id } => {
            let actor = app.identity()?;
            let entries = audit::activity_for_application(&app.db, &actor, id)?;
            if app.json {
                app.print_json(&entries)?;
            } else {
                println!("{:<20} {:<28} {}", "WHEN", "ACTION", "DETAILS");
                println!("{}", "-".repeat(80));
                for entry in entries {
                    println!(
                        "{:<20} {:<28} {}",
                        entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                        entry.action,
                        entry.metadata
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_jobs(jobs: &[JobWithCompany]) {
    if jobs.is_empty() {
        println!("No jobs found.");
        return;
    }
    println!("{:<36} {:<30} {:<20} {:<20}", "ID", "TITLE", "COMPANY", "LOCATION");
    println!("{}", "-".repeat(109));
    for entry in jobs {
        println!(
            "{:<36} {:<30} {:<20} {:<20}",
            entry.job.id,
            truncate(&entry.job.title, 28),
            truncate(&entry.company.name, 18),
            truncate(entry.job.location.as_deref().unwrap_or("-"), 18)
        );
    }
}

fn print_application(detail: &ApplicationDetail) {
    let application = &detail.application;
    println!("Application {}", application.id);
    println!("Job: {} ({})", detail.job.job.title, detail.job.job.id);
    println!("Company: {}", detail.job.company.name);
    if let Some(location) = &detail.job.job.location {
        println!("Location: {}", location);
    }
    println!("Status: {}", application.status);
    if let Some(url) = &application.source_url {
        println!("Source: {}", url);
    }
    println!("Applied: {}", application.applied_at.format("%Y-%m-%d %H:%M"));
    println!("Updated: {}", application.updated_at.format("%Y-%m-%d %H:%M"));

    if !detail.notes.is_empty() {
        println!("\nNotes ({}):", detail.notes.len());
        for note in &detail.notes {
            println!("  [{}]", note.created_at.format("%Y-%m-%d %H:%M"));
            for line in textwrap::wrap(&note.body, 76) {
                println!("    {}", line);
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
