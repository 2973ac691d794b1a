use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::application::services::{Provisioner, TeamNames, TransitionPlan};
use crate::application::use_cases::{CourseService, EnrollmentSynchronizer};
use crate::domain::entities::{Course, RepoType, User};
use crate::domain::value_objects::enrollment_status::EnrollmentStatus;
use crate::domain::value_objects::scm_type::ScmType;
use crate::infrastructure::filesystem::config_store::{AppConfig, ConfigStore, DEFAULT_CONFIG_FILE};
use crate::infrastructure::scm::{ScmContext, ScmFactory, ScmProvider};
use crate::infrastructure::store::{EnrollmentStore, FileStore};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    " ",
    env!("BUILD_DATE"),
    ")"
);

/// enrollsync - mirror course enrollments onto GitHub/GitLab organizations
#[derive(Parser)]
#[command(name = "enrollsync")]
#[command(about = "Mirror course enrollments onto GitHub/GitLab organizations")]
#[command(version, long_version = LONG_VERSION)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file
    #[arg(short, long, global = true, env = "ENROLLSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// State file (overrides store.path from the configuration)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register or replace a user
    AddUser {
        #[arg(long)]
        id: u64,

        #[arg(long)]
        login: String,

        #[arg(long)]
        name: Option<String>,
    },

    /// Register or replace a course
    AddCourse {
        #[arg(long)]
        id: u64,

        /// SCM organization (GitHub org / GitLab group) id
        #[arg(long)]
        org: u64,

        #[arg(long)]
        name: String,

        #[arg(long)]
        code: Option<String>,

        /// Provider hosting the organization (defaults to the configured one)
        #[arg(long)]
        provider: Option<ScmType>,
    },

    /// Update a course after checking that its organization still exists
    UpdateCourse {
        #[arg(long)]
        id: u64,

        #[arg(long)]
        org: u64,

        #[arg(long)]
        name: String,
    },

    /// Request enrollment in a course (PENDING)
    Enroll {
        #[arg(long)]
        user: u64,

        #[arg(long)]
        course: u64,
    },

    /// Change the status of one or more enrollments
    Transition {
        /// User ids; several may be given
        #[arg(long, required = true, num_args = 1..)]
        user: Vec<u64>,

        #[arg(long)]
        course: u64,

        /// Target status (pending, rejected, student, teacher)
        #[arg(long)]
        status: EnrollmentStatus,

        /// Overall deadline in seconds
        #[arg(long, default_value = "120")]
        timeout: u64,
    },

    /// List enrollments of a course
    Enrollments {
        #[arg(long)]
        course: u64,

        /// Only these statuses (repeatable)
        #[arg(long)]
        status: Vec<EnrollmentStatus>,

        /// Hide students that belong to a group
        #[arg(long)]
        no_groups: bool,
    },

    /// List courses, optionally those of one user
    Courses {
        #[arg(long)]
        user: Option<u64>,

        /// Only these enrollment statuses (repeatable)
        #[arg(long)]
        status: Vec<EnrollmentStatus>,
    },

    /// Print the URL of a course repository
    RepoUrl {
        /// Current user
        #[arg(long)]
        user: u64,

        #[arg(long)]
        course: u64,

        #[arg(long = "type", default_value = "user")]
        repo_type: RepoType,
    },

    /// List, show or create SCM directories
    Directories {
        /// Show a single directory
        #[arg(long, conflicts_with = "create")]
        id: Option<u64>,

        /// Create a directory with this name
        #[arg(long, requires = "path")]
        create: Option<String>,

        /// Path of the directory to create
        #[arg(long)]
        path: Option<String>,
    },
}

/// CLI application runner
pub struct CliApp {
    cli: Cli,
}

impl CliApp {
    pub fn new() -> Self {
        Self { cli: Cli::parse() }
    }

    pub fn from_cli(cli: Cli) -> Self {
        Self { cli }
    }

    pub fn verbose(&self) -> bool {
        self.cli.verbose
    }

    pub async fn run(self) -> Result<()> {
        if self.cli.no_color {
            colored::control::set_override(false);
        }

        match self.handle_command().await {
            Ok(_) => Ok(()),
            Err(e) => {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
                exit(1);
            }
        }
    }

    async fn handle_command(&self) -> Result<()> {
        let config = self.load_config()?;
        let store = Arc::new(self.open_store(&config).await?);

        match &self.cli.command {
            Commands::AddUser { id, login, name } => {
                let mut user = User::new(*id, login.clone());
                if let Some(name) = name {
                    user.name = name.clone();
                }
                store.put_user(user).await?;
                println!("{} User {} ({}) saved", "✓".green().bold(), id, login);
                Ok(())
            }
            Commands::AddCourse {
                id,
                org,
                name,
                code,
                provider,
            } => {
                let course = Course::new(*id, *org, name.clone())
                    .with_code(code.clone().unwrap_or_default())
                    .with_provider(provider.unwrap_or(config.scm.provider));
                store.put_course(course).await?;
                println!("{} Course {} saved", "✓".green().bold(), id);
                Ok(())
            }
            Commands::UpdateCourse { id, org, name } => {
                self.handle_update_course(&config, store, *id, *org, name)
                    .await
            }
            Commands::Enroll { user, course } => {
                let enrollment = CourseService::new(store)
                    .create_enrollment(*user, *course)
                    .await?;
                println!(
                    "{} User {} requested enrollment in course {} ({})",
                    "✓".green().bold(),
                    enrollment.user_id,
                    enrollment.course_id,
                    enrollment.status.to_string().yellow()
                );
                Ok(())
            }
            Commands::Transition {
                user,
                course,
                status,
                timeout,
            } => {
                self.handle_transition(&config, store, user, *course, *status, *timeout)
                    .await
            }
            Commands::Enrollments {
                course,
                status,
                no_groups,
            } => {
                let enrollments = CourseService::new(store)
                    .get_enrollments_by_course(*course, status, *no_groups)
                    .await?;
                println!("{} Enrollments in course {}", "::".blue().bold(), course);
                for e in &enrollments {
                    let group = e
                        .group_id
                        .map(|g| format!(" group {}", g))
                        .unwrap_or_default();
                    println!("  user {:<8} {}{}", e.user_id, colorize_status(e.status), group);
                }
                if enrollments.is_empty() {
                    println!("  {}", "(none)".dimmed());
                }
                Ok(())
            }
            Commands::Courses { user, status } => {
                let service = CourseService::new(store);
                let courses = match user {
                    Some(user_id) => service.get_courses_by_user(*user_id, status).await?,
                    None => service.get_courses().await?,
                };
                println!("{} Courses", "::".blue().bold());
                for c in &courses {
                    println!(
                        "  {:<6} {:<10} {} ({} org {})",
                        c.id,
                        c.code,
                        c.name.bold(),
                        c.provider,
                        c.organization_id
                    );
                }
                if courses.is_empty() {
                    println!("  {}", "(none)".dimmed());
                }
                Ok(())
            }
            Commands::RepoUrl {
                user,
                course,
                repo_type,
            } => {
                let current_user = store.get_user(*user).await?;
                let url = CourseService::new(store)
                    .get_repository_url(&current_user, *course, *repo_type)
                    .await?;
                println!("{}", url);
                Ok(())
            }
            Commands::Directories { id, create, path } => {
                self.handle_directories(&config, store, *id, create.as_deref(), path.as_deref())
                    .await
            }
        }
    }

    async fn handle_transition(
        &self,
        config: &AppConfig,
        store: Arc<FileStore>,
        users: &[u64],
        course_id: u64,
        status: EnrollmentStatus,
        timeout: u64,
    ) -> Result<()> {
        let teams = TeamNames::from(&config.teams);
        let needs_scm = TransitionPlan::for_transition(None, status, &teams)?.requires_scm();
        if needs_scm && config.scm.resolve_token().is_err() {
            // Students whose repository is already recorded still go through
            warn!(
                provider = %config.scm.provider,
                "no SCM token configured; transitions that reach the provider will fail"
            );
        }
        let scm = self.provider(config, false)?;

        let sync = EnrollmentSynchronizer::new(store)
            .with_teams(teams)
            .with_provisioner(Provisioner::from(&config.repositories));

        let ctx = ScmContext::with_timeout(Duration::from_secs(timeout));
        let token = ctx.cancellation_token().clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });

        println!(
            "{} Moving {} enrollment(s) in course {} to {}",
            "::".blue().bold(),
            users.len(),
            course_id,
            colorize_status(status)
        );

        // Different (user, course) pairs are independent and run concurrently
        let results = futures::future::join_all(users.iter().map(|&user_id| {
            let sync = &sync;
            let ctx = &ctx;
            let scm = scm.as_ref();
            async move {
                (
                    user_id,
                    sync.update_enrollment(ctx, scm, user_id, course_id, status)
                        .await,
                )
            }
        }))
        .await;

        let mut failed = 0;
        for (user_id, result) in results {
            match result {
                Ok(enrollment) => println!(
                    "  {} user {} is now {}",
                    "✓".green().bold(),
                    user_id,
                    colorize_status(enrollment.status)
                ),
                Err(e) => {
                    failed += 1;
                    let hint = if e.kind().is_retryable() {
                        " (retryable)".yellow().to_string()
                    } else {
                        String::new()
                    };
                    println!("  {} user {}: {}{}", "✗".red().bold(), user_id, e, hint);
                }
            }
        }

        if failed > 0 {
            anyhow::bail!("{} of {} transitions failed", failed, users.len());
        }
        Ok(())
    }

    async fn handle_update_course(
        &self,
        config: &AppConfig,
        store: Arc<FileStore>,
        id: u64,
        org: u64,
        name: &str,
    ) -> Result<()> {
        let existing = store.get_course(id).await?;
        let course = Course {
            organization_id: org,
            name: name.to_string(),
            ..existing
        };
        let scm = self.provider(config, true)?;
        let ctx = ScmContext::with_timeout(Duration::from_secs(config.scm.timeout_secs));
        CourseService::new(store)
            .update_course(&ctx, scm.as_ref(), &course)
            .await?;
        println!("{} Course {} updated", "✓".green().bold(), id);
        Ok(())
    }

    async fn handle_directories(
        &self,
        config: &AppConfig,
        store: Arc<FileStore>,
        id: Option<u64>,
        create: Option<&str>,
        path: Option<&str>,
    ) -> Result<()> {
        let scm = self.provider(config, true)?;
        let ctx = ScmContext::with_timeout(Duration::from_secs(config.scm.timeout_secs));
        let service = CourseService::new(store);

        let directories = match (id, create, path) {
            (Some(id), _, _) => vec![service.get_directory(&ctx, scm.as_ref(), id).await?],
            (None, Some(name), Some(path)) => {
                vec![service.create_directory(&ctx, scm.as_ref(), name, path).await?]
            }
            _ => service.list_directories(&ctx, scm.as_ref()).await?,
        };

        println!("{} Directories on {}", "::".blue().bold(), scm.scm_type());
        for d in &directories {
            println!("  {:<10} {} ({})", d.id, d.name.bold(), d.path);
        }
        Ok(())
    }

    fn load_config(&self) -> Result<AppConfig> {
        let store = ConfigStore::new();
        let config = match &self.cli.config {
            Some(path) => store
                .read_config(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => store.load_or_default(DEFAULT_CONFIG_FILE)?,
        };
        Ok(config)
    }

    async fn open_store(&self, config: &AppConfig) -> Result<FileStore> {
        let path = self
            .cli
            .store
            .clone()
            .unwrap_or_else(|| config.store.path.clone());
        FileStore::open(&path)
            .await
            .with_context(|| format!("failed to open state file {}", path.display()))
    }

    /// Provider for the configured SCM; the token is only required when calls will be made
    fn provider(&self, config: &AppConfig, needs_token: bool) -> Result<Arc<dyn ScmProvider>> {
        let token = match config.scm.resolve_token() {
            Ok(token) => token,
            Err(e) if !needs_token => {
                debug!(error = %e, "continuing without an SCM token");
                String::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(ScmFactory::create(&config.scm, &token)?)
    }
}

impl Default for CliApp {
    fn default() -> Self {
        Self::new()
    }
}

fn colorize_status(status: EnrollmentStatus) -> colored::ColoredString {
    let text = status.to_string();
    match status {
        EnrollmentStatus::Student => text.green(),
        EnrollmentStatus::Teacher => text.cyan(),
        EnrollmentStatus::Pending => text.yellow(),
        EnrollmentStatus::Rejected => text.red(),
        EnrollmentStatus::None => text.dimmed(),
    }
}
