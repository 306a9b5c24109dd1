//! schooldash - parent dashboards for the school management backend.

mod cli;
mod render;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Command};
use schooldash_core::api::{RestBackend, SchoolApi};
use schooldash_core::auth::{AuthError, AuthService, CredentialStore, SignInForm, SignUpForm};
use schooldash_core::cache::{Clock, RequestDeduplicator, SystemClock, TtlCache};
use schooldash_core::dashboard::ParentDashboard;
use schooldash_core::fetch::Orchestrator;
use schooldash_core::models::{ProfileUpdate, Student};
use schooldash_core::Config;

/// Log file name prefix inside `log_dir`
const LOG_FILE_PREFIX: &str = "schooldash.log";

/// Initialize the tracing subscriber for logging.
///
/// RUST_LOG controls the level (default `warn`). When `log_dir` is set, logs
/// also go to a daily rolling file; keep the returned guard alive so it flushes.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

/// Shared services for one invocation.
struct Services {
    api: SchoolApi,
    orchestrator: Orchestrator,
    auth: AuthService,
}

impl Services {
    fn build(config: &Config) -> Result<Self> {
        let (url, anon_key) = config.backend()?;
        let backend = Arc::new(RestBackend::new(url, anon_key).context("Failed to create HTTP client")?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache = Arc::new(TtlCache::new(config.cache_ttl(), clock.clone()));
        let dedup = Arc::new(RequestDeduplicator::new(clock));

        let auth = AuthService::new(
            backend.clone(),
            cache.clone(),
            dedup.clone(),
            config.cache_dir()?,
        )
        .with_timeout(config.auth_timeout());

        Ok(Self {
            api: SchoolApi::new(backend),
            orchestrator: Orchestrator::new(cache, dedup, config.dedup_ttl()),
            auth,
        })
    }

    fn require_user(&self) -> Result<String> {
        match self.auth.current_session() {
            Some(session) => Ok(session.user_id),
            None => bail!("Not signed in - run `schooldash login` first"),
        }
    }
}

fn prompt_line(label: &str) -> Result<String> {
    eprint!("{}", label);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Print validation problems field by field, anything else as-is.
fn report_auth_error(err: AuthError) -> anyhow::Error {
    let fields = err.field_messages();
    if fields.is_empty() {
        return err.into();
    }
    for (field, message) in fields {
        eprintln!("  {}: {}", field, message);
    }
    anyhow::anyhow!("Please fix the fields above")
}

async fn login(services: &Services, config: &mut Config, email: Option<String>, remember: bool) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => prompt_line("Email: ")?,
    };

    let recalled = if remember {
        None
    } else {
        CredentialStore::recall(&email).unwrap_or_else(|e| {
            warn!(error = %e, "Could not read keychain");
            None
        })
    };
    let form = match recalled {
        Some(form) => form,
        None => SignInForm::new(&email, rpassword::prompt_password("Password: ")?),
    };

    let session = services
        .auth
        .sign_in(&form)
        .await
        .map_err(report_auth_error)?;

    if remember {
        if let Err(e) = CredentialStore::remember(&form) {
            warn!(error = %e, "Could not save password to keychain");
        }
    }

    config.last_email = Some(email);
    config.save()?;
    println!("Signed in as {}", session.email.as_deref().unwrap_or(&session.user_id));
    Ok(())
}

async fn signup(services: &Services, name: String, email: String) -> Result<()> {
    let password = rpassword::prompt_password("Password: ")?;
    let confirm_password = rpassword::prompt_password("Confirm password: ")?;
    let form = SignUpForm {
        full_name: name,
        email,
        password,
        confirm_password,
    };
    let user = services.auth.sign_up(&form).await.map_err(report_auth_error)?;
    println!(
        "Account created for {} - check your inbox to confirm it",
        user.email.as_deref().unwrap_or(&user.id)
    );
    Ok(())
}

async fn logout(services: &Services, config: &Config) -> Result<()> {
    services.auth.sign_out().await;
    if let Some(email) = &config.last_email {
        if let Err(e) = CredentialStore::forget(email) {
            warn!(error = %e, "Could not remove password from keychain");
        }
    }
    println!("Signed out");
    Ok(())
}

fn pick_student(children: Vec<Student>, wanted: Option<&str>) -> Result<Student> {
    let Some(wanted) = wanted else {
        return children
            .into_iter()
            .next()
            .context("No students are linked to this account");
    };
    children
        .into_iter()
        .find(|s| s.id == wanted || s.first_name.eq_ignore_ascii_case(wanted))
        .with_context(|| format!("No student matching '{}'", wanted))
}

async fn dashboard(services: &Services, wanted: Option<String>) -> Result<()> {
    let user_id = services.require_user()?;
    let mut dashboard = ParentDashboard::new(
        services.api.clone(),
        services.orchestrator.clone(),
        user_id,
    );

    let children = dashboard.children().await;
    let children = match (children.result, children.stale) {
        (Ok(children), _) => children,
        (Err(_), Some(stale)) => stale,
        (Err(e), None) => return Err(anyhow::anyhow!("Could not load students: {}", e)),
    };
    let student = pick_student(children, wanted.as_deref())?;

    dashboard.mount(student.clone());
    dashboard.wait_until_settled().await;
    info!(state = ?dashboard.state(), "Dashboard settled");

    print!(
        "{}",
        render::dashboard(&student, dashboard.snapshot(), Utc::now().date_naive())
    );
    dashboard.unmount();
    Ok(())
}

async fn notifications(services: &Services) -> Result<()> {
    let user_id = services.require_user()?;
    let items = services.api.fetch_notifications(&user_id).await?;
    print!("{}", render::notifications(&items, Utc::now()));
    Ok(())
}

async fn update_profile(services: &Services, name: Option<String>, phone: Option<String>) -> Result<()> {
    let update = ProfileUpdate {
        full_name: name,
        phone,
    };
    let profile = services
        .auth
        .update_profile(&update)
        .await
        .map_err(report_auth_error)?;
    print!("{}", render::profile(&profile));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    let _guard = init_tracing(&config);
    info!("schooldash starting");

    let services = Services::build(&config)?;

    match cli.command {
        Command::Login { email, remember } => login(&services, &mut config, email, remember).await,
        Command::Signup { name, email } => signup(&services, name, email).await,
        Command::Logout => logout(&services, &config).await,
        Command::Whoami => {
            let profile = services.auth.profile().await?;
            print!("{}", render::profile(&profile));
            Ok(())
        }
        Command::Profile { name, phone } => update_profile(&services, name, phone).await,
        Command::Dashboard { student } => dashboard(&services, student).await,
        Command::Notifications => notifications(&services).await,
    }
}
