//! services/portal/src/bin/portal.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use mentorship_core::{KeyRegistry, OAuthProvider};
use portal_lib::{
    adapters::{
        LocalStore, SupabaseAuthAdapter, SupabaseClient, SupabaseDbAdapter,
        SupabaseStorageAdapter, TracingNavigator,
    },
    config::Config,
    error::PortalError,
    features::{OnboardingService, OnboardingSurvey, ResumeService},
    session::{
        Guard, GuardKind, SessionPorts, SessionService, SessionSnapshot, SignUpRequest,
    },
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line client for the mentorship portal.
#[derive(Parser)]
#[command(name = "portal", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the current principal and what each guard would decide.
    Status,
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// YYYY-MM-DD
        #[arg(long)]
        date_of_birth: Option<NaiveDate>,
    },
    /// Print the provider consent URL to open in a browser.
    Oauth {
        #[arg(long)]
        provider: OAuthProvider,
    },
    /// Finish an OAuth sign-in from the URL the browser was sent back to.
    CompleteOauth {
        #[arg(long)]
        url: String,
    },
    AcceptTerms,
    /// Submit the onboarding survey for the signed-in user.
    Survey {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// YYYY-MM-DD
        #[arg(long)]
        date_of_birth: Option<NaiveDate>,
        #[arg(long)]
        education_level: Option<String>,
        #[arg(long)]
        english_level: Option<String>,
        /// Comma separated.
        #[arg(long, value_delimiter = ',')]
        interests: Vec<String>,
        #[arg(long)]
        bio: Option<String>,
    },
    /// Upload a resume as the signed-in student.
    UploadResume {
        #[arg(long)]
        file: PathBuf,
    },
    /// List the signed-in student's resumes.
    Resumes,
    SignOut,
}

#[tokio::main]
async fn main() -> Result<(), PortalError> {
    let cli = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded for project {}", config.project_ref());

    // --- 2. Initialize Adapters ---
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let client = SupabaseClient::new(config.supabase_url.clone(), config.supabase_anon_key.clone())
        .with_http_client(http);
    let keys = KeyRegistry::new(config.project_ref());
    let storage = Arc::new(LocalStore::open(&config.client_state_path)?);
    let auth = Arc::new(SupabaseAuthAdapter::new(
        client.clone(),
        storage.clone(),
        keys.clone(),
    ));
    let db = Arc::new(SupabaseDbAdapter::new(client.clone()));
    let objects = Arc::new(SupabaseStorageAdapter::new(client.clone()));

    // --- 3. Build and Bootstrap the Session ---
    let ports = SessionPorts {
        auth,
        db: db.clone(),
        roles: db,
        storage,
        navigator: Arc::new(TracingNavigator::new()),
        keys,
    };
    let service = SessionService::new(ports, config.session_settings());
    let subscription = service.bootstrap().await;

    // --- 4. Run the Command ---
    match cli.command {
        Command::Status => {}
        Command::SignIn { email, password } => {
            service.sign_in(&email, &password).await?;
            settle(&service).await;
        }
        Command::SignUp {
            email,
            password,
            first_name,
            last_name,
            date_of_birth,
        } => {
            let result = service
                .sign_up(SignUpRequest {
                    email,
                    password,
                    first_name,
                    last_name,
                    date_of_birth,
                })
                .await?;
            if result.session.is_none() {
                println!("Check your inbox to confirm the address, then sign in.");
            } else {
                settle(&service).await;
            }
        }
        Command::Oauth { provider } => {
            let url = service.sign_in_with_oauth(provider).await?;
            println!("{}", url);
            return Ok(());
        }
        Command::CompleteOauth { url } => {
            service.complete_oauth(&url).await?;
            settle(&service).await;
        }
        Command::AcceptTerms => service.update_terms(true).await?,
        Command::Survey {
            first_name,
            last_name,
            date_of_birth,
            education_level,
            english_level,
            interests,
            bio,
        } => {
            let survey = OnboardingSurvey {
                first_name,
                last_name,
                date_of_birth,
                education_level,
                english_level,
                interests,
                bio,
            };
            OnboardingService::new(service.clone())
                .submit_survey(&survey)
                .await?;
            println!("Survey saved");
        }
        Command::UploadResume { file } => {
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    PortalError::Internal(format!("{} has no usable file name", file.display()))
                })?
                .to_string();
            let body = Bytes::from(tokio::fs::read(&file).await?);
            let resume = ResumeService::new(service.clone(), objects.clone())
                .upload(&file_name, body)
                .await?;
            println!("Uploaded {} to {}", resume.file_name, resume.public_url);
        }
        Command::Resumes => {
            let resumes = ResumeService::new(service.clone(), objects.clone())
                .mine()
                .await?;
            if resumes.is_empty() {
                println!("No resumes uploaded");
            }
            for resume in resumes {
                println!("{}  {}  {}", resume.id, resume.uploaded_at, resume.file_name);
            }
        }
        Command::SignOut => {
            let report = service.sign_out().await;
            println!(
                "Signed out (backend confirmed: {}, keys removed: {}, cookies expired: {})",
                report.backend_signed_out,
                report.removed_keys.len(),
                report.cookies_expired
            );
            if !report.remaining_keys.is_empty() {
                println!("Could not remove: {}", report.remaining_keys.join(", "));
            }
        }
    }

    print_snapshot(&service.snapshot());
    for kind in [
        GuardKind::Protected,
        GuardKind::AdminOnly,
        GuardKind::MentorOnly,
        GuardKind::TermsChecker,
    ] {
        let decision = Guard::new(kind, config.guard_timeout)
            .resolve(service.subscribe())
            .await;
        println!("{:<14} {:?}", format!("{:?}", kind), decision);
    }

    subscription.unsubscribe().await;
    service.teardown();
    Ok(())
}

/// Lets the auth listener apply the sign-in it was just sent.
async fn settle(service: &Arc<SessionService>) {
    let mut rx = service.subscribe();
    let resolved = rx.wait_for(|s| !s.loading && s.profile.is_some());
    if tokio::time::timeout(service.settings().bootstrap_timeout, resolved)
        .await
        .is_err()
    {
        info!("Profile not resolved yet");
    }
}

fn print_snapshot(snapshot: &SessionSnapshot) {
    let Some(user) = &snapshot.user else {
        println!("Signed out");
        if let Some(error) = &snapshot.error {
            println!("Last error: {}", error);
        }
        return;
    };
    println!("User:             {}", user.email.as_deref().unwrap_or("(no email)"));
    println!("Role:             {:?}", snapshot.role());
    println!("Terms accepted:   {}", snapshot.has_accepted_terms);
    println!("Profile complete: {}", snapshot.is_profile_complete);
}
