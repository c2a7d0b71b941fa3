mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use dotenv::dotenv;
use intellimed_client::api::DocumentInfo;
use intellimed_client::{AppState, Registration, Route, SessionState, Settings};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(cli.verbose)));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Settings::new().context("failed to load configuration")?;
    if let Some(url) = cli.api_url.clone() {
        config.api.base_url = url;
    }
    info!("Using API at {}", config.api.base_url);

    let state = AppState::new(config)?;
    state.session.initialize();

    match run(&state, cli.command).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if e.is_session_fatal() {
                warn!("Stored session is no longer valid; signing out");
                if let Err(err) = state.session.logout() {
                    warn!("Failed to clear stored credential: {}", err);
                }
            }
            anyhow::bail!("{}", e.user_message())
        }
    }
}

/// Filter used when `RUST_LOG` is unset.
fn default_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

async fn run(state: &AppState, command: Commands) -> intellimed_client::Result<()> {
    match command {
        Commands::Login { email, password, portal } => {
            let role = state.session.login_for_portal(&email, &password, portal.into()).await?;
            println!("Signed in as {} ({})", email, role);
        }
        Commands::GoogleLogin { token, role } => {
            let role = state.session.federated_login(&token, role.into()).await?;
            println!("Signed in with Google ({})", role);
        }
        Commands::Register { email, password, role, access_code } => {
            let registration = Registration {
                email: email.clone(),
                password,
                role: role.into(),
                doctor_access_code: access_code,
            };
            state.session.register(&registration).await?;
            println!("Registered {}. You can now sign in.", email);
        }
        Commands::Logout => {
            state.session.logout()?;
            println!("Signed out");
        }
        Commands::Whoami => match state.session.current() {
            SessionState::Present(session) => println!("{} ({})", session.email, session.role),
            _ => println!("Not signed in"),
        },
        Commands::Documents => {
            state.require(Route::PatientDashboard)?;
            print_documents(&state.api.own_documents().await?);
        }
        Commands::Upload { path } => {
            state.require(Route::PatientDashboard)?;
            let document = state.api.upload_file(&path).await?;
            print_documents(std::slice::from_ref(&document));
        }
        Commands::DeleteDocument { id } => {
            state.require(Route::PatientDashboard)?;
            state.api.delete_document(id).await?;
            println!("Deleted document {}", id);
        }
        Commands::GenerateCode => {
            state.require(Route::PatientDashboard)?;
            let code = state.api.generate_access_code().await?;
            println!("{}", code.access_code);
        }
        Commands::Patients => {
            state.require(Route::DoctorDashboard)?;
            for patient in state.api.doctor_patients().await? {
                match patient.name {
                    Some(name) => println!("{:>6}  {}  {}", patient.id, patient.email, name),
                    None => println!("{:>6}  {}", patient.id, patient.email),
                }
            }
        }
        Commands::PatientDocuments { patient_id } => {
            state.require(Route::DoctorDashboard)?;
            print_documents(&state.api.patient_documents(patient_id).await?);
        }
        Commands::LinkPatient { access_code } => {
            state.require(Route::DoctorDashboard)?;
            let outcome = state.api.link_patient(&access_code).await?;
            println!("{}", outcome.message);
        }
    }
    Ok(())
}

fn print_documents(documents: &[DocumentInfo]) {
    if documents.is_empty() {
        println!("No documents");
        return;
    }
    for doc in documents {
        let id = doc.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into());
        println!("{:>6}  {}  {}", id, doc.upload_timestamp.to_rfc3339(), doc.filename);
        if let Some(analysis) = doc.analysis() {
            match serde_json::to_string_pretty(&analysis) {
                Ok(text) => println!("{}", text),
                Err(e) => warn!("Could not render analysis for {}: {}", doc.filename, e),
            }
        }
    }
}
