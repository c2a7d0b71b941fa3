//! Command-line front end for the portal client.

use clap::{Parser, Subcommand, ValueEnum};
use intellimed_client::{Portal, Role};
use std::path::PathBuf;

/// IntelliMed portal client
///
/// Signs in against the portal backend, keeps the session token on disk and
/// gives access to the patient and doctor dashboards' data.
#[derive(Parser, Debug)]
#[command(name = "intellimed", version, about = "IntelliMed portal client")]
pub struct Cli {
    /// Override the API base URL from configuration
    #[arg(long, global = true, env = "INTELLIMED_API_URL")]
    pub api_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "INTELLIMED_PASSWORD", hide_env_values = true)]
        password: String,
        /// Portal tab the user signs in from
        #[arg(long, value_enum, default_value_t = PortalArg::Patient)]
        portal: PortalArg,
    },

    /// Exchange a Google identity token for a portal session
    GoogleLogin {
        #[arg(long)]
        token: String,
        #[arg(long, value_enum, default_value_t = RoleArg::Patient)]
        role: RoleArg,
    },

    /// Create an account (does not sign in)
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "INTELLIMED_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, value_enum, default_value_t = RoleArg::Patient)]
        role: RoleArg,
        /// Required when registering as a doctor
        #[arg(long, required_if_eq("role", "doctor"))]
        access_code: Option<String>,
    },

    /// Sign out and forget the stored token
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List your uploaded documents (patients)
    Documents,

    /// Upload a document for analysis (patients)
    Upload { path: PathBuf },

    /// Delete one of your documents (patients)
    DeleteDocument { id: i64 },

    /// Generate an access code a doctor can use to link to you (patients)
    GenerateCode,

    /// List linked patients (doctors)
    Patients,

    /// List a linked patient's documents (doctors)
    PatientDocuments { patient_id: i64 },

    /// Link a patient using their access code (doctors)
    LinkPatient { access_code: String },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleArg {
    Patient,
    Doctor,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Patient => Role::Patient,
            RoleArg::Doctor => Role::Doctor,
            RoleArg::Admin => Role::Admin,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortalArg {
    Patient,
    Doctor,
}

impl From<PortalArg> for Portal {
    fn from(arg: PortalArg) -> Self {
        match arg {
            PortalArg::Patient => Portal::Patient,
            PortalArg::Doctor => Portal::Doctor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_login() {
        let cli = Cli::try_parse_from([
            "intellimed", "login", "--email", "doc@x.com", "--password", "pw", "--portal", "doctor",
        ])
        .unwrap();
        match cli.command {
            Commands::Login { email, portal, .. } => {
                assert_eq!(email, "doc@x.com");
                assert_eq!(Portal::from(portal), Portal::Doctor);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_register_doctor() {
        let cli = Cli::try_parse_from([
            "intellimed", "register", "--email", "d@x.com", "--password", "pw", "--role", "doctor",
            "--access-code", "DOCTOR_SECRET",
        ])
        .unwrap();
        match cli.command {
            Commands::Register { role, access_code, .. } => {
                assert_eq!(Role::from(role), Role::Doctor);
                assert_eq!(access_code.as_deref(), Some("DOCTOR_SECRET"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_register_doctor_requires_access_code() {
        let err = Cli::try_parse_from([
            "intellimed", "register", "--email", "d@x.com", "--password", "pw", "--role", "doctor",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        assert!(err.to_string().contains("--access-code"));

        let cli = Cli::try_parse_from([
            "intellimed", "register", "--email", "p@x.com", "--password", "pw",
        ])
        .unwrap();
        match cli.command {
            Commands::Register { role, access_code, .. } => {
                assert_eq!(Role::from(role), Role::Patient);
                assert_eq!(access_code, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
