//! Command-line parsing.

use clap::{Parser, Subcommand};

/// schooldash - parent dashboards for the school management backend
#[derive(Parser, Debug)]
#[command(name = "schooldash")]
#[command(about = "Attendance, fees, homework and school news from the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and remember the session
    Login {
        /// Email address (defaults to the last one used)
        #[arg(long)]
        email: Option<String>,

        /// Keep the password in the OS keychain for next time
        #[arg(long)]
        remember: bool,
    },

    /// Create a new parent account
    Signup {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,
    },

    /// Sign out and forget all cached data
    Logout,

    /// Show the signed-in profile
    Whoami,

    /// Edit the signed-in profile
    Profile {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        phone: Option<String>,
    },

    /// Show the parent dashboard for one child
    Dashboard {
        /// Student id or first name (defaults to the first child)
        #[arg(long, short)]
        student: Option<String>,
    },

    /// List recent notifications
    Notifications,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dashboard_student() {
        let cli = Cli::try_parse_from(["schooldash", "dashboard", "-s", "Maya"]).unwrap();
        match cli.command {
            Command::Dashboard { student } => assert_eq!(student.as_deref(), Some("Maya")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_login_flags() {
        let cli =
            Cli::try_parse_from(["schooldash", "login", "--email", "p@example.com", "--remember"])
                .unwrap();
        match cli.command {
            Command::Login { email, remember } => {
                assert_eq!(email.as_deref(), Some("p@example.com"));
                assert!(remember);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_signup_requires_name() {
        assert!(Cli::try_parse_from(["schooldash", "signup", "--email", "p@example.com"]).is_err());
    }
}
