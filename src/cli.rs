//! CLI argument definitions using clap derive macros.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use joblo_core::BatchOptions;
use joblo_core::retry::DEFAULT_MAX_ATTEMPTS;
use joblo_core::scrape::MAX_PROFILE_COUNT;

/// Resilient authenticated scraping of job, company and profile pages.
///
/// Credentials come from `JOBLO_IDENTIFIER` and `JOBLO_SECRET` (a `.env`
/// file in the working directory is honoured).
#[derive(Parser, Debug)]
#[command(name = "joblo")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape a batch of member profiles
    Profiles(ProfilesArgs),

    /// Scrape job postings for a search
    Jobs(JobsArgs),

    /// Scrape one company page
    Company(CompanyArgs),

    /// Serve the HTTP API
    Serve(ServeArgs),

    /// Manage the stored session token
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Delete stored job postings older than a number of days
    Prune(PruneArgs),
}

/// Where profile URLs come from.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileSource {
    /// Read URLs from --file (text, or CSV first column)
    File,
    /// Built-in list of public profiles
    Sample,
}

#[derive(Args, Debug)]
pub struct ProfilesArgs {
    /// Source of profile URLs
    #[arg(long, value_enum, default_value_t = ProfileSource::Sample)]
    pub source: ProfileSource,

    /// File containing profile URLs (required with --source file)
    #[arg(long, required_if_eq("source", "file"))]
    pub file: Option<PathBuf>,

    /// Number of profiles to scrape (capped at 100)
    #[arg(long, default_value_t = 10)]
    pub count: usize,

    #[command(flatten)]
    pub batch: BatchArgs,
}

impl ProfilesArgs {
    /// Requested count, capped.
    #[must_use]
    pub fn capped_count(&self) -> usize {
        self.count.min(MAX_PROFILE_COUNT)
    }
}

#[derive(Args, Debug)]
pub struct JobsArgs {
    /// Search keywords
    #[arg(long, default_value = "software engineer")]
    pub query: String,

    /// Search location
    #[arg(long, default_value = "United States")]
    pub location: String,

    /// Job postings to visit (1-50)
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=50))]
    pub limit: u32,

    /// Maximum attempts (1-10)
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: u32,
}

#[derive(Args, Debug)]
pub struct CompanyArgs {
    /// Company page URL
    pub url: String,

    /// Maximum attempts (1-10)
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: u32,
}

/// Pacing flags shared by batch commands.
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Items between long pauses
    #[arg(long = "batch", default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    pub batch_size: u32,

    /// Shortest long pause in seconds
    #[arg(long, default_value_t = 60)]
    pub delay_min: u64,

    /// Longest long pause in seconds
    #[arg(long, default_value_t = 180)]
    pub delay_max: u64,

    /// Maximum attempts per item (1-10)
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: u32,
}

impl BatchArgs {
    /// Validated batch options.
    ///
    /// # Errors
    ///
    /// Returns a message when `--delay-min` exceeds `--delay-max`.
    pub fn options(&self) -> Result<BatchOptions, String> {
        if self.delay_min > self.delay_max {
            return Err(format!(
                "--delay-min ({}) must not exceed --delay-max ({})",
                self.delay_min, self.delay_max
            ));
        }
        Ok(BatchOptions {
            batch_size: self.batch_size as usize,
            min_delay: Duration::from_secs(self.delay_min),
            max_delay: Duration::from_secs(self.delay_max),
        })
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    #[command(flatten)]
    pub batch: BatchArgs,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Seed the session from a browser cookie export (file path, or '-' / omitted for stdin)
    Import {
        /// Cookie export file (Netscape cookies.txt or JSON)
        source: Option<PathBuf>,
    },
    /// Show the stored session token
    Status,
    /// Delete the stored session token
    Clear,
}

#[derive(Args, Debug)]
pub struct PruneArgs {
    /// Age threshold in days
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..))]
    pub days: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_subcommand() {
        let result = Cli::try_parse_from(["joblo"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_verbose_flag_is_global() {
        let cli = Cli::try_parse_from(["joblo", "session", "status", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Command::Session {
                command: SessionCommand::Status
            }
        ));
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Cli::try_parse_from(["joblo", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Cli::try_parse_from(["joblo", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    // ==================== Profiles Tests ====================

    #[test]
    fn test_cli_profiles_defaults() {
        let cli = Cli::try_parse_from(["joblo", "profiles"]).unwrap();
        let Command::Profiles(args) = cli.command else {
            panic!("expected profiles");
        };
        assert_eq!(args.source, ProfileSource::Sample);
        assert_eq!(args.count, 10);
        assert_eq!(args.batch.batch_size, 5);
        assert_eq!(args.batch.delay_min, 60);
        assert_eq!(args.batch.delay_max, 180);
        assert_eq!(args.batch.max_attempts, 3);
    }

    #[test]
    fn test_cli_profiles_file_source_requires_file() {
        let err = Cli::try_parse_from(["joblo", "profiles", "--source", "file"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let cli = Cli::try_parse_from(["joblo", "profiles", "--source", "file", "--file", "p.csv"])
            .unwrap();
        let Command::Profiles(args) = cli.command else {
            panic!("expected profiles");
        };
        assert_eq!(args.file, Some(PathBuf::from("p.csv")));
    }

    #[test]
    fn test_cli_profiles_count_capped() {
        let cli = Cli::try_parse_from(["joblo", "profiles", "--count", "500"]).unwrap();
        let Command::Profiles(args) = cli.command else {
            panic!("expected profiles");
        };
        assert_eq!(args.capped_count(), 100);
    }

    #[test]
    fn test_cli_max_attempts_range() {
        let err = Cli::try_parse_from(["joblo", "profiles", "--max-attempts", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        let err = Cli::try_parse_from(["joblo", "profiles", "--max-attempts", "11"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_batch_options_reject_inverted_delays() {
        let cli = Cli::try_parse_from([
            "joblo",
            "profiles",
            "--delay-min",
            "200",
            "--delay-max",
            "100",
        ])
        .unwrap();
        let Command::Profiles(args) = cli.command else {
            panic!("expected profiles");
        };
        assert!(args.batch.options().is_err());
    }

    #[test]
    fn test_batch_options_convert_seconds() {
        let cli = Cli::try_parse_from(["joblo", "profiles", "--batch", "2", "--delay-min", "1", "--delay-max", "3"])
            .unwrap();
        let Command::Profiles(args) = cli.command else {
            panic!("expected profiles");
        };
        let options = args.batch.options().unwrap();
        assert_eq!(options.batch_size, 2);
        assert_eq!(options.min_delay, Duration::from_secs(1));
        assert_eq!(options.max_delay, Duration::from_secs(3));
    }

    // ==================== Jobs / Serve / Prune Tests ====================

    #[test]
    fn test_cli_jobs_limit_range() {
        let cli = Cli::try_parse_from(["joblo", "jobs", "--query", "rust"]).unwrap();
        let Command::Jobs(args) = cli.command else {
            panic!("expected jobs");
        };
        assert_eq!(args.query, "rust");
        assert_eq!(args.location, "United States");
        assert_eq!(args.limit, 10);

        let err = Cli::try_parse_from(["joblo", "jobs", "--limit", "51"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_serve_default_bind() {
        let cli = Cli::try_parse_from(["joblo", "serve"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.bind.to_string(), "127.0.0.1:8000");
    }

    #[test]
    fn test_cli_prune_default_days() {
        let cli = Cli::try_parse_from(["joblo", "prune"]).unwrap();
        let Command::Prune(args) = cli.command else {
            panic!("expected prune");
        };
        assert_eq!(args.days, 30);
    }

    #[test]
    fn test_cli_session_import_source_optional() {
        let cli = Cli::try_parse_from(["joblo", "session", "import"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Session {
                command: SessionCommand::Import { source: None }
            }
        ));
    }
}
