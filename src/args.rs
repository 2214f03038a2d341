use std::{path::PathBuf, time::Duration};

use url::Url;
use x_checker::{
    api::{PollOptions, TaskInput},
    config::DEFAULT_BASE_URL,
};

fn non_blank_value_parser(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("Value cannot be empty".to_string());
    }
    if trimmed.len() > 128 {
        return Err("Value cannot exceed 128 characters".to_string());
    }
    Ok(trimmed.to_string())
}

fn phone_number_value_parser(raw: &str) -> Result<String, String> {
    let number = raw.trim();
    if number.is_empty() {
        return Err("Phone number cannot be empty".to_string());
    }

    // The service wants E.164-like strings, leave the rest to it
    let digits = number.strip_prefix('+').unwrap_or(number);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!(
            "'{number}' is not a phone number, expected digits with an optional leading '+'"
        ));
    }

    Ok(number.to_string())
}

#[derive(clap::Parser)]
#[command(name = "x-checker")]
#[command(version)]
#[command(about = "Check which phone numbers have an X (Twitter) account")]
#[command(long_about = "
Uploads a list of phone numbers to the checknumber.ai bulk API, waits for the
task to finish and downloads the result spreadsheet.

Examples:
  # Submit a file and wait for the results
  x-checker submit --file input.txt --watch --output results.xlsx

  # Submit numbers directly
  x-checker submit --numbers +1234567890,+9876543210

  # Check on a task later
  x-checker status --task 0b6a1c7e --watch

  # Fetch a finished result
  x-checker download --result-url https://files.example.com/r.xlsx --output results.xlsx
")]
pub struct Args {
    #[command(flatten)]
    pub api: ApiArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Args)]
pub struct ApiArgs {
    /// API key, sent as the X-API-Key header
    #[arg(long, env = "X_CHECKER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// API endpoint URL
    #[arg(
        long,
        env = "X_CHECKER_URL",
        value_hint = clap::ValueHint::Url,
        value_parser = Url::parse,
        default_value = DEFAULT_BASE_URL
    )]
    pub url: Url,

    /// Retry status checks and downloads this many times on network errors
    /// and 5xx answers. Uploads are never retried.
    #[arg(long, default_value_t = 0)]
    pub retries: usize,
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Upload phone numbers and create a verification task
    Submit(SubmitArgs),

    /// Show the status of a task, optionally waiting for it to finish
    Status(StatusArgs),

    /// Download the result file of a finished task
    Download(DownloadArgs),
}

#[derive(clap::Args)]
#[group(required = true, multiple = false)]
pub struct InputArgs {
    /// File with one phone number per line
    #[arg(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    /// Comma separated phone numbers
    #[arg(
        long,
        value_name = "NUMBERS",
        value_delimiter = ',',
        value_parser = phone_number_value_parser
    )]
    pub numbers: Vec<String>,
}

impl InputArgs {
    pub fn into_input(self) -> TaskInput {
        match self.file {
            Some(path) => TaskInput::path(path),
            None => TaskInput::from_numbers(self.numbers),
        }
    }
}

#[derive(clap::Args)]
pub struct WaitArgs {
    /// Poll until the task finishes
    #[arg(long, default_value_t = false)]
    pub watch: bool,

    /// Where to save the result file once exported (implies --watch)
    #[arg(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Seconds between status checks
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval: u64,

    /// Give up waiting after this many seconds
    #[arg(long, value_name = "SECS", default_value_t = 1800)]
    pub timeout: u64,

    /// Wait for as long as it takes
    #[arg(long, default_value_t = false, conflicts_with = "timeout")]
    pub no_timeout: bool,
}

impl WaitArgs {
    pub const fn should_wait(&self) -> bool {
        self.watch || self.output.is_some()
    }

    pub fn poll_options(&self) -> PollOptions {
        let timeout = (!self.no_timeout).then(|| Duration::from_secs(self.timeout));
        PollOptions::default()
            .with_interval(Duration::from_secs(self.interval))
            .with_timeout(timeout)
    }
}

#[derive(clap::Args)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Identifier echoed back by the service
    #[arg(long, default_value = "test", value_parser = non_blank_value_parser)]
    pub user_id: String,

    #[command(flatten)]
    pub wait: WaitArgs,
}

#[derive(clap::Args)]
pub struct StatusArgs {
    /// Task id returned by submit
    #[arg(long, value_name = "TASK_ID", value_parser = non_blank_value_parser)]
    pub task: String,

    /// Identifier echoed back by the service
    #[arg(long, default_value = "test", value_parser = non_blank_value_parser)]
    pub user_id: String,

    #[command(flatten)]
    pub wait: WaitArgs,
}

#[derive(clap::Args)]
pub struct DownloadArgs {
    /// Result URL reported by an exported task
    #[arg(long, value_name = "URL", value_hint = clap::ValueHint::Url)]
    pub result_url: String,

    /// Destination file
    #[arg(long, value_name = "FILE", default_value = "results.xlsx")]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn phone_numbers() {
        assert_eq!(phone_number_value_parser(" +1234567890 ").unwrap(), "+1234567890");
        assert!(phone_number_value_parser("12-34").is_err());
        assert!(phone_number_value_parser("+").is_err());
        assert!(phone_number_value_parser("").is_err());
    }

    #[test]
    fn submit_with_numbers() {
        let args = Args::try_parse_from([
            "x-checker",
            "--api-key",
            "k",
            "submit",
            "--numbers",
            "+1234567890,+9876543210",
            "--output",
            "out.xlsx",
        ])
        .unwrap();

        let Commands::Submit(submit) = args.command else {
            panic!("expected submit");
        };
        assert!(submit.wait.should_wait());
        assert_eq!(submit.user_id, "test");
        assert_eq!(
            submit.input.into_input(),
            TaskInput::bytes("input.txt", "+1234567890\n+9876543210")
        );
    }

    #[test]
    fn submit_requires_exactly_one_input() {
        assert!(Args::try_parse_from(["x-checker", "submit"]).is_err());
        assert!(Args::try_parse_from([
            "x-checker",
            "submit",
            "--file",
            "a.txt",
            "--numbers",
            "+1"
        ])
        .is_err());
    }

    #[test]
    fn status_poll_options() {
        let args = Args::try_parse_from([
            "x-checker",
            "status",
            "--task",
            "t-1",
            "--interval",
            "2",
            "--no-timeout",
        ])
        .unwrap();

        let Commands::Status(status) = args.command else {
            panic!("expected status");
        };
        let options = status.wait.poll_options();
        assert_eq!(options.interval, Duration::from_secs(2));
        assert_eq!(options.timeout, None);
        assert!(!status.wait.should_wait());
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(Args::try_parse_from([
            "x-checker",
            "status",
            "--task",
            "t-1",
            "--watch",
            "--interval",
            "0",
        ])
        .is_err());
    }

    #[test]
    fn default_url() {
        let args = Args::try_parse_from([
            "x-checker",
            "download",
            "--result-url",
            "https://files.example.com/r.xlsx",
        ])
        .unwrap();

        assert_eq!(args.api.url.as_str(), "https://api.checknumber.ai/");
        let Commands::Download(download) = args.command else {
            panic!("expected download");
        };
        assert_eq!(download.output, PathBuf::from("results.xlsx"));
    }
}
