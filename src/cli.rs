//! Command-line interface for the session client.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Google Cloud project ID.
    pub project: Option<String>,
    /// Google Cloud region.
    pub region: Option<String>,
    /// Custom API endpoint host.
    pub endpoint: Option<String>,
    /// Session runtime version.
    pub runtime_version: Option<String>,
    /// Session TTL in seconds.
    pub ttl_seconds: Option<u64>,
    /// Session idle TTL in seconds.
    pub idle_ttl_seconds: Option<u64>,
    /// Service account the workload runs as.
    pub service_account: Option<String>,
    /// Authentication type (SERVICE_ACCOUNT | END_USER_CREDENTIALS).
    pub auth_type: Option<String>,
    /// Subnetwork URI.
    pub subnet: Option<String>,
    /// Session template resource name.
    pub session_template: Option<String>,
    /// Session labels as key=value pairs.
    pub labels: Vec<(String, String)>,
    /// Package requirements to stage for the session.
    pub artifacts: Vec<String>,
    /// Active-session info file path.
    pub session_file: Option<PathBuf>,
    /// Terminate the session when the client exits.
    pub terminate_at_exit: bool,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('p') | Long("project") => {
                result.project = Some(parser.value()?.parse()?);
            }
            Short('r') | Long("region") => {
                result.region = Some(parser.value()?.parse()?);
            }
            Long("endpoint") => {
                result.endpoint = Some(parser.value()?.parse()?);
            }
            Long("runtime-version") => {
                result.runtime_version = Some(parser.value()?.parse()?);
            }
            Long("ttl") => {
                let value: String = parser.value()?.parse()?;
                result.ttl_seconds = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("ttl", value))?,
                );
            }
            Long("idle-ttl") => {
                let value: String = parser.value()?.parse()?;
                result.idle_ttl_seconds = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("idle-ttl", value))?,
                );
            }
            Long("service-account") => {
                result.service_account = Some(parser.value()?.parse()?);
            }
            Long("auth-type") => {
                result.auth_type = Some(parser.value()?.parse()?);
            }
            Long("subnet") => {
                result.subnet = Some(parser.value()?.parse()?);
            }
            Long("session-template") => {
                result.session_template = Some(parser.value()?.parse()?);
            }
            Long("label") => {
                let value: String = parser.value()?.parse()?;
                let (key, val) = value
                    .split_once('=')
                    .ok_or_else(|| ArgsError::InvalidValue("label", value.clone()))?;
                result.labels.push((key.to_string(), val.to_string()));
            }
            Long("artifact") => {
                result.artifacts.push(parser.value()?.parse()?);
            }
            Long("session-file") => {
                result.session_file = Some(parser.value()?.parse()?);
            }
            Long("terminate-at-exit") => {
                result.terminate_at_exit = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"dataproc-spark-connect {version}
Client for managed Dataproc Spark Connect sessions

USAGE:
    dataproc-spark-connect [OPTIONS]

OPTIONS:
    -p, --project <ID>            Google Cloud project ID
    -r, --region <REGION>         Google Cloud region
        --endpoint <HOST>         Custom API endpoint host
        --runtime-version <VER>   Session runtime version [default: 2.3]
        --ttl <SECONDS>           Session TTL in seconds
        --idle-ttl <SECONDS>      Session idle TTL in seconds
        --service-account <SA>    Service account (implies SERVICE_ACCOUNT auth)
        --auth-type <TYPE>        SERVICE_ACCOUNT or END_USER_CREDENTIALS
        --subnet <URI>            Subnetwork URI
        --session-template <T>    Session template resource name
        --label <KEY=VALUE>       Session label (repeatable)
        --artifact <REQUIREMENT>  Package requirement to stage (repeatable)
        --session-file <FILE>     Active-session info file path
        --terminate-at-exit       Terminate the session on exit
    -l, --log-level <LVL>         Log level (error, warn, info, debug, trace)
    -h, --help                    Print help
    -V, --version                 Print version

ENVIRONMENT VARIABLES:
    GOOGLE_CLOUD_PROJECT                              Project ID
    GOOGLE_CLOUD_REGION                               Region
    GOOGLE_APPLICATION_CREDENTIALS                    Credentials file
    GOOGLE_CLOUD_DATAPROC_API_ENDPOINT                API endpoint override
    DATAPROC_SPARK_CONNECT_AUTH_TYPE                  Authentication type
    DATAPROC_SPARK_CONNECT_SERVICE_ACCOUNT            Service account
    DATAPROC_SPARK_CONNECT_TTL_SECONDS                Session TTL
    DATAPROC_SPARK_CONNECT_IDLE_TTL_SECONDS           Session idle TTL
    DATAPROC_SPARK_CONNECT_SESSION_TERMINATE_AT_EXIT  Terminate on exit (true/false)
    DATAPROC_SPARK_CONNECT_ACTIVE_SESSION_FILE_PATH   Active-session file
    DATAPROC_SPARK_CONNECT_DEFAULT_DATASOURCE         Default datasource
    DATAPROC_SPARK_CONNECT_SUBNET                     Subnetwork URI

EXAMPLES:
    # Connect with everything from the environment
    dataproc-spark-connect

    # Explicit project and region, terminate the session on ctrl-c
    dataproc-spark-connect -p my-project -r us-central1 --terminate-at-exit

    # Stage dependencies for the session
    dataproc-spark-connect --artifact "spacy==3.8.4" --artifact torch
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("dataproc-spark-connect {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
