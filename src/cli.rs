use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "fritz-sweep",
    about = "Terminate idle connections on a FRITZ!Box via TR-064 (UPnP/SOAP)"
)]
pub struct Cli {
    /// Router management base URL, e.g. http://fritz.box:49000 or https://192.168.178.1:49443
    #[arg(long, default_value = "http://fritz.box:49000")]
    pub host: String,

    /// TR-064 user with permission to manage connections
    #[arg(short, long, default_value_t = String::new())]
    pub username: String,

    #[arg(short, long, default_value_t = String::new())]
    pub password: String,

    /// Idle threshold in seconds; connections idle at least this long are terminated
    #[arg(long, default_value_t = 86_400)]
    pub threshold_secs: i64,

    #[arg(long, default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Actually terminate connections (default is a dry run)
    #[arg(long, action = ArgAction::SetTrue)]
    pub live: bool,

    /// Accept self-signed TLS certificates on the management port
    #[arg(long, action = ArgAction::SetTrue)]
    pub insecure: bool,

    /// Write the sweep result as JSON to file (path)
    #[arg(long, value_name = "FILE", default_value_t = String::new())]
    pub json_out: String,
}

impl Cli {
    pub fn parse() -> Self {
        Parser::parse()
    }
}
