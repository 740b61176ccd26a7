//! `agentconnect`: command-line client for the AgentConnect service.
//!
//! Every service operation is a subcommand, plus local credential
//! management and offline webhook verification:
//!
//! - **`register`**: register an agent and store its API key.
//! - **`login`** / **`logout`** / **`whoami`**: manage the stored key.
//! - **`list`**, **`get`**, **`status`**: the agent directory.
//! - **`send`**, **`message`**: send a message and check its delivery.
//! - **`verify`**: check a webhook body against its `X-Signature` value.
//!
//! Results are printed as pretty JSON on stdout. A request the service
//! refuses prints its message to stderr and exits 1; local problems (bad
//! input, unreadable files, credential storage) exit 2.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use agentconnect::verify_bytes;
use agentconnect_client::{api::ListQuery, AgentConnectClient, ClientConfig, ClientError};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

/// agentconnect: AgentConnect service CLI
///
/// Register agents, discover them, exchange messages and verify webhook
/// deliveries.
#[derive(Parser)]
#[command(name = "agentconnect", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct GlobalArgs {
    /// Service API base, including the `/api` suffix.
    #[arg(long, global = true, env = "AGENTCONNECT_API_BASE", value_name = "URL")]
    api_base: Option<String>,

    /// Credential file the API key is stored in.
    #[arg(long, global = true, env = "AGENTCONNECT_CREDENTIALS", value_name = "PATH")]
    credentials: Option<PathBuf>,

    /// Request timeout in seconds. No timeout when unset.
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Register a new agent and store the issued API key.
    ///
    /// Prints the registration, including the webhook secret token. The
    /// service will not show the secret again.
    Register {
        #[arg(short = 'n', long)]
        name: String,

        #[arg(short = 'd', long, default_value = "")]
        description: String,

        /// Absolute http(s) URL that will receive message deliveries.
        #[arg(short = 'w', long, value_name = "URL")]
        webhook_url: String,
    },

    /// Store an existing API key.
    Login {
        #[arg(value_name = "API_KEY")]
        api_key: String,
    },

    /// Remove the stored API key.
    Logout,

    /// Report whether an API key is stored. Exits 1 when none is.
    Whoami,

    /// List registered agents.
    List {
        /// Only agents with this status.
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        skip: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// Show one agent.
    Get {
        #[arg(value_name = "AGENT_ID")]
        agent_id: String,
    },

    /// Set an agent's status (your own agent only).
    Status {
        #[arg(value_name = "AGENT_ID")]
        agent_id: String,

        /// Any status string, e.g. online | offline | busy.
        #[arg(value_name = "STATUS")]
        status: String,
    },

    /// Send a message to another agent.
    ///
    /// CONTENT is inline JSON, `-` for JSON on stdin, or `@path` for a JSON
    /// file.
    ///
    /// Examples:
    ///   agentconnect send agent_b '{"text":"hi"}'
    ///   agentconnect send agent_b @reply.json
    Send {
        #[arg(value_name = "TO_AGENT_ID")]
        to_agent_id: String,

        #[arg(value_name = "CONTENT")]
        content: String,
    },

    /// Show a message's delivery status.
    Message {
        #[arg(value_name = "MESSAGE_ID")]
        message_id: String,
    },

    /// Verify a webhook body against its signature.
    ///
    /// Reads the raw body from FILE (or stdin with `-`). Prints `valid` and
    /// exits 0, or prints `invalid` and exits 1. No network access.
    Verify {
        /// The agent's webhook secret token.
        #[arg(long, env = "AGENTCONNECT_WEBHOOK_SECRET", hide_env_values = true)]
        secret: String,

        /// Value of the X-Signature header, with or without `sha256=`.
        #[arg(long)]
        signature: String,

        /// Path to the raw request body, or `-` for stdin.
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "agentconnect=info,agentconnect_client=info".into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let global = &cli.global;

    match cli.command {
        Command::Register {
            name,
            description,
            webhook_url,
        } => {
            let reg = connect(global)
                .register(&name, &description, &webhook_url)
                .await
                .unwrap_or_else(|e| fail(e));
            tracing::info!(agent_id = %reg.agent_id, "registered; API key stored");
            print_json(&reg);
        }

        Command::Login { api_key } => {
            if api_key.trim().is_empty() {
                fatal("API key must not be empty");
            }
            connect(global)
                .set_credential(&api_key)
                .unwrap_or_else(|e| fail(e));
            println!("API key stored");
        }

        Command::Logout => {
            connect(global)
                .clear_credential()
                .unwrap_or_else(|e| fail(e));
            println!("API key removed");
        }

        Command::Whoami => {
            if connect(global).has_credential() {
                println!("API key present");
            } else {
                println!("no API key stored");
                process::exit(1);
            }
        }

        Command::List {
            status,
            skip,
            limit,
        } => {
            let query = list_query(status, skip, limit);
            let page = connect(global)
                .list_agents_page(&query)
                .await
                .unwrap_or_else(|e| fail(e));
            print_json(&page);
        }

        Command::Get { agent_id } => {
            let agent = connect(global)
                .get_agent(&agent_id)
                .await
                .unwrap_or_else(|e| fail(e));
            print_json(&agent);
        }

        Command::Status { agent_id, status } => {
            let agent = connect(global)
                .update_status(&agent_id, &status)
                .await
                .unwrap_or_else(|e| fail(e));
            print_json(&agent);
        }

        Command::Send {
            to_agent_id,
            content,
        } => {
            let content = parse_content(&content);
            let receipt = connect(global)
                .send_message(&to_agent_id, &content)
                .await
                .unwrap_or_else(|e| fail(e));
            print_json(&receipt);
        }

        Command::Message { message_id } => {
            let receipt = connect(global)
                .get_message_status(&message_id)
                .await
                .unwrap_or_else(|e| fail(e));
            print_json(&receipt);
        }

        // Offline; needs neither a client nor a credential store.
        Command::Verify {
            secret,
            signature,
            file,
        } => {
            let body = read_input(&file);
            if verify_bytes(&body, &signature, secret.as_bytes()) {
                println!("valid");
            } else {
                println!("invalid");
                process::exit(1);
            }
        }
    }
}

/// Environment config, overridden by any flags given on the command line.
fn connect(global: &GlobalArgs) -> AgentConnectClient {
    let mut config = ClientConfig::from_env();
    if let Some(api_base) = &global.api_base {
        config.api_base = api_base.clone();
    }
    if let Some(path) = &global.credentials {
        config.credentials_path = Some(path.clone());
    }

    let mut http = reqwest::Client::builder();
    if let Some(secs) = global.timeout {
        http = http.timeout(Duration::from_secs(secs));
    }
    let http = http
        .build()
        .unwrap_or_else(|e| fatal(&format!("failed to build HTTP client: {e}")));

    AgentConnectClient::from_config(&config, http).unwrap_or_else(|e| fail(e))
}

/// An empty `--status` means no filter.
fn list_query(status: Option<String>, skip: Option<u32>, limit: Option<u32>) -> ListQuery {
    ListQuery {
        status: status.filter(|s| !s.is_empty()),
        skip,
        limit,
    }
}

/// Resolve a `send` CONTENT argument to a JSON value.
fn parse_content(arg: &str) -> Value {
    let raw = if arg == "-" {
        read_input(Path::new("-"))
    } else if let Some(path) = arg.strip_prefix('@') {
        read_input(Path::new(path))
    } else {
        arg.as_bytes().to_vec()
    };
    serde_json::from_slice(&raw)
        .unwrap_or_else(|e| fatal(&format!("message content is not valid JSON: {e}")))
}

/// Read the full contents of a file, or stdin when the path is `"-"`.
fn read_input(path: &Path) -> Vec<u8> {
    if path.to_str() == Some("-") {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .unwrap_or_else(|e| fatal(&format!("failed to read stdin: {e}")));
        buf
    } else {
        fs::read(path)
            .unwrap_or_else(|e| fatal(&format!("failed to read {}: {e}", path.display())))
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => fatal(&format!("failed to encode output: {e}")),
    }
}

/// Report a client error and exit: 1 for anything the service or the
/// network produced, 2 for local errors.
fn fail(err: ClientError) -> ! {
    match &err {
        ClientError::InvalidRequest(_) | ClientError::Credential(_) => fatal(&err.to_string()),
        ClientError::RegistrationNotPersisted { registration, .. } => {
            // The service did register the agent; the secrets are not shown again.
            print_json(registration);
            fatal(&err.to_string())
        }
        _ => {
            eprintln!("agentconnect: {err}");
            process::exit(1);
        }
    }
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("agentconnect: {msg}");
    process::exit(2);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "agentconnect",
            "get",
            "a1",
            "--api-base",
            "http://127.0.0.1:9/api",
            "--timeout",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.global.api_base.as_deref(), Some("http://127.0.0.1:9/api"));
        assert_eq!(cli.global.timeout, Some(3));
        assert!(matches!(cli.command, Command::Get { agent_id } if agent_id == "a1"));
    }

    #[test]
    fn send_takes_recipient_and_content() {
        let cli =
            Cli::try_parse_from(["agentconnect", "send", "a2", r#"{"text":"hi"}"#]).unwrap();
        let Command::Send {
            to_agent_id,
            content,
        } = cli.command
        else {
            panic!("expected send");
        };
        assert_eq!(to_agent_id, "a2");
        assert_eq!(parse_content(&content), serde_json::json!({"text": "hi"}));
    }

    #[test]
    fn empty_status_filter_is_dropped() {
        let cli = Cli::try_parse_from(["agentconnect", "list", "--status", ""]).unwrap();
        let Command::List {
            status,
            skip,
            limit,
        } = cli.command
        else {
            panic!("expected list");
        };
        assert_eq!(list_query(status, skip, limit), ListQuery::default());

        let query = list_query(Some("online".into()), None, Some(5));
        assert_eq!(query.status.as_deref(), Some("online"));
        assert_eq!(query.limit, Some(5));
    }

    #[test]
    fn verify_requires_signature() {
        assert!(
            Cli::try_parse_from(["agentconnect", "verify", "--secret", "s", "body.json"]).is_err()
        );
    }
}
