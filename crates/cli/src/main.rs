// SPDX-License-Identifier: MIT

//! `rdt`: thin command-line client for the `rdtd` daemon's local IPC socket.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod client;
mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rdt_daemon::{ComponentRef, Request};

use client::DaemonClient;
use output::print_response;

#[derive(Debug, Parser)]
#[command(name = "rdt", about = "Inspect a connected React app's component tree")]
struct Cli {
    /// Print the raw JSON response instead of formatted text
    #[arg(long, global = true)]
    json: bool,
    /// Override the daemon state directory (default: $RDT_STATE_DIR or ~/.agent-react-devtools)
    #[arg(long, global = true, value_name = "PATH")]
    state_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the daemon is alive
    Ping,
    /// Daemon and connection status
    Status,
    /// Print the component tree
    Tree {
        #[arg(long)]
        depth: Option<u32>,
    },
    /// Inspect one component's props/state/hooks
    Component {
        /// Numeric id or @cN label
        id: String,
    },
    /// Find components by display name
    Find {
        name: String,
        #[arg(long)]
        exact: bool,
    },
    /// Count components by kind
    Count,
    /// Profiling session commands
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Block until a condition holds, or time out
    Wait {
        /// "connected" or "component"
        condition: String,
        #[arg(long)]
        name: Option<String>,
        /// Timeout in milliseconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[derive(Debug, Subcommand)]
enum ProfileCommand {
    /// Start a profiling session
    Start {
        #[arg(long)]
        name: Option<String>,
    },
    /// Stop the active profiling session
    Stop,
    /// Per-component render report for the last session
    Report {
        /// Numeric id or @cN label
        component_id: String,
    },
    /// The slowest-rendering components
    Slow {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// The most frequently re-rendered components
    Rerenders {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Commit-by-commit timeline
    Timeline {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Per-component detail for one commit
    Commit {
        index: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn parse_component_ref(s: &str) -> ComponentRef {
    match s.parse::<u32>() {
        Ok(id) => ComponentRef::Id(id),
        Err(_) => ComponentRef::Label(s.to_string()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let request = match &cli.command {
        Command::Ping => Request::Ping,
        Command::Status => Request::Status,
        Command::Tree { depth } => Request::GetTree { depth: *depth },
        Command::Component { id } => Request::GetComponent { id: parse_component_ref(id) },
        Command::Find { name, exact } => Request::Find { name: name.clone(), exact: *exact },
        Command::Count => Request::Count,
        Command::Profile(cmd) => profile_request(cmd),
        Command::Wait { condition, name, timeout } => {
            Request::Wait { condition: condition.clone(), name: name.clone(), timeout: *timeout }
        }
    };

    let mut client = match DaemonClient::connect(cli.state_dir.clone()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let response = match client.send(&request) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let code = match &cli.command {
        Command::Tree { .. } => print_response(&response, cli.json, output::print_tree),
        Command::Status => print_response(&response, cli.json, output::print_status),
        _ => print_response(&response, cli.json, output::print_json),
    };

    if code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn profile_request(cmd: &ProfileCommand) -> Request {
    match cmd {
        ProfileCommand::Start { name } => Request::ProfileStart { name: name.clone() },
        ProfileCommand::Stop => Request::ProfileStop,
        ProfileCommand::Report { component_id } => {
            Request::ProfileReport { component_id: parse_component_ref(component_id) }
        }
        ProfileCommand::Slow { limit } => Request::ProfileSlow { limit: *limit },
        ProfileCommand::Rerenders { limit } => Request::ProfileRerenders { limit: *limit },
        ProfileCommand::Timeline { limit } => Request::ProfileTimeline { limit: *limit },
        ProfileCommand::Commit { index, limit } => {
            Request::ProfileCommit { index: *index, limit: *limit }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_string_parses_as_id() {
        assert_eq!(parse_component_ref("42"), ComponentRef::Id(42));
    }

    #[test]
    fn at_label_parses_as_label() {
        assert_eq!(parse_component_ref("@c3"), ComponentRef::Label("@c3".to_string()));
    }

    #[test]
    fn cli_parses_tree_with_depth() {
        let cli = Cli::parse_from(["rdt", "tree", "--depth", "2"]);
        assert!(matches!(cli.command, Command::Tree { depth: Some(2) }));
    }
}
