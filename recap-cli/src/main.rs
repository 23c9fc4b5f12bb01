//! recap-cli — operator frontend for the recap HTTP API
//!
//! # Subcommands
//! - `status`                              — server health
//! - `rooms [-n <limit>]`                  — rooms by recent activity
//! - `messages [--room <id>] [-n <limit>]` — recent messages
//! - `summaries [--room <id>] [-n <limit>]`— recent summaries
//! - `analyze`                             — trigger one analysis batch

use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8780";
const DEFAULT_LIMIT: usize = 10;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "recap-cli",
    version,
    about = "Recap group-chat summarization — operator CLI"
)]
struct Cli {
    /// Recap HTTP server URL (overrides RECAP_HTTP_URL env var)
    #[arg(long, env = "RECAP_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show recap server status
    Status,

    /// List rooms by most recent activity
    Rooms {
        /// Maximum number of rooms to list
        #[arg(short = 'n', long, default_value_t = 50)]
        limit: usize,

        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },

    /// List recent messages, newest first
    Messages {
        /// Restrict to a single room id
        #[arg(long)]
        room: Option<String>,

        /// Maximum number of messages to list
        #[arg(short = 'n', long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },

    /// List recent summaries, newest first
    Summaries {
        /// Restrict to a single room id
        #[arg(long)]
        room: Option<String>,

        /// Maximum number of summaries to list
        #[arg(short = 'n', long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Trigger one analysis batch now
    Analyze,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct RoomsResponse {
    rooms: Vec<RoomRow>,
}

#[derive(Debug, Deserialize)]
struct RoomRow {
    room_id: String,
    topic: String,
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    messages: Vec<MessageRow>,
}

#[derive(Debug, Deserialize)]
struct MessageRow {
    room_topic: Option<String>,
    user_name: Option<String>,
    content: String,
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct SummariesResponse {
    summaries: Vec<SummaryRow>,
}

#[derive(Debug, Deserialize)]
struct SummaryRow {
    room_id: String,
    summary: String,
    start_time: String,
    end_time: String,
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client() -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()?)
}

fn get_json(server: &str, path: &str, query: &[(&str, String)]) -> anyhow::Result<serde_json::Value> {
    let resp = client()?
        .get(format!("{}{}", server, path))
        .query(query)
        .send()?;

    let status = resp.status();
    let body: serde_json::Value = resp.json()?;

    if !status.is_success() {
        anyhow::bail!(
            "server returned {}: {}",
            status,
            body["error"].as_str().unwrap_or("unknown error")
        );
    }

    Ok(body)
}

fn do_status(server: &str) -> anyhow::Result<()> {
    let body = get_json(server, "/health", &[])?;
    println!("status:     {}", body["status"].as_str().unwrap_or("?"));
    println!("version:    {}", body["version"].as_str().unwrap_or("?"));
    println!("postgresql: {}", body["postgresql"].as_str().unwrap_or("?"));
    println!("socket:     {}", body["socket"].as_str().unwrap_or("?"));
    Ok(())
}

fn do_rooms(server: &str, limit: usize, json: bool) -> anyhow::Result<()> {
    let body = get_json(server, "/rooms", &[("limit", limit.to_string())])?;
    if json {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let parsed: RoomsResponse = serde_json::from_value(body)?;
    for room in parsed.rooms {
        println!("{}  {}  (last active {})", room.room_id, room.topic, room.updated_at);
    }
    Ok(())
}

fn do_messages(
    server: &str,
    room: Option<String>,
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let mut query = vec![("limit", limit.to_string())];
    if let Some(room_id) = room {
        query.push(("room_id", room_id));
    }

    let body = get_json(server, "/messages", &query)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let parsed: MessagesResponse = serde_json::from_value(body)?;
    for msg in parsed.messages {
        println!(
            "[{}] {} — {}: {}",
            msg.created_at,
            msg.room_topic.as_deref().unwrap_or("Unknown"),
            msg.user_name.as_deref().unwrap_or("Unknown"),
            msg.content
        );
    }
    Ok(())
}

fn do_summaries(
    server: &str,
    room: Option<String>,
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let mut query = vec![("limit", limit.to_string())];
    if let Some(room_id) = room {
        query.push(("room_id", room_id));
    }

    let body = get_json(server, "/summaries", &query)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let parsed: SummariesResponse = serde_json::from_value(body)?;
    for s in parsed.summaries {
        println!("== {} ({} .. {})", s.room_id, s.start_time, s.end_time);
        println!("{}\n", s.summary);
    }
    Ok(())
}

fn do_analyze(server: &str) -> anyhow::Result<()> {
    let resp = client()?
        .post(format!("{}/analyze", server))
        .send()?;

    let status = resp.status();
    let body: serde_json::Value = resp.json()?;

    if !status.is_success() {
        anyhow::bail!(
            "analysis failed: {}",
            body["error"].as_str().unwrap_or("unknown error")
        );
    }

    println!(
        "analyzed {} room(s)",
        body["rooms_analyzed"].as_u64().unwrap_or(0)
    );
    println!("{}", serde_json::to_string_pretty(&body["results"])?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Status => do_status(&cli.server),
        Commands::Rooms { limit, json } => do_rooms(&cli.server, limit, json),
        Commands::Messages { room, limit, json } => {
            do_messages(&cli.server, room, limit, json)
        }
        Commands::Summaries { room, limit, json } => {
            do_summaries(&cli.server, room, limit, json)
        }
        Commands::Analyze => do_analyze(&cli.server),
    }
}
