/// Chat Client Tool - interactive WebSocket diagnostics
///
/// Connects to a running chat server, optionally posts one message, and
/// prints every envelope it receives:
/// - initial snapshot (`message` events, oldest first)
/// - live `message` and `reaction_updated` broadcasts
/// - `error` replies to this connection
///
/// Usage:
///   cargo run --bin tool_chat_client
///   cargo run --bin tool_chat_client -- --send "hello" --name Ann
///   cargo run --bin tool_chat_client -- --url ws://127.0.0.1:9000/ws --duration 60
use clap::Parser;
use colored::Colorize;
use futures_util::{SinkExt, StreamExt};
use tokio::time::{timeout, Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Parser, Debug)]
#[command(name = "tool_chat_client", about = "Connect to the chat server and print events")]
struct Args {
    /// WebSocket endpoint
    #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Post this message after the snapshot arrives
    #[arg(long)]
    send: Option<String>,

    /// Author name for --send
    #[arg(long, default_value = "ChatClient")]
    name: String,

    /// React to this message id with --emoji
    #[arg(long)]
    react: Option<String>,

    /// Emoji for --react
    #[arg(long, default_value = "👍")]
    emoji: String,

    /// Seconds to keep listening
    #[arg(long, default_value_t = 30)]
    duration: u64,
}

fn print_header(title: &str) {
    println!("\n{}", "=".repeat(80));
    println!("  {}", title);
    println!("{}\n", "=".repeat(80));
}

fn print_event(raw: &str) {
    let Ok(envelope) = serde_json::from_str::<serde_json::Value>(raw) else {
        println!("{} {}", "RAW".dimmed(), raw);
        return;
    };
    let data = &envelope["data"];

    match envelope["type"].as_str().unwrap_or_default() {
        "message" => println!(
            "{} [{}] {}: {}",
            "MSG".green().bold(),
            data["id"].as_str().unwrap_or_default().get(..8).unwrap_or_default(),
            data["author_name"].as_str().unwrap_or_default().cyan(),
            data["text"].as_str().unwrap_or_default()
        ),
        "reaction_updated" => println!(
            "{} {} {} by {} on [{}]",
            "REACT".magenta().bold(),
            data["action"].as_str().unwrap_or_default(),
            data["emoji"].as_str().unwrap_or_default(),
            data["user_id"].as_str().unwrap_or_default(),
            data["message_id"].as_str().unwrap_or_default().get(..8).unwrap_or_default()
        ),
        "error" => println!(
            "{} {}",
            "ERROR".red().bold(),
            data["error"].as_str().unwrap_or_default()
        ),
        other => println!("{} {} {}", "???".yellow(), other, data),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    print_header("CHAT CLIENT TOOL");
    println!("URL:      {}", args.url);
    println!("Duration: {}s", args.duration);
    println!();

    let (mut ws, response) = connect_async(args.url.as_str()).await?;
    println!("Connected (HTTP {})\n", response.status());

    if let Some(text) = &args.send {
        let frame = serde_json::json!({
            "type": "send_message",
            "data": { "text": text, "author_name": args.name },
        });
        ws.send(Message::Text(frame.to_string())).await?;
    }

    if let Some(message_id) = &args.react {
        let frame = serde_json::json!({
            "type": "add_reaction",
            "data": { "message_id": message_id, "emoji": args.emoji },
        });
        ws.send(Message::Text(frame.to_string())).await?;
    }

    let deadline = Instant::now() + Duration::from_secs(args.duration);
    let mut received = 0usize;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        match timeout(remaining, ws.next()).await {
            Err(_) => break,
            Ok(None) => {
                println!("{}", "Server closed the connection".yellow());
                break;
            }
            Ok(Some(Err(e))) => {
                println!("{} {}", "Transport error:".red(), e);
                break;
            }
            Ok(Some(Ok(Message::Text(text)))) => {
                received += 1;
                print_event(&text);
            }
            Ok(Some(Ok(Message::Close(frame)))) => {
                println!("{} {:?}", "Close frame:".yellow(), frame);
                break;
            }
            // tungstenite answers pings on the next read/write
            Ok(Some(Ok(_))) => {}
        }
    }

    let _ = ws.close(None).await;

    print_header("SUMMARY");
    println!("Events received: {}", received);

    Ok(())
}
