use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, warn};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use super::args::Args;
use crate::{
    core::{Config, ConversationManager, ConversationStore, InMemoryHistory, LLMError, TurnOutcome},
    providers::{ClaudeClient, LLMClient, Message, StreamEvent},
    tools::{ToolRegistry, WebSearchTool},
};

const EXIT_COMMANDS: [&str; 2] = ["exit", "quit"];

/// Creates the Claude client, reading the API key from `.env` or the environment
fn create_llm_client(config: &Config) -> Result<Arc<dyn LLMClient>, LLMError> {
    let api_key = dotenv::var("ANTHROPIC_API_KEY")
        .or_else(|_| std::env::var("ANTHROPIC_API_KEY"))
        .map_err(|_| {
            LLMError::ConfigError("ANTHROPIC_API_KEY not set in .env or environment".to_string())
        })?;
    Ok(Arc::new(ClaudeClient::new(&api_key, &config.claude)?))
}

pub async fn run(args: Args) -> Result<(), LLMError> {
    let _ = dotenv::dotenv();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(model) = args.model.clone() {
        config = config.with_model(model);
    }
    let enable_tools = args.enable_tools.unwrap_or(config.enable_tools);
    let max_tool_hops = args.max_tool_hops.unwrap_or(config.max_tool_hops);

    debug!(
        "[SETTINGS] model: {}, tools_enabled: {enable_tools}, max_tool_hops: {max_tool_hops}",
        config.get_model()
    );

    let client = create_llm_client(&config)?;
    let mut manager = ConversationManager::new(client, &config).with_max_tool_hops(max_tool_hops);
    if enable_tools {
        let mut registry = ToolRegistry::new();
        registry.register(WebSearchTool::new(&config.web_search)?);
        manager = manager.with_tools(registry);
    }

    let mut history = InMemoryHistory::new();
    match args.query() {
        Some(query) => {
            history.append(user_message(query, &args.images)?);
            chat_turn(&manager, &mut history).await
        }
        None if !args.images.is_empty() => Err(LLMError::ConfigError(
            "--image needs a query to go with it".to_string(),
        )),
        None => interactive(&manager, &mut history).await,
    }
}

/// Line-based session sharing one history until EOF or `exit`
async fn interactive(
    manager: &ConversationManager,
    history: &mut InMemoryHistory,
) -> Result<(), LLMError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if EXIT_COMMANDS.contains(&line) {
            break;
        }

        history.append(Message::user(line));
        if let Err(e) = chat_turn(manager, history).await {
            eprintln!("Error: {e}");
        }
    }

    Ok(())
}

/// Runs one turn, streaming text to stdout; Ctrl-C cancels it
async fn chat_turn(
    manager: &ConversationManager,
    history: &mut InMemoryHistory,
) -> Result<(), LLMError> {
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let mut stdout = io::stdout();
    let result = manager
        .run_turn(history, &cancel, |event| {
            if let Err(e) = render(&mut stdout, event) {
                warn!("[Conversation] failed to write output: {e}");
            }
        })
        .await;
    ctrl_c.abort();

    // Ensure final newline
    writeln!(&mut stdout)?;

    match result? {
        TurnOutcome::Completed { tool_hops, .. } => {
            debug!("[Conversation] turn completed after {tool_hops} tool hops");
        }
        TurnOutcome::HopLimitReached { tool_hops, .. } => {
            eprintln!("[stopped after {tool_hops} tool calls]");
        }
        TurnOutcome::Cancelled => eprintln!("[interrupted]"),
    }
    Ok(())
}

fn render<W: Write>(writer: &mut W, event: &StreamEvent) -> io::Result<()> {
    match event {
        StreamEvent::Text(text) => {
            writer.write_all(text.as_bytes())?;
            writer.flush()
        }
        StreamEvent::ToolUse(call) => {
            writer.flush()?;
            eprintln!("\n[{call}]");
            Ok(())
        }
        StreamEvent::MessageStart | StreamEvent::MessageEnd | StreamEvent::Error(_) => Ok(()),
    }
}

fn user_message(query: String, images: &[PathBuf]) -> Result<Message, LLMError> {
    images.iter().try_fold(Message::user(query), |message, path| {
        let media_type = image_media_type(path)?;
        let data = std::fs::read(path)?;
        debug!("[SETTINGS] attaching {} ({media_type}, {} bytes)", path.display(), data.len());
        Ok(message.with_image(media_type, STANDARD.encode(data)))
    })
}

fn image_media_type(path: &Path) -> Result<&'static str, LLMError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("png") => Ok("image/png"),
        Some("jpg" | "jpeg") => Ok("image/jpeg"),
        Some("gif") => Ok("image/gif"),
        Some("webp") => Ok("image/webp"),
        _ => Err(LLMError::IOError(format!(
            "Unsupported image type: {}",
            path.display()
        ))),
    }
}
