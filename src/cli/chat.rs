//! `skein chat`: one prompt, one reply.

use std::path::Path;

use crate::bus::Notification;
use crate::config::SkeinConfig;
use crate::error::SkeinError;
use crate::thread::ThreadManager;

use super::ChatArgs;

const PREVIEW_CHARS: usize = 200;

/// Start (or reuse) a thread, send the prompt and print the outcome.
pub async fn handle_chat(args: ChatArgs, config_path: Option<&Path>) -> Result<(), SkeinError> {
    let mut config = SkeinConfig::load_from(config_path)?;
    if let Some(model) = args.model {
        config = config.with_model(model);
    }
    let provider = config.provider()?;
    let manager = ThreadManager::from_config(provider, &config);

    let thread = manager.start_thread(args.thread, args.dir).await?;
    let before = manager.get_agent(&thread).await?.messages().len();
    let mut updates = manager.subscribe(&thread);
    manager.send_message(&thread, args.prompt).await?;
    eprintln!("[{thread}]");

    match updates.recv().await {
        Some(Notification::Updated { agent, .. }) => {
            for message in agent.messages().iter().skip(before) {
                for call in message.tool_calls() {
                    eprintln!("-> {} {}", call.name, preview(&call.arguments.to_string()));
                }
                for result in message.tool_results() {
                    let marker = if result.is_error { "error" } else { "ok" };
                    eprintln!("   {marker}: {}", preview(&result.text()));
                }
            }
            if let Some(reply) = agent.last_assistant_text() {
                println!("{reply}");
            }
            Ok(())
        }
        Some(Notification::Failed { reason, .. }) => Err(SkeinError::Turn(reason)),
        None => Err(SkeinError::InvalidState("thread stopped before replying".into())),
    }
}

fn preview(text: &str) -> String {
    let flat = text.replace('\n', " ");
    match flat.char_indices().nth(PREVIEW_CHARS) {
        Some((end, _)) => format!("{}...", &flat[..end]),
        None => flat,
    }
}
