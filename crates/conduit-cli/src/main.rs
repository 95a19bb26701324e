mod config;
mod render;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use conduit_persist::{MessagePersistence, RetryQueueConfig};
use conduit_session::{
    EnvTokenProvider, HttpEventSource, SessionConfig, SessionController, TurnFailure, TurnOutcome,
    TurnRequest,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, ACCESS_TOKEN_VAR, BACKEND_KEY_VAR};
use crate::render::{render_history_entry, render_message};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    init_logging(&config);

    tracing::info!(
        agent_url = %config.backend.agent_url,
        agent_id = %config.backend.agent_id,
        "starting conduit-chat"
    );

    let persistence = build_persistence(&config)?;
    if let Some(persistence) = &persistence {
        let report = persistence.flush_retry_queue().await;
        if report.attempted > 0 {
            tracing::info!(
                delivered = report.delivered,
                dropped = report.dropped,
                "flushed messages queued by an earlier run"
            );
        }
    }

    let tokens = Arc::new(EnvTokenProvider::new(ACCESS_TOKEN_VAR));
    let source = HttpEventSource::new(&config.backend.agent_url, tokens)?;
    let mut controller =
        SessionController::new(Arc::new(source)).with_config(SessionConfig::from(&config.session));
    if let Some(persistence) = &persistence {
        controller = controller.with_persistence(Arc::clone(persistence));
    }

    let mut thread_id = config.history.resume_thread().map(str::to_string);
    if let (Some(id), Some(persistence)) = (thread_id.as_deref(), &persistence) {
        print_history(persistence, id).await;
    }

    println!(
        "Chatting with {}. /new starts a new thread, /quit exits. Ctrl-C stops a reply, or exits at the prompt.",
        config.backend.agent_id
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        // Reading a line is cancel-safe, so Ctrl-C at the prompt can quit
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                None
            }
        };
        let Some(line) = line else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/quit" => break,
            "/new" => {
                thread_id = None;
                println!("Started a new thread.");
                continue;
            }
            _ => {}
        }

        let mut request = TurnRequest::new(&config.backend.agent_id, line);
        request.thread_id = thread_id.clone();

        match run_turn(&controller, request).await? {
            Ok(outcome) => {
                print!("{}", render_message(&outcome.message));
                thread_id = Some(outcome.thread.thread_id);

                if let Some(persistence) = &persistence {
                    let persistence = Arc::clone(persistence);
                    tokio::spawn(async move {
                        persistence.flush_retry_queue().await;
                    });
                }
            }
            Err(failure) => {
                if let Some(message) = &failure.message {
                    print!("{}", render_message(message));
                    thread_id = Some(failure.thread.thread_id.clone());
                }
                eprintln!("error: {}", failure.error);
            }
        }
    }

    // Saves still in flight would be dropped with the runtime
    controller.wait_for_persistence().await;

    tracing::info!("conduit-chat exiting");
    Ok(())
}

/// Run one turn in the background; Ctrl-C cancels it
async fn run_turn(
    controller: &SessionController,
    request: TurnRequest,
) -> Result<std::result::Result<TurnOutcome, TurnFailure>> {
    let handle = controller.spawn(request);

    let cancel = handle.cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = handle.join.await.context("Session task panicked")?;
    interrupt.abort();
    Ok(result)
}

async fn print_history(persistence: &MessagePersistence, thread_id: &str) {
    match persistence.load_history(thread_id).await {
        Ok(messages) => {
            for message in &messages {
                println!("{}", render_history_entry(message));
            }
        }
        Err(e) => tracing::warn!(thread_id, "Failed to load history: {}", e),
    }
}

fn build_persistence(config: &Config) -> Result<Option<Arc<MessagePersistence>>> {
    let Some(key) = &config.backend_key else {
        tracing::warn!("{} not set, messages will not be persisted", BACKEND_KEY_VAR);
        return Ok(None);
    };

    let mut builder = MessagePersistence::builder()
        .base_url(&config.backend.persistence_url)
        .api_key(key)
        .queue_dir(&config.queue.dir)
        .queue_config(RetryQueueConfig::from(&config.queue));
    if let Some(quota) = config.queue.quota_bytes {
        builder = builder.quota_bytes(quota);
    }

    let persistence = builder.build().context("Failed to build persistence client")?;
    Ok(Some(Arc::new(persistence)))
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // Logs go to stderr so they never interleave with the transcript
    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
