use genai_core::ai::ChatSession;
use genai_core::containers::Container;
use tracing::warn;

use crate::provision::{model_client, terminate_all, Cleanup, CliResult, Connection, CHAT_MODEL};

pub async fn run(connection: &Connection) -> CliResult<()> {
    let mut cleanup = Cleanup::new(connection.keep_containers);
    let client = match model_client(connection, CHAT_MODEL, &mut cleanup).await {
        Ok(client) => client,
        Err(e) => return cleanup.finish(Err(e)).await,
    };

    // stdin is read on this task, the interrupt is caught on another one
    let listener = tokio::spawn(interrupt_listener(cleanup.containers(), connection.keep_containers));

    println!("Chat session {}", console::style("- type quit, exit or bye to end it").dim());
    let mut session = ChatSession::new(client);
    let result = session
        .run(tokio::io::BufReader::new(tokio::io::stdin()), &mut std::io::stdout())
        .await
        .map_err(Into::into);

    listener.abort();
    cleanup.finish(result).await
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await
}

async fn interrupt_listener(containers: Vec<Container>, keep: bool) {
    if let Err(e) = shutdown_signal().await {
        warn!("cannot listen for interrupts: {}", e);
        return;
    }
    println!("\nInterrupt signal received, ending chat session");
    terminate_all(&containers, keep).await;
    std::process::exit(0);
}
