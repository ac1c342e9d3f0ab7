/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes four top-level command modules:

- `chat`: Interactive chat session over the WebSocket channel
- `queries`: Print the quick-query catalog
- `status`: Print system status
- `ask`: One-shot question over `POST /chat`

These handlers are intentionally small and use the library components:
the chat client, the API client, the catalog and the status poller.
*/

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::Result;
use crate::render;

// Special commands parser for the chat REPL
pub mod special_commands;

fn api_client(config: &Config) -> Result<ApiClient> {
    ApiClient::new(config.api_base_url()?, config.request_timeout())
}

// Chat command handler
pub mod chat {
    //! Interactive chat handler.
    //!
    //! Keyboard input is read on a dedicated blocking thread and forwarded
    //! over a channel. The async loop selects between that channel and the
    //! chat client's events, so input handling, event handling and output
    //! never run concurrently.

    use super::*;
    use crate::catalog::QuickQueryCatalog;
    use crate::client::{ChatClient, SubmitOutcome};
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::channel::ConnectionState;
    use crate::message::Message;
    use crate::protocol::InboundKind;
    use crate::status::StatusPoller;
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use tokio::sync::mpsc;

    /// What the REPL should do after handling a line
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Flow {
        Continue,
        Exit,
    }

    #[derive(Debug)]
    enum InputEvent {
        Line(String),
        Interrupted,
        Eof,
    }

    /// Start an interactive chat session
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    ///
    /// # Errors
    ///
    /// Returns error only for startup problems such as an unusable URL.
    /// Connection loss and backend errors are reported in the session.
    ///
    /// # Examples
    ///
    /// ```
    /// use opschat::commands::chat;
    /// use opschat::config::Config;
    ///
    /// // In application code:
    /// // chat::run_chat(Config::default()).await?;
    /// ```
    pub async fn run_chat(config: Config) -> Result<()> {
        tracing::info!("Starting interactive chat session");

        let api = api_client(&config)?;
        let client = ChatClient::connect(&config.ws_base_url()?, config.query_options())?;
        let poller = config
            .status
            .enabled
            .then(|| StatusPoller::spawn(api.clone(), config.poll_interval()));

        let mut session = ReplSession::new(client, api, poller);
        session.install_printers();

        print_welcome_banner(&config);
        if let Err(e) = session.catalog.load().await {
            println!("{}", format!("Quick queries unavailable: {}", e).yellow());
        }
        println!("{}", render::connection_banner(ConnectionState::Connecting, None));

        let (input_tx, mut input_rx) = mpsc::unbounded_channel();
        let (ack_tx, ack_rx) = std::sync::mpsc::channel();
        spawn_input_thread(input_tx, ack_rx);

        let mut channel_open = true;
        loop {
            tokio::select! {
                event = session.client.next_event(), if channel_open => {
                    if event.is_none() {
                        channel_open = false;
                    }
                }
                input = input_rx.recv() => match input {
                    Some(InputEvent::Line(line)) => {
                        let flow = session.handle_line(&line).await;
                        let _ = ack_tx.send(());
                        if flow == Flow::Exit {
                            break;
                        }
                    }
                    Some(InputEvent::Interrupted) => {
                        println!("CTRL-C");
                        break;
                    }
                    Some(InputEvent::Eof) | None => {
                        println!("CTRL-D");
                        break;
                    }
                }
            }
        }

        session.shutdown().await;
        println!("Goodbye!");
        Ok(())
    }

    /// Read lines on a blocking thread. After each line the thread waits
    /// for an acknowledgement so the next prompt follows the line's output.
    fn spawn_input_thread(
        tx: mpsc::UnboundedSender<InputEvent>,
        ack: std::sync::mpsc::Receiver<()>,
    ) {
        std::thread::spawn(move || {
            let mut rl = match DefaultEditor::new() {
                Ok(rl) => rl,
                Err(err) => {
                    tracing::error!("Failed to initialize line editor: {:?}", err);
                    let _ = tx.send(InputEvent::Eof);
                    return;
                }
            };

            let prompt = format!("{} ", ">>".cyan().bold());
            loop {
                match rl.readline(&prompt) {
                    Ok(line) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        let _ = rl.add_history_entry(trimmed);
                        if tx.send(InputEvent::Line(trimmed.to_string())).is_err() {
                            break;
                        }
                        if ack.recv().is_err() {
                            break;
                        }
                    }
                    Err(ReadlineError::Interrupted) => {
                        let _ = tx.send(InputEvent::Interrupted);
                        break;
                    }
                    Err(ReadlineError::Eof) => {
                        let _ = tx.send(InputEvent::Eof);
                        break;
                    }
                    Err(err) => {
                        tracing::error!("Readline error: {:?}", err);
                        let _ = tx.send(InputEvent::Eof);
                        break;
                    }
                }
            }
        });
    }

    /// Everything one REPL run owns
    #[derive(Debug)]
    pub struct ReplSession {
        client: ChatClient,
        api: ApiClient,
        catalog: QuickQueryCatalog,
        poller: Option<StatusPoller>,
    }

    impl ReplSession {
        pub fn new(client: ChatClient, api: ApiClient, poller: Option<StatusPoller>) -> Self {
            Self {
                catalog: QuickQueryCatalog::new(api.clone()),
                client,
                api,
                poller,
            }
        }

        pub fn client(&self) -> &ChatClient {
            &self.client
        }

        pub fn catalog_mut(&mut self) -> &mut QuickQueryCatalog {
            &mut self.catalog
        }

        /// Print banners and inbound messages as the client applies them.
        fn install_printers(&mut self) {
            self.client.on_connect(|| {
                println!("{}", render::connection_banner(ConnectionState::Connected, None));
            });
            self.client.on_disconnect(|reason| {
                println!(
                    "{}",
                    render::connection_banner(ConnectionState::Disconnected, reason)
                );
                println!("Messages can no longer be sent. Type '/exit' to leave.");
            });
            for kind in [InboundKind::Response, InboundKind::Error] {
                self.client
                    .on_message(kind, |message| println!("{}", render::format_message(message)));
            }
        }

        /// Handle one line of user input.
        pub async fn handle_line(&mut self, line: &str) -> Flow {
            let command = match parse_special_command(line) {
                Ok(command) => command,
                Err(e) => {
                    println!("{}", e.to_string().red());
                    return Flow::Continue;
                }
            };

            match command {
                SpecialCommand::None => self.submit(line, false).await,
                SpecialCommand::Help => print_help(),
                SpecialCommand::ListQueries => self.list_queries().await,
                SpecialCommand::QuickQuery(n) => {
                    match self.catalog.grouped().nth_query(n).map(|q| q.query.clone()) {
                        Some(query) => self.submit(&query, true).await,
                        None => println!("{}", format!("No quick query #{}", n).yellow()),
                    }
                }
                SpecialCommand::Suggest(n) => {
                    let suggestion = self
                        .client
                        .log()
                        .last_assistant()
                        .and_then(|m| m.suggestions().get(n - 1).cloned());
                    match suggestion {
                        Some(suggestion) => self.submit_suggestion(&suggestion).await,
                        None => println!("{}", format!("No suggestion #{}", n).yellow()),
                    }
                }
                SpecialCommand::ShowStatus => self.show_status().await,
                SpecialCommand::History(last) => {
                    let history = self.history(last);
                    if history.is_empty() {
                        println!("No messages yet");
                    }
                    for message in history {
                        println!("{}", render::format_message(message));
                    }
                }
                SpecialCommand::Export(path) => {
                    let written = self
                        .client
                        .log()
                        .to_json()
                        .and_then(|json| std::fs::write(&path, json).map_err(Into::into));
                    match written {
                        Ok(()) => println!(
                            "Exported {} messages to {}",
                            self.client.log().len(),
                            path.display()
                        ),
                        Err(e) => println!("{}", format!("Export failed: {}", e).red()),
                    }
                }
                SpecialCommand::Exit => return Flow::Exit,
            }
            Flow::Continue
        }

        async fn submit(&mut self, text: &str, echo: bool) {
            let outcome = self.client.submit(text).await;
            self.report_submit(outcome, echo);
        }

        async fn submit_suggestion(&mut self, suggestion: &str) {
            let outcome = self.client.submit_suggestion(suggestion).await;
            self.report_submit(outcome, true);
        }

        /// The whole log, or only its last `last` entries.
        fn history(&self, last: Option<usize>) -> &[Message] {
            let log = self.client.log();
            match last {
                Some(n) => log.since(log.len().saturating_sub(n)),
                None => log.all(),
            }
        }

        fn report_submit(&self, outcome: SubmitOutcome, echo: bool) {
            match outcome {
                SubmitOutcome::Sent if echo => {
                    if let Some(message) = self.client.log().last() {
                        println!("{}", render::format_message(message));
                    }
                }
                SubmitOutcome::Sent | SubmitOutcome::Empty => {}
                SubmitOutcome::Disconnected => {
                    println!("{}", "Not connected; message not sent".red());
                }
                SubmitOutcome::NotSent => {
                    println!("{}", "Connection lost; message not sent".red());
                }
            }
        }

        async fn list_queries(&mut self) {
            if self.catalog.grouped().is_empty() {
                if let Err(e) = self.catalog.load().await {
                    println!("{}", format!("Quick queries unavailable: {}", e).yellow());
                    return;
                }
            }
            let grouped = self.catalog.grouped();
            if grouped.is_empty() {
                println!("No quick queries available");
            } else {
                render::queries_table(grouped).printstd();
            }
        }

        async fn show_status(&self) {
            let latest = self.poller.as_ref().and_then(StatusPoller::latest);
            let status = match latest {
                Some(status) => status,
                None => match self.api.status().await {
                    Ok(status) => status,
                    Err(e) => {
                        println!("{}", format!("Status unavailable: {}", e).yellow());
                        return;
                    }
                },
            };
            println!("{}", render::status_headline(&status));
            println!("{}", render::status_line(Some(&status)));
            render::status_table(&status).printstd();
        }

        /// Stop background work and close the channel.
        pub async fn shutdown(self) {
            if let Some(poller) = self.poller {
                poller.stop().await;
            }
            if let Err(e) = self.client.disconnect().await {
                tracing::warn!("Error while closing chat channel: {}", e);
            }
        }
    }

    fn print_welcome_banner(config: &Config) {
        let options = config.query_options();
        let mut sources = Vec::new();
        if options.include_metrics {
            sources.push("metrics");
        }
        if options.include_logs {
            sources.push("logs");
        }
        if options.include_traces {
            sources.push("traces");
        }

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║              opschat - Observability Chat                    ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Service:    {}", config.api.base_url);
        println!(
            "Sources:    {}",
            if sources.is_empty() {
                "none".to_string()
            } else {
                sources.join(", ")
            }
        );
        println!("Time range: {}\n", options.time_range);
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

}

// Quick-query catalog command handler
pub mod queries {
    //! Print the grouped quick-query catalog.

    use super::*;
    use crate::catalog::QuickQueryCatalog;

    /// Fetch and print the catalog
    ///
    /// # Errors
    ///
    /// Returns error if the catalog cannot be fetched
    pub async fn run_queries(config: &Config, json: bool) -> Result<()> {
        let mut catalog = QuickQueryCatalog::new(api_client(config)?);
        let grouped = catalog.load().await?;

        if json {
            println!("{}", serde_json::to_string_pretty(grouped)?);
        } else if grouped.is_empty() {
            println!("No quick queries available");
        } else {
            render::queries_table(grouped).printstd();
        }
        Ok(())
    }
}

// System status command handler
pub mod status {
    //! Print the aggregated health of the platform's services.

    use super::*;

    /// Fetch and print `/status`
    ///
    /// # Errors
    ///
    /// Returns error if the status cannot be fetched
    pub async fn run_status(config: &Config, json: bool) -> Result<()> {
        let status = api_client(config)?.status().await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            println!("{}", render::status_headline(&status));
            render::status_table(&status).printstd();
        }
        Ok(())
    }
}

// One-shot question handler
pub mod ask {
    //! Ask one question over `POST /chat` without opening a channel.

    use super::*;
    use crate::message::Message;
    use crate::protocol::{parse_timestamp, ChatRequest};
    use crate::session::create_session_id;

    /// Send `message` and print the reply
    ///
    /// # Errors
    ///
    /// Returns error if the service is unreachable or rejects the request
    pub async fn run_ask(config: &Config, message: &str, json: bool) -> Result<()> {
        let message = message.trim();
        if message.is_empty() {
            anyhow::bail!("Message cannot be empty");
        }

        let session_id = create_session_id();
        let request = ChatRequest::new(message, &session_id, &config.query_options());
        let reply = api_client(config)?.chat(&request).await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&reply)?);
            return Ok(());
        }

        let timestamp = parse_timestamp(&reply.timestamp).unwrap_or_else(chrono::Utc::now);
        let answer = Message::assistant(
            reply.response,
            timestamp,
            reply.metadata,
            reply.suggestions.unwrap_or_default(),
        );
        println!("{}", render::format_message(&answer));
        Ok(())
    }
}
