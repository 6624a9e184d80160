//! Mnemo CLI
//!
//! Interactive chat with memory recall, plus administration of the
//! underlying vector store.

use clap::{Parser, Subcommand};
use console::{style, Term};
use dialoguer::{theme::ColorfulTheme, History, Input};
use futures::StreamExt;
use mnemo::agent::{Conversation, GenerationOptions, Message, OpenAiClient};
use mnemo::config::{self, Config};
use mnemo::database::{init_pool, init_pool_for_migrations, migrations};
use mnemo::memory::{open_store, MemoryRecord, NewRecord, Recall};
use mnemo::{Error, Result, VERSION};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::PathBuf;

#[allow(unused_imports)]
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "mnemo",
    author = "Mnemo Contributors",
    version = VERSION,
    about = "Mnemo - retrieval-augmented memory agent",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat with memory recall
    Chat {
        /// Model to use
        #[arg(short, long)]
        model: Option<String>,
        /// Disable memory recall for this session
        #[arg(long)]
        no_memory: bool,
    },

    /// Manage stored memories
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Run database migrations (PostgreSQL backend)
    Migrate,

    /// Check the status of all configured services
    Status,

    /// Test the LLM connection
    TestLlm {
        /// Model to test
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List available models
    Models,

    /// Print a sample environment configuration
    InitConfig,
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Store a memory
    Add {
        /// The text to store
        text: String,
        /// Response metadata to attach
        #[arg(short, long)]
        response: Option<String>,
        /// Collection to store into
        #[arg(short, long)]
        collection: Option<String>,
        /// Explicit record id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },
    /// Search memories by similarity
    Query {
        /// The query text
        text: String,
        /// Number of results
        #[arg(short, long, default_value_t = 5)]
        n: usize,
        /// Collection to search
        #[arg(short, long)]
        collection: Option<String>,
    },
    /// Get a record by id, or all records when no id is given
    Get {
        /// Record id
        id: Option<String>,
        /// Collection to read
        #[arg(short, long)]
        collection: Option<String>,
    },
    /// Show the first records of a collection
    Peek {
        /// Number of records
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// Collection to read
        #[arg(short, long)]
        collection: Option<String>,
    },
    /// Count records in a collection
    Count {
        /// Collection to count
        #[arg(short, long)]
        collection: Option<String>,
    },
    /// Delete a record by id
    Delete {
        /// Record id
        id: String,
        /// Collection to delete from
        #[arg(short, long)]
        collection: Option<String>,
    },
    /// Drop a whole collection
    Drop {
        /// Collection to drop
        #[arg(short, long)]
        collection: Option<String>,
    },
    /// Clear all data (the Qdrant backend requires allow_reset)
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mnemo=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Chat { model, no_memory }) => interactive_chat(model, no_memory).await,
        Some(Commands::Memory { action }) => run_memory_action(action).await,
        Some(Commands::Migrate) => run_migrations().await,
        Some(Commands::Status) => check_status().await,
        Some(Commands::TestLlm { model }) => test_llm(model).await,
        Some(Commands::Models) => list_models().await,
        Some(Commands::InitConfig) => init_config(),
        None => interactive_chat(None, false).await,
    }
}

/// Get the dialoguer theme
fn theme() -> ColorfulTheme {
    ColorfulTheme::default()
}

// ============================================================================
// Input History
// ============================================================================

/// Prompt history persisted to a file in the state directory
struct FileHistory {
    entries: VecDeque<String>,
    path: PathBuf,
}

impl FileHistory {
    fn load(path: PathBuf) -> Self {
        let entries = std::fs::read_to_string(&path)
            .map(|content| {
                content
                    .lines()
                    .rev()
                    .take(500)
                    .map(String::from)
                    .collect::<VecDeque<_>>()
            })
            .unwrap_or_default();

        FileHistory { entries, path }
    }
}

impl<T: ToString> History<T> for FileHistory {
    fn read(&self, pos: usize) -> Option<String> {
        self.entries.get(pos).cloned()
    }

    fn write(&mut self, val: &T) {
        let val = val.to_string();
        self.entries.push_front(val.clone());

        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(mut file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
        {
            let _ = writeln!(file, "{}", val);
        }
    }
}

// ============================================================================
// Interactive Chat
// ============================================================================

/// Interactive chat with streaming rendering and memory recall
async fn interactive_chat(model: Option<String>, no_memory: bool) -> Result<()> {
    let config = Config::from_env()?;
    let openai_config = config
        .provider
        .openai
        .clone()
        .ok_or_else(|| Error::Config("OpenAI not configured. Set OPENAI_API_KEY.".into()))?;
    let client = OpenAiClient::new(openai_config.clone())?;

    let model = model.unwrap_or_else(|| config.agent.model.clone());

    println!();
    println!(
        "{}",
        style("╔══════════════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║              🧠 Mnemo Interactive Chat           ║").cyan()
    );
    println!(
        "{}",
        style("╚══════════════════════════════════════════════════╝").cyan()
    );
    println!();
    println!("   {} Using model: {}", style("✓").green(), style(&model).cyan());

    // Attach memory recall unless disabled; chat still works without it
    let recall = if no_memory {
        None
    } else {
        match open_store(&config).await {
            Ok(store) => {
                println!(
                    "   {} Memory: {} backend",
                    style("✓").green(),
                    style(config.storage.backend).cyan()
                );
                Some(Recall::new(store, config.agent.recall_limit))
            }
            Err(e) => {
                println!("   {} Memory unavailable: {}", style("⚠").yellow(), e);
                None
            }
        }
    };

    println!();
    println!("   {}", style("Commands:").dim());
    println!("   {}  - Exit chat", style("/quit").yellow());
    println!("   {} - Clear conversation history", style("/clear").yellow());
    println!("   {}  - Show this help", style("/help").yellow());
    println!();

    let base_prompt = config.agent.system_prompt.clone();
    let mut conversation = Conversation::new(&model).with_system_prompt(&base_prompt);
    let mut history = FileHistory::load(config::history_path());

    loop {
        let user_input: String = match Input::with_theme(&theme())
            .with_prompt(style("Type to ask").green().bold().to_string())
            .allow_empty(true)
            .history_with(&mut history)
            .interact_text()
        {
            Ok(input) => input,
            // EOF or terminal interrupt ends the session
            Err(_) => break,
        };

        let input = user_input.trim();

        if input.is_empty() {
            continue;
        }

        if input.starts_with('/') {
            match input.to_lowercase().as_str() {
                "/quit" | "/exit" | "/q" => {
                    println!("\n{} Goodbye!\n", style("👋").bold());
                    break;
                }
                "/clear" | "/c" => {
                    conversation.clear();
                    let term = Term::stdout();
                    let _ = term.clear_screen();
                    println!("\n   {} Conversation cleared.\n", style("✓").green());
                    continue;
                }
                "/help" | "/h" | "/?" => {
                    println!();
                    println!("   {}", style("Available Commands:").cyan().bold());
                    println!("   {}  - Exit chat", style("/quit").yellow());
                    println!("   {} - Clear conversation", style("/clear").yellow());
                    println!("   {}  - Show help", style("/help").yellow());
                    println!();
                    continue;
                }
                _ => {
                    println!(
                        "   {} Unknown command. Type {} for help.\n",
                        style("⚠").yellow(),
                        style("/help").cyan()
                    );
                    continue;
                }
            }
        }

        // Recall relevant memories into the system prompt
        if let Some(ref recall) = recall {
            match recall.retrieve(input).await {
                Ok(context) if !context.is_empty() => {
                    conversation.set_system_prompt(format!("{}{}", base_prompt, context));
                }
                Ok(_) => {}
                Err(e) => {
                    println!("   {} Recall failed: {}", style("⚠").yellow(), e);
                }
            }
        }

        conversation.add_user_message(input);

        // Show typing indicator until the first token arrives
        print!("   {} ", style("●●●").dim());
        io::stdout().flush()?;

        match client
            .chat_stream(&model, conversation.get_api_messages(), GenerationOptions::balanced())
            .await
        {
            Ok(mut stream) => {
                let term = Term::stdout();
                let _ = term.clear_line();
                print!("\r   {} ", style(">").cyan().bold());
                io::stdout().flush()?;

                let mut streamed = String::new();
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(delta) => {
                            print!("{}", delta.content);
                            io::stdout().flush()?;
                            streamed.push_str(&delta.content);
                        }
                        Err(e) => {
                            println!("\n   {} Stream error: {}", style("❌").red(), e);
                            break;
                        }
                    }
                }
                println!("\n");

                conversation.add_assistant_message(&streamed);

                if let Some(ref recall) = recall {
                    if let Err(e) = recall.remember(input, &streamed).await {
                        println!("   {} Could not store memory: {}", style("⚠").yellow(), e);
                    }
                }
            }
            Err(e) => {
                let term = Term::stdout();
                let _ = term.clear_line();
                println!("\r   {} Error: {}\n", style("❌").red(), e);
            }
        }
    }

    Ok(())
}

// ============================================================================
// Memory Administration
// ============================================================================

fn print_record(record: &MemoryRecord) {
    println!(
        "   {} {}",
        style(&record.id).cyan(),
        style(record.created_at.to_rfc3339()).dim()
    );
    println!("     Q: {}", record.text);
    if let Some(ref response) = record.response {
        println!("     A: {}", response);
    }
}

async fn run_memory_action(action: MemoryAction) -> Result<()> {
    let config = Config::from_env()?;
    let store = open_store(&config).await?;

    match action {
        MemoryAction::Add {
            text,
            response,
            collection,
            id,
        } => {
            let mut record = NewRecord::new(text);
            if let Some(response) = response {
                record = record.with_response(response);
            }

            let ids = store
                .add(vec![record], collection.as_deref(), id.map(|i| vec![i]))
                .await?;
            println!("{} Stored with id: {}", style("✓").green(), ids[0]);
        }
        MemoryAction::Query { text, n, collection } => {
            let mut results = store
                .query(&[text], collection.as_deref(), n)
                .await?;
            let matches = results.pop().unwrap_or_default();

            if matches.is_empty() {
                println!("{} No matches.", style("ℹ").blue());
            }
            for scored in matches {
                println!("   {} {:.3}", style("score").dim(), scored.score);
                print_record(&scored.record);
            }
        }
        MemoryAction::Get { id, collection } => {
            let records = store.get(collection.as_deref(), id.as_deref()).await?;
            if records.is_empty() {
                println!("{} No records.", style("ℹ").blue());
            }
            for record in &records {
                print_record(record);
            }
        }
        MemoryAction::Peek { limit, collection } => {
            let records = store.peek(collection.as_deref(), limit).await?;
            for record in &records {
                print_record(record);
            }
            println!("\n{} record(s)", records.len());
        }
        MemoryAction::Count { collection } => {
            let count = store.count(collection.as_deref()).await?;
            println!("{}", count);
        }
        MemoryAction::Delete { id, collection } => {
            store.delete(&id, collection.as_deref()).await?;
            println!("{} Deleted {}", style("✓").green(), id);
        }
        MemoryAction::Drop { collection } => {
            store.drop_collection(collection.as_deref()).await?;
            println!("{} Collection dropped.", style("✓").green());
        }
        MemoryAction::Reset { yes } => {
            if !yes {
                let confirmed = dialoguer::Confirm::with_theme(&theme())
                    .with_prompt("This clears all stored memories. Continue?")
                    .default(false)
                    .interact()
                    .map_err(|e| Error::Config(format!("Confirm error: {}", e)))?;
                if !confirmed {
                    println!("{} Cancelled.", style("ℹ").blue());
                    return Ok(());
                }
            }

            store.reset().await?;
            println!("{} Memory reset.", style("✓").green());
        }
    }

    Ok(())
}

// ============================================================================
// Migrations, Status, Diagnostics
// ============================================================================

/// Run database migrations
async fn run_migrations() -> Result<()> {
    println!("Running database migrations...\n");

    let config = Config::from_env()?;
    let postgres = config
        .storage
        .postgres
        .as_ref()
        .ok_or_else(|| Error::Config("PostgreSQL not configured for migrations".into()))?;
    // Use init_pool_for_migrations to skip the pgvector check - migrations will create it
    let pool = init_pool_for_migrations(postgres).await?;

    migrations::run(
        &pool,
        &config.storage.collection,
        config.storage.embedding.dimensions,
    )
    .await?;

    println!("\n✅ Migrations complete!");
    Ok(())
}

/// Check status of all configured services
async fn check_status() -> Result<()> {
    println!("🔍 Mnemo Status\n");

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            println!("❌ Configuration: {}", e);
            return Ok(());
        }
    };

    println!("Configuration: ✅ Loaded");
    println!("  Platform: {}", config.provider.platform);
    println!("  Model: {}", config.agent.model);
    println!("  Memory backend: {}", config.storage.backend);
    println!("  Embedding: {:?}", config.storage.embedding.provider);

    for issue in config::validate_config(&config).errors {
        println!("  ⚠️  {}: {}", issue.path, issue.message);
    }

    // Check LLM platform
    match test_llm_connection(&config).await {
        Ok(_) => println!("LLM platform: ✅ Connected"),
        Err(e) => println!("LLM platform: ❌ {}", e),
    }

    // Check the configured memory backend
    match config.storage.backend {
        config::VectorBackendType::Postgres => match test_database(&config).await {
            Ok(_) => println!("PostgreSQL: ✅ Connected"),
            Err(e) => println!("PostgreSQL: ❌ {}", e),
        },
        config::VectorBackendType::Qdrant => match test_qdrant(&config).await {
            Ok(_) => println!("Qdrant: ✅ Connected"),
            Err(e) => println!("Qdrant: ❌ {}", e),
        },
    }

    Ok(())
}

async fn test_llm_connection(config: &Config) -> Result<()> {
    let openai_config = config
        .provider
        .openai
        .clone()
        .ok_or_else(|| Error::Config("OpenAI not configured".into()))?;
    let client = OpenAiClient::new(openai_config)?;
    client.list_models().await?;
    Ok(())
}

async fn test_database(config: &Config) -> Result<()> {
    let postgres = config
        .storage
        .postgres
        .as_ref()
        .ok_or_else(|| Error::Config("PostgreSQL not configured".into()))?;
    let pool = init_pool(postgres).await?;
    sqlx::query("SELECT 1").execute(&pool).await?;
    Ok(())
}

async fn test_qdrant(config: &Config) -> Result<()> {
    let qdrant = config
        .storage
        .qdrant
        .as_ref()
        .ok_or_else(|| Error::Config("Qdrant not configured".into()))?;
    let client = qdrant_client::Qdrant::from_url(&qdrant.url)
        .skip_compatibility_check()
        .build()
        .map_err(|e| Error::Qdrant(e.to_string()))?;
    client
        .health_check()
        .await
        .map_err(|e| Error::Qdrant(e.to_string()))?;
    Ok(())
}

/// Test LLM connection with a round-trip completion
async fn test_llm(model: Option<String>) -> Result<()> {
    let config = Config::from_env()?;
    let openai_config = config
        .provider
        .openai
        .clone()
        .ok_or_else(|| Error::Config("OpenAI not configured".into()))?;
    let client = OpenAiClient::new(openai_config)?;

    let model = model.unwrap_or(config.agent.model);
    println!("Testing model: {}\n", model);

    let messages = vec![
        Message::system("You are a helpful assistant. Keep responses brief."),
        Message::user("Say 'Hello from Mnemo!' in exactly those words."),
    ];

    let response = client
        .chat_with_model(&model, messages, GenerationOptions::precise())
        .await?;

    if let Some(choice) = response.choices.first() {
        println!("Response: {}", choice.message.content);
    }

    if let Some(usage) = response.usage {
        println!("\nTokens used: {}", usage.total_tokens);
    }

    println!("\n✅ LLM test successful!");
    Ok(())
}

/// List available models
async fn list_models() -> Result<()> {
    let config = Config::from_env()?;
    let openai_config = config
        .provider
        .openai
        .ok_or_else(|| Error::Config("OpenAI not configured".into()))?;
    let client = OpenAiClient::new(openai_config)?;

    println!("\n{}", style("Loading available models...").dim());
    let models = client.list_models().await?;

    let term = Term::stdout();
    let _ = term.clear_last_lines(1);

    println!("   {} models available\n", style(models.len()).green().bold());
    for model in models {
        match model.owned_by {
            Some(owner) => println!("   • {:<40} {}", model.id, style(owner).dim()),
            None => println!("   • {}", model.id),
        }
    }

    Ok(())
}

/// Print sample environment configuration
fn init_config() -> Result<()> {
    let example = include_str!("../../.env.example");
    println!("{}", example);
    Ok(())
}
