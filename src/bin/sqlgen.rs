//! One-shot natural-language → SQL proof of concept
//!
//! Loads the JSON config, opens a warehouse session, renders a one-shot
//! prompt template, calls the hosted LLM, and executes the produced SQL
//! string verbatim against the session. No validation or retry.

use anyhow::{bail, Context, Result};
use clap::Parser;
use console::style;
use dialoguer::{theme::ColorfulTheme, Select};
use handlebars::Handlebars;
use mnemo::agent::{GenerationOptions, Message, OpenAiClient};
use mnemo::config::Config;
use secrecy::ExposeSecret;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Column, Row};
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "mnemo-sqlgen",
    version = mnemo::VERSION,
    about = "Generate and run SQL from a natural-language request",
    long_about = None
)]
struct Cli {
    /// What to ask the warehouse
    #[arg(default_value = "Show the five most recent records from the memory table")]
    prompt: String,

    /// Config file path override
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

const SQL_PROMPT_TEMPLATE: &str = "\
You play as a professional data scientist. You are currently in the data \
engineering stage. You will understand the user's input and generate a SQL \
query for a PostgreSQL warehouse. Reply with the SQL only. Do not add ; at \
the end of the query.

The user's input description is: {{input}}
The SQL query generated is:";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mnemo=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    println!("Welcome to mnemo-sqlgen!");
    println!("You are currently in the data engineering stage.\n");

    // Data store selection; only PostgreSQL is wired up
    let stores = ["PostgreSQL", "Snowflake", "Databricks"];
    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Choose a data store")
        .items(&stores)
        .default(0)
        .interact()
        .context("data store selection failed")?;

    if choice != 0 {
        bail!("{} support is not wired up yet", stores[choice]);
    }

    let config = match cli.config {
        Some(path) => mnemo::config::load_config_from_path(&path)?,
        None => Config::from_env()?,
    };

    let warehouse = config
        .warehouse
        .as_ref()
        .context("warehouse not configured: set WAREHOUSE_URL or warehouse.url")?;
    let openai = config
        .provider
        .openai
        .clone()
        .context("OpenAI not configured: set OPENAI_API_KEY")?;

    // Open the warehouse session
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(warehouse.connect_timeout_secs))
        .connect(warehouse.url.expose_secret())
        .await
        .context("failed to open warehouse session")?;

    // Prompt template → hosted LLM → string parser
    let mut handlebars = Handlebars::new();
    handlebars
        .register_template_string("sql_agent", SQL_PROMPT_TEMPLATE)
        .context("invalid prompt template")?;
    let prompt = handlebars.render("sql_agent", &serde_json::json!({ "input": cli.prompt }))?;

    let client = OpenAiClient::new(openai)?;
    let response = client
        .chat(vec![Message::user(prompt)], GenerationOptions::precise())
        .await?;

    let raw = &response
        .choices
        .first()
        .context("empty completion response")?
        .message
        .content;
    let sql = parse_sql(raw);

    println!("\n{}", style("Generated SQL:").bold());
    println!("{}\n", style(&sql).cyan());

    // Execute verbatim; warehouse errors pass through
    let rows = sqlx::query(&sql).fetch_all(&pool).await?;
    print_rows(&rows);

    Ok(())
}

/// Output parsing: strip whitespace, code fences, and a trailing semicolon
fn parse_sql(raw: &str) -> String {
    let mut sql = raw.trim();

    if let Some(stripped) = sql.strip_prefix("```sql") {
        sql = stripped;
    } else if let Some(stripped) = sql.strip_prefix("```") {
        sql = stripped;
    }
    if let Some(stripped) = sql.strip_suffix("```") {
        sql = stripped;
    }

    sql.trim().trim_end_matches(';').trim().to_string()
}

/// Render result rows with column headers
fn print_rows(rows: &[PgRow]) {
    let Some(first) = rows.first() else {
        println!("{} 0 rows", style("ℹ").blue());
        return;
    };

    let headers: Vec<&str> = first.columns().iter().map(|c| c.name()).collect();
    println!("{}", style(headers.join(" │ ")).bold());

    for row in rows {
        let values: Vec<String> = (0..row.columns().len())
            .map(|i| format_value(row, i))
            .collect();
        println!("{}", values.join(" │ "));
    }

    println!("\n{} row(s)", rows.len());
}

/// Decode a column value as a display string, trying common warehouse types
fn format_value(row: &PgRow, idx: usize) -> String {
    macro_rules! try_type {
        ($ty:ty) => {
            if let Ok(value) = row.try_get::<Option<$ty>, _>(idx) {
                return value
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "NULL".to_string());
            }
        };
    }

    try_type!(String);
    try_type!(i64);
    try_type!(i32);
    try_type!(f64);
    try_type!(bool);
    try_type!(uuid::Uuid);

    if let Ok(value) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
        return value
            .map(|v| v.to_rfc3339())
            .unwrap_or_else(|| "NULL".to_string());
    }

    "?".to_string()
}

#[cfg(test)]
mod tests {
    use super::parse_sql;

    #[test]
    fn test_parse_sql_trims_semicolon() {
        assert_eq!(parse_sql("SELECT 1;"), "SELECT 1");
        assert_eq!(parse_sql("  SELECT 1  "), "SELECT 1");
    }

    #[test]
    fn test_parse_sql_strips_code_fences() {
        assert_eq!(
            parse_sql("```sql\nSELECT * FROM memory\n```"),
            "SELECT * FROM memory"
        );
        assert_eq!(parse_sql("```\nSELECT 1\n```"), "SELECT 1");
    }

    #[test]
    fn test_parse_sql_passes_plain_queries_through() {
        assert_eq!(
            parse_sql("SELECT id FROM memory LIMIT 5"),
            "SELECT id FROM memory LIMIT 5"
        );
    }
}
