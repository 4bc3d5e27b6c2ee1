use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use common::catalog::Catalog;
use common::executor::{DatabaseConfig, MySqlExecutor};
use common::llm::watsonx::{DEFAULT_MODEL_ID, DEFAULT_URL};
use common::llm::{WatsonxClient, WatsonxConfig};
use common::{FinalReport, LoopConfig, LoopController};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "txt2sql")]
#[command(about = "answer questions about the manufacturing database with validated sql", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate, run and validate SQL for one or more questions
    Ask {
        /// Natural-language questions, answered concurrently
        #[arg(required = true)]
        questions: Vec<String>,

        #[command(flatten)]
        catalog: CatalogArgs,

        #[command(flatten)]
        watsonx: WatsonxArgs,

        #[command(flatten)]
        database: DatabaseArgs,

        /// Print reports as JSON
        #[arg(long, default_value = "false")]
        json: bool,

        /// Time limit in seconds for each model and database call
        #[arg(long, env = "TXT2SQL_CALL_TIMEOUT_SECS")]
        call_timeout_secs: Option<u64>,
    },

    /// Print the table metadata exactly as it is embedded in prompts
    Catalog {
        #[command(flatten)]
        catalog: CatalogArgs,
    },
}

#[derive(Args)]
struct CatalogArgs {
    /// Catalog JSON file (default: built-in chemical manufacturing catalog)
    #[arg(long, env = "TXT2SQL_METADATA")]
    metadata: Option<PathBuf>,
}

#[derive(Args)]
struct WatsonxArgs {
    /// IBM Cloud API key
    #[arg(long, env = "APIKEY", hide_env_values = true)]
    api_key: String,

    /// watsonx.ai project id
    #[arg(long, env = "PROJECT_ID")]
    project_id: String,

    /// watsonx.ai regional endpoint
    #[arg(long, env = "WATSONX_URL", default_value = DEFAULT_URL)]
    watsonx_url: String,

    /// Model used for both generation and validation
    #[arg(long, env = "WATSONX_MODEL_ID", default_value = DEFAULT_MODEL_ID)]
    model_id: String,

    /// Maximum tokens per model response
    #[arg(long, default_value = "3000")]
    max_new_tokens: u32,
}

#[derive(Args)]
struct DatabaseArgs {
    #[arg(long, env = "MYSQL_HOST", default_value = "localhost")]
    mysql_host: String,

    #[arg(long, env = "MYSQL_PORT", default_value = "3306")]
    mysql_port: u16,

    #[arg(long, env = "MYSQL_USER", default_value = "root")]
    mysql_user: String,

    #[arg(long, env = "MYSQL_PASS", default_value = "", hide_env_values = true)]
    mysql_pass: String,

    #[arg(long, env = "MYSQL_DB")]
    mysql_db: String,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let _guard = common::tracing::init_tracing("txt2sql")?;

        match self.command {
            Commands::Ask {
                questions,
                catalog,
                watsonx,
                database,
                json,
                call_timeout_secs,
            } => ask(questions, catalog, watsonx, database, json, call_timeout_secs).await,
            Commands::Catalog { catalog } => {
                let catalog = load_catalog(&catalog)?;
                println!("{}", catalog.to_prompt_json());
                Ok(())
            }
        }
    }
}

fn load_catalog(args: &CatalogArgs) -> Result<Catalog> {
    let catalog = match &args.metadata {
        Some(path) => {
            tracing::info!("loading catalog from {}", path.display());
            Catalog::load(path)?
        }
        None => Catalog::builtin()?,
    };

    tracing::info!(tables = catalog.tables().len(), "catalog ready");
    Ok(catalog)
}

async fn ask(
    questions: Vec<String>,
    catalog: CatalogArgs,
    watsonx: WatsonxArgs,
    database: DatabaseArgs,
    json: bool,
    call_timeout_secs: Option<u64>,
) -> Result<()> {
    let catalog = Arc::new(load_catalog(&catalog)?);

    let mut generator_config = WatsonxConfig::new(watsonx.api_key, watsonx.project_id);
    generator_config.url = watsonx.watsonx_url;
    generator_config.model_id = watsonx.model_id;
    generator_config.max_new_tokens = watsonx.max_new_tokens;
    let generator = Arc::new(WatsonxClient::new(generator_config)?);

    let executor = Arc::new(MySqlExecutor::new(&DatabaseConfig {
        host: database.mysql_host,
        port: database.mysql_port,
        user: database.mysql_user,
        password: database.mysql_pass,
        database: database.mysql_db,
    }));

    let config = LoopConfig {
        call_timeout: call_timeout_secs.map(Duration::from_secs),
    };

    let controller = LoopController::new(generator, executor, catalog, config);

    tracing::info!(count = questions.len(), "running agentic sql workflow");
    let reports = controller.answer_all(questions.clone()).await;

    for (question, report) in questions.iter().zip(&reports) {
        if json {
            print_json(question, report)?;
        } else {
            print_report(question, report)?;
        }
    }

    Ok(())
}

fn print_json(question: &str, report: &FinalReport) -> Result<()> {
    let mut value = serde_json::to_value(report)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("question".to_string(), question.into());
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_report(question: &str, report: &FinalReport) -> Result<()> {
    let banner = "=".repeat(30);

    println!("\nQUESTION: {}", question);
    println!("\n{}\n GENERATED SQL QUERY\n{}", banner, banner);
    println!("{}", report.sql_query);
    println!("\n{}\n SQL EXECUTION RESULT\n{}", banner, banner);
    println!("{}", serde_json::to_string_pretty(&report.sql_result)?);
    println!("\n{}\n VALIDATION STATUS\n{}", banner, banner);
    println!("Valid: {}", report.valid);
    println!("Attempts: {}", report.attempts);
    println!("Issues: {:?}", report.issues);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_catalog_subcommand_parses_without_credentials() {
        let cli = Cli::try_parse_from(["txt2sql", "catalog"]).unwrap();
        assert!(matches!(cli.command, Commands::Catalog { .. }));
    }

    #[test]
    fn test_ask_parses_questions_and_flags() {
        let cli = Cli::try_parse_from([
            "txt2sql",
            "ask",
            "What is the stock of CH-001?",
            "Which raw materials are short?",
            "--api-key",
            "key",
            "--project-id",
            "project",
            "--mysql-db",
            "chem",
            "--json",
            "--call-timeout-secs",
            "45",
        ])
        .unwrap();

        match cli.command {
            Commands::Ask {
                questions,
                json,
                call_timeout_secs,
                database,
                ..
            } => {
                assert_eq!(questions.len(), 2);
                assert!(json);
                assert_eq!(call_timeout_secs, Some(45));
                assert_eq!(database.mysql_db, "chem");
                assert_eq!(database.mysql_port, 3306);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_load_builtin_catalog() {
        let catalog = load_catalog(&CatalogArgs { metadata: None }).unwrap();
        assert!(catalog.table("opt_scenario").is_some());
    }
}
