use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;

use tcm_chat::{ChatEngine, EngineConfig};
use tcm_dashscope::DashScopeClient;
use tcm_index::{build_and_persist, BuildConfig, IndexSnapshot};

#[derive(Parser)]
#[command(name = "tcm")]
#[command(about = "RAG-powered traditional Chinese medicine Q&A assistant", long_about = None)]
struct Cli {
    /// Directory holding the persisted index snapshot
    #[arg(long, default_value = "./doc_emb")]
    index: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the index from a corpus of .txt documents
    Build {
        /// Directory containing the corpus
        #[arg(long, default_value = "./data")]
        corpus: PathBuf,
    },
    /// Interactive question answering over the indexed corpus
    Chat,
    /// Ask a single question and print the answer
    Ask { question: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let client = Arc::new(DashScopeClient::from_env()?);

    match cli.command {
        Command::Build { corpus } => {
            println!("{} Building index from {}...", "📚".cyan(), corpus.display());
            let snapshot =
                build_and_persist(&corpus, &cli.index, client.as_ref(), &BuildConfig::default())
                    .await
                    .context("index build failed")?;
            println!(
                "{} Indexed {} chunks into {}",
                "✅".green(),
                snapshot.vectors.len(),
                cli.index.display()
            );
        }
        Command::Chat => {
            let engine = load_engine(&cli.index, client)?;
            run_repl(&engine).await?;
        }
        Command::Ask { question } => {
            let engine = load_engine(&cli.index, client)?;
            match engine.ask("cli", &question).await {
                Ok(answer) => println!("{}", answer),
                Err(e) => {
                    eprintln!("{} {}", "❌".red(), e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn load_engine(
    index_dir: &PathBuf,
    client: Arc<DashScopeClient>,
) -> Result<ChatEngine<DashScopeClient, DashScopeClient>> {
    // A corrupt snapshot aborts startup; serving a partial index is worse
    // than not serving.
    let snapshot = Arc::new(
        IndexSnapshot::load(index_dir)
            .with_context(|| format!("failed to load index from {}", index_dir.display()))?,
    );
    Ok(ChatEngine::new(snapshot, client.clone(), client, EngineConfig::from_env()))
}

async fn run_repl(engine: &ChatEngine<DashScopeClient, DashScopeClient>) -> Result<()> {
    println!("{}", "🐼 中医智能诊疗小助手".green().bold());
    println!("{}", "输入你的中医症状问题，我来帮你辨证～ (exit 退出, reset 清空对话)".dimmed());

    loop {
        print!("{} ", "❓".cyan());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("{}", "👋 再见！".green());
            break;
        }
        if input.eq_ignore_ascii_case("reset") {
            engine.reset_session("repl");
            println!("{}", "🔄 对话已重置".yellow());
            continue;
        }

        match engine.ask("repl", input).await {
            Ok(answer) => println!("{} {}", "💬".green(), answer),
            Err(e) => println!("{} {}", "❌".red(), e),
        }
    }

    Ok(())
}
