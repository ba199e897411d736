//! EduAssist answer engine CLI.
//!
//! Usage:
//!   eduassist ask "explain for loops" --subject python_programming
//!   eduassist index --reset
//!   eduassist stats
//!   eduassist practice dbms

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use eduassist_core::config::{Config, Settings, Strategy};
use eduassist_core::knowledge::SharedKnowledge;
use eduassist_core::practice::{generate_practice_questions, practice_subjects, DEFAULT_TOPIC};
use eduassist_core::subjects::subject_key_for;
use eduassist_embed::get_default_embedder;
use eduassist_keyword::{KeywordMatcher, KeywordSource};
use eduassist_resolver::Resolver;
use eduassist_vector::{VectorIndex, VectorSource};

#[derive(Parser)]
#[command(name = "eduassist", version, about = "EduAssist answer engine")]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a question
    Ask {
        question: String,
        /// Subject key to scope the lookup to
        #[arg(short, long)]
        subject: Option<String>,
        /// Skip the vector index
        #[arg(long)]
        keyword_only: bool,
        /// Print the match result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add knowledge base topics missing from the vector index
    Index {
        /// Empty the index first
        #[arg(long)]
        reset: bool,
    },
    /// Remove every document from the vector index
    Clear,
    /// Show vector index statistics
    Stats,
    /// Print practice questions for a subject
    Practice { subject: String, topic: Option<String> },
    /// Map a course display name to its subject key
    SubjectKey { name: String },
}

async fn open_index(settings: &Settings) -> Result<VectorIndex> {
    let embedder = get_default_embedder()?;
    let uri = settings.vector_uri();
    std::fs::create_dir_all(&uri)?;
    VectorIndex::open(&uri.to_string_lossy(), &settings.vector.table, &settings.vector.cache_table, embedder).await
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(msg.to_string());
    Ok(pb)
}

async fn ask(settings: &Settings, question: &str, subject: Option<String>, keyword_only: bool, json: bool) -> Result<()> {
    let knowledge = Arc::new(SharedKnowledge::open(settings.knowledge_path()));
    let matcher = KeywordMatcher::new(Arc::clone(&knowledge));
    let mut resolver = Resolver::new(matcher.clone()).default_subject(settings.resolver.default_subject.clone());

    let mut index = None;
    if !keyword_only && settings.resolver.strategy == Strategy::Vector {
        match open_index(settings).await {
            Ok(opened) => {
                let opened = Arc::new(opened);
                let pb = spinner("Checking knowledge base for new topics...")?;
                let inserted = opened.refresh(&knowledge.snapshot()).await;
                pb.finish_and_clear();
                if inserted > 0 {
                    println!("Indexed {inserted} new topics");
                }
                let source = VectorSource::new(Arc::clone(&opened), settings.vector.similarity_threshold).with_k(settings.vector.search_k);
                resolver = resolver.with_source(Arc::new(source));
                index = Some(opened);
            }
            Err(e) => tracing::warn!(error = %e, "vector index unavailable, using keyword matching"),
        }
    }
    resolver = resolver.with_source(Arc::new(KeywordSource::new(matcher)));

    let subject = subject.unwrap_or_else(|| settings.resolver.default_subject.clone());
    let resolution = resolver.resolve_detailed(question, &subject).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&resolution.result)?);
    } else {
        println!("{}", resolution.display_text());
        if resolution.is_found() {
            let similarity = resolution.result.similarity.map(|s| format!(", similarity {s:.3}")).unwrap_or_default();
            let via = resolution.source.as_deref().unwrap_or("general override");
            println!("\n({} match via {via}{similarity})", resolution.result.match_type);
        }
    }

    drop(resolver);
    if let Some(index) = index.and_then(|i| Arc::try_unwrap(i).ok()) {
        index.close().await;
    }
    Ok(())
}

async fn index(settings: &Settings, reset: bool) -> Result<()> {
    let knowledge = SharedKnowledge::open(settings.knowledge_path());
    let kb = knowledge.snapshot();
    if kb.is_empty() {
        println!("⚠️  Knowledge base at {} is empty or unreadable", settings.knowledge_path().display());
    }
    let vi = open_index(settings).await?;
    if reset {
        vi.clear().await?;
        println!("🗑️  Cleared {}", vi.table_name());
    }
    let pb = spinner(&format!("Embedding {} topics...", kb.topic_count()))?;
    let inserted = vi.populate(&kb).await?;
    pb.finish_with_message(format!("✅ Added {inserted} documents"));
    let stats = vi.stats().await?;
    println!("📊 {} documents in {} at {}", stats.total_documents, stats.table, stats.uri);
    vi.close().await;
    Ok(())
}

fn practice(subject: &str, topic: Option<&str>) {
    let questions = generate_practice_questions(subject, topic.unwrap_or(DEFAULT_TOPIC));
    for (i, q) in questions.iter().enumerate() {
        println!("{}. {}", i + 1, q);
    }
    if !practice_subjects().any(|s| s == subject) {
        println!("\nSubjects with practice questions: {}", practice_subjects().collect::<Vec<_>>().join(", "));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug,lance=info,lancedb=info" } else { "info,lance=warn,lancedb=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let settings = config.settings()?;

    match cli.command {
        Command::Ask { question, subject, keyword_only, json } => ask(&settings, &question, subject, keyword_only, json).await?,
        Command::Index { reset } => index(&settings, reset).await?,
        Command::Clear => {
            let vi = open_index(&settings).await?;
            vi.clear().await?;
            println!("🗑️  Cleared {}", vi.table_name());
            vi.close().await;
        }
        Command::Stats => {
            let vi = open_index(&settings).await?;
            let stats = vi.stats().await?;
            println!("Table:     {}", stats.table);
            println!("Location:  {}", stats.uri);
            println!("Documents: {}", stats.total_documents);
            vi.close().await;
        }
        Command::Practice { subject, topic } => practice(&subject, topic.as_deref()),
        Command::SubjectKey { name } => println!("{}", subject_key_for(&name)),
    }
    Ok(())
}
