use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use promptforge_common::{Config, GeneticConfig, ProgressEvent, ProgressSink};
use promptforge_evolve::{EngineDeps, EvolutionEngine};
use promptforge_llm::{CharBudget, ClaudeGenerator, ClaudeJudge, HeuristicLint};

#[derive(Parser, Debug)]
#[command(name = "promptforge", about = "Evolve a prompt from a seed intent")]
struct Cli {
    /// The intent every candidate prompt is grown from.
    seed_intent: String,

    #[arg(long, default_value = "general")]
    domain: String,

    /// Framework tag, or "auto" to rotate the diversity pool.
    #[arg(long, default_value = "auto")]
    framework: String,

    #[arg(long, default_value = "en")]
    language: String,

    #[arg(long, default_value_t = 8)]
    population: usize,

    #[arg(long, default_value_t = 10)]
    generations: u32,

    #[arg(long, default_value_t = 0.3)]
    mutation_rate: f64,

    #[arg(long, default_value_t = 0.7)]
    crossover_rate: f64,

    #[arg(long, default_value_t = 2)]
    elitism: usize,

    #[arg(long, default_value_t = 3)]
    tournament: usize,

    /// Delay between generator calls, for provider rate limits.
    #[arg(long, default_value_t = 500)]
    delay_ms: u64,

    /// Seed the run's random source for a reproducible decision sequence.
    #[arg(long)]
    rng_seed: Option<u64>,
}

/// Logs each phase transition; never blocks, never touches the algorithm.
struct LogSink;

impl ProgressSink for LogSink {
    fn emit(&self, event: ProgressEvent) {
        info!(
            kind = ?event.kind,
            generation = event.generation,
            progress = format!("{:.0}%", event.progress),
            "{}",
            event.detail
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("promptforge=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    let genetic = GeneticConfig::builder()
        .seed_intent(cli.seed_intent)
        .domain_id(cli.domain)
        .framework(cli.framework)
        .language(cli.language)
        .population_size(cli.population)
        .max_generations(cli.generations)
        .mutation_rate(cli.mutation_rate)
        .crossover_rate(cli.crossover_rate)
        .elitism_count(cli.elitism)
        .tournament_size(cli.tournament)
        .generator_delay_ms(cli.delay_ms)
        .rng_seed(cli.rng_seed)
        .build();

    let deps = EngineDeps::new(
        Arc::new(ClaudeGenerator::new(&config.anthropic_api_key, &config.claude_model)),
        Arc::new(ClaudeJudge::new(&config.anthropic_api_key, &config.claude_model)),
        Arc::new(HeuristicLint::new()),
        Arc::new(CharBudget::new()),
    )
    .with_sink(Arc::new(LogSink));

    let engine = EvolutionEngine::new(genetic, deps)?;
    let result = engine.run().await?;

    info!("{result}");
    println!("{}", result.best_individual_ever.text);

    Ok(())
}
