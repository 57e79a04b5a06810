// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and prints results. All business
// logic is delegated to Layer 2 (application).
//
//   1. `train`    : filter, split, fine-tune, report
//   2. `stats`    : corpus counts after filtering
//   3. `attribute`: most likely authors of one source file

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{AttributeArgs, Commands, StatsArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "code-authorship",
    version,
    about = "Fine-tune a transformer to attribute code snippets to their authors."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route to the matching use case; never computes anything itself.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)     => run_train(args),
            Commands::Stats(args)     => run_stats(args),
            Commands::Attribute(args) => run_attribute(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on corpus: {}", args.corpus.data);

    let summary = TrainUseCase::new(args.into()).execute()?;
    let outcome = &summary.outcome;

    println!(
        "Trained {} authors on {} samples ({} eval): {} steps, {} evaluations{}",
        summary.authors,
        summary.train_samples,
        summary.eval_samples,
        outcome.total_steps,
        outcome.history.len(),
        if outcome.stopped_early { ", stopped early" } else { "" }
    );
    if let Some(best) = &outcome.best {
        println!(
            "Best checkpoint: step {} (epoch {}), eval weighted F1 {:.4}",
            best.step, best.epoch, best.weighted_f1
        );
    }
    let metrics = &summary.test_metrics;
    println!("Accuracy:    {:.4} ({}/{})", metrics.accuracy, metrics.correct, metrics.total);
    println!("Weighted F1: {:.4}", metrics.weighted_f1);
    println!(
        "Misclassified {} of {} test samples → {}",
        summary.misclassified,
        summary.test_samples,
        summary.report_path.display()
    );
    Ok(())
}

fn run_stats(args: StatsArgs) -> Result<()> {
    use crate::application::stats_use_case::StatsUseCase;

    let stats = StatsUseCase::new(args.into()).execute()?;

    println!("Rows read: {}, kept: {}", stats.rows_read, stats.rows_kept);
    println!("Authors after filtering: {}", stats.authors.len());
    for (author, count) in &stats.authors {
        println!("  {:<24} {:>6}", author, count);
    }
    Ok(())
}

fn run_attribute(args: AttributeArgs) -> Result<()> {
    use crate::application::attribute_use_case::AttributeUseCase;

    let use_case = AttributeUseCase::new(&args.checkpoint_dir, &args.execution.into())?;
    let ranked   = use_case.attribute_file(&args.file, args.top_k)?;

    println!("\n{}:", args.file);
    for (rank, (author, prob)) in ranked.iter().enumerate() {
        println!("  {}. {:<24} {:>6.2}%", rank + 1, author, prob * 100.0);
    }
    Ok(())
}
