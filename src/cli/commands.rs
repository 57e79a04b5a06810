// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `stats` and
// `attribute`, and all their configurable flags.

use clap::{Args, Subcommand, ValueEnum};

use crate::application::train_use_case::TrainConfig;
use crate::domain::training::MonitorMetric;
use crate::infra::device::{DeviceKind, ExecutionConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune the classifier and report on the held-out split
    Train(TrainArgs),

    /// Load and filter the corpus, then print per-author counts
    Stats(StatsArgs),

    /// Predict the author of a source file with a trained checkpoint
    Attribute(AttributeArgs),
}

/// `--monitor` values; mirrors `MonitorMetric`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorArg {
    EvalLoss,
    Accuracy,
    WeightedF1,
}

impl From<MonitorArg> for MonitorMetric {
    fn from(arg: MonitorArg) -> Self {
        match arg {
            MonitorArg::EvalLoss   => Self::EvalLoss,
            MonitorArg::Accuracy   => Self::Accuracy,
            MonitorArg::WeightedF1 => Self::WeightedF1,
        }
    }
}

/// Where the corpus lives and which rows survive.
#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    /// CSV file with one code snippet per row
    #[arg(long, default_value = "data/corpus.csv")]
    pub data: String,

    #[arg(long, default_value = "code")]
    pub code_column: String,

    /// Column holding the author id
    #[arg(long, default_value = "user_id")]
    pub author_column: String,

    #[arg(long, default_value = "newline_count")]
    pub newline_column: String,

    /// Keep rows with strictly more newlines than this
    #[arg(long, default_value_t = 2)]
    pub min_newlines: i64,

    /// Keep authors with strictly more surviving samples than this
    #[arg(long, default_value_t = 10)]
    pub min_author_support: usize,
}

/// Device selection, shared by `train` and `attribute`.
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    #[arg(long, value_enum, default_value_t = DeviceKind::Auto)]
    pub device: DeviceKind,

    /// Comma-separated device indices; only the first one is used
    #[arg(long, value_delimiter = ',')]
    pub visible_devices: Vec<usize>,
}

impl From<DeviceArgs> for ExecutionConfig {
    fn from(a: DeviceArgs) -> Self {
        ExecutionConfig { device: a.device, visible_devices: a.visible_devices }
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Receives metrics.csv, misclassified.json and checkpoints/
    #[arg(long, default_value = "output")]
    pub output_dir: String,

    /// Directory with tokenizer.json and optional pretrained encoder weights.
    /// A word-level tokenizer is built here when none exists.
    #[arg(long, default_value = "model")]
    pub model_dir: String,

    /// Share of each author's samples held out for the final report
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Share of the train part held out for evaluation during training.
    /// 0 evaluates on the test split.
    #[arg(long, default_value_t = 0.0)]
    pub eval_fraction: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Every snippet is truncated or padded to this many tokens
    #[arg(long, default_value_t = 512)]
    pub max_seq_len: usize,

    /// Upper bound on the vocabulary of a freshly built tokenizer
    #[arg(long, default_value_t = 30522)]
    pub vocab_size: usize,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 16)]
    pub eval_batch_size: usize,

    #[arg(long, default_value_t = 2e-4)]
    pub lr: f64,

    #[arg(long, default_value_t = 0.01)]
    pub weight_decay: f64,

    /// Evaluate and checkpoint every n steps (0 = once per epoch)
    #[arg(long, default_value_t = 0)]
    pub eval_steps: usize,

    /// Most recent checkpoints kept on disk besides the best one (0 = all)
    #[arg(long, default_value_t = 2)]
    pub save_total_limit: usize,

    /// Metric that picks the best checkpoint and drives early stopping
    #[arg(long, value_enum, default_value_t = MonitorArg::WeightedF1)]
    pub monitor: MonitorArg,

    /// Evaluations without improvement before stopping (0 = never stop early)
    #[arg(long, default_value_t = 3)]
    pub patience: usize,

    #[arg(long, default_value_t = 0.0)]
    pub min_delta: f64,

    /// Hidden size of a freshly initialised encoder
    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    /// d_model must be divisible by num_heads
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// DataLoader worker threads
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    #[command(flatten)]
    pub execution: DeviceArgs,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_path:          a.corpus.data,
            output_dir:         a.output_dir,
            model_dir:          a.model_dir,
            code_column:        a.corpus.code_column,
            author_column:      a.corpus.author_column,
            newline_column:     a.corpus.newline_column,
            min_newlines:       a.corpus.min_newlines,
            min_author_support: a.corpus.min_author_support,
            test_fraction:      a.test_fraction,
            eval_fraction:      a.eval_fraction,
            seed:               a.seed,
            max_seq_len:        a.max_seq_len,
            vocab_size:         a.vocab_size,
            epochs:             a.epochs,
            batch_size:         a.batch_size,
            eval_batch_size:    a.eval_batch_size,
            lr:                 a.lr,
            weight_decay:       a.weight_decay,
            eval_steps:         a.eval_steps,
            save_total_limit:   a.save_total_limit,
            patience:           a.patience,
            min_delta:          a.min_delta,
            monitor:            a.monitor.into(),
            d_model:            a.d_model,
            num_heads:          a.num_heads,
            num_layers:         a.num_layers,
            d_ff:               a.d_ff,
            dropout:            a.dropout,
            num_workers:        a.num_workers,
            execution:          a.execution.into(),
        }
    }
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,
}

impl From<StatsArgs> for TrainConfig {
    fn from(a: StatsArgs) -> Self {
        TrainConfig {
            data_path:          a.corpus.data,
            code_column:        a.corpus.code_column,
            author_column:      a.corpus.author_column,
            newline_column:     a.corpus.newline_column,
            min_newlines:       a.corpus.min_newlines,
            min_author_support: a.corpus.min_author_support,
            ..TrainConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct AttributeArgs {
    /// Source file to attribute
    #[arg(long)]
    pub file: String,

    /// Checkpoint directory written by `train` ({output_dir}/checkpoints)
    #[arg(long, default_value = "output/checkpoints")]
    pub checkpoint_dir: String,

    /// Number of candidate authors to print
    #[arg(long, default_value_t = 3)]
    pub top_k: usize,

    #[command(flatten)]
    pub execution: DeviceArgs,
}
