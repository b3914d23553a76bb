use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use word2vec::{Model, NetworkType, ProgressListener, Stage, Vocabulary};

#[derive(Parser)]
#[command(about = "WORD VECTOR estimation toolkit", version)]
struct Options {
    /// Use text data from FILE to train the model, one sentence per line
    #[arg(long = "train", value_name = "FILE")]
    train_file: PathBuf,

    /// Use FILE to save the resulting word vectors
    #[arg(long = "output", value_name = "FILE")]
    output_file: PathBuf,

    /// Set size of word vectors; default is 100
    #[arg(long = "size", default_value_t = 100)]
    layer_size: usize,

    /// Set max skip length between words
    #[arg(long, default_value_t = 5)]
    window: usize,

    /// Set threshold for occurrence of words. Those that appear with higher
    /// frequency in the training data will be randomly down-sampled
    #[arg(long, default_value_t = 1e-3)]
    sample: f64,

    /// Use Hierarchical Softmax
    #[arg(long)]
    hs: bool,

    /// Number of negative examples; common values are 3 - 10 (0 = not used)
    #[arg(long, default_value_t = 0)]
    negative: usize,

    /// Use N threads
    #[arg(long = "threads", value_name = "N")]
    num_threads: Option<usize>,

    /// Run more training iterations
    #[arg(long, default_value_t = 5)]
    iter: usize,

    /// Discard words that appear less than N times
    #[arg(long = "min-count", value_name = "N", default_value_t = 5)]
    min_count: u64,

    /// Set the starting learning rate; default is 0.025 for skip-gram and
    /// 0.05 for CBOW
    #[arg(long)]
    alpha: Option<f64>,

    /// Save the resulting vectors in binary mode
    #[arg(long)]
    binary: bool,

    /// The vocabulary will be saved to FILE
    #[arg(long = "save-vocab", value_name = "FILE")]
    save_vocab_file: Option<PathBuf>,

    /// The vocabulary will be read from FILE, not constructed from the
    /// training data
    #[arg(long = "read-vocab", value_name = "FILE")]
    read_vocab_file: Option<PathBuf>,

    /// Use the continuous bag of words model (otherwise, use skip-gram model)
    #[arg(long)]
    cbow: bool,
}

struct BarListener(ProgressBar);

impl ProgressListener for BarListener {
    fn update(&self, stage: Stage, progress: f64) {
        self.0.set_message(stage.to_string());
        self.0.set_position((progress * 1000.0) as u64);
    }
}

fn read_sentences(path: &PathBuf) -> Result<Vec<Vec<String>>> {
    let reader = BufReader::new(File::open(path).context("error opening training data file")?);
    let mut sentences = Vec::new();
    for line in reader.lines() {
        let line = line.context("error reading training data file")?;
        let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if !tokens.is_empty() {
            sentences.push(tokens);
        }
    }
    Ok(sentences)
}

fn run(options: Options) -> Result<()> {
    let sentences = read_sentences(&options.train_file)?;
    println!("Starting training using file {:?}", options.train_file);

    let bar = ProgressBar::new(1000);
    bar.set_style(
        ProgressStyle::with_template("{msg:>24} [{bar:40}] {percent}%")
            .expect("static template"),
    );

    let mut builder = Model::trainer()
        .network_type(if options.cbow {
            NetworkType::Cbow
        } else {
            NetworkType::SkipGram
        })
        .layer_size(options.layer_size)
        .window_size(options.window)
        .down_sample_rate(options.sample)
        .negative_samples(options.negative)
        .iterations(options.iter)
        .min_vocab_frequency(options.min_count)
        .listener(Arc::new(BarListener(bar.clone())));
    if options.hs {
        builder = builder.use_hierarchical_softmax();
    }
    if let Some(alpha) = options.alpha {
        builder = builder.initial_learning_rate(alpha);
    }
    if let Some(n) = options.num_threads {
        builder = builder.num_threads(n);
    }
    if let Some(path) = &options.read_vocab_file {
        let counts = Vocabulary::read_counts(path).context("error reading vocabulary file")?;
        builder = builder.vocab(counts);
    }
    if let Some(path) = &options.save_vocab_file {
        let counts = Vocabulary::count(&sentences);
        Vocabulary::from_counts(counts, options.min_count)
            .save(path)
            .context("error writing vocabulary file")?;
    }

    let model = builder.train(sentences).context("training failed")?;
    bar.finish_and_clear();

    if options.binary {
        model
            .to_bin_file(&options.output_file)
            .context("error writing output file")?;
    } else {
        model
            .to_text_file(&options.output_file)
            .context("error writing output file")?;
    }
    println!(
        "Saved {} vectors of size {} to {:?}",
        model.vocab().len(),
        model.layer_size(),
        options.output_file
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt::init();
    if let Err(err) = run(Options::parse()) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}
