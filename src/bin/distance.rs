use std::io::Write;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use word2vec::Model;

/// number of closest words that will be shown
const N: usize = 40;

#[derive(Parser)]
#[command(about = "Interactive nearest-neighbor queries over a trained model")]
struct Options {
    /// Contains word projections in the BINARY FORMAT.
    #[arg(value_name = "FILE")]
    file_name: PathBuf,
}

fn run(options: Options) -> Result<()> {
    let model = Model::from_bin_file(&options.file_name).context("error loading model")?;
    let searcher = model.for_search();

    let mut line = String::new();
    loop {
        print!("Enter word (EXIT to break): ");
        let _ = std::io::stdout().flush();

        line.clear();
        match std::io::stdin().read_line(&mut line) {
            Err(err) => {
                eprintln!("error reading stdin: {err}");
                break;
            }
            Ok(0) => break,
            Ok(_) => {}
        }
        let word = line.trim();
        if word == "EXIT" {
            break;
        }

        let matches = match searcher.matches(word, N) {
            Ok(matches) => matches,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        println!();
        println!("                                              Word       Cosine distance");
        println!("------------------------------------------------------------------------");
        for m in matches.iter().filter(|m| m.word != word) {
            println!("{:>50}\t\t{:8.6}", m.word, m.distance);
        }
    }
    Ok(())
}

fn main() {
    let options = Options::parse();
    if let Err(err) = run(options) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}
