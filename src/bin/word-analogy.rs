use std::io::Write;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use word2vec::Model;

/// number of closest words that will be shown
const N: usize = 40;

#[derive(Parser)]
#[command(about = "Interactive analogy queries: for A B C, find words near C - A + B")]
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
        print!("Enter three words (EXIT to break): ");
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
        if line.trim() == "EXIT" {
            break;
        }

        let words: Vec<&str> = line.trim().split_whitespace().collect();
        if words.len() != 3 {
            println!(
                "{} words were entered.. three words are needed at the input to perform the calculation",
                words.len()
            );
            continue;
        }

        // difference(a, b) applied to c scores against c - (a - b) = c - a + b.
        let matches = searcher
            .similarity(words[0], words[1])
            .and_then(|diff| diff.matches(words[2], N));
        let matches = match matches {
            Ok(matches) => matches,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        println!();
        println!("                                              Word       Cosine distance");
        println!("------------------------------------------------------------------------");
        for m in matches.iter().filter(|m| !words.contains(&m.word.as_str())) {
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
