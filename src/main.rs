use anyhow::{Context, Result, bail};
use clap::Parser;
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use regen::{Config, Operation, Settings, SourceMatcher, compile, parse_tree};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Generator pattern
    #[arg(value_name = "GENERATOR")]
    generator: String,

    /// File whose lines are the ranges to replace (default: stdin)
    #[arg(value_name = "FILE")]
    file: Option<String>,

    /// Pattern matched against each range to supply {{n}} groups
    #[arg(short = 'o', long, value_name = "REGEX", default_value = ".*")]
    original: String,

    /// Base alphabet char spec, e.g. "a-z" (repeatable)
    #[arg(long, value_name = "SPEC")]
    base: Vec<String>,

    /// Whitespace alphabet char spec (repeatable)
    #[arg(long, value_name = "SPEC")]
    whitespace: Vec<String>,

    /// Digit alphabet char spec (repeatable)
    #[arg(long, value_name = "SPEC")]
    digit: Vec<String>,

    /// Word alphabet char spec (repeatable)
    #[arg(long, value_name = "SPEC")]
    word: Vec<String>,

    /// Repetition limit for *, + and {n,}
    #[arg(short = 'u', long, default_value_t = 10)]
    upper_bound: usize,

    /// Seed for reproducible output
    #[arg(short = 's', long)]
    seed: Option<u64>,

    /// Generate this many ranges without reading input
    #[arg(short = 'n', long, conflicts_with = "file")]
    count: Option<usize>,

    /// Print the parse tree of the generator pattern and exit
    #[arg(long)]
    tree: bool,
}

impl Args {
    fn settings(&self) -> Settings {
        fn or_default(specs: &[String], default: Vec<String>) -> Vec<String> {
            if specs.is_empty() {
                default
            } else {
                specs.to_vec()
            }
        }
        let defaults = Settings::default();
        Settings {
            base_charset: or_default(&self.base, defaults.base_charset),
            whitespace_charset: or_default(&self.whitespace, defaults.whitespace_charset),
            digit_charset: or_default(&self.digit, defaults.digit_charset),
            word_charset: or_default(&self.word, defaults.word_charset),
            upper_bound: self.upper_bound,
        }
    }
}

fn read_ranges(file: Option<&str>) -> Result<Vec<String>> {
    let contents = match file {
        Some(path) => fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?,
        None => {
            let mut contents = String::new();
            io::stdin()
                .read_to_string(&mut contents)
                .context("Failed to read stdin")?;
            contents
        }
    };
    Ok(contents.lines().map(str::to_string).collect())
}

/// Returns whether every range generated successfully.
fn run(args: &Args) -> Result<bool> {
    if args.tree {
        print!("{}", parse_tree(&args.generator)?);
        return Ok(true);
    }

    let config = Config::new(&args.settings());
    if config.base().is_empty() {
        bail!("The base alphabet is empty");
    }
    let mut generator = compile(&args.generator, &config)?;
    if let Some(seed) = args.seed {
        generator.reseed(seed);
    }

    let mut ok = true;
    if let Some(count) = args.count {
        for index in 0..count {
            generator.set_range_context(index, Vec::new());
            match generator.generate() {
                Ok(text) => println!("{text}"),
                Err(err) => {
                    eprintln!("{err}");
                    ok = false;
                }
            }
        }
        return Ok(ok);
    }

    let originals = read_ranges(args.file.as_deref())?;
    let mut operation = Operation::new(generator, SourceMatcher::new(&args.original)?);
    for (outcome, original) in operation.run(&originals).iter().zip(&originals) {
        println!("{}", outcome.text_or(original));
        if let Some(err) = outcome.error() {
            eprintln!("{err}");
            ok = false;
        }
    }
    Ok(ok)
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}
