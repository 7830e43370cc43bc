use clap::Parser;
use exitintel::aggregate::{compute_aggregates, filter_department, render_dashboard, render_record};
use exitintel::cli::{Cli, Command, CorpusArgs};
use exitintel::config::{load_config, ExitIntelConfig};
use exitintel::context::build_context_prompt;
use exitintel::corpus::{load_corpus, lookup_record};
use exitintel::{analyze, chat, metrics, serve, ExitIntelError};
use std::path::PathBuf;
use std::process::ExitCode;

fn corpus_path(args: &CorpusArgs, config: &ExitIntelConfig) -> PathBuf {
    args.corpus.clone().unwrap_or_else(|| config.insights.corpus.clone())
}

fn run() -> Result<(), ExitIntelError> {
    let cli = Cli::parse();
    let config = load_config()?;

    match cli.command {
        Command::Analyze(args) => {
            let input = args.input.unwrap_or_else(|| config.analysis.input.clone());
            let output = args.output.unwrap_or_else(|| config.analysis.output.clone());
            let concurrency = args.concurrency.unwrap_or(config.analysis.concurrency);
            let provider = metrics::init_meter_provider(&config.metrics);
            let result = analyze::handle_analyze(&config, &input, &output, concurrency);
            metrics::shutdown(provider);
            result
        }
        Command::Dashboard(args) => {
            let corpus = load_corpus(&corpus_path(&args.corpus, &config))?;
            let stats = match args.department.as_deref() {
                Some(d) => compute_aggregates(&filter_department(&corpus, d)),
                None => compute_aggregates(&corpus),
            };
            if args.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print!("{}", render_dashboard(&stats));
            }
            Ok(())
        }
        Command::List(args) => {
            let corpus = load_corpus(&corpus_path(&args, &config))?;
            for record in &corpus {
                println!("{}", record.display_name());
            }
            Ok(())
        }
        Command::Show(args) => {
            let corpus = load_corpus(&corpus_path(&args.corpus, &config))?;
            let record = lookup_record(&corpus, &args.selector)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(record)?);
            } else {
                print!("{}", render_record(record));
            }
            Ok(())
        }
        Command::Context(args) => {
            let corpus = load_corpus(&corpus_path(&args, &config))?;
            println!("{}", build_context_prompt(&corpus, &config.organization)?);
            Ok(())
        }
        Command::Chat(args) => {
            let provider = metrics::init_meter_provider(&config.metrics);
            let result = chat::handle_chat(&config, &corpus_path(&args, &config));
            metrics::shutdown(provider);
            result
        }
        Command::Serve(args) => serve::handle_serve(&config, &corpus_path(&args, &config)),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("exitintel: {e}");
            ExitCode::from(1)
        }
    }
}
