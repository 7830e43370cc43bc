use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "exitintel", version, about = "Exit interview analysis and insights")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Analyze raw interviews with the completion service and write the enriched corpus
    Analyze(AnalyzeArgs),
    /// Show aggregate exit trends
    Dashboard(DashboardArgs),
    /// List interview selectors ("Name (ID)")
    List(CorpusArgs),
    /// Show one interview with its analysis
    Show(ShowArgs),
    /// Print the system prompt the chat assistant starts from
    Context(CorpusArgs),
    /// Chat with the HR analyst assistant on stdin/stdout
    Chat(CorpusArgs),
    /// Start MCP server on stdio exposing statistics, records, and chat
    Serve(CorpusArgs),
}

#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Raw interview export (JSON array); defaults to analysis.input
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Enriched corpus to write, replacing any previous one; defaults to analysis.output
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Parallel completion requests; defaults to analysis.concurrency
    #[arg(long)]
    pub concurrency: Option<usize>,
}

#[derive(Parser)]
pub struct CorpusArgs {
    /// Enriched corpus path; defaults to insights.corpus
    #[arg(long, env = "EXITINTEL_CORPUS")]
    pub corpus: Option<PathBuf>,
}

#[derive(Parser)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Restrict to one department
    #[arg(long)]
    pub department: Option<String>,

    /// Print statistics as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct ShowArgs {
    /// "Name (ID)" as printed by `list`, or a bare employee ID
    pub selector: String,

    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Print the enriched record as JSON
    #[arg(long)]
    pub json: bool,
}
