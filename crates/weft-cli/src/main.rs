use std::path::PathBuf;

use clap::Parser;

mod cli;
mod config;

use cli::ChatArgs;

#[derive(Parser, Debug)]
#[command(name = "weft", version, about = "pattern-driven LLM prompt runner")]
struct Cli {
    /// Configuration directory, defaults to ~/.weft
    #[arg(long, global = true)]
    conf_dir: Option<PathBuf>,
    #[command(flatten)]
    chat: ChatArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(error) = cli::run_chat(cli.chat, cli.conf_dir).await {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
