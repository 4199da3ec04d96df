use clap::Parser;
use colored::Colorize;
use scold_cli::{cmd::Args, util};

#[tokio::main]
async fn main() {
    util::init_logger();

    let app = Args::parse();
    let code = app.exec().await.unwrap_or_else(|e| {
        eprintln!("{}: {:?}", "error".bright_red().bold(), e);
        1
    });
    std::process::exit(code);
}
