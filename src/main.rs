use clap::Parser;
use page2vid::cli::{usage_exit_code, Cli, Command};
use page2vid::record_page;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(usage_exit_code(&e));
        }
    };

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let Command::Record(args) = cli.command;
    let json = args.json;

    let options = match args.into_options() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("Saving video to: {}", options.output.display());
    match record_page(options).await {
        Ok(summary) => {
            if json {
                match serde_json::to_string(&summary) {
                    Ok(s) => println!("{}", s),
                    Err(e) => log::warn!("failed to serialize summary: {}", e),
                }
            } else {
                println!("Video saved to {} ({} frames)", summary.output.display(), summary.frames);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
