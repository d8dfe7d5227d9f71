use clap::Parser;
use docchat_cli::{Cli, Command, app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    docchat_telemetry::init_telemetry("docchat", cli.global.log_format)?;
    let args = &cli.global;

    match &cli.command {
        Command::Serve(serve) => app::serve(args, serve).await,
        Command::Ingest(ingest) => app::ingest(args, ingest).await,
        Command::Ask(ask) => app::ask(args, ask).await,
        Command::Chat(chat) => app::chat(args, chat).await,
        Command::Stats => app::stats(args).await,
        Command::Clear => app::clear(args).await,
        Command::Models => app::models(args).await,
        Command::TestConnection => app::check_connection(args).await,
    }
}
