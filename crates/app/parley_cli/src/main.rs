use clap::Parser;
use parley_cli::cli::{Cli, Commands};
use parley_cli::client::HttpRelayClient;
use parley_cli::surface::ChatSurface;
use parley_cli::terminal::{self, TerminalView};
use parley_cli::{Error, Result, logging};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = run().await {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let args = Cli::parse();

    match &args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
        Commands::Health => {
            let client = HttpRelayClient::new(&args.server)?;
            let status = client.health().await?;
            println!("{status}");
            if status != "ok" {
                return Err(Error::Custom(format!("server reported status {status}")));
            }
        }
        Commands::Chat => {
            let client = HttpRelayClient::new(&args.server)?;
            log::info!("chatting via {}", args.server);
            let mut surface = ChatSurface::new(client).with_view(Box::new(TerminalView::new()));
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            terminal::run_chat(&mut surface, stdin, &mut stdout).await?;
        }
    }

    Ok(())
}
