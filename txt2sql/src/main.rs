use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod cmd;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // env fallbacks below may come from a local .env
    let _ = dotenvy::dotenv();

    let args = cmd::Cli::parse();
    args.execute().await
}
