use clap::Parser;
use painter_server::{args::Args, run, setup_logging};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    setup_logging();
    let args = Args::parse();
    run(args.host, args.settings())
        .await
        .expect("Unable to run game server, is it already running?")
}
