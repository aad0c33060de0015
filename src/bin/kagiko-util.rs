use clap::Parser;

#[tokio::main]
async fn main() {
    use kagiko::util::cli::*;

    dotenv::dotenv().ok();

    let opts = Options::parse();
    run_cli_action(opts).await;
    println!("OK!");
}
