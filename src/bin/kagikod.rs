#[tokio::main]
async fn main() -> Result<(), ()> {
    kagiko::main().await
}
