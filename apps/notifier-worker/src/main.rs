#[tokio::main]
async fn main() -> eyre::Result<()> {
    notifier_worker::run().await
}
