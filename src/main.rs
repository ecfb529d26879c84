#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = acadex::run().await {
        eprintln!("acadex fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
