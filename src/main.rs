#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lattice_agent::cli::app::run().await
}
