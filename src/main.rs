//! Protectorium server entry point.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    protectorium::server::run().await
}
