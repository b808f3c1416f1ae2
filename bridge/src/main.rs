mod app;
mod cli;
mod error;
mod mqtt;
mod netatmo;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
