use stride_diagnostics::app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::main().await
}
