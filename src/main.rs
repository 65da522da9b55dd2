#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = exam_connect::run().await {
        eprintln!("exam-connect fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
