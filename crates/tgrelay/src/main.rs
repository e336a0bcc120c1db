use std::sync::Arc;

use tgrelay_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), tgrelay_core::Error> {
    tgrelay_core::logging::init("tgrelay")?;

    let cfg = Arc::new(Config::load()?);

    tgrelay_telegram::router::run(cfg)
        .await
        .map_err(|e| tgrelay_core::Error::External(format!("relay failed: {e}")))?;

    Ok(())
}
