use std::io::Result;

#[tokio::main]
async fn main() -> Result<()> {
    planet_rush::run_with_config().await
}
