// book reviews web server

use bookreview::config::Config;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	fmt().with_env_filter(EnvFilter::from_default_env()).init();

	let config = Config::load()?;
	bookreview::start_server(config).await
}
