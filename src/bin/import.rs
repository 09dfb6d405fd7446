// loads books.csv into the books table

use std::path::PathBuf;

use anyhow::Context;
use bookreview::{import::import_books, sql::Db};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
	/// CSV with a header row and columns isbn, title, author, year
	#[arg(default_value = "books.csv")]
	path: PathBuf,

	#[arg(long, env = "DATABASE_URL")]
	database_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	// DATABASE_URL may live in .env, and clap reads it from the environment
	dotenvy::dotenv().ok();
	fmt().with_env_filter(EnvFilter::from_default_env()).init();
	let args = Args::parse();

	let db = Db::connect(&args.database_url).await?;
	db.schema().await?;

	let file = std::fs::File::open(&args.path)
		.with_context(|| format!("can't open {}", args.path.display()))?;
	info!("Importing {}", args.path.display());

	let inserted = import_books(&db, file).await?;
	println!("Inserted {inserted} books");
	Ok(())
}
