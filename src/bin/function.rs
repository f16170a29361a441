use axum::http::StatusCode;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use formbase::config::Config;
use formbase::function::{self, FunctionEvent, FunctionResponse};

/// Reads one JSON event from stdin and writes the JSON response to stdout.
/// Logs go to stderr so stdout stays machine-readable.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;

    let response = match serde_json::from_str::<FunctionEvent>(&input) {
        Ok(event) => {
            tracing::debug!(method = %event.http_method, path = %event.path, "Invoking function");
            let store = formbase::build_store(&config);
            let app = formbase::build_app(store.clone(), config);
            let response = function::invoke(app, event).await;
            store.close().await;
            response
        }
        Err(e) => {
            tracing::warn!("Unreadable function event: {e}");
            FunctionResponse::error(StatusCode::BAD_REQUEST, format!("Invalid event: {e}"))
        }
    };

    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}
