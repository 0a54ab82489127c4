//! Binary entrypoint for the BQA API server.
use bqa_api::run;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // Default listen address can be overridden with BQA_ADDR
    let addr = std::env::var("BQA_ADDR").unwrap_or_else(|_| "0.0.0.0:8787".to_string());
    run(&addr).await;
}
