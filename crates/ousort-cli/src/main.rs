//! Binary entrypoint: one relocation cycle per invocation.

#[tokio::main]
async fn main() {
    let code = ousort_cli::run().await;
    std::process::exit(code);
}
