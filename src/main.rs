use std::process::ExitCode;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> ExitCode {
    match investor_crawler::cli::run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(investor_crawler::cli::exit_code_for(&err))
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() -> ExitCode {
    eprintln!("CLI feature not enabled. Build with --features cli");
    ExitCode::from(1)
}
