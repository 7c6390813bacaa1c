use std::process::ExitCode;

const DEFAULT_CONFIG: &str = "config.json";

fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());

    match wgpu_temple::run(&config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Application error: {err}");
            ExitCode::FAILURE
        }
    }
}
