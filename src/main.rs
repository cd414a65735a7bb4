use assetpipe::PipelineError;
use std::process;

fn main() {
    match assetpipe::cli::run() {
        Ok(()) => {}
        // Task failures were already reported by the notifier
        Err(PipelineError::Task(_)) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
