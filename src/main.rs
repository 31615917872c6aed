use azure_toolkit::cli::{Args, Runner};
use azure_toolkit::Logger;
use std::process;

#[tokio::main]
async fn main() {
    let args = Args::parse_args();

    let runner = match Runner::new(args) {
        Ok(runner) => runner,
        Err(e) => {
            Logger::new(false).error(&e.to_string());
            process::exit(2);
        }
    };

    if let Err(e) = runner.run().await {
        runner.output().error(&e.to_string());
        process::exit(1);
    }
}
