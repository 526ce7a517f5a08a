mod commands;
mod terminal;

use commands::CommandLine;
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init(commands.verbose);
    print::banner(commands.quiet);

    commands::scan::scan(&commands).await
}
