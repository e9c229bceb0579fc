use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "invitrack")]
#[command(author, version, about = "Telegram bot that tracks who invited whom into a group", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot and the liveness endpoint (default)
    Run,

    /// Print every issued invite link as `inviter_id<TAB>link`
    Links,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
