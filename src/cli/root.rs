use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::cli::{dump, keys, show, topkey};
use crate::config::{env, Initializer};
use crate::core;
use crate::Result;

/// Redis rdb file analyzer
#[derive(Parser, Debug)]
#[command(version, propagate_version = true, subcommand_required = true)]
pub struct RdrCommand {
    /// Global options
    #[command(flatten)]
    pub global: GlobalOptions,
    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Global options
#[derive(Args, Debug)]
pub struct GlobalOptions {
    /// Configuration file path
    #[arg(long, short = 'C', env = env::CONFIG_PATH, global = true)]
    pub config: Option<PathBuf>,
    /// Do not verify the crc64 trailer of dump files
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub no_verify_checksum: bool,
    /// Entries buffered between decoder and consumer
    #[arg(long, env = "RDR_CHANNEL_CAPACITY", global = true)]
    pub channel_capacity: Option<usize>,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print all keys of dump files
    Keys(keys::KeysCommand),
    /// Print the largest keys of dump files
    Topkey(topkey::TopkeyCommand),
    /// Print statistics of dump files as json
    Dump(dump::DumpCommand),
    /// Serve statistics of dump files on a web page
    Show(show::ShowCommand),
}

/// Parse command line args
pub fn parse() -> RdrCommand {
    RdrCommand::parse()
}

impl GlobalOptions {
    /// Load the configuration file and apply global flags on top of it.
    pub async fn initializer(self) -> Result<Initializer> {
        let GlobalOptions {
            config,
            no_verify_checksum,
            channel_capacity,
        } = self;

        let mut initializer = Initializer::load(config.as_deref()).await?;

        let mut flags = core::Config::default();
        if no_verify_checksum {
            flags.set_verify_checksum(Some(false));
        }
        flags.set_channel_capacity(channel_capacity);
        initializer.override_analyzer(&mut flags);

        Ok(initializer)
    }
}

impl RdrCommand {
    pub async fn run(self) -> Result<()> {
        let RdrCommand { global, command } = self;
        let initializer = global.initializer().await?;

        match command {
            Command::Keys(keys) => keys.run(initializer).await,
            Command::Topkey(topkey) => topkey.run(initializer).await,
            Command::Dump(dump) => dump.run(initializer).await,
            Command::Show(show) => show.run(initializer, tokio::signal::ctrl_c()).await,
        }
    }
}
