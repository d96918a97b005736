use std::path::PathBuf;

use argh::FromArgs;

/// Bitcoin staking indexer.
#[derive(Debug, FromArgs)]
pub(crate) struct Args {
    /// path to the TOML config file; defaults apply when omitted
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    /// path to the JSON file with protocol parameter versions
    #[argh(option, short = 'p')]
    pub params: PathBuf,

    /// override the configured data directory
    #[argh(option)]
    pub datadir: Option<PathBuf>,

    /// override the configured start height
    #[argh(option)]
    pub start_height: Option<u64>,

    /// replay confirmed blocks from a `height:blockhex` file instead of
    /// a live scanner
    #[argh(option)]
    pub blocks_file: Option<PathBuf>,
}
