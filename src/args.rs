use clap::Parser;

/// The command line args passed to the Kamino server
#[derive(Parser, Debug)]
#[clap(version, author)]
pub struct Args {
    /// The path to load the config file from
    #[clap(short, long, default_value = "kamino.yml")]
    pub config: String,
}
