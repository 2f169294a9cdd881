use bbb_cnn::Architecture;
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub(crate) cmd: SubCmd,
}

#[derive(Subcommand)]
pub(crate) enum SubCmd {
    /// Print the layers, shapes and parameter counts of an architecture
    Summary(SummaryArgs),
    /// Run probabilistic forward passes on random input
    Sample(SampleArgs),
    /// List available arrayfire backends
    AvailableBackends,
}

#[derive(Args, Debug, Serialize, Deserialize)]
pub(crate) struct SummaryArgs {
    /// network architecture
    #[clap(value_enum)]
    pub architecture: Architecture,

    /// number of output classes
    pub outputs: usize,

    /// number of input channels
    pub inputs: usize,
}

#[derive(Args, Debug, Serialize, Deserialize)]
pub(crate) struct SampleArgs {
    /// network architecture
    #[clap(value_enum)]
    pub architecture: Architecture,

    /// number of output classes
    pub outputs: usize,

    /// number of input channels
    pub inputs: usize,

    /// number of images per forward pass
    #[clap(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: u64,

    /// number of forward passes
    #[clap(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub num_samples: u64,

    /// seed for parameter initialization and sampling, overrides the cfg file
    #[clap(long)]
    pub seed: Option<u64>,

    /// path to json file with prior and posterior settings
    #[clap(long)]
    pub cfg: Option<String>,

    /// disable dropout
    #[clap(short, long)]
    pub eval: bool,

    /// enable debug prints
    #[clap(short, long)]
    pub debug_prints: bool,
}

#[cfg(test)]
mod tests {
    use super::{Cli, SubCmd};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn sample_defaults_to_one_image_and_one_pass() {
        let cli = Cli::try_parse_from(["bbb-cnn", "sample", "le-net", "10", "1"]).unwrap();
        match cli.cmd {
            SubCmd::Sample(args) => {
                assert_eq!(args.batch_size, 1);
                assert_eq!(args.num_samples, 1);
            }
            _ => panic!("expected sample subcommand"),
        }
    }

    #[test]
    fn zero_batch_size_and_samples_are_rejected() {
        for flag in ["--batch-size", "--num-samples"] {
            let res = Cli::try_parse_from(["bbb-cnn", "sample", "le-net", "10", "1", flag, "0"]);
            assert!(res.is_err(), "{}", flag);
        }
        let res =
            Cli::try_parse_from(["bbb-cnn", "sample", "le-net", "10", "1", "--batch-size", "4"]);
        assert!(res.is_ok());
    }
}
