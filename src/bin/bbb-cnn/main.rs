mod cli;

use arrayfire::{dim4, randu};
use bbb_cnn::{
    net::{
        architectures::infer_shapes,
        layer_spec::{LayerSpec, Shape},
    },
    BayesCfg, BayesNet,
};
use clap::Parser;
use cli::{Cli, SampleArgs, SubCmd, SummaryArgs};
use log::{debug, info};
use serde::Serialize;
use serde_json::to_writer_pretty;
use std::path::Path;

fn main() {
    match Cli::parse().cmd {
        SubCmd::Summary(args) => summary(args),
        SubCmd::Sample(args) => sample(args),
        SubCmd::AvailableBackends => available_backends(),
    }
}

fn available_backends() {
    println!("{:?}", arrayfire::get_available_backends());
}

fn summary(args: SummaryArgs) {
    simple_logger::init_with_level(log::Level::Info).unwrap();

    let specs = args.architecture.layer_specs(args.outputs, args.inputs);
    let input = args.architecture.input_shape(args.inputs);
    let shapes = infer_shapes(&specs, input).expect("Inconsistent architecture");

    info!("{} with input {}", args.architecture, input);
    for (spec, shape) in specs.iter().zip(shapes.iter()) {
        info!(
            "{:<32} -> {:<12} params: {}",
            spec.to_string(),
            shape.to_string(),
            spec.num_params()
        );
    }
    info!(
        "Total params: {}",
        specs.iter().map(LayerSpec::num_params).sum::<usize>()
    );
}

#[derive(Serialize)]
struct SampleReport {
    architecture: String,
    input: Shape,
    batch_size: u64,
    num_params: usize,
    logits_dims: [u64; 4],
    kls: Vec<f32>,
    mean_kl: f32,
}

fn sample(args: SampleArgs) {
    if args.debug_prints {
        simple_logger::init_with_level(log::Level::Debug).unwrap();
    } else {
        simple_logger::init_with_level(log::Level::Info).unwrap();
    }
    debug!("{:?}", args);

    let mut cfg = match &args.cfg {
        Some(path) => BayesCfg::from_file(Path::new(path)).expect("Failed to load cfg"),
        None => BayesCfg::default(),
    };
    if let Some(seed) = args.seed {
        cfg = cfg.with_seed(seed);
    }

    info!("Building {}", args.architecture);
    let mut net = BayesNet::new(args.architecture, args.outputs, args.inputs, &cfg)
        .expect("Failed to build network");
    net.set_training(!args.eval);
    info!("Built net with {} params", net.num_params());

    let size = args.architecture.input_size() as u64;
    let x = randu::<f32>(dim4![size, size, args.inputs as u64, args.batch_size]);

    let mut kls = Vec::with_capacity(args.num_samples as usize);
    let mut logits_dims = [0; 4];
    for sample_ix in 0..args.num_samples {
        let (logits, kl) = net.prob_forward(&x).expect("Forward pass failed");
        info!("sample: {:} \t | kl: {:.4}", sample_ix, kl);
        logits_dims = *logits.dims().get();
        kls.push(kl);
    }

    let mean_kl = kls.iter().sum::<f32>() / kls.len() as f32;
    let report = SampleReport {
        architecture: args.architecture.to_string(),
        input: args.architecture.input_shape(args.inputs),
        batch_size: args.batch_size,
        num_params: net.num_params(),
        logits_dims,
        kls,
        mean_kl,
    };
    to_writer_pretty(std::io::stdout(), &report).expect("Failed to write report");
    println!();
}
