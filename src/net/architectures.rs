use super::{
    bayes_cfg::BayesCfg,
    layer_spec::{LayerSpec, Shape},
    module_list::ModuleList,
};
use crate::error::Error;
use arrayfire::Array;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use strum_macros::EnumString;

#[derive(clap::ValueEnum, Clone, Copy, Debug, Serialize, Deserialize, EnumString, PartialEq, Eq)]
pub enum Architecture {
    AlexNet,
    LeNet,
    LeNetExp,
}

impl Display for Architecture {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Architecture {
    /// Side length of the square images the architecture is laid out for.
    pub fn input_size(&self) -> usize {
        match self {
            Architecture::AlexNet => 224,
            Architecture::LeNet | Architecture::LeNetExp => 32,
        }
    }

    pub fn input_shape(&self, inputs: usize) -> Shape {
        Shape::image(self.input_size(), self.input_size(), inputs)
    }

    /// Layer sequence for `outputs` classes and `inputs` image channels.
    pub fn layer_specs(&self, outputs: usize, inputs: usize) -> Vec<LayerSpec> {
        match self {
            Architecture::AlexNet => vec![
                // features
                LayerSpec::conv(inputs, 64, 11, 4, 2),
                LayerSpec::relu(),
                LayerSpec::pool(3, 2),
                LayerSpec::conv(64, 192, 5, 1, 2),
                LayerSpec::relu(),
                LayerSpec::pool(3, 2),
                LayerSpec::conv(192, 384, 3, 1, 1),
                LayerSpec::relu(),
                LayerSpec::conv(384, 256, 3, 1, 1),
                LayerSpec::relu(),
                LayerSpec::conv(256, 256, 3, 1, 1),
                LayerSpec::relu(),
                LayerSpec::pool(3, 2),
                // classifier
                LayerSpec::Flatten(256 * 6 * 6),
                LayerSpec::Dropout,
                LayerSpec::fc(256 * 6 * 6, 4096),
                LayerSpec::relu(),
                LayerSpec::Dropout,
                LayerSpec::fc(4096, 4096),
                LayerSpec::relu(),
                LayerSpec::fc(4096, outputs),
            ],
            Architecture::LeNet => vec![
                LayerSpec::conv(inputs, 6, 5, 1, 0),
                LayerSpec::softplus(),
                LayerSpec::pool(2, 2),
                LayerSpec::conv(6, 16, 5, 1, 0),
                LayerSpec::softplus(),
                LayerSpec::pool(2, 2),
                LayerSpec::Flatten(5 * 5 * 16),
                LayerSpec::fc(5 * 5 * 16, 120),
                LayerSpec::softplus(),
                LayerSpec::fc(120, 84),
                LayerSpec::softplus(),
                LayerSpec::fc(84, outputs),
            ],
            Architecture::LeNetExp => vec![
                LayerSpec::conv(inputs, 64, 5, 1, 0),
                LayerSpec::softplus(),
                LayerSpec::pool(2, 2),
                LayerSpec::conv(64, 192, 5, 1, 0),
                LayerSpec::softplus(),
                LayerSpec::conv(192, 64, 5, 1, 1),
                LayerSpec::softplus(),
                LayerSpec::Flatten(8 * 8 * 64),
                LayerSpec::fc(8 * 8 * 64, 512),
                LayerSpec::softplus(),
                LayerSpec::fc(512, 1024),
                LayerSpec::softplus(),
                LayerSpec::fc(1024, 1024),
                LayerSpec::softplus(),
                LayerSpec::fc(1024, 512),
                LayerSpec::softplus(),
                LayerSpec::fc(512, outputs),
            ],
        }
    }

    pub fn num_params(&self, outputs: usize, inputs: usize) -> usize {
        self.layer_specs(outputs, inputs)
            .iter()
            .map(LayerSpec::num_params)
            .sum()
    }
}

/// Output shape of every layer in `specs`, starting from `input`.
pub fn infer_shapes(specs: &[LayerSpec], input: Shape) -> Result<Vec<Shape>, Error> {
    let mut shapes = Vec::with_capacity(specs.len());
    let mut shape = input;
    for spec in specs {
        shape = spec.output_shape(shape)?;
        shapes.push(shape);
    }
    Ok(shapes)
}

/// A network of probabilistic layers, evaluated by a [`ModuleList`].
pub struct BayesNet {
    architecture: Architecture,
    outputs: usize,
    inputs: usize,
    specs: Vec<LayerSpec>,
    layers: ModuleList,
}

impl BayesNet {
    pub fn new(
        architecture: Architecture,
        outputs: usize,
        inputs: usize,
        cfg: &BayesCfg,
    ) -> Result<Self, Error> {
        cfg.validate()?;
        if outputs == 0 || inputs == 0 {
            return Err(Error::InvalidConfig(format!(
                "outputs and inputs have to be positive, got {} and {}",
                outputs, inputs
            )));
        }
        let specs = architecture.layer_specs(outputs, inputs);
        infer_shapes(&specs, architecture.input_shape(inputs))?;

        let mut rng = cfg.host_rng();
        let layers = specs.iter().map(|s| s.build(cfg, &mut rng)).collect();
        let net = Self {
            architecture,
            outputs,
            inputs,
            specs,
            layers: ModuleList::new(layers, cfg.random_engine()),
        };
        debug!(
            "Built {} with {} layers, {} params",
            architecture,
            net.layers.len(),
            net.num_params()
        );
        Ok(net)
    }

    /// AlexNet with probabilistic weights.
    pub fn alexnet(outputs: usize, inputs: usize, cfg: &BayesCfg) -> Result<Self, Error> {
        Self::new(Architecture::AlexNet, outputs, inputs, cfg)
    }

    /// LeNet with probabilistic weights and softplus activations.
    pub fn lenet(outputs: usize, inputs: usize, cfg: &BayesCfg) -> Result<Self, Error> {
        Self::new(Architecture::LeNet, outputs, inputs, cfg)
    }

    /// Wider and deeper LeNet variant.
    pub fn lenet_exp(outputs: usize, inputs: usize, cfg: &BayesCfg) -> Result<Self, Error> {
        Self::new(Architecture::LeNetExp, outputs, inputs, cfg)
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn layer_specs(&self) -> &[LayerSpec] {
        &self.specs
    }

    pub fn module_list(&self) -> &ModuleList {
        &self.layers
    }

    pub fn num_params(&self) -> usize {
        self.layers.num_params()
    }

    pub fn set_training(&mut self, training: bool) {
        self.layers.set_training(training);
    }

    /// Logits and summed divergence of one pass with sampled weights.
    pub fn prob_forward(&self, x: &Array<f32>) -> Result<(Array<f32>, f32), Error> {
        self.layers.prob_forward(x)
    }

    pub fn forward(&self, x: &Array<f32>) -> Result<Array<f32>, Error> {
        self.layers.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::{infer_shapes, Architecture, BayesNet};
    use crate::{
        error::Error,
        net::{bayes_cfg::BayesCfg, layer_spec::Shape, layers::layer::Layer},
    };
    use arrayfire::{dim4, randu};
    use assert_approx_eq::assert_approx_eq;
    use std::str::FromStr;

    #[test]
    fn architectures_map_native_inputs_to_logits() {
        for arch in [
            Architecture::AlexNet,
            Architecture::LeNet,
            Architecture::LeNetExp,
        ] {
            for inputs in [1, 3] {
                let shapes =
                    infer_shapes(&arch.layer_specs(10, inputs), arch.input_shape(inputs)).unwrap();
                assert_eq!(*shapes.last().unwrap(), Shape::Features(10), "{}", arch);
            }
        }
    }

    #[test]
    fn alexnet_feature_extractor_ends_in_6x6() {
        let arch = Architecture::AlexNet;
        let shapes = infer_shapes(&arch.layer_specs(10, 3), arch.input_shape(3)).unwrap();
        assert_eq!(shapes[0], Shape::image(55, 55, 64));
        assert_eq!(shapes[12], Shape::image(6, 6, 256));
        assert_eq!(arch.layer_specs(10, 3).len(), 21);
    }

    #[test]
    fn wrong_input_size_fails_shape_inference() {
        let arch = Architecture::LeNet;
        assert!(infer_shapes(&arch.layer_specs(10, 1), Shape::image(28, 28, 1)).is_err());
    }

    #[test]
    fn lenet_param_count() {
        let conv1 = 5 * 5 * 6 + 6;
        let conv2 = 5 * 5 * 6 * 16 + 16;
        let fc = 400 * 120 + 120 + 120 * 84 + 84 + 84 * 10 + 10;
        let expected = 2 * (conv1 + conv2 + fc);
        assert_eq!(Architecture::LeNet.num_params(10, 1), expected);

        let net = BayesNet::lenet(10, 1, &BayesCfg::new().with_seed(0)).unwrap();
        assert_eq!(net.num_params(), expected);
    }

    #[test]
    fn lenet_prob_forward_returns_logits_and_summed_kl() {
        let net = BayesNet::lenet(10, 3, &BayesCfg::new().with_seed(3)).unwrap();
        let x = randu::<f32>(dim4![32, 32, 3, 4]);
        let (logits, kl) = net.prob_forward(&x).unwrap();
        assert_eq!(logits.dims(), dim4![4, 10, 1, 1]);

        let layer_kls: f32 = net
            .module_list()
            .layers()
            .iter()
            .map(|l| match l {
                Layer::BayesConv2d(c) => c.kl(),
                Layer::BayesLinear(f) => f.kl(),
                _ => 0.,
            })
            .sum();
        assert_approx_eq!(kl, layer_kls, 1e-1);

        let (_, traced) = net.module_list().prob_forward_traced(&x).unwrap();
        assert_approx_eq!(traced.iter().sum::<f32>(), kl, 1e-1);
    }

    #[test]
    fn lenet_exp_prob_forward_maps_native_input_to_logits() {
        let net = BayesNet::lenet_exp(10, 3, &BayesCfg::new().with_seed(5)).unwrap();
        let x = randu::<f32>(dim4![32, 32, 3, 2]);
        let (logits, kl) = net.prob_forward(&x).unwrap();
        assert_eq!(logits.dims(), dim4![2, 10, 1, 1]);
        assert!(kl.is_finite() && kl > 0.);
    }

    #[test]
    fn same_seed_same_posterior_means() {
        let cfg = BayesCfg::new().with_seed(9);
        let mut a = BayesNet::lenet(4, 1, &cfg).unwrap();
        let mut b = BayesNet::lenet(4, 1, &cfg).unwrap();
        a.set_training(false);
        b.set_training(false);
        let x = randu::<f32>(dim4![32, 32, 1, 2]);
        let ya = crate::af_helpers::to_host(&a.forward(&x).unwrap());
        let yb = crate::af_helpers::to_host(&b.forward(&x).unwrap());
        assert_eq!(ya, yb);
    }

    #[test]
    fn invalid_cfg_and_sizes_are_rejected() {
        let cfg = BayesCfg::new().with_prior_sigma(-1.);
        assert!(matches!(
            BayesNet::lenet(10, 1, &cfg),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            BayesNet::lenet(0, 1, &BayesCfg::new()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn architecture_from_str() {
        assert_eq!(
            Architecture::from_str("LeNetExp").unwrap(),
            Architecture::LeNetExp
        );
        assert!(Architecture::from_str("ResNet").is_err());
    }
}
