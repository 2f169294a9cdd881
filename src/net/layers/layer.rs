use super::{
    activation::Activation, bayes_conv2d::BayesConv2d, bayes_linear::BayesLinear,
    dropout::Dropout, flatten::Flatten, pooling::MaxPool2d,
};
use crate::error::Error;
use arrayfire::{Array, RandomEngine};
use enum_dispatch::enum_dispatch;

/// Probabilistic forward pass of convolutional layers.
/// Returns the transformed tensor and the layer's divergence contribution.
pub trait ConvProbForward {
    fn conv_prob_forward(
        &self,
        x: &Array<f32>,
        engine: &RandomEngine,
    ) -> Result<(Array<f32>, f32), Error>;
}

/// Probabilistic forward pass of fully connected layers.
/// Returns the transformed tensor and the layer's divergence contribution.
pub trait FcProbForward {
    fn fc_prob_forward(
        &self,
        x: &Array<f32>,
        engine: &RandomEngine,
    ) -> Result<(Array<f32>, f32), Error>;
}

#[enum_dispatch]
pub trait Module {
    fn name(&self) -> String;

    /// Plain transformation. Probabilistic layers use their posterior means.
    fn forward(&self, x: &Array<f32>, engine: &RandomEngine) -> Result<Array<f32>, Error>;

    fn num_params(&self) -> usize {
        0
    }

    fn set_training(&mut self, _training: bool) {}

    fn as_conv_prob(&self) -> Option<&dyn ConvProbForward> {
        None
    }

    fn as_fc_prob(&self) -> Option<&dyn FcProbForward> {
        None
    }
}

#[enum_dispatch(Module)]
pub enum Layer {
    BayesConv2d,
    BayesLinear,
    Activation,
    MaxPool2d,
    Flatten,
    Dropout,
}
