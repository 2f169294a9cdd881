use crate::af_helpers::{relu, softplus};
use arrayfire::{sigmoid, tanh, Array};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Serialize, Deserialize, Clone, Copy, clap::ValueEnum, Debug, PartialEq, Eq)]
pub enum ActivationFunction {
    Tanh,
    ReLU,
    Softplus,
    SiLU,
    Identity,
}

impl Display for ActivationFunction {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl HasActivationFunction for ActivationFunction {
    fn h(&self, x: &Array<f32>) -> Array<f32> {
        match self {
            ActivationFunction::Tanh => tanh(x),
            ActivationFunction::ReLU => relu(x),
            ActivationFunction::Softplus => softplus(x),
            ActivationFunction::SiLU => x * sigmoid(x),
            ActivationFunction::Identity => x.clone(),
        }
    }
}

pub trait HasActivationFunction {
    fn h(&self, x: &Array<f32>) -> Array<f32>;
}
