use super::layer::Module;
use crate::{
    error::Error,
    net::activation_functions::{ActivationFunction, HasActivationFunction},
};
use arrayfire::{Array, RandomEngine};

/// Elementwise nonlinearity.
pub struct Activation {
    activation_function: ActivationFunction,
}

impl Activation {
    pub fn new(activation_function: ActivationFunction) -> Self {
        Self {
            activation_function,
        }
    }

    pub fn activation_function(&self) -> ActivationFunction {
        self.activation_function
    }
}

impl Module for Activation {
    fn name(&self) -> String {
        self.activation_function.to_string()
    }

    fn forward(&self, x: &Array<f32>, _engine: &RandomEngine) -> Result<Array<f32>, Error> {
        Ok(self.activation_function.h(x))
    }
}
