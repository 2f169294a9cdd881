use super::layer::Module;
use crate::error::Error;
use arrayfire::{ge, random_uniform, Array, RandomEngine};

/// Inverted dropout. Active in training mode, the identity otherwise.
pub struct Dropout {
    p: f32,
    training: bool,
}

impl Dropout {
    pub fn new(p: f32) -> Self {
        Self { p, training: true }
    }

    pub fn p(&self) -> f32 {
        self.p
    }

    pub fn is_training(&self) -> bool {
        self.training
    }
}

impl Module for Dropout {
    fn name(&self) -> String {
        format!("Dropout(p={})", self.p)
    }

    fn forward(&self, x: &Array<f32>, engine: &RandomEngine) -> Result<Array<f32>, Error> {
        if !self.training || self.p == 0. {
            return Ok(x.clone());
        }
        let keep = ge(&random_uniform::<f32>(x.dims(), engine), &self.p, false);
        Ok(x * keep / (1. - self.p))
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }
}

#[cfg(test)]
mod tests {
    use super::Dropout;
    use crate::{af_helpers::to_host, net::layers::layer::Module};
    use arrayfire::{dim4, Array, RandomEngine, RandomEngineType};
    use assert_approx_eq::assert_approx_eq;

    fn engine() -> RandomEngine {
        RandomEngine::new(RandomEngineType::PHILOX_4X32_10, Some(5))
    }

    #[test]
    fn training_mode_zeroes_and_rescales() {
        let x = Array::new(&vec![1f32; 1000], dim4![1000, 1, 1, 1]);
        let y = to_host(&Dropout::new(0.5).forward(&x, &engine()).unwrap());
        assert!(y.iter().all(|v| *v == 0. || (*v - 2.).abs() < 1e-6));
        let num_dropped = y.iter().filter(|v| **v == 0.).count();
        assert!(num_dropped > 400 && num_dropped < 600);
    }

    #[test]
    fn eval_mode_is_identity() {
        let x = Array::new(&[1f32, -2., 3.], dim4![3, 1, 1, 1]);
        let mut layer = Dropout::new(0.5);
        layer.set_training(false);
        assert!(!layer.is_training());
        let y = to_host(&layer.forward(&x, &engine()).unwrap());
        for (a, b) in y.iter().zip([1f32, -2., 3.].iter()) {
            assert_approx_eq!(a, b, 1e-7);
        }
    }
}
