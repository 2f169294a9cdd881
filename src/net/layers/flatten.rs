use super::layer::Module;
use crate::{af_helpers::dims_of, error::Error};
use arrayfire::{dim4, moddims, transpose, Array, RandomEngine};

/// Reshapes `[h, w, c, n]` images into `[n, h * w * c]` feature rows.
pub struct Flatten {
    num_features: usize,
}

impl Flatten {
    pub fn new(num_features: usize) -> Self {
        Self { num_features }
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }
}

impl Module for Flatten {
    fn name(&self) -> String {
        format!("Flatten({})", self.num_features)
    }

    fn forward(&self, x: &Array<f32>, _engine: &RandomEngine) -> Result<Array<f32>, Error> {
        let [h, w, c, n] = dims_of(x);
        if (h * w * c) as usize != self.num_features {
            return Err(Error::shape_mismatch(
                &self.name(),
                format!("{} features per sample", self.num_features),
                format!("{}x{}x{} = {}", h, w, c, h * w * c),
            ));
        }
        let cols = moddims(x, dim4!(h * w * c, n, 1, 1));
        Ok(transpose(&cols, false))
    }
}
