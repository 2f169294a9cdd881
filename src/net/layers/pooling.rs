use super::{
    layer::Module,
    window::{max_pool2d, Window},
};
use crate::error::Error;
use arrayfire::{Array, RandomEngine};

pub struct MaxPool2d {
    window: Window,
}

impl MaxPool2d {
    pub fn new(kernel_size: usize, stride: usize) -> Self {
        Self {
            window: Window::new(kernel_size, stride, 0),
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }
}

impl Module for MaxPool2d {
    fn name(&self) -> String {
        format!(
            "MaxPool2d(k={}, s={})",
            self.window.kernel_size, self.window.stride
        )
    }

    fn forward(&self, x: &Array<f32>, _engine: &RandomEngine) -> Result<Array<f32>, Error> {
        let out_dims = self.window.output_dims(&self.name(), x)?;
        Ok(max_pool2d(x, &self.window, out_dims))
    }
}
