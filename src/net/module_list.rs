use super::layers::layer::{Layer, Module};
use crate::{af_helpers::to_host, error::Error};
use arrayfire::{Array, RandomEngine};
use log::{debug, log_enabled, trace, Level};

/// An ordered sequence of layers evaluated one after another.
pub struct ModuleList {
    layers: Vec<Layer>,
    engine: RandomEngine,
}

impl ModuleList {
    pub fn new(layers: Vec<Layer>, engine: RandomEngine) -> Self {
        Self { layers, engine }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn num_params(&self) -> usize {
        self.layers.iter().map(|l| l.num_params()).sum()
    }

    /// Switch dropout and similar layers between training and evaluation behaviour.
    pub fn set_training(&mut self, training: bool) {
        for layer in self.layers.iter_mut() {
            layer.set_training(training);
        }
    }

    /// Evaluate all layers with sampled weights.
    /// Returns the logits and the summed divergence of all probabilistic layers.
    pub fn prob_forward(&self, x: &Array<f32>) -> Result<(Array<f32>, f32), Error> {
        let (logits, kls) = self.prob_forward_traced(x)?;
        Ok((logits, kls.iter().sum()))
    }

    /// Same as [`ModuleList::prob_forward`], but returns the divergence
    /// contribution of every layer instead of their sum.
    pub fn prob_forward_traced(&self, x: &Array<f32>) -> Result<(Array<f32>, Vec<f32>), Error> {
        let mut kls = Vec::with_capacity(self.layers.len());
        let mut x = x.clone();
        for layer in &self.layers {
            let (y, layer_kl) = self.layer_prob_forward(layer, &x)?;
            x = y;
            kls.push(layer_kl);
        }
        self.log_logits(&x);
        Ok((x, kls))
    }

    /// Evaluate all layers with posterior mean weights.
    pub fn forward(&self, x: &Array<f32>) -> Result<Array<f32>, Error> {
        let mut x = x.clone();
        for layer in &self.layers {
            x = layer.forward(&x, &self.engine)?;
        }
        Ok(x)
    }

    fn layer_prob_forward(
        &self,
        layer: &Layer,
        x: &Array<f32>,
    ) -> Result<(Array<f32>, f32), Error> {
        let res = if let Some(conv) = layer.as_conv_prob() {
            conv.conv_prob_forward(x, &self.engine)?
        } else if let Some(fc) = layer.as_fc_prob() {
            fc.fc_prob_forward(x, &self.engine)?
        } else {
            (layer.forward(x, &self.engine)?, 0.)
        };
        debug!("{} -> {:?}", layer.name(), res.0.dims());
        Ok(res)
    }

    fn log_logits(&self, logits: &Array<f32>) {
        if log_enabled!(Level::Trace) {
            trace!("logits: {:?}", to_host(logits));
        }
    }
}
