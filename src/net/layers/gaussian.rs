use crate::{
    af_helpers::{log_softplus, softplus, sum_all_host},
    net::bayes_cfg::BayesCfg,
};
use arrayfire::{Array, Dim4};
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Uniform};

/// Factorised gaussian variational posterior q(w) = N(mu, softplus(rho)^2)
/// over a single parameter tensor, with a N(0, prior_sigma^2) prior.
pub struct GaussianPosterior {
    mu: Array<f32>,
    rho: Array<f32>,
    prior_sigma: f32,
}

impl GaussianPosterior {
    /// Means uniform in +-1/sqrt(fan_in), all rho at the configured init value.
    pub(crate) fn init(dims: Dim4, fan_in: usize, cfg: &BayesCfg, rng: &mut ChaCha20Rng) -> Self {
        let num_elements = dims.elements() as usize;
        let stdv = 1. / (fan_in as f32).sqrt();
        let mu_host: Vec<f32> = Uniform::new_inclusive(-stdv, stdv)
            .sample_iter(rng)
            .take(num_elements)
            .collect();
        let rho_host = vec![cfg.posterior_rho_init; num_elements];
        Self::from_host(&mu_host, &rho_host, dims, cfg.prior_sigma)
    }

    pub fn from_host(mu: &[f32], rho: &[f32], dims: Dim4, prior_sigma: f32) -> Self {
        Self {
            mu: Array::new(mu, dims),
            rho: Array::new(rho, dims),
            prior_sigma,
        }
    }

    pub fn mu(&self) -> &Array<f32> {
        &self.mu
    }

    pub fn rho(&self) -> &Array<f32> {
        &self.rho
    }

    pub fn prior_sigma(&self) -> f32 {
        self.prior_sigma
    }

    pub fn sigma(&self) -> Array<f32> {
        softplus(&self.rho)
    }

    pub fn variance(&self) -> Array<f32> {
        let sigma = self.sigma();
        &sigma * &sigma
    }

    pub fn num_elements(&self) -> usize {
        self.mu.elements()
    }

    /// Number of variational parameters (mu and rho).
    pub fn num_params(&self) -> usize {
        2 * self.num_elements()
    }

    /// KL(q || p), summed over all elements.
    pub fn kl(&self) -> f32 {
        let n = self.num_elements() as f32;
        let sigma = self.sigma();
        let sum_log_sigma = sum_all_host(&log_softplus(&self.rho));
        let sum_sq = sum_all_host(&(&sigma * &sigma + &self.mu * &self.mu));
        let prior_var = self.prior_sigma * self.prior_sigma;
        n * (self.prior_sigma.ln() - 0.5) - sum_log_sigma + sum_sq / (2. * prior_var)
    }
}
