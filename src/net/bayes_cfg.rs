use crate::error::Error;
use arrayfire::{RandomEngine, RandomEngineType};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

/// Priors, initial posterior state and seeding of a probabilistic net.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BayesCfg {
    /// std of the zero mean gaussian weight prior
    pub prior_sigma: f32,
    /// initial value of the unconstrained posterior std parameter,
    /// sigma = softplus(rho)
    pub posterior_rho_init: f32,
    /// dropout probability used by dropout layers
    pub dropout_p: f32,
    pub seed: Option<u64>,
}

impl Default for BayesCfg {
    fn default() -> Self {
        Self {
            prior_sigma: 1.0,
            posterior_rho_init: -5.0,
            dropout_p: 0.5,
            seed: None,
        }
    }
}

impl BayesCfg {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let r = BufReader::new(File::open(path)?);
        let cfg: Self = serde_json::from_reader(r)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_prior_sigma(mut self, sigma: f32) -> Self {
        self.prior_sigma = sigma;
        self
    }

    pub fn with_posterior_rho_init(mut self, rho: f32) -> Self {
        self.posterior_rho_init = rho;
        self
    }

    pub fn with_dropout_p(mut self, p: f32) -> Self {
        self.dropout_p = p;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(self.prior_sigma.is_finite() && self.prior_sigma > 0.) {
            return Err(Error::InvalidConfig(format!(
                "prior_sigma has to be positive, got {}",
                self.prior_sigma
            )));
        }
        if !self.posterior_rho_init.is_finite() {
            return Err(Error::InvalidConfig(
                "posterior_rho_init has to be finite".to_string(),
            ));
        }
        if !(0. ..1.).contains(&self.dropout_p) {
            return Err(Error::InvalidConfig(format!(
                "dropout_p has to be in [0, 1), got {}",
                self.dropout_p
            )));
        }
        Ok(())
    }

    /// Host rng used for parameter initialization.
    pub(crate) fn host_rng(&self) -> ChaCha20Rng {
        match self.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        }
    }

    /// Device rng used for sampling during forward passes.
    pub(crate) fn random_engine(&self) -> RandomEngine {
        let seed = self.seed.unwrap_or_else(rand::random::<u64>);
        RandomEngine::new(RandomEngineType::PHILOX_4X32_10, Some(seed))
    }
}

#[cfg(test)]
mod tests {
    use super::BayesCfg;
    use crate::error::Error;
    use std::{fs, path::PathBuf};

    fn write_tmp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "bbb_cnn_{}_{}.json",
            std::process::id(),
            name
        ));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn default_cfg_is_valid() {
        assert!(BayesCfg::default().validate().is_ok());
    }

    #[test]
    fn non_positive_prior_sigma_is_rejected() {
        let cfg = BayesCfg::new().with_prior_sigma(0.);
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
        let cfg = BayesCfg::new().with_prior_sigma(f32::NAN);
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn dropout_p_out_of_range_is_rejected() {
        assert!(BayesCfg::new().with_dropout_p(1.0).validate().is_err());
        assert!(BayesCfg::new().with_dropout_p(-0.1).validate().is_err());
        assert!(BayesCfg::new().with_dropout_p(0.0).validate().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: BayesCfg = serde_json::from_str(r#"{"prior_sigma": 0.1, "seed": 3}"#).unwrap();
        assert_eq!(cfg.prior_sigma, 0.1);
        assert_eq!(cfg.seed, Some(3));
        assert_eq!(cfg.dropout_p, BayesCfg::default().dropout_p);
    }

    #[test]
    fn from_file_round_trips() {
        let cfg = BayesCfg::new()
            .with_prior_sigma(0.3)
            .with_posterior_rho_init(-4.)
            .with_dropout_p(0.2)
            .with_seed(11);
        let path = write_tmp("round_trip", &serde_json::to_string(&cfg).unwrap());
        let loaded = BayesCfg::from_file(&path);
        fs::remove_file(&path).unwrap();
        assert_eq!(loaded.unwrap(), cfg);
    }

    #[test]
    fn from_file_missing_path() {
        let path = std::env::temp_dir().join("bbb_cnn_does_not_exist.json");
        assert!(matches!(
            BayesCfg::from_file(&path),
            Err(Error::FromFileOpeningError(_))
        ));
    }

    #[test]
    fn from_file_malformed_json() {
        let path = write_tmp("malformed", r#"{"prior_sigma": "#);
        let loaded = BayesCfg::from_file(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(loaded, Err(Error::FromFileDeserializeError(_))));
    }

    #[test]
    fn from_file_validates() {
        let path = write_tmp("invalid", r#"{"dropout_p": 1.0}"#);
        let loaded = BayesCfg::from_file(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(loaded, Err(Error::InvalidConfig(_))));
    }
}
