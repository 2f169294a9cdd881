//! Convolutional networks with gaussian variational posteriors over their
//! weights (Bayes by Backprop), evaluated on ArrayFire.

pub mod af_helpers;
pub mod error;
pub mod net;

pub use error::Error;
pub use net::{
    architectures::{Architecture, BayesNet},
    bayes_cfg::BayesCfg,
};
