pub mod activation;
pub mod bayes_conv2d;
pub mod bayes_linear;
pub mod dropout;
pub mod flatten;
pub mod gaussian;
pub mod layer;
pub mod pooling;
pub mod window;
