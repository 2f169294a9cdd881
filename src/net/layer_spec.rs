use super::{
    activation_functions::ActivationFunction,
    bayes_cfg::BayesCfg,
    layers::{
        activation::Activation, bayes_conv2d::BayesConv2d, bayes_linear::BayesLinear,
        dropout::Dropout, flatten::Flatten, layer::Layer, pooling::MaxPool2d, window::Window,
    },
};
use crate::error::Error;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Per sample tensor shape, i.e. without the batch dimension.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Shape {
    Image {
        height: usize,
        width: usize,
        channels: usize,
    },
    Features(usize),
}

impl Shape {
    pub fn image(height: usize, width: usize, channels: usize) -> Self {
        Shape::Image {
            height,
            width,
            channels,
        }
    }

    pub fn num_elements(&self) -> usize {
        match self {
            Shape::Image {
                height,
                width,
                channels,
            } => height * width * channels,
            Shape::Features(n) => *n,
        }
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Shape::Image {
                height,
                width,
                channels,
            } => write!(f, "{}x{}x{}", height, width, channels),
            Shape::Features(n) => write!(f, "{}", n),
        }
    }
}

/// Host side description of a layer, used to check and build architectures.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum LayerSpec {
    BayesConv2d {
        in_channels: usize,
        out_channels: usize,
        window: Window,
    },
    BayesLinear {
        in_features: usize,
        out_features: usize,
    },
    Activation(ActivationFunction),
    MaxPool2d {
        kernel_size: usize,
        stride: usize,
    },
    Flatten(usize),
    /// Drop probability is taken from the [`BayesCfg`] at build time.
    Dropout,
}

impl LayerSpec {
    pub fn conv(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
    ) -> Self {
        LayerSpec::BayesConv2d {
            in_channels,
            out_channels,
            window: Window::new(kernel_size, stride, padding),
        }
    }

    pub fn fc(in_features: usize, out_features: usize) -> Self {
        LayerSpec::BayesLinear {
            in_features,
            out_features,
        }
    }

    pub fn pool(kernel_size: usize, stride: usize) -> Self {
        LayerSpec::MaxPool2d {
            kernel_size,
            stride,
        }
    }

    pub fn relu() -> Self {
        LayerSpec::Activation(ActivationFunction::ReLU)
    }

    pub fn softplus() -> Self {
        LayerSpec::Activation(ActivationFunction::Softplus)
    }

    pub fn is_probabilistic(&self) -> bool {
        matches!(
            self,
            LayerSpec::BayesConv2d { .. } | LayerSpec::BayesLinear { .. }
        )
    }

    /// Number of variational parameters, a mean and a rho per weight and bias.
    pub fn num_params(&self) -> usize {
        match self {
            LayerSpec::BayesConv2d {
                in_channels,
                out_channels,
                window,
            } => {
                let k = window.kernel_size;
                2 * (k * k * in_channels * out_channels + out_channels)
            }
            LayerSpec::BayesLinear {
                in_features,
                out_features,
            } => 2 * (in_features * out_features + out_features),
            _ => 0,
        }
    }

    /// Static shape inference.
    pub fn output_shape(&self, input: Shape) -> Result<Shape, Error> {
        let mismatch = |expected: String| -> Result<Shape, Error> {
            Err(Error::shape_mismatch(&self.to_string(), expected, input))
        };
        match (self, input) {
            (
                LayerSpec::BayesConv2d {
                    in_channels,
                    out_channels,
                    window,
                },
                Shape::Image {
                    height,
                    width,
                    channels,
                },
            ) if channels == *in_channels => {
                match (window.output_len(height), window.output_len(width)) {
                    (Some(h), Some(w)) => Ok(Shape::image(h, w, *out_channels)),
                    _ => mismatch(format!("spatial dims >= {}", window.kernel_size)),
                }
            }
            (LayerSpec::BayesConv2d { in_channels, .. }, _) => {
                mismatch(format!("image with {} channels", in_channels))
            }
            (
                LayerSpec::MaxPool2d {
                    kernel_size,
                    stride,
                },
                Shape::Image {
                    height,
                    width,
                    channels,
                },
            ) => {
                let window = Window::new(*kernel_size, *stride, 0);
                match (window.output_len(height), window.output_len(width)) {
                    (Some(h), Some(w)) => Ok(Shape::image(h, w, channels)),
                    _ => mismatch(format!("spatial dims >= {}", kernel_size)),
                }
            }
            (LayerSpec::MaxPool2d { .. }, _) => mismatch("image".to_string()),
            (LayerSpec::Flatten(n), Shape::Image { .. }) if input.num_elements() == *n => {
                Ok(Shape::Features(*n))
            }
            (LayerSpec::Flatten(n), _) => mismatch(format!("image with {} elements", n)),
            (
                LayerSpec::BayesLinear {
                    in_features,
                    out_features,
                },
                Shape::Features(n),
            ) if n == *in_features => Ok(Shape::Features(*out_features)),
            (LayerSpec::BayesLinear { in_features, .. }, _) => {
                mismatch(format!("{} features", in_features))
            }
            (LayerSpec::Activation(_), _) | (LayerSpec::Dropout, _) => Ok(input),
        }
    }

    pub fn build(&self, cfg: &BayesCfg, rng: &mut ChaCha20Rng) -> Layer {
        match self {
            LayerSpec::BayesConv2d {
                in_channels,
                out_channels,
                window,
            } => BayesConv2d::new(*in_channels, *out_channels, *window, cfg, rng).into(),
            LayerSpec::BayesLinear {
                in_features,
                out_features,
            } => BayesLinear::new(*in_features, *out_features, cfg, rng).into(),
            LayerSpec::Activation(af) => Activation::new(*af).into(),
            LayerSpec::MaxPool2d {
                kernel_size,
                stride,
            } => MaxPool2d::new(*kernel_size, *stride).into(),
            LayerSpec::Flatten(n) => Flatten::new(*n).into(),
            LayerSpec::Dropout => Dropout::new(cfg.dropout_p).into(),
        }
    }
}

impl Display for LayerSpec {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            LayerSpec::BayesConv2d {
                in_channels,
                out_channels,
                window,
            } => write!(
                f,
                "BayesConv2d({}, {}, {})",
                in_channels, out_channels, window
            ),
            LayerSpec::BayesLinear {
                in_features,
                out_features,
            } => write!(f, "BayesLinear({}, {})", in_features, out_features),
            LayerSpec::Activation(af) => write!(f, "{}", af),
            LayerSpec::MaxPool2d {
                kernel_size,
                stride,
            } => write!(f, "MaxPool2d(k={}, s={})", kernel_size, stride),
            LayerSpec::Flatten(n) => write!(f, "Flatten({})", n),
            LayerSpec::Dropout => write!(f, "Dropout"),
        }
    }
}
