pub mod activation_functions;
pub mod architectures;
pub mod bayes_cfg;
pub mod layer_spec;
pub mod layers;
pub mod module_list;
