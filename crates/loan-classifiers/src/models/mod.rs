pub mod gbdt;
pub mod logistic;
#[cfg(feature = "nnet")]
pub mod neural_net;
pub mod random_forest;
pub mod svm;

pub mod classifier_trait;
pub mod factory;
pub mod pipeline;
