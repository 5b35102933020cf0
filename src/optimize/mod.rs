pub mod levenberg_marquardt;
pub mod logistic;
pub mod newton;
