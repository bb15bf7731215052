//! Concrete network implementations.

pub mod resnet;

pub use resnet::{PolicyNet, PolicyNetConfig, ResBlock, ResBlockConfig, ValueNet, ValueNetConfig};
