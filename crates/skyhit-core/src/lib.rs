pub mod calibration;
pub mod config;
pub mod consts;
pub mod downsample;
pub mod error;
pub mod frame;
pub mod grid;
pub mod trigger;
pub mod weight_map;
