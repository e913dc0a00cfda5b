pub mod broadcast;
pub mod capture;
pub mod config;
pub mod display;
pub mod pose;
pub mod protocol;
pub mod render;
pub mod tracker;
