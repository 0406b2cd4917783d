pub mod config;
pub mod logging;
pub mod names;
pub mod run;
