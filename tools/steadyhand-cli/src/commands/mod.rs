pub mod calibrate;
pub mod check;
pub mod config;
pub mod run;
