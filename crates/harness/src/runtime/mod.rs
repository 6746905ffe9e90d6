//! Runtime — boot (logging + config) and the suite driver.

pub mod boot;
pub mod run;
