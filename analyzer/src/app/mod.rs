pub mod options;
pub mod pass;
pub mod run;
