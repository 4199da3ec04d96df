pub mod cmd;
pub mod config;
pub mod executable;
pub mod printer;
pub mod util;
