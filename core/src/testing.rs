pub mod batch;
pub mod listener;
pub mod pool;
pub mod process;
pub mod result;
pub mod stopwatch;

pub use batch::*;
pub use listener::*;
pub use pool::*;
pub use process::*;
pub use result::*;
pub use stopwatch::*;
