pub mod compile;
pub mod init;
pub mod watch;
pub mod widgets;

pub use compile::{compile, CompileArgs};
pub use init::{init, InitArgs};
pub use watch::{watch, WatchArgs};
pub use widgets::{widgets, WidgetsArgs};
