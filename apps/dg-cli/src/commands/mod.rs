pub mod check;
pub mod show;
pub mod validate;
pub mod watch;
