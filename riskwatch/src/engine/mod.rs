pub mod dispatcher;
pub mod fusion;
