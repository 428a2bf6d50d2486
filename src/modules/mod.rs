//! Builtin modules shipped with the bot
//!
//! Kept deliberately small; they exist to exercise the registration and
//! dispatch surfaces end to end.

pub mod echo;
pub mod greeter;

pub use echo::EchoModule;
pub use greeter::GreeterModule;
