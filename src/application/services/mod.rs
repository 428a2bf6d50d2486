//! Application services - orchestration around the dispatcher

pub mod server_worker;

pub use server_worker::ServerWorkers;
