// Poetry Engine — autonomous poetry agent runtime
// Particles accumulate and decay in the store; the scheduler decides when
// to write, the pipeline writes, and the reflection and research cycles feed
// new particles back in. Collaborators (model, weather, search, push) are
// reached only through the traits in atoms::traits.

pub mod commands;
pub mod config;
pub mod http;
pub mod notify;
pub mod parse;
pub mod particles;
pub mod poems;
pub mod prompts;
pub mod providers;
pub mod readiness;
pub mod reflection;
pub mod research;
pub mod scheduler;
pub mod season;
pub mod state;
pub mod store;
pub mod weather;
pub mod web;

#[cfg(test)]
pub(crate) mod testing;
