// Poetry Engine — Particles
//   graph   — keyword tokenizer + connection snapshot at insert time
//   decay   — per-tick strength decay, floor pruning, population cap
//   ingest  — every path that creates particles (season, weather, extracted
//             bullets from references / feedback / research / critique)

pub mod decay;
pub mod graph;
pub mod ingest;

pub use decay::{decay_factor, run_decay};
pub use graph::{extract_keywords, find_connections, insert_with_connections};
