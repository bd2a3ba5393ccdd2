// Poetry Bot — library root.
// atoms: pure types and contracts. engine: everything with side effects.

pub mod atoms;
pub mod engine;
