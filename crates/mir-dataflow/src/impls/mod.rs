//! The borrow checker's dataflow problems.

mod borrows;
mod initialized;

#[cfg(test)]
mod tests;

pub use self::borrows::Borrows;
pub use self::initialized::MaybeUninitializedPlaces;
