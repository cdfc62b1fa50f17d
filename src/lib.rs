pub mod config;
pub mod flashcards;
pub mod quiz;
pub mod vocab;

#[cfg(test)]
mod testing;
