pub mod card;
pub mod color;
pub mod deck;
pub mod hint;
pub mod table;
pub mod view;

/// Note tokens available to the whole table; every hint consumes one.
pub const MAX_NOTE_TOKENS: u8 = 8;
/// Third storm token ends the game.
pub const MAX_STORM_TOKENS: u8 = 3;
