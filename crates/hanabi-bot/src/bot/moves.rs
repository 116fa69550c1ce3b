//! Construction of concrete moves against the current view.
//!
//! Builders never fail loudly: an impossible move either yields `None`
//! (bad slot index) or degrades to [`Move::Show`].

use hanabi_core::game::command::Move;
use hanabi_core::model::MAX_NOTE_TOKENS;
use hanabi_core::model::hint::{Hint, HintKind};
use hanabi_core::model::view::{GameView, PlayerHand};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;
use tracing::{Level, event};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HintRejection {
    #[error("all note tokens are in use")]
    TokensExhausted,
    #[error("cannot hint yourself")]
    SelfHint,
    #[error("no player named '{0}'")]
    UnknownDestination(String),
    #[error("{hint} matches nothing in {destination}'s hand")]
    NotInHand { destination: String, hint: Hint },
}

pub fn play(view: &GameView, slot: usize) -> Option<Move> {
    (slot < view.hand_size()).then_some(Move::Play { slot })
}

/// Discarding with no note token spent degrades to a refresh.
pub fn discard(view: &GameView, slot: usize) -> Option<Move> {
    if slot >= view.hand_size() {
        return None;
    }
    if view.used_note_tokens == 0 {
        return Some(Move::Show);
    }
    Some(Move::Discard { slot })
}

/// Checks a hint against the destination's true hand.
pub fn validate_hint(
    view: &GameView,
    me: &str,
    destination: &str,
    hint: Hint,
) -> Result<(), HintRejection> {
    if view.used_note_tokens >= MAX_NOTE_TOKENS {
        return Err(HintRejection::TokensExhausted);
    }
    if destination == me {
        return Err(HintRejection::SelfHint);
    }
    let player = view
        .player(destination)
        .ok_or_else(|| HintRejection::UnknownDestination(destination.to_string()))?;
    if !player.hand.iter().any(|card| hint.matches(card)) {
        return Err(HintRejection::NotInHand {
            destination: destination.to_string(),
            hint,
        });
    }
    Ok(())
}

pub fn hint(view: &GameView, me: &str, destination: &str, hint: Hint) -> Move {
    match validate_hint(view, me, destination, hint) {
        Ok(()) => Move::Hint {
            destination: destination.to_string(),
            hint,
        },
        Err(reason) => {
            event!(
                target: "hanabi_bot::moves",
                Level::DEBUG,
                player = me,
                destination,
                %hint,
                %reason,
                "hint rejected; falling back to refresh"
            );
            Move::Show
        }
    }
}

pub fn random_kind<R: Rng + ?Sized>(rng: &mut R) -> HintKind {
    if rng.gen_bool(0.5) {
        HintKind::Color
    } else {
        HintKind::Value
    }
}

/// A truthful hint about a random card of a random other player.
pub fn random_hint<R: Rng + ?Sized>(view: &GameView, me: &str, rng: &mut R) -> Move {
    if view.used_note_tokens >= MAX_NOTE_TOKENS {
        return Move::Show;
    }
    let candidates: Vec<&PlayerHand> = view
        .others(me)
        .filter(|player| !player.hand.is_empty())
        .collect();
    let Some(target) = candidates.choose(rng) else {
        return Move::Show;
    };
    let Some(card) = target.hand.choose(rng) else {
        return Move::Show;
    };
    let kind = random_kind(rng);
    hint(view, me, &target.name, Hint::about(kind, card))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveKind {
    Play,
    Discard,
    Hint,
}

/// Uniformly picks a move kind the token counts allow, then a random move of that kind.
pub fn random_move<R: Rng + ?Sized>(view: &GameView, me: &str, rng: &mut R) -> Move {
    if view.players.is_empty() {
        return Move::Show;
    }
    let mut kinds = vec![MoveKind::Play];
    if view.used_note_tokens > 0 {
        kinds.push(MoveKind::Discard);
    }
    if view.used_note_tokens < MAX_NOTE_TOKENS {
        kinds.push(MoveKind::Hint);
    }
    let hand_size = view.hand_size();
    let picked = kinds.choose(rng).copied().unwrap_or(MoveKind::Play);
    let built = match picked {
        MoveKind::Play => play(view, rng.gen_range(0..hand_size)),
        MoveKind::Discard => discard(view, rng.gen_range(0..hand_size)),
        MoveKind::Hint => Some(random_hint(view, me, rng)),
    };
    built.unwrap_or(Move::Show)
}
