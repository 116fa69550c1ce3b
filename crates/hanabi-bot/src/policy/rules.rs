use crate::bot::moves;
use crate::policy::estimate::{playability, unaccounted_cards};
use crate::policy::{RuleContext, RuleOutcome};
use hanabi_core::game::command::Move;
use hanabi_core::model::MAX_NOTE_TOKENS;
use hanabi_core::model::hint::{Hint, HintKind};
use rand::Rng;

/// Storm tokens used below which probabilistic plays are still allowed.
const STORM_MARGIN: u8 = 2;

pub const RULE_COUNT: usize = 24;

/// Every rule a genome can order, addressed by position.
pub const CATALOG: [Rule; RULE_COUNT] = [
    Rule::PlayIfCertain,
    Rule::PlayJustHinted,
    Rule::HintPlayable(HintFocus::Either),
    Rule::HintPlayable(HintFocus::Value),
    Rule::HintPlayable(HintFocus::Color),
    Rule::HintValueToNext(1),
    Rule::HintValueToNext(5),
    Rule::DiscardUseless,
    Rule::HintRandom,
    Rule::PlayRandom,
    Rule::SafePlay { threshold: 1.0 },
    Rule::SafePlay { threshold: 0.8 },
    Rule::SafePlay { threshold: 0.65 },
    Rule::SafePlay { threshold: 0.5 },
    Rule::SafePlayWithStormMargin { threshold: 0.6 },
    Rule::SafePlayWithStormMargin { threshold: 0.4 },
    Rule::SafePlayWithStormMargin { threshold: 0.2 },
    Rule::DiscardOldestUnidentified,
    Rule::DiscardOldest,
    Rule::DiscardUnidentified,
    Rule::PlayRandom,
    Rule::SafeDiscard { threshold: 0.8 },
    Rule::SafeDiscard { threshold: 0.65 },
    Rule::SafeDiscard { threshold: 0.5 },
];

/// Which field a playable-card hint reveals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintFocus {
    Either,
    Color,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    PlayIfCertain,
    PlayJustHinted,
    HintPlayable(HintFocus),
    HintValueToNext(u8),
    DiscardUseless,
    HintRandom,
    PlayRandom,
    SafePlay { threshold: f64 },
    SafePlayWithStormMargin { threshold: f64 },
    DiscardOldestUnidentified,
    DiscardOldest,
    DiscardUnidentified,
    SafeDiscard { threshold: f64 },
}

impl Rule {
    pub const fn name(&self) -> &'static str {
        match self {
            Rule::PlayIfCertain => "play_if_certain",
            Rule::PlayJustHinted => "play_just_hinted",
            Rule::HintPlayable(HintFocus::Either) => "hint_playable",
            Rule::HintPlayable(HintFocus::Color) => "hint_color_playable",
            Rule::HintPlayable(HintFocus::Value) => "hint_value_playable",
            Rule::HintValueToNext(_) => "hint_value_to_next",
            Rule::DiscardUseless => "discard_useless",
            Rule::HintRandom => "hint_random",
            Rule::PlayRandom => "play_random",
            Rule::SafePlay { .. } => "safe_play",
            Rule::SafePlayWithStormMargin { .. } => "safe_play_with_storm_margin",
            Rule::DiscardOldestUnidentified => "discard_oldest_unidentified",
            Rule::DiscardOldest => "discard_oldest",
            Rule::DiscardUnidentified => "discard_unidentified",
            Rule::SafeDiscard { .. } => "safe_discard",
        }
    }

    pub const fn threshold(&self) -> Option<f64> {
        match self {
            Rule::SafePlay { threshold }
            | Rule::SafePlayWithStormMargin { threshold }
            | Rule::SafeDiscard { threshold } => Some(*threshold),
            _ => None,
        }
    }

    /// Proposes a move or declines. Never mutates the context.
    pub fn evaluate<R: Rng + ?Sized>(&self, ctx: &RuleContext<'_>, rng: &mut R) -> RuleOutcome {
        match *self {
            Rule::PlayIfCertain => play_if_certain(ctx),
            Rule::PlayJustHinted => play_just_hinted(ctx),
            Rule::HintPlayable(focus) => hint_playable(ctx, focus, rng),
            Rule::HintValueToNext(value) => hint_value_to_next(ctx, value),
            Rule::DiscardUseless => discard_useless(ctx),
            Rule::HintRandom => RuleOutcome::from_move(moves::random_hint(ctx.view, ctx.player, rng)),
            Rule::PlayRandom => RuleOutcome::from_move(moves::random_move(ctx.view, ctx.player, rng)),
            Rule::SafePlay { threshold } => safe_play(ctx, threshold),
            Rule::SafePlayWithStormMargin { threshold } => {
                if ctx.view.used_storm_tokens < STORM_MARGIN {
                    safe_play(ctx, threshold)
                } else {
                    RuleOutcome::Decline
                }
            }
            Rule::DiscardOldestUnidentified => discard_oldest(ctx, true),
            Rule::DiscardOldest => discard_oldest(ctx, false),
            Rule::DiscardUnidentified => discard_unidentified(ctx),
            Rule::SafeDiscard { threshold } => safe_discard(ctx, threshold),
        }
    }
}

fn play_if_certain(ctx: &RuleContext<'_>) -> RuleOutcome {
    let table = &ctx.view.table;
    ctx.beliefs
        .slots()
        .iter()
        .position(|slot| slot.is_playable(table))
        .and_then(|slot| moves::play(ctx.view, slot))
        .map_or(RuleOutcome::Decline, RuleOutcome::from_move)
}

fn play_just_hinted(ctx: &RuleContext<'_>) -> RuleOutcome {
    let Some(index) = ctx.beliefs.last_hinted() else {
        return RuleOutcome::Decline;
    };
    match ctx.beliefs.slot(index) {
        Some(slot) if slot.is_playable(&ctx.view.table) => {
            moves::play(ctx.view, index).map_or(RuleOutcome::Decline, RuleOutcome::from_move)
        }
        _ => RuleOutcome::Decline,
    }
}

fn hint_playable<R: Rng + ?Sized>(ctx: &RuleContext<'_>, focus: HintFocus, rng: &mut R) -> RuleOutcome {
    if ctx.view.used_note_tokens >= MAX_NOTE_TOKENS {
        return RuleOutcome::Decline;
    }
    for player in ctx.view.others(ctx.player) {
        let Some(card) = player.hand.iter().find(|card| ctx.view.table.accepts(card)) else {
            continue;
        };
        let kind = match focus {
            HintFocus::Either => moves::random_kind(rng),
            HintFocus::Color => HintKind::Color,
            HintFocus::Value => HintKind::Value,
        };
        let hint = Hint::about(kind, card);
        return RuleOutcome::from_move(moves::hint(ctx.view, ctx.player, &player.name, hint));
    }
    RuleOutcome::Decline
}

fn hint_value_to_next(ctx: &RuleContext<'_>, value: u8) -> RuleOutcome {
    if ctx.view.used_note_tokens >= MAX_NOTE_TOKENS {
        return RuleOutcome::Decline;
    }
    let Some(next) = ctx.view.next_player_after(ctx.player) else {
        return RuleOutcome::Decline;
    };
    RuleOutcome::from_move(moves::hint(ctx.view, ctx.player, &next.name, Hint::Value(value)))
}

fn discard_useless(ctx: &RuleContext<'_>) -> RuleOutcome {
    if ctx.view.used_note_tokens == 0 {
        return RuleOutcome::Decline;
    }
    let table = &ctx.view.table;
    ctx.beliefs
        .slots()
        .iter()
        .position(|slot| slot.is_known() && !slot.is_playable(table))
        .and_then(|slot| moves::discard(ctx.view, slot))
        .map_or(RuleOutcome::Decline, RuleOutcome::from_move)
}

fn discard_oldest(ctx: &RuleContext<'_>, unidentified_only: bool) -> RuleOutcome {
    if ctx.view.used_note_tokens == 0 {
        return RuleOutcome::Decline;
    }
    ctx.beliefs
        .slots()
        .iter()
        .enumerate()
        .filter(|(_, slot)| !unidentified_only || slot.is_unidentified())
        .min_by_key(|(_, slot)| slot.last_update)
        .and_then(|(index, _)| moves::discard(ctx.view, index))
        .map_or(RuleOutcome::Decline, RuleOutcome::from_move)
}

fn discard_unidentified(ctx: &RuleContext<'_>) -> RuleOutcome {
    if ctx.view.used_note_tokens == 0 {
        return RuleOutcome::Decline;
    }
    ctx.beliefs
        .slots()
        .iter()
        .position(|slot| slot.is_unidentified())
        .and_then(|slot| moves::discard(ctx.view, slot))
        .map_or(RuleOutcome::Decline, RuleOutcome::from_move)
}

fn safe_play(ctx: &RuleContext<'_>, threshold: f64) -> RuleOutcome {
    best_slot(ctx, threshold, |p| p)
        .and_then(|slot| moves::play(ctx.view, slot))
        .map_or(RuleOutcome::Decline, RuleOutcome::from_move)
}

fn safe_discard(ctx: &RuleContext<'_>, threshold: f64) -> RuleOutcome {
    if ctx.view.used_note_tokens == 0 {
        return RuleOutcome::Decline;
    }
    best_slot(ctx, threshold, |p| 1.0 - p)
        .and_then(|slot| moves::discard(ctx.view, slot))
        .map_or(RuleOutcome::Decline, RuleOutcome::from_move)
}

/// Highest-scoring slot whose score reaches `threshold`; ties keep the earliest slot.
fn best_slot(ctx: &RuleContext<'_>, threshold: f64, score: impl Fn(f64) -> f64) -> Option<usize> {
    let pool = unaccounted_cards(ctx.view, ctx.player);
    let mut best: Option<(usize, f64)> = None;
    for (index, slot) in ctx.beliefs.slots().iter().enumerate() {
        let value = score(playability(slot, &pool, &ctx.view.table));
        if value >= threshold && best.is_none_or(|(_, current)| value > current) {
            best = Some((index, value));
        }
    }
    best.map(|(index, _)| index)
}

impl RuleOutcome {
    /// A refresh is not a proposal: the rule had nothing useful to do.
    pub(crate) fn from_move(mv: Move) -> Self {
        if mv.is_show() {
            RuleOutcome::Decline
        } else {
            RuleOutcome::Propose(mv)
        }
    }
}
