mod estimate;
mod genome;
mod rules;

pub use estimate::{playability, unaccounted_cards};
pub use genome::{Genome, GenomeError};
pub use rules::{CATALOG, HintFocus, RULE_COUNT, Rule};

use hanabi_core::belief::BeliefStore;
use hanabi_core::game::command::Move;
use hanabi_core::model::view::GameView;
use rand::Rng;
use tracing::{Level, event};

/// Everything a rule may look at when deciding.
pub struct RuleContext<'a> {
    pub player: &'a str,
    pub view: &'a GameView,
    pub beliefs: &'a BeliefStore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Propose(Move),
    Decline,
}

impl RuleOutcome {
    pub const fn is_declined(&self) -> bool {
        matches!(self, RuleOutcome::Decline)
    }

    pub fn into_move(self) -> Option<Move> {
        match self {
            RuleOutcome::Propose(mv) => Some(mv),
            RuleOutcome::Decline => None,
        }
    }
}

/// A move together with the rule that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub priority: usize,
    pub rule: Rule,
    pub mv: Move,
}

/// Rules evaluated strictly in priority order; the first proposal wins.
#[derive(Debug, Clone, PartialEq)]
pub struct RulePolicy {
    order: Vec<Rule>,
}

impl RulePolicy {
    pub fn new(order: Vec<Rule>) -> Self {
        Self { order }
    }

    pub fn from_genome(genome: &Genome) -> Result<Self, GenomeError> {
        let genome = genome.clone().expect_len(RULE_COUNT)?;
        Ok(Self::new(
            genome.genes().iter().map(|&gene| CATALOG[gene]).collect(),
        ))
    }

    pub fn catalog_order() -> Self {
        Self::new(CATALOG.to_vec())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.order
    }

    /// Lazily yields every non-declining rule's move in priority order.
    ///
    /// Callers stop pulling once the session accepts a move, so later rules
    /// are never evaluated.
    pub fn proposals<'a, R: Rng + ?Sized>(
        &'a self,
        ctx: &'a RuleContext<'a>,
        rng: &'a mut R,
    ) -> impl Iterator<Item = Proposal> + 'a {
        self.order
            .iter()
            .enumerate()
            .filter_map(move |(priority, rule)| {
                let mv = rule.evaluate(ctx, &mut *rng).into_move()?;
                event!(
                    target: "hanabi_bot::policy",
                    Level::DEBUG,
                    player = ctx.player,
                    rule = rule.name(),
                    priority,
                    command = %mv,
                    "rule proposed move"
                );
                Some(Proposal {
                    priority,
                    rule: *rule,
                    mv,
                })
            })
    }

    /// The first proposal, or a refresh when every rule declines.
    pub fn decide<R: Rng + ?Sized>(&self, ctx: &RuleContext<'_>, rng: &mut R) -> Move {
        for rule in &self.order {
            if let RuleOutcome::Propose(mv) = rule.evaluate(ctx, &mut *rng) {
                return mv;
            }
        }
        Move::Show
    }
}

impl Default for RulePolicy {
    fn default() -> Self {
        Self::catalog_order()
    }
}
