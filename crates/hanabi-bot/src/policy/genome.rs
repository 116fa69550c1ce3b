use core::fmt;
use core::str::FromStr;

use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

/// A total priority order over rules: a permutation of `0..len`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Genome {
    genes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenomeError {
    #[error("gene {gene} is outside 0..{len}")]
    OutOfRange { gene: usize, len: usize },
    #[error("gene {0} appears more than once")]
    Duplicate(usize),
    #[error("expected {expected} genes, found {found}")]
    Length { expected: usize, found: usize },
    #[error("cannot parse gene '{0}'")]
    InvalidGene(String),
}

impl Genome {
    pub fn identity(len: usize) -> Self {
        Self {
            genes: (0..len).collect(),
        }
    }

    pub fn shuffled<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        let mut genome = Self::identity(len);
        genome.genes.shuffle(rng);
        genome
    }

    pub fn from_genes(genes: Vec<usize>) -> Result<Self, GenomeError> {
        let len = genes.len();
        let mut seen = vec![false; len];
        for &gene in &genes {
            if gene >= len {
                return Err(GenomeError::OutOfRange { gene, len });
            }
            if std::mem::replace(&mut seen[gene], true) {
                return Err(GenomeError::Duplicate(gene));
            }
        }
        Ok(Self { genes })
    }

    pub fn genes(&self) -> &[usize] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Exchanges two positions. Panics if either is out of bounds, like [`slice::swap`].
    pub fn swap(&mut self, a: usize, b: usize) {
        self.genes.swap(a, b);
    }

    pub fn expect_len(self, expected: usize) -> Result<Self, GenomeError> {
        if self.len() == expected {
            Ok(self)
        } else {
            Err(GenomeError::Length {
                expected,
                found: self.len(),
            })
        }
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, gene) in self.genes.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{gene}")?;
        }
        Ok(())
    }
}

impl FromStr for Genome {
    type Err = GenomeError;

    /// Accepts whitespace or comma separated genes, optionally wrapped in brackets.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s.trim().trim_start_matches('[').trim_end_matches(']');
        let genes = inner
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .map(|token| {
                token
                    .parse::<usize>()
                    .map_err(|_| GenomeError::InvalidGene(token.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_genes(genes)
    }
}
