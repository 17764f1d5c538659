//! Generates text from a compiled [`Program`].

use rand::distributions::Uniform;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Mcg128Xsl64;

use crate::config::Config;
use crate::error::{ConfigError, GenerationError, GenerationErrorKind};
use crate::pattern::ast::{Bounds, FirstModifier, NumberFormat, Program, Step};
use crate::pattern::expr::{Expression, Scope, index_value};

type StepResult = Result<String, GenerationErrorKind>;

/// A compiled pattern together with its random source and per-range context.
///
/// Callers describe the range being generated with
/// [`Generator::set_range_context`] and then call [`Generator::generate`].
#[derive(Debug, Clone)]
pub struct Generator {
    program: Program,
    upper_bound: usize,
    rng: Mcg128Xsl64,
    range_index: usize,
    /// `None` marks a group that did not take part in the match.
    source_groups: Vec<Option<String>>,
    source_values: Vec<f64>,
    /// Source groups of the first range, for `:first` and `:-first`.
    first_groups: Option<Vec<Option<String>>>,
}

impl Generator {
    /// A generator seeded from the thread RNG.
    pub fn new(program: Program, config: &Config) -> Self {
        Self {
            program,
            upper_bound: config.upper_bound(),
            rng: Mcg128Xsl64::seed_from_u64(rand::thread_rng().r#gen()),
            range_index: 0,
            source_groups: Vec::new(),
            source_values: Vec::new(),
            first_groups: None,
        }
    }

    /// Replace the random source with one seeded from `seed`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.reseed(seed);
        self
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = Mcg128Xsl64::seed_from_u64(seed);
    }

    /// Number of capturing groups in the pattern.
    pub fn group_count(&self) -> usize {
        self.program.group_count
    }

    pub fn range_index(&self) -> usize {
        self.range_index
    }

    /// Set the index of the range about to be generated and the capture
    /// groups of its original text.
    pub fn set_range_context(&mut self, range_index: usize, source_groups: Vec<Option<String>>) {
        self.source_values = source_groups
            .iter()
            .map(|group| group.as_deref().map_or(0.0, source_value))
            .collect();
        self.source_groups = source_groups;
        self.range_index = range_index;
    }

    /// Forget the first range's source groups.
    pub fn reset_first_snapshot(&mut self) {
        self.first_groups = None;
    }

    /// Generate the text for the current range.
    pub fn generate(&mut self) -> Result<String, GenerationError> {
        let mut context = GenerationContext {
            rng: &mut self.rng,
            upper_bound: self.upper_bound,
            range_index: self.range_index,
            source_groups: &self.source_groups,
            source_values: &self.source_values,
            first_groups: &mut self.first_groups,
            groups: Vec::new(),
            group_slots: vec![None; self.program.group_count],
            counters: Vec::new(),
        };
        context
            .eval_steps(&self.program.steps)
            .map_err(|kind| GenerationError {
                range_index: self.range_index,
                kind,
            })
    }
}

/// Mutable state for a single [`Generator::generate`] call.
struct GenerationContext<'g> {
    rng: &'g mut Mcg128Xsl64,
    upper_bound: usize,
    range_index: usize,
    source_groups: &'g [Option<String>],
    source_values: &'g [f64],
    first_groups: &'g mut Option<Vec<Option<String>>>,
    /// Capture group values, in the order the groups were first entered.
    groups: Vec<String>,
    /// Capture index claimed by each group step, by step id.
    group_slots: Vec<Option<usize>>,
    /// Active repetition counters, outermost first.
    counters: Vec<usize>,
}

impl GenerationContext<'_> {
    fn scope(&self) -> Scope<'_> {
        Scope {
            counters: &self.counters,
            range_index: self.range_index,
            source_values: self.source_values,
        }
    }

    fn eval_steps(&mut self, steps: &[Step]) -> StepResult {
        let mut text = String::new();
        for step in steps {
            text.push_str(&self.eval_step(step)?);
        }
        Ok(text)
    }

    fn eval_step(&mut self, step: &Step) -> StepResult {
        match step {
            Step::Literal(text) => Ok(text.clone()),
            Step::Class(set) => Ok(set.draw_string(&mut *self.rng)),
            Step::Group { id, body } => {
                let slot = match self.group_slots[*id] {
                    Some(slot) => slot,
                    None => {
                        let slot = self.groups.len();
                        self.groups.push(String::new());
                        self.group_slots[*id] = Some(slot);
                        slot
                    }
                };
                let text = self.eval_steps(body)?;
                self.groups[slot].clone_from(&text);
                Ok(text)
            }
            Step::Backref(n) => n
                .checked_sub(1)
                .and_then(|at| self.groups.get(at))
                .cloned()
                .ok_or(GenerationErrorKind::UnknownGroup(*n)),
            Step::Repeat {
                step,
                bounds,
                construct,
            } => {
                let (min, max) = self.bounds(bounds, construct)?;
                let count = self.rng.sample(Uniform::new_inclusive(min, max));
                self.counters.push(0);
                let mut text = String::new();
                for i in 0..count {
                    if let Some(counter) = self.counters.last_mut() {
                        *counter = i;
                    }
                    text.push_str(&self.eval_step(step)?);
                }
                self.counters.pop();
                Ok(text)
            }
            Step::SourceBackref {
                index,
                modifier,
                construct,
            } => self.source_group(index, *modifier, construct),
            Step::Numeric { value, format } => {
                let value = value.eval(&self.scope())?;
                Ok(format.format(value))
            }
            Step::Alternation(branches) => match branches.choose(&mut *self.rng) {
                Some(branch) => self.eval_steps(branch),
                None => Ok(String::new()),
            },
        }
    }

    /// Inclusive repetition range for `bounds`, evaluated in the scope
    /// surrounding the loop.
    fn bounds(&self, bounds: &Bounds, construct: &str) -> Result<(usize, usize), GenerationErrorKind> {
        let upper_bound = self.upper_bound;
        let range = match bounds {
            Bounds::ZeroOrMore => (0, upper_bound),
            Bounds::ZeroOrOne => (0, 1),
            Bounds::OneOrMore => (1, upper_bound.max(1)),
            Bounds::Exactly(n) => {
                let n = self.count(n, construct)?;
                (n, n)
            }
            Bounds::AtLeast(n) => {
                let n = self.count(n, construct)?;
                if n > upper_bound {
                    return Err(GenerationErrorKind::Config(
                        ConfigError::MinimumAboveUpperBound {
                            minimum: n,
                            upper_bound,
                            construct: construct.to_string(),
                        },
                    ));
                }
                (n, upper_bound)
            }
            Bounds::Between(n, m) => {
                let (n, m) = (self.count(n, construct)?, self.count(m, construct)?);
                if m < n {
                    return Err(GenerationErrorKind::Config(ConfigError::BoundsOutOfOrder {
                        construct: construct.to_string(),
                    }));
                }
                (n, m)
            }
        };
        Ok(range)
    }

    fn count(&self, expr: &Expression, construct: &str) -> Result<usize, GenerationErrorKind> {
        let count = expr.eval(&self.scope())?;
        if count < 0.0 {
            return Err(GenerationErrorKind::InvalidCount {
                construct: construct.to_string(),
                count,
            });
        }
        Ok(count.trunc() as usize)
    }

    fn source_group(
        &mut self,
        index: &Expression,
        modifier: Option<FirstModifier>,
        construct: &str,
    ) -> StepResult {
        let value = index.eval(&self.scope())?;
        let at = index_value(value).ok();

        let mut first = None;
        if modifier.is_some() {
            if self.range_index == 0 || self.first_groups.is_none() {
                *self.first_groups = Some(self.source_groups.to_vec());
            }
            first = self
                .first_groups
                .as_ref()
                .zip(at)
                .and_then(|(groups, at)| groups.get(at))
                .and_then(Option::as_ref)
                .filter(|group| !group.is_empty());
        }

        let current = at
            .and_then(|at| self.source_groups.get(at))
            .and_then(Option::as_ref)
            .ok_or_else(|| GenerationErrorKind::UnknownSourceGroup {
                construct: construct.to_string(),
                index: NumberFormat::default().format(value),
            })?;
        let text = match (modifier, first) {
            (Some(FirstModifier::First), Some(first)) => first.as_str(),
            (Some(FirstModifier::MinusFirst), Some(first)) => {
                current.strip_prefix(first.as_str()).unwrap_or(current.as_str())
            }
            _ => current.as_str(),
        };
        Ok(text.to_string())
    }
}

/// The number a source group stands for in `S[k]`: its decimal (or `0x`,
/// `0o`, `0b` prefixed) value, or 0 for anything else, including blank text
/// and non-finite values.
fn source_value(text: &str) -> f64 {
    let text = text.trim();
    let radix = match text.get(..2) {
        Some("0x" | "0X") => 16,
        Some("0o" | "0O") => 8,
        Some("0b" | "0B") => 2,
        _ => 10,
    };
    if radix != 10 {
        let digits = &text[2..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return 0.0;
        }
        return u64::from_str_radix(digits, radix).map_or(0.0, |value| value as f64);
    }
    // `inf`, `NaN` and friends are not numbers here.
    if text.chars().any(|c| c.is_alphabetic() && !matches!(c, 'e' | 'E')) {
        return 0.0;
    }
    text.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}
