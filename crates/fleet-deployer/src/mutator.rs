//! Whitespace mutation of contract sources.
//!
//! Candidate insertion sites are the line breaks of the canonical source plus the gaps right after
//! every `{`, `}` and `;` in code. Comments and string literals contribute no gaps. A random
//! subset of the sites is picked and each picked site located after the first `{` receives
//! between zero and `max_insertions_per_site` extra newlines. The compiler embeds a hash of the
//! source in the bytecode metadata, so any byte difference between two variants yields distinct
//! bytecode.
//!
//! Uniqueness is probabilistic. With `s` sites and `m` maximum insertions, a single draw leaves the
//! source untouched with probability of roughly `(1 / (s + 1)) * (m + 1) / m`, so two independent
//! variants of a source with ten sites and `m = 4` collide in about 1–2% of draws.
//! [`SourceMutator::generate_batch`] redraws colliding variants a bounded number of times.

use std::collections::HashSet;

use rand::{seq::index, Rng};
use tracing::{debug, warn};

use crate::{ContractSource, ContractVariant};

/// Errors raised while mutating a source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    /// The source text is empty
    #[error("contract source '{0}' is empty")]
    EmptySource(String),

    /// The source has no opening brace, so there is no body to insert into
    #[error("contract source '{0}' has no contract body (missing '{{')")]
    MissingBody(String),
}

/// A single planned insertion, expressed as an offset into the canonical source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    /// Byte offset of the site in the canonical source.
    pub site: usize,
    /// Number of filler characters inserted before the site.
    pub count: usize,
}

/// Lexical context of the scanner in [`SourceMutator::candidate_sites`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lexeme {
    Code,
    LineComment,
    BlockComment,
    Str(u8),
}

/// Produces whitespace-only variants of a contract source.
#[derive(Debug, Clone, Copy)]
pub struct SourceMutator {
    max_insertions_per_site: usize,
}

impl Default for SourceMutator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_INSERTIONS)
    }
}

impl SourceMutator {
    /// Character inserted at a selected site.
    pub const FILLER: char = '\n';
    /// Default upper bound of fillers inserted per site.
    pub const DEFAULT_MAX_INSERTIONS: usize = 4;
    /// Default number of draws per variant before a duplicate is accepted.
    pub const DEFAULT_MAX_ATTEMPTS: usize = 16;

    /// Creates a mutator inserting at most `max_insertions_per_site` fillers at each site.
    pub const fn new(max_insertions_per_site: usize) -> Self {
        Self { max_insertions_per_site }
    }

    /// Byte offsets of every candidate insertion site in `text`, ascending and unique.
    ///
    /// A site is the offset of a line break, or the offset right after a `{`, `}` or `;` that is
    /// neither inside a comment nor inside a string literal.
    pub fn candidate_sites(text: &str) -> Vec<usize> {
        let bytes = text.as_bytes();
        let mut sites = Vec::new();
        let mut state = Lexeme::Code;
        let mut i = 0;
        while i < bytes.len() {
            let next = bytes.get(i + 1).copied();
            match (state, bytes[i]) {
                (Lexeme::Code, b'/') if next == Some(b'/') => {
                    state = Lexeme::LineComment;
                    i += 1;
                }
                (Lexeme::Code, b'/') if next == Some(b'*') => {
                    state = Lexeme::BlockComment;
                    i += 1;
                }
                (Lexeme::Code, quote @ (b'"' | b'\'')) => state = Lexeme::Str(quote),
                (Lexeme::Code, b'{' | b'}' | b';') => sites.push(i + 1),
                (Lexeme::Code | Lexeme::BlockComment, b'\n') => sites.push(i),
                (Lexeme::LineComment, b'\n') => {
                    sites.push(i);
                    state = Lexeme::Code;
                }
                (Lexeme::BlockComment, b'*') if next == Some(b'/') => {
                    state = Lexeme::Code;
                    i += 1;
                }
                (Lexeme::Str(_), b'\\') => i += 1,
                (Lexeme::Str(quote), c) if c == quote || c == b'\n' => state = Lexeme::Code,
                _ => {}
            }
            i += 1;
        }
        sites.dedup();
        sites
    }

    /// Draws the insertions for one variant, in ascending site order.
    ///
    /// Sites at or before the first `{` are drawn but never planned, so the declaration header is
    /// left untouched. Zero-count insertions are dropped from the plan.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        source: &ContractSource,
        rng: &mut R,
    ) -> Result<Vec<Insertion>, MutationError> {
        let text = source.text();
        if text.is_empty() {
            return Err(MutationError::EmptySource(source.file_name().to_string()));
        }
        let body_start = text
            .find('{')
            .ok_or_else(|| MutationError::MissingBody(source.file_name().to_string()))?;

        let sites = Self::candidate_sites(text);
        let amount = rng.random_range(0..=sites.len());
        let mut selected: Vec<usize> =
            index::sample(rng, sites.len(), amount).into_iter().map(|i| sites[i]).collect();
        selected.sort_unstable();

        let mut plan = Vec::with_capacity(selected.len());
        for site in selected {
            let count = rng.random_range(0..=self.max_insertions_per_site);
            if site > body_start && count > 0 {
                plan.push(Insertion { site, count });
            }
        }
        Ok(plan)
    }

    /// Applies a plan produced by [`Self::plan`] to `text`.
    ///
    /// Sites are offsets into the original text; the running number of inserted characters is
    /// added to each site so later offsets stay valid.
    pub fn apply(text: &str, plan: &[Insertion]) -> String {
        let total: usize = plan.iter().map(|insertion| insertion.count).sum();
        let mut out = String::with_capacity(text.len() + total);
        out.push_str(text);

        let mut offset = 0;
        for insertion in plan {
            let filler: String = std::iter::repeat_n(Self::FILLER, insertion.count).collect();
            out.insert_str(insertion.site + offset, &filler);
            offset += insertion.count;
        }
        out
    }

    /// Produces one variant of `source`.
    pub fn mutate<R: Rng + ?Sized>(
        &self,
        source: &ContractSource,
        rng: &mut R,
    ) -> Result<ContractVariant, MutationError> {
        let plan = self.plan(source, rng)?;
        let inserted = plan.iter().map(|insertion| insertion.count).sum();
        let text = Self::apply(source.text(), &plan);
        Ok(ContractVariant::new(ContractSource::new(source.file_name(), text), inserted))
    }

    /// Produces `count` variants of `source` for a whole batch.
    ///
    /// A variant whose text equals an earlier one is redrawn up to `max_attempts` times. When the
    /// attempts run out the duplicate is kept and a warning is logged.
    pub fn generate_batch<R: Rng + ?Sized>(
        &self,
        source: &ContractSource,
        count: usize,
        max_attempts: usize,
        rng: &mut R,
    ) -> Result<Vec<ContractVariant>, MutationError> {
        let mut seen = HashSet::with_capacity(count);
        let mut variants = Vec::with_capacity(count);

        for index in 0..count {
            let mut attempt = 1;
            let variant = loop {
                let variant = self.mutate(source, rng)?;
                if !seen.contains(variant.text()) {
                    break variant;
                }
                if attempt >= max_attempts.max(1) {
                    warn!(index, attempts = attempt, "Accepting duplicate contract variant");
                    break variant;
                }
                attempt += 1;
            };
            debug!(index, inserted = variant.inserted(), attempts = attempt, "Generated variant");
            seen.insert(variant.text().to_string());
            variants.push(variant);
        }
        Ok(variants)
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};
    use rstest::rstest;

    use super::*;

    const MULTILINE: &str = "// SPDX-License-Identifier: MIT\npragma solidity ^0.8.0;\n\ncontract CryptoSchool {\n    address owner;\n\n    constructor() {\n        owner = msg.sender;\n    }\n\n    receive() external payable {}\n\n    function MoneyBack() public {\n        payable(owner).transfer(address(this).balance);\n    }\n}\n";

    fn source(text: &str) -> ContractSource {
        ContractSource::new("CryptoSchool.sol", text)
    }

    fn non_whitespace(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[rstest]
    #[case(MULTILINE, 0)]
    #[case(MULTILINE, 1)]
    #[case(MULTILINE, 4)]
    #[case(MULTILINE, 32)]
    #[case("contract C { constructor() {} function MoneyBack() public {} }", 4)]
    #[case("contract C {\n}\n", 8)]
    fn preserves_non_whitespace_content(#[case] text: &str, #[case] max: usize) {
        let mutator = SourceMutator::new(max);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let variant = mutator.mutate(&source(text), &mut rng).unwrap();
            assert_eq!(non_whitespace(variant.text()), non_whitespace(text));
            assert_eq!(variant.text().len(), text.len() + variant.inserted());
        }
    }

    #[test]
    fn never_inserts_before_opening_brace() {
        let text = "pragma solidity ^0.8.0;\n\n\n// header\ncontract C\n{\n  function f() public {}\n}\n";
        let brace = text.find('{').unwrap();
        let mutator = SourceMutator::new(6);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let plan = mutator.plan(&source(text), &mut rng).unwrap();
            assert!(plan.iter().all(|insertion| insertion.site > brace));
            let mutated = SourceMutator::apply(text, &plan);
            assert_eq!(&mutated[..=brace], &text[..=brace]);
        }
    }

    #[test]
    fn plan_is_sorted_and_bounded() {
        let mutator = SourceMutator::new(3);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let plan = mutator.plan(&source(MULTILINE), &mut rng).unwrap();
            assert!(plan.windows(2).all(|pair| pair[0].site < pair[1].site));
            assert!(plan.iter().all(|insertion| (1..=3).contains(&insertion.count)));
        }
    }

    #[test]
    fn same_seed_same_variant() {
        let mutator = SourceMutator::default();
        let first = mutator.mutate(&source(MULTILINE), &mut StdRng::seed_from_u64(42)).unwrap();
        let second = mutator.mutate(&source(MULTILINE), &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn independent_draws_rarely_collide() {
        let mutator = SourceMutator::default();
        let mut rng = StdRng::seed_from_u64(1234);
        let trials = 500;
        let collisions = (0..trials)
            .filter(|_| {
                let a = mutator.mutate(&source(MULTILINE), &mut rng).unwrap();
                let b = mutator.mutate(&source(MULTILINE), &mut rng).unwrap();
                a == b
            })
            .count();
        assert!(collisions * 20 < trials, "{collisions} collisions in {trials} trials");
    }

    #[test]
    fn batch_variants_are_distinct() {
        let mutator = SourceMutator::default();
        let mut rng = StdRng::seed_from_u64(99);
        let variants = mutator
            .generate_batch(&source(MULTILINE), 25, SourceMutator::DEFAULT_MAX_ATTEMPTS, &mut rng)
            .unwrap();
        let distinct: HashSet<_> = variants.iter().map(|v| v.text().to_string()).collect();
        assert_eq!(variants.len(), 25);
        assert_eq!(distinct.len(), 25);
    }

    #[test]
    fn single_line_source_yields_distinct_batch() {
        let text = "contract C { constructor() {} function MoneyBack() public {} }";
        let brace = text.find('{').unwrap();
        assert!(SourceMutator::candidate_sites(text).iter().filter(|site| **site > brace).count() >= 5);

        let mut rng = StdRng::seed_from_u64(5);
        let variants = SourceMutator::default()
            .generate_batch(&source(text), 3, SourceMutator::DEFAULT_MAX_ATTEMPTS, &mut rng)
            .unwrap();
        let distinct: HashSet<_> = variants.iter().map(|v| v.text().to_string()).collect();
        assert_eq!(distinct.len(), 3);
        assert!(variants.iter().all(|v| non_whitespace(v.text()) == non_whitespace(text)));
    }

    #[test]
    fn exhausted_sites_accept_duplicates() {
        // One site with at most two fillers allows three distinct texts.
        let text = "contract C {";
        let mut rng = StdRng::seed_from_u64(5);
        let variants = SourceMutator::new(2).generate_batch(&source(text), 6, 4, &mut rng).unwrap();
        let distinct: HashSet<_> = variants.iter().map(|v| v.text().to_string()).collect();
        assert_eq!(variants.len(), 6);
        assert!(distinct.len() <= 3);
    }

    #[test]
    fn comments_and_strings_hold_no_sites() {
        let text = "contract C {\n    string s = \"a;{b}\\\";\";\n    // x; {y}\n    /* p; q */ uint z;\n}";
        let sites = SourceMutator::candidate_sites(text);

        let literal = text.find('"').unwrap()..text.rfind('"').unwrap();
        let comment = text.find("//").unwrap()..text.find("// x; {y}").unwrap() + 9;
        let block = text.find("/*").unwrap()..text.find("*/").unwrap() + 2;
        for range in [literal, comment, block] {
            assert!(sites.iter().all(|site| !range.contains(site)), "site inside {range:?}");
        }
        // `uint z;` and the closing brace still count.
        assert!(sites.contains(&(text.find("z;").unwrap() + 2)));
        assert_eq!(sites.last(), Some(&text.len()));
        assert!(sites.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn rejects_sources_without_body() {
        let mutator = SourceMutator::default();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            mutator.mutate(&source("pragma solidity ^0.8.0;\n"), &mut rng),
            Err(MutationError::MissingBody("CryptoSchool.sol".to_string()))
        );
        assert_eq!(
            mutator.mutate(&source(""), &mut rng),
            Err(MutationError::EmptySource("CryptoSchool.sol".to_string()))
        );
    }

    #[test]
    fn apply_offsets_account_for_earlier_insertions() {
        let text = "a{\nb\nc\n";
        let plan = [Insertion { site: 2, count: 2 }, Insertion { site: 6, count: 1 }];
        assert_eq!(SourceMutator::apply(text, &plan), "a{\n\n\nb\nc\n\n");
    }
}
