//! Query understanding for the fundrank pipeline.
//!
//! Turns free-form fund queries ("low-risk SBI tech fund with returns above
//! 12%") into a residual semantic query plus structured filter constraints.
//!
//! Two modules:
//!
//! - [`normalize`]: the single text normalizer shared by indexing and query
//!   time. Applying the same normalization on both sides is an invariant of
//!   the engine; a second tokenization would silently break lexical recall.
//! - [`parse`]: ordered rule-based extractors over the normalized text.
//!   Each extractor consumes the substrings it recognizes and passes the
//!   residual on; whatever survives every extractor is the semantic query.
//!
//! Parsing never fails. Constraints that are recognized but out of sane
//! range are dropped with a recorded warning, and parsing is idempotent:
//! re-parsing the canonical rendering of a parsed query yields the same
//! constraints and nothing new.

pub mod normalize;
pub mod parse;

pub use parse::{
    parse, Constraint, ParseWarning, ParsedQuery, QueryParser, ReturnPeriod, RiskTier,
    SpanContribution, SuitabilityTag,
};
