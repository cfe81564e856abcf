//! Vote alphabet and the coercion of incoming vote tokens.
//!
//! Incoming vote values are dynamically typed: the strings "agree",
//! "disagree", "pass", signed numerics (including numeric strings), or null.
//! A single typed parser maps them into the tri-state alphabet; anything
//! ambiguous becomes `Missing` or `Invalid` and is counted, never raised.

use core::fmt;

/// An observed vote: the three-valued cell alphabet.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Vote {
    Agree,
    Disagree,
    Pass,
}

impl Vote {
    /// Numeric cell encoding used by the dense matrix view.
    pub fn as_f64(self) -> f64 {
        match self {
            Vote::Agree => 1.0,
            Vote::Disagree => -1.0,
            Vote::Pass => 0.0,
        }
    }

    /// Decode a dense cell back into the alphabet. NaN is MISSING.
    pub fn from_cell(x: f64) -> Option<Vote> {
        if x.is_nan() {
            None
        } else if x > 0.0 {
            Some(Vote::Agree)
        } else if x < 0.0 {
            Some(Vote::Disagree)
        } else {
            Some(Vote::Pass)
        }
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vote::Agree => f.write_str("agree"),
            Vote::Disagree => f.write_str("disagree"),
            Vote::Pass => f.write_str("pass"),
        }
    }
}

/// Outcome of coercing a raw vote token.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CoercedVote {
    Vote(Vote),
    /// Null / absent value: the cell stays unobserved.
    Missing,
    /// Unknown token: counted as invalid by the orchestrator.
    Invalid,
}

impl CoercedVote {
    /// Coerce a textual token ("agree"/"disagree"/"pass", or a numeric
    /// string normalized by sign).
    pub fn from_str_token(s: &str) -> CoercedVote {
        match s.trim().to_ascii_lowercase().as_str() {
            "agree" => CoercedVote::Vote(Vote::Agree),
            "disagree" => CoercedVote::Vote(Vote::Disagree),
            "pass" => CoercedVote::Vote(Vote::Pass),
            other => match other.parse::<f64>() {
                Ok(x) => CoercedVote::from_number(x),
                Err(_) => CoercedVote::Invalid,
            },
        }
    }

    /// Coerce a numeric token by sign: positive → agree, negative →
    /// disagree, zero → pass. Non-finite values are invalid.
    pub fn from_number(x: f64) -> CoercedVote {
        if !x.is_finite() {
            return CoercedVote::Invalid;
        }
        if x > 0.0 {
            CoercedVote::Vote(Vote::Agree)
        } else if x < 0.0 {
            CoercedVote::Vote(Vote::Disagree)
        } else {
            CoercedVote::Vote(Vote::Pass)
        }
    }

    pub fn vote(self) -> Option<Vote> {
        match self {
            CoercedVote::Vote(v) => Some(v),
            _ => None,
        }
    }
}
