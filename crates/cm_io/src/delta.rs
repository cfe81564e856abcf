//! Vote and moderation deltas (engine input).

use cm_core::{CoercedVote, ParticipantId, StatementId};
use serde::Deserialize;

/// A raw vote value as it appears on the wire: a token string, a signed
/// numeric, null, or anything else (which coerces to invalid).
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum VoteToken {
    Text(String),
    Number(f64),
    Null(Option<()>),
    Other(serde_json::Value),
}

impl VoteToken {
    /// Coerce into the engine's vote alphabet.
    pub fn coerce(&self) -> CoercedVote {
        match self {
            VoteToken::Text(s) => CoercedVote::from_str_token(s),
            VoteToken::Number(x) => CoercedVote::from_number(*x),
            VoteToken::Null(_) => CoercedVote::Missing,
            VoteToken::Other(_) => CoercedVote::Invalid,
        }
    }
}

/// One incoming vote record. `pid`/`tid` accept both string and integer
/// forms; the original textual form is preserved.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct VoteRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    pub pid: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub tid: Option<String>,
    #[serde(default, deserialize_with = "lenient_vote")]
    pub vote: Option<VoteToken>,
    /// Millisecond epoch, optional.
    #[serde(default)]
    pub created: Option<i64>,
}

impl VoteRecord {
    pub fn participant(&self) -> Option<ParticipantId> {
        self.pid.as_deref().map(ParticipantId::new)
    }

    pub fn statement(&self) -> Option<StatementId> {
        self.tid.as_deref().map(StatementId::new)
    }
}

/// The expected envelope for a batch of votes.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct VoteDelta {
    #[serde(default)]
    pub votes: Vec<VoteRecord>,
    #[serde(default, rename = "lastVoteTimestamp")]
    pub last_vote_timestamp: Option<i64>,
}

/// Moderation delta. A field that is absent leaves the corresponding set
/// unchanged; a present (possibly empty) field replaces it.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ModerationDelta {
    #[serde(default, deserialize_with = "lenient_id_vec")]
    pub mod_out_tids: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_id_vec")]
    pub mod_in_tids: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_id_vec")]
    pub meta_tids: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_id_vec")]
    pub mod_out_ptpts: Option<Vec<String>>,
}

impl ModerationDelta {
    pub fn statements(ids: &Option<Vec<String>>) -> Option<Vec<StatementId>> {
        ids.as_ref()
            .map(|v| v.iter().map(StatementId::new).collect())
    }

    pub fn participants(ids: &Option<Vec<String>>) -> Option<Vec<ParticipantId>> {
        ids.as_ref()
            .map(|v| v.iter().map(ParticipantId::new).collect())
    }
}

/// String, integer, or float ids are accepted; the textual form is kept.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Float(f64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Int(n) => n.to_string(),
            RawId::Float(x) => x.to_string(),
        }
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(RawId::into_string))
}

/// Distinguishes a present `null` (coerces to `VoteToken::Null`) from an
/// absent key (`None`), since `Option<T>`'s usual derive treats both alike.
fn lenient_vote<'de, D>(deserializer: D) -> Result<Option<VoteToken>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    VoteToken::deserialize(deserializer).map(Some)
}

fn lenient_id_vec<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<RawId>>::deserialize(deserializer)?
        .map(|items| items.into_iter().map(RawId::into_string).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cm_core::Vote;

    #[test]
    fn envelope_parses_mixed_vote_forms() {
        let delta: VoteDelta = serde_json::from_str(
            r#"{
                "votes": [
                    {"pid": 1, "tid": "7", "vote": "agree"},
                    {"pid": "2", "tid": 7, "vote": -1},
                    {"pid": "3", "tid": "7", "vote": null},
                    {"pid": "4", "tid": "7", "vote": "bogus"},
                    {"pid": 5.0, "tid": "7", "vote": true}
                ],
                "lastVoteTimestamp": 1700000000000
            }"#,
        )
        .unwrap();
        assert_eq!(delta.last_vote_timestamp, Some(1_700_000_000_000));
        assert_eq!(delta.votes.len(), 5);
        assert_eq!(delta.votes[0].pid.as_deref(), Some("1"));
        assert_eq!(delta.votes[0].vote.as_ref().unwrap().coerce().vote(), Some(Vote::Agree));
        assert_eq!(
            delta.votes[1].vote.as_ref().unwrap().coerce().vote(),
            Some(Vote::Disagree)
        );
        assert_eq!(delta.votes[2].vote.as_ref().unwrap().coerce(), CoercedVote::Missing);
        assert_eq!(delta.votes[3].vote.as_ref().unwrap().coerce(), CoercedVote::Invalid);
        // A float id keeps a textual form; a boolean vote is invalid.
        assert_eq!(delta.votes[4].pid.as_deref(), Some("5"));
        assert_eq!(delta.votes[4].vote.as_ref().unwrap().coerce(), CoercedVote::Invalid);
    }

    #[test]
    fn moderation_distinguishes_absent_from_empty() {
        let delta: ModerationDelta =
            serde_json::from_str(r#"{"mod_out_tids": [3, "x"], "meta_tids": []}"#).unwrap();
        assert_eq!(
            delta.mod_out_tids,
            Some(vec!["3".to_string(), "x".to_string()])
        );
        assert_eq!(delta.meta_tids, Some(Vec::new()));
        assert_eq!(delta.mod_in_tids, None);
        assert_eq!(delta.mod_out_ptpts, None);
    }
}
