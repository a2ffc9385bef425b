//! Checkpoint record as served by the explorer API
//!
//! A checkpoint covers a range of L1 heights and a range of L2 heights and is
//! committed to L1 by a batch transaction. Records are read-only on the
//! client side.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Placeholder shown for values the server has not filled in yet
pub const MISSING_VALUE: &str = "-";

const SHORT_ID_HEAD: usize = 8;
const SHORT_ID_TAIL: usize = 6;

/// Checkpoint descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Index (epoch) of the checkpoint
    pub idx: u64,
    /// L1 height range covered (start, end)
    pub l1_range: (u64, u64),
    /// L2 height range covered (start, end)
    pub l2_range: (u64, u64),
    /// L2 block id at the end of the range
    pub l2_blockid: String,
    /// Where the checkpoint was committed on L1, once posted
    #[serde(default)]
    pub commitment: Option<CommitmentInfo>,
    /// L1 confirmation status, once known
    #[serde(default)]
    pub confirmation_status: Option<ConfirmationStatus>,
}

/// L1 transaction carrying the checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentInfo {
    #[serde(default)]
    pub blockhash: String,
    pub txid: String,
    #[serde(default)]
    pub wtxid: String,
    #[serde(default)]
    pub height: u64,
    #[serde(default)]
    pub position: u32,
}

/// L1 confirmation status of a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationStatus {
    /// Waiting to be posted on L1
    Pending,
    /// Included in an L1 block
    Confirmed,
    /// Buried deep enough to be final
    Finalized,
}

impl ConfirmationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationStatus::Pending => "pending",
            ConfirmationStatus::Confirmed => "confirmed",
            ConfirmationStatus::Finalized => "finalized",
        }
    }
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfirmationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ConfirmationStatus::Pending),
            "confirmed" => Ok(ConfirmationStatus::Confirmed),
            "finalized" => Ok(ConfirmationStatus::Finalized),
            _ => Err(Error::InvalidInput(format!("Invalid status: {}", s))),
        }
    }
}

impl Checkpoint {
    /// Batch transaction id, or `-` before the checkpoint is posted
    pub fn batch_txid(&self) -> &str {
        self.commitment
            .as_ref()
            .map(|c| c.txid.as_str())
            .filter(|txid| !txid.is_empty())
            .unwrap_or(MISSING_VALUE)
    }

    /// Status label, or `-` when unknown
    pub fn status_label(&self) -> &'static str {
        self.confirmation_status
            .as_ref()
            .map(ConfirmationStatus::as_str)
            .unwrap_or(MISSING_VALUE)
    }
}

/// Shorten a long block id to `head...tail`
///
/// # Examples
/// ```
/// use explorer_common::checkpoint::shorten_block_id;
///
/// assert_eq!(shorten_block_id("abcdef"), "abcdef");
/// assert_eq!(
///     shorten_block_id("0123456789abcdef0123456789abcdef"),
///     "01234567...abcdef"
/// );
/// ```
pub fn shorten_block_id(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= SHORT_ID_HEAD + SHORT_ID_TAIL {
        return value.to_string();
    }

    let head: String = chars[..SHORT_ID_HEAD].iter().collect();
    let tail: String = chars[chars.len() - SHORT_ID_TAIL..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Block-explorer link builder for L1 and L2 heights
#[derive(Debug, Clone, Default)]
pub struct ExplorerLinks {
    l1_base: Option<Url>,
    l2_base: Option<Url>,
}

impl ExplorerLinks {
    /// Base URLs are expected to end in `/` (see `config::parse_base_url`)
    pub fn new(l1_base: Option<Url>, l2_base: Option<Url>) -> Self {
        Self { l1_base, l2_base }
    }

    pub fn l1_block(&self, height: u64) -> Option<Url> {
        block_url(self.l1_base.as_ref(), height)
    }

    pub fn l2_block(&self, height: u64) -> Option<Url> {
        block_url(self.l2_base.as_ref(), height)
    }
}

fn block_url(base: Option<&Url>, height: u64) -> Option<Url> {
    base.and_then(|b| b.join(&format!("block/{}", height)).ok())
}
