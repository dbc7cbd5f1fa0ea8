//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use crate::error::{AppError, ProbeError, ProbeResult, Result};

/// Identity of one diagnostic pass (1-based)
pub type PassId = u32;

/// How confidently the endpoint selector vouches for its pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionTier {
    /// Port accepted a connection and passed the UDP capability test
    Full,
    /// Port accepted a connection, UDP support unconfirmed
    Partial,
    /// Nothing responded; first configured pair used so later stages fail informatively
    Fallback,
}

impl SelectionTier {
    pub fn description(&self) -> &'static str {
        match self {
            SelectionTier::Full => "TCP + UDP support",
            SelectionTier::Partial => "TCP only - UDP tests may fail",
            SelectionTier::Fallback => "no server responded - using fallback",
        }
    }
}

/// Direction of a saturating transfer relative to this host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Upload,
    Download,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upload => write!(f, "upload"),
            Direction::Download => write!(f, "download"),
        }
    }
}

/// Bufferbloat letter grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BufferbloatGrade {
    A,
    B,
    C,
}

impl BufferbloatGrade {
    /// Grade C is the only grade reported as a problem
    pub fn is_problem(&self) -> bool {
        matches!(self, BufferbloatGrade::C)
    }
}

impl fmt::Display for BufferbloatGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            BufferbloatGrade::A => "A",
            BufferbloatGrade::B => "B",
            BufferbloatGrade::C => "C",
        };
        write!(f, "{}", letter)
    }
}

/// Jitter / packet loss verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JitterStatus {
    Ok,
    Warn,
}

impl fmt::Display for JitterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JitterStatus::Ok => write!(f, "OK"),
            JitterStatus::Warn => write!(f, "WARN"),
        }
    }
}

/// Independent per-hop annotations; a hop may carry several
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopFlags {
    pub loss: bool,
    pub high_jitter: bool,
    pub latency_variance: bool,
}

impl HopFlags {
    pub fn any(&self) -> bool {
        self.loss || self.high_jitter || self.latency_variance
    }

    /// Flag labels in display order
    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.loss {
            labels.push("LOSS");
        }
        if self.high_jitter {
            labels.push("HIGH-JITTER");
        }
        if self.latency_variance {
            labels.push("LATENCY-VAR");
        }
        labels
    }
}
