use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use tracing::{debug, warn};

use crate::error::Error;
use crate::model::{ClassificationResult, FolderCandidate};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_auto_process")]
    pub auto_process: f64,
    #[serde(default = "default_require_confirmation")]
    pub require_confirmation: f64,
}

fn default_auto_process() -> f64 {
    0.8
}

fn default_require_confirmation() -> f64 {
    0.3
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            auto_process: default_auto_process(),
            require_confirmation: default_require_confirmation(),
        }
    }
}

impl Thresholds {
    pub fn new(auto_process: f64, require_confirmation: f64) -> Result<Self, Error> {
        let thresholds = Self {
            auto_process,
            require_confirmation,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("auto_process", self.auto_process),
            ("require_confirmation", self.require_confirmation),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "thresholds.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.auto_process < self.require_confirmation {
            return Err(Error::InvalidConfig(format!(
                "thresholds.auto_process ({}) must be >= thresholds.require_confirmation ({})",
                self.auto_process, self.require_confirmation
            )));
        }
        Ok(())
    }

    pub fn band(&self, confidence: f64) -> Band {
        if confidence >= self.auto_process {
            Band::AutoProcess
        } else if confidence >= self.require_confirmation {
            Band::Confirm
        } else {
            Band::Skip
        }
    }
}

/// Where a confidence lands relative to the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    AutoProcess,
    Confirm,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    BelowThreshold,
    ConfirmationRequired,
    Declined,
    NoTemplate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::BelowThreshold => "below confirmation threshold",
            SkipReason::ConfirmationRequired => "needs confirmation (non-interactive)",
            SkipReason::Declined => "declined by operator",
            SkipReason::NoTemplate => "no destination template",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    AutoProcess,
    /// Medium confidence accepted by the operator; processed like `AutoProcess`.
    Confirmed,
    Skip(SkipReason),
    /// Operator asked to stop; remaining candidates are not processed.
    Abort,
}

impl Decision {
    pub fn proceeds(&self) -> bool {
        matches!(self, Decision::AutoProcess | Decision::Confirmed)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::AutoProcess => f.write_str("auto-process"),
            Decision::Confirmed => f.write_str("confirmed"),
            Decision::Skip(reason) => write!(f, "skip ({})", reason),
            Decision::Abort => f.write_str("abort"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmResponse {
    Accept,
    Decline,
    Abort,
}

pub struct ConfirmRequest<'a> {
    pub candidate: &'a FolderCandidate,
    pub result: &'a ClassificationResult,
}

/// Operator prompt used for medium-confidence candidates.
pub trait Confirmer {
    fn confirm(&mut self, request: &ConfirmRequest<'_>) -> io::Result<ConfirmResponse>;
}

/// Confirmer that declines everything; used for batch runs.
pub struct NeverConfirm;

impl Confirmer for NeverConfirm {
    fn confirm(&mut self, _request: &ConfirmRequest<'_>) -> io::Result<ConfirmResponse> {
        Ok(ConfirmResponse::Decline)
    }
}

pub fn decide(
    thresholds: &Thresholds,
    candidate: &FolderCandidate,
    result: &ClassificationResult,
    interactive: bool,
    confirmer: &mut dyn Confirmer,
) -> Decision {
    let confidence = result.confidence();
    match thresholds.band(confidence) {
        Band::AutoProcess => Decision::AutoProcess,
        Band::Skip => Decision::Skip(SkipReason::BelowThreshold),
        Band::Confirm if !interactive => Decision::Skip(SkipReason::ConfirmationRequired),
        Band::Confirm => {
            let request = ConfirmRequest { candidate, result };
            match confirmer.confirm(&request) {
                Ok(ConfirmResponse::Accept) => Decision::Confirmed,
                Ok(ConfirmResponse::Decline) => Decision::Skip(SkipReason::Declined),
                Ok(ConfirmResponse::Abort) => {
                    debug!("Operator aborted at {}", candidate.path.display());
                    Decision::Abort
                }
                Err(e) => {
                    warn!("Confirmation prompt failed, aborting run: {}", e);
                    Decision::Abort
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaType;

    struct Scripted {
        response: io::Result<ConfirmResponse>,
        calls: usize,
    }

    impl Scripted {
        fn new(response: io::Result<ConfirmResponse>) -> Self {
            Self { response, calls: 0 }
        }
    }

    impl Confirmer for Scripted {
        fn confirm(&mut self, _request: &ConfirmRequest<'_>) -> io::Result<ConfirmResponse> {
            self.calls += 1;
            match &self.response {
                Ok(r) => Ok(*r),
                Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
            }
        }
    }

    fn result_with(confidence: f64) -> ClassificationResult {
        ClassificationResult::new(MediaType::Movie, confidence, "test")
    }

    fn candidate() -> FolderCandidate {
        FolderCandidate::new("/downloads/x", vec![])
    }

    #[test]
    fn test_threshold_sweep() {
        let thresholds = Thresholds::new(0.8, 0.3).unwrap();
        let mut never = NeverConfirm;
        for step in 0..=100 {
            let c = step as f64 / 100.0;
            let result = result_with(c);
            let batch = decide(&thresholds, &candidate(), &result, false, &mut never);
            if c >= 0.8 {
                assert_eq!(batch, Decision::AutoProcess, "c = {}", c);
            } else {
                assert!(matches!(batch, Decision::Skip(_)), "c = {}", c);
            }

            let mut accept = Scripted::new(Ok(ConfirmResponse::Accept));
            let interactive = decide(&thresholds, &candidate(), &result, true, &mut accept);
            if c >= 0.8 {
                assert_eq!(interactive, Decision::AutoProcess);
                assert_eq!(accept.calls, 0);
            } else if c >= 0.3 {
                assert_eq!(interactive, Decision::Confirmed);
                assert_eq!(accept.calls, 1);
            } else {
                assert_eq!(interactive, Decision::Skip(SkipReason::BelowThreshold));
                assert_eq!(accept.calls, 0);
            }
        }
    }

    #[test]
    fn test_non_interactive_medium_is_skip() {
        let thresholds = Thresholds::default();
        let mut accept = Scripted::new(Ok(ConfirmResponse::Accept));
        let decision = decide(&thresholds, &candidate(), &result_with(0.5), false, &mut accept);
        assert_eq!(decision, Decision::Skip(SkipReason::ConfirmationRequired));
        assert_eq!(accept.calls, 0);
    }

    #[test]
    fn test_decline_and_abort() {
        let thresholds = Thresholds::default();
        let mut decline = Scripted::new(Ok(ConfirmResponse::Decline));
        assert_eq!(
            decide(&thresholds, &candidate(), &result_with(0.5), true, &mut decline),
            Decision::Skip(SkipReason::Declined)
        );

        let mut abort = Scripted::new(Ok(ConfirmResponse::Abort));
        assert_eq!(
            decide(&thresholds, &candidate(), &result_with(0.5), true, &mut abort),
            Decision::Abort
        );

        let mut broken = Scripted::new(Err(io::Error::new(io::ErrorKind::UnexpectedEof, "eof")));
        assert_eq!(
            decide(&thresholds, &candidate(), &result_with(0.5), true, &mut broken),
            Decision::Abort
        );
    }

    #[test]
    fn test_invalid_thresholds() {
        assert!(Thresholds::new(0.5, 0.6).is_err());
        assert!(Thresholds::new(1.5, 0.6).is_err());
        assert!(Thresholds::new(f64::NAN, 0.0).is_err());
        assert!(Thresholds::new(0.5, 0.5).is_ok());
    }
}
