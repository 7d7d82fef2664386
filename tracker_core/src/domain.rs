//! Domain model for an immigration application: its identifying key, the
//! state machine it moves through, and the fixed substring-marker table used
//! to classify a portal's free-text status into a category (§4.5).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Application type codes accepted by the subscription dialog (§4.8).
pub const ALLOWED_TYPES: &[&str] = &["CD", "DO", "DP", "DV", "MK", "PP", "ST", "TP", "VP", "ZK", "ZM"];

/// `(OAM-)?\d{3,5}(-\d+)?/[A-Z]{2}-\d{4}`, anchored and case-sensitive on the
/// type code, matching the original `num_regex` in `bot/utils.py` exactly.
static OAM_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(?:OAM-)?([0-9]{3,5})(?:-([0-9]+))?/([A-Z]{2})-([0-9]{4})$").unwrap());

/// The tuple (number, type, year) identifying a subscription within a user.
/// A suffix is carried separately since it doesn't participate in uniqueness
/// (§3: "Unique per user per (number,type,year)").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationKey {
  pub number: String,
  pub suffix: Option<String>,
  pub application_type: String,
  pub year: i32,
}

#[derive(Debug, thiserror::Error)]
#[error("'{0}' doesn't match the OAM application number grammar")]
pub struct ParseApplicationKeyError(String);

impl FromStr for ApplicationKey {
  type Err = ParseApplicationKeyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let caps = OAM_REGEX
      .captures(s.trim())
      .ok_or_else(|| ParseApplicationKeyError(s.to_string()))?;
    Ok(ApplicationKey {
      number: caps[1].to_string(),
      suffix: caps.get(2).map(|m| m.as_str().to_string()),
      application_type: caps[3].to_string(),
      year: caps[4].parse().expect("regex guarantees digits"),
    })
  }
}

impl fmt::Display for ApplicationKey {
  /// Regenerates the canonical `OAM-<n>(-<s>)?/<TT>-<YYYY>` form. Parsing
  /// this output is identity up to case/whitespace normalization (§8).
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.suffix {
      Some(suffix) if suffix != "0" => write!(
        f,
        "OAM-{}-{}/{}-{}",
        self.number, suffix, self.application_type, self.year
      ),
      _ => write!(f, "OAM-{}/{}-{}", self.number, self.application_type, self.year),
    }
  }
}

impl ApplicationKey {
  pub fn is_allowed_type(&self) -> bool {
    ALLOWED_TYPES.contains(&self.application_type.as_str())
  }

  pub fn is_allowed_year(&self, current_year: i32) -> bool {
    (current_year - 3..=current_year).contains(&self.year)
  }
}

/// Application lifecycle state (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationState {
  Unknown,
  NotFound,
  InProgress,
  Approved,
  Denied,
}

impl ApplicationState {
  /// APPROVED and DENIED are terminal: `is_resolved = true` (§3 invariant).
  pub fn is_terminal(self) -> bool {
    matches!(self, ApplicationState::Approved | ApplicationState::Denied)
  }
}

impl fmt::Display for ApplicationState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      ApplicationState::Unknown => "UNKNOWN",
      ApplicationState::NotFound => "NOT_FOUND",
      ApplicationState::InProgress => "IN_PROGRESS",
      ApplicationState::Approved => "APPROVED",
      ApplicationState::Denied => "DENIED",
    };
    write!(f, "{s}")
  }
}

/// Classification bucket for a free-text portal status (§4.5). Distinct from
/// `ApplicationState` because "error" isn't a stored state — a failed fetch
/// maps to whatever `ApplicationState` the reconciler decides (§4.5 step 7),
/// never to a literal `error` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
  NotFound,
  InProgress,
  Approved,
  Denied,
  Error,
}

impl StatusCategory {
  pub fn application_state(self) -> ApplicationState {
    match self {
      StatusCategory::NotFound => ApplicationState::NotFound,
      StatusCategory::InProgress => ApplicationState::InProgress,
      StatusCategory::Approved => ApplicationState::Approved,
      StatusCategory::Denied => ApplicationState::Denied,
      StatusCategory::Error => ApplicationState::Unknown,
    }
  }

  /// Visual sign used in notification templates, ported from `MVCR_STATUSES`
  /// in `bot/utils.py` (supplemented feature, see SPEC_FULL.md).
  pub fn sign(self) -> &'static str {
    match self {
      StatusCategory::NotFound => "⚪️",
      StatusCategory::InProgress => "🟡",
      StatusCategory::Approved => "🟢",
      StatusCategory::Denied => "🔴",
      StatusCategory::Error => "🔴",
    }
  }
}

/// The fixed substring-marker table from §4.5. First match wins; markers are
/// checked in table order and within a category in listed order.
const STATUS_MARKERS: &[(StatusCategory, &[&str])] = &[
  (StatusCategory::NotFound, &["nebylo nalezeno", "bez úvodních nul"]),
  (StatusCategory::InProgress, &["zpracovává se", "v-prubehu-rizeni"]),
  (StatusCategory::Approved, &["bylo povoleno", "rizeni-povoleno"]),
  (StatusCategory::Denied, &["bylo nepovoleno", "zamítlo", "zastavilo"]),
  (StatusCategory::Error, &["ERROR"]),
];

/// Classify a raw portal status string. Returns `None` if no marker matches,
/// in which case the reconciler still persists the status with `state =
/// UNKNOWN` and a generic notification (§4.5, Open Question (b)).
pub fn classify_status(status: &str) -> Option<StatusCategory> {
  STATUS_MARKERS
    .iter()
    .find(|(_, markers)| markers.iter().any(|marker| status.contains(marker)))
    .map(|(category, _)| *category)
}

/// Languages the notification text catalog is keyed by (§3 User attributes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Lang {
  En,
  Cz,
  Ru,
  Ua,
}

impl Default for Lang {
  fn default() -> Self {
    Lang::En
  }
}

impl fmt::Display for Lang {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Lang::En => "EN",
      Lang::Cz => "CZ",
      Lang::Ru => "RU",
      Lang::Ua => "UA",
    };
    write!(f, "{s}")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_full_form_with_prefix_and_suffix() {
    let key: ApplicationKey = "OAM-13077-3/ZK-2020".parse().unwrap();
    assert_eq!(key.number, "13077");
    assert_eq!(key.suffix.as_deref(), Some("3"));
    assert_eq!(key.application_type, "ZK");
    assert_eq!(key.year, 2020);
  }

  #[test]
  fn parses_bare_form_without_prefix_or_suffix() {
    let key: ApplicationKey = "12345/TP-2023".parse().unwrap();
    assert_eq!(key.number, "12345");
    assert_eq!(key.suffix, None);
    assert_eq!(key.to_string(), "OAM-12345/TP-2023");
  }

  #[test]
  fn round_trips_through_display_and_parse() {
    let original = "OAM-5777-3/TP-2023";
    let key: ApplicationKey = original.parse().unwrap();
    assert_eq!(key.to_string(), original);
  }

  #[test]
  fn rejects_lowercase_type_code() {
    assert!("12345/tp-2023".parse::<ApplicationKey>().is_err());
  }

  #[test]
  fn classify_first_match_wins() {
    assert_eq!(classify_status("v-prubehu-rizeni"), Some(StatusCategory::InProgress));
    assert_eq!(classify_status("rozhodnuti: bylo povoleno"), Some(StatusCategory::Approved));
    assert_eq!(classify_status("gibberish"), None);
  }

  #[test]
  fn terminal_states_are_approved_and_denied_only() {
    assert!(ApplicationState::Approved.is_terminal());
    assert!(ApplicationState::Denied.is_terminal());
    assert!(!ApplicationState::InProgress.is_terminal());
    assert!(!ApplicationState::NotFound.is_terminal());
    assert!(!ApplicationState::Unknown.is_terminal());
  }
}
