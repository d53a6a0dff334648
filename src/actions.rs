//! The action vocabulary.
//!
//! Clients speak in lower-case tokens such as `poweron` or `sleep 5s`. This
//! module owns the fixed set of hardware actions, the sleep grammar and the
//! classification of arbitrary tokens into one of the two.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::error::Error;

/// Prefix every sleep token starts with.
const SLEEP_PREFIX: &str = "sleep";
/// Separator between the keyword and the duration.
const SLEEP_KEYWORD: &str = "sleep ";

/// A hardware action from the fixed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Turn power off.
    PowerOff,
    /// Turn power on.
    PowerOn,
    /// Power-cycle.
    PowerCycle,
    /// Hard reset. Part of the vocabulary, performed by no target kind.
    HardReset,
    /// Physically reseat a blade.
    Reseat,
    /// Report power state.
    IsOn,
    /// Reset the management controller itself.
    PowerCycleBmc,
    /// Network boot on next start.
    PxeOnce,
    /// Network boot on next start, legacy boot mode.
    PxeOnceMbr,
    /// Network boot on next start, UEFI boot mode.
    PxeOnceEfi,
    /// Capture the console.
    Screenshot,
}

impl Action {
    /// Every action in the vocabulary.
    pub const ALL: [Action; 11] = [
        Action::PowerOff,
        Action::PowerOn,
        Action::PowerCycle,
        Action::HardReset,
        Action::Reseat,
        Action::IsOn,
        Action::PowerCycleBmc,
        Action::PxeOnce,
        Action::PxeOnceMbr,
        Action::PxeOnceEfi,
        Action::Screenshot,
    ];

    /// The wire token for this action.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::PowerOff => "poweroff",
            Action::PowerOn => "poweron",
            Action::PowerCycle => "powercycle",
            Action::HardReset => "hardreset",
            Action::Reseat => "reseat",
            Action::IsOn => "ison",
            Action::PowerCycleBmc => "powercyclebmc",
            Action::PxeOnce => "pxeonce",
            Action::PxeOnceMbr => "pxeoncembr",
            Action::PxeOnceEfi => "pxeonceefi",
            Action::Screenshot => "screenshot",
        }
    }

    /// Look up an action by its exact token.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == token)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s).ok_or_else(|| Error::UnknownAction(s.to_string()))
    }
}

/// A sleep token whose duration could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to parse duration in sleep action: {reason} in {input:?}")]
pub struct DurationError {
    /// The duration text after the keyword
    pub input: String,
    /// Why it was rejected
    pub reason: &'static str,
}

/// What a token turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// One of the fixed hardware actions.
    Known(Action),
    /// A sleep action, with its parsed (or malformed) duration.
    Sleep(Result<Duration, DurationError>),
    /// Neither.
    Unknown,
}

/// Classify an action token.
pub fn classify(token: &str) -> Classification {
    if let Some(action) = Action::from_token(token) {
        return Classification::Known(action);
    }
    if is_sleep_action(token) {
        return Classification::Sleep(parse_sleep_duration(token));
    }
    Classification::Unknown
}

/// A token is a sleep action when it starts with `sleep` and contains
/// `sleep ` somewhere.
pub fn is_sleep_action(token: &str) -> bool {
    token.starts_with(SLEEP_PREFIX) && token.contains(SLEEP_KEYWORD)
}

/// Parse the duration of a sleep token. The first `sleep ` is removed and the
/// remainder is read as a duration string. Negative durations sleep for zero.
pub fn parse_sleep_duration(token: &str) -> Result<Duration, DurationError> {
    let remainder = token.replacen(SLEEP_KEYWORD, "", 1);
    parse_duration(&remainder)
}

/// Parse a duration such as `300ms`, `-1.5h` or `2h45m`.
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. Every number
/// needs a unit except a bare `0`. A negative total is clamped to zero.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let fail = |reason| DurationError {
        input: input.to_string(),
        reason,
    };

    let mut s = input;
    let mut negative = false;
    if let Some(rest) = s.strip_prefix('-') {
        negative = true;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(fail("invalid duration"));
    }

    let mut total: u128 = 0;
    while !s.is_empty() {
        let int_len = s.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, rest) = s.split_at(int_len);
        s = rest;

        let mut frac_part = "";
        if let Some(rest) = s.strip_prefix('.') {
            let frac_len = rest.bytes().take_while(u8::is_ascii_digit).count();
            frac_part = &rest[..frac_len];
            s = &rest[frac_len..];
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(fail("invalid duration"));
        }

        let unit_len = s
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(s.len());
        let (unit, rest) = s.split_at(unit_len);
        s = rest;
        let per_unit: u128 = match unit {
            "" => return Err(fail("missing unit")),
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            _ => return Err(fail("unknown unit")),
        };

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| fail("invalid duration"))?
        };
        total = whole
            .checked_mul(per_unit)
            .and_then(|n| total.checked_add(n))
            .ok_or_else(|| fail("invalid duration"))?;

        if !frac_part.is_empty() {
            let fraction: f64 = format!("0.{frac_part}")
                .parse()
                .map_err(|_| fail("invalid duration"))?;
            total = total
                .checked_add((fraction * per_unit as f64) as u128)
                .ok_or_else(|| fail("invalid duration"))?;
        }
    }

    // Signed 64-bit nanoseconds, so at most about 292 years either way
    let limit = if negative {
        1u128 << 63
    } else {
        i64::MAX as u128
    };
    if total > limit {
        return Err(fail("invalid duration"));
    }
    if negative {
        return Ok(Duration::ZERO);
    }
    // total fits in u64 after the check above
    Ok(Duration::from_nanos(total as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_every_action_round_trips_through_its_token() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn test_tokens_are_case_sensitive() {
        assert!(Action::from_token("PowerOn").is_none());
        assert!(matches!(
            "POWERON".parse::<Action>(),
            Err(Error::UnknownAction(t)) if t == "POWERON"
        ));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("ison"), Classification::Known(Action::IsOn));
        assert_eq!(
            classify("sleep 10s"),
            Classification::Sleep(Ok(Duration::from_secs(10)))
        );
        assert_eq!(classify("dance"), Classification::Unknown);
        assert_eq!(classify("asleep 10s"), Classification::Unknown);
        assert_eq!(classify("sleepz10s"), Classification::Unknown);
        assert_eq!(classify("sleepz 10s"), Classification::Unknown);
        assert_eq!(classify(""), Classification::Unknown);
    }

    #[test]
    fn test_sleep_without_unit_is_malformed() {
        match classify("sleep 10") {
            Classification::Sleep(Err(err)) => assert_eq!(err.reason, "missing unit"),
            other => panic!("unexpected classification {other:?}"),
        }
        assert!(matches!(classify("sleep abc"), Classification::Sleep(Err(_))));
        assert!(matches!(classify("sleep "), Classification::Sleep(Err(_))));
        assert!(matches!(classify("sleep 5 s"), Classification::Sleep(Err(_))));
    }

    #[test]
    fn test_sleep_keyword_may_follow_a_longer_prefix() {
        // Only the first "sleep " is removed, leaving "sleepy 5s"
        match classify("sleepy sleep 5s") {
            Classification::Sleep(Err(err)) => assert_eq!(err.input, "sleepy 5s"),
            other => panic!("unexpected classification {other:?}"),
        }
        assert!(is_sleep_action("sleepy sleep 5s"));
        assert!(!is_sleep_action("sleepy 5s"));
    }

    #[test]
    fn test_duration_is_capped_at_signed_nanoseconds() {
        assert_eq!(
            parse_duration("2562047h").unwrap(),
            Duration::from_secs(2_562_047 * 3_600)
        );
        assert!(parse_duration("2562048h").is_err());
        assert!(parse_duration("9223372036854775807ns").is_ok());
        assert!(parse_duration("9223372036854775808ns").is_err());
        assert_eq!(
            parse_duration("-9223372036854775808ns").unwrap(),
            Duration::ZERO
        );
        assert!(matches!(
            classify("sleep 3000000h"),
            Classification::Sleep(Err(_))
        ));
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("2h45m").unwrap(), Duration::from_secs(9900));
        assert_eq!(parse_duration("10us").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("10µs").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("7ns").unwrap(), Duration::from_nanos(7));
        assert_eq!(parse_duration(".5m").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("+1s").unwrap(), Duration::from_secs(1));
    }

    #[test]
    fn test_negative_duration_is_zero() {
        assert_eq!(parse_duration("-1h").unwrap(), Duration::ZERO);
        assert_eq!(
            classify("sleep -5s"),
            Classification::Sleep(Ok(Duration::ZERO))
        );
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        for input in ["", "-", "s", "1x", "1.s.", "99999999999999999999999h"] {
            assert!(parse_duration(input).is_err(), "{input:?} should fail");
        }
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn whole_milliseconds_parse_exactly(ms in 0u64..10_000_000) {
                prop_assert_eq!(
                    classify(&format!("sleep {ms}ms")),
                    Classification::Sleep(Ok(Duration::from_millis(ms)))
                );
            }

            #[test]
            fn tokens_without_sleep_prefix_are_known_or_unknown(token in "[a-z ]{0,16}") {
                prop_assume!(!token.starts_with("sleep"));
                let expected = match Action::from_token(&token) {
                    Some(action) => Classification::Known(action),
                    None => Classification::Unknown,
                };
                prop_assert_eq!(classify(&token), expected);
            }

            #[test]
            fn parse_duration_never_panics(input in "\\PC{0,24}") {
                let _ = parse_duration(&input);
            }
        }
    }
}
