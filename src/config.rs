use std::time::Duration;

/// Settings threaded through the launcher, driver and harness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Pause between the exit code query and closing the process handle.
    pub delay: Duration,
}

impl RunConfig {
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

/// Longest delay the native program accepts: its argument is a 32-bit
/// millisecond count.
pub const MAX_DELAY: Duration = Duration::from_millis(u32::MAX as u64);

const UNITS: [(&str, u128); 8] = [
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
];

/// Parses durations such as `0`, `15ms`, `1.5s` or `1m30s`.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let text = text.trim();
    if text == "0" {
        return Ok(Duration::ZERO);
    }
    if text.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut total: u128 = 0;
    let mut rest = text;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..number_end];
        rest = &rest[number_end..];
        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        if number.is_empty() || number == "." {
            return Err(format!("invalid duration {text:?}: missing number"));
        }
        if unit.is_empty() {
            return Err(format!("invalid duration {text:?}: missing unit"));
        }
        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| format!("invalid duration {text:?}: unknown unit {unit:?}"))?;

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| format!("invalid duration {text:?}"))?
        };
        // Digits beyond nanosecond precision of the largest unit do not matter.
        let fraction = &fraction[..fraction.len().min(18)];
        let fraction_nanos = if fraction.is_empty() {
            0
        } else {
            let digits: u128 = fraction
                .parse()
                .map_err(|_| format!("invalid duration {text:?}"))?;
            digits * scale / 10u128.pow(fraction.len() as u32)
        };

        total = whole
            .checked_mul(scale)
            .and_then(|nanos| nanos.checked_add(fraction_nanos))
            .and_then(|nanos| nanos.checked_add(total))
            .ok_or_else(|| format!("invalid duration {text:?}: overflow"))?;
    }

    let nanos =
        u64::try_from(total).map_err(|_| format!("invalid duration {text:?}: overflow"))?;
    let delay = Duration::from_nanos(nanos);
    if delay > MAX_DELAY {
        return Err(format!(
            "invalid duration {text:?}: longer than {}ms",
            MAX_DELAY.as_millis()
        ));
    }
    Ok(delay)
}
