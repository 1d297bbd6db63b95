//! Cron schedule normalization and validation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::diagnostic::CompilerError;

static START_STEP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)/(\d+)$").expect("start/step pattern is valid"));

const MONTH_NAMES: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];
const DAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// One of the five cron fields.
#[derive(Debug, Clone, Copy)]
struct Field {
    name: &'static str,
    min: u32,
    max: u32,
    names: &'static [&'static str],
    /// Value of the first entry in `names`.
    names_offset: u32,
}

const FIELDS: [Field; 5] = [
    Field { name: "minute", min: 0, max: 59, names: &[], names_offset: 0 },
    Field { name: "hour", min: 0, max: 23, names: &[], names_offset: 0 },
    Field { name: "day of month", min: 1, max: 31, names: &[], names_offset: 0 },
    Field { name: "month", min: 1, max: 12, names: &MONTH_NAMES, names_offset: 1 },
    Field { name: "day of week", min: 0, max: 7, names: &DAY_NAMES, names_offset: 0 },
];

/// Expands `start/step` shorthands into explicit ranges.
///
/// `5/15` in the minute field becomes `5-59/15`. In the day-of-week field the
/// shorthand becomes an explicit list of days, with `7` folded onto `0`.
pub fn rectify(cron: &str) -> String {
    let parts: Vec<&str> = cron.split_whitespace().collect();
    if parts.len() != 5 {
        return cron.to_string();
    }

    let upper_bounds = [59, 23, 31, 12];
    let mut rectified: Vec<String> = parts[..4]
        .iter()
        .zip(upper_bounds)
        .map(|(part, max)| {
            START_STEP
                .replace(part, |caps: &regex::Captures| format!("{}-{}/{}", &caps[1], max, &caps[2]))
                .into_owned()
        })
        .collect();

    let dow = match START_STEP.captures(parts[4]) {
        Some(caps) => {
            let start: u32 = caps[1].parse().unwrap_or(0);
            let step: u32 = caps[2].parse().unwrap_or(1).max(1);
            let mut days: Vec<u32> = (start..=7).step_by(step as usize).map(|d| d % 7).collect();
            days.dedup();
            days.iter().map(u32::to_string).collect::<Vec<_>>().join(",")
        }
        None => parts[4].to_string(),
    };
    rectified.push(dow);

    rectified.join(" ")
}

/// Checks a five-field schedule, returning the reason when it is rejected.
pub fn check(cron: &str) -> Result<(), String> {
    let parts: Vec<&str> = cron.split_whitespace().collect();
    if parts.len() != 5 {
        return Err(format!("expected 5 fields, found {}", parts.len()));
    }

    for (part, field) in parts.iter().zip(FIELDS.iter()) {
        check_field(part, field)?;
    }

    if parts[2] != "*" && parts[4] != "*" {
        return Err(
            "the day of the month and the day of the week cannot be specified at the same time"
                .to_string(),
        );
    }

    Ok(())
}

/// Validates and rectifies the schedule of a cron method.
pub fn validate_schedule(class: &str, method: &str, cron: &str) -> Result<String, CompilerError> {
    let invalid = |reason: String| CompilerError::InvalidCron {
        class: class.to_string(),
        method: method.to_string(),
        cron: cron.to_string(),
        reason,
    };

    check(cron).map_err(invalid)?;
    let rectified = rectify(cron);
    check(&rectified).map_err(invalid)?;
    Ok(rectified)
}

fn check_field(part: &str, field: &Field) -> Result<(), String> {
    for item in part.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (item, None),
        };

        if let Some(step) = step {
            let step: u32 = step
                .parse()
                .map_err(|_| format!("invalid step '{}' in {} field", step, field.name))?;
            if step == 0 {
                return Err(format!("step cannot be zero in {} field", field.name));
            }
        }

        if range == "*" {
            continue;
        }

        match range.split_once('-') {
            Some((low, high)) => {
                let low = parse_value(low, field)?;
                let high = parse_value(high, field)?;
                if low > high {
                    return Err(format!("range {}-{} is reversed in {} field", low, high, field.name));
                }
            }
            None => {
                parse_value(range, field)?;
            }
        }
    }
    Ok(())
}

fn parse_value(value: &str, field: &Field) -> Result<u32, String> {
    let upper = value.to_ascii_uppercase();
    if let Some(index) = field.names.iter().position(|n| *n == upper) {
        return Ok(index as u32 + field.names_offset);
    }

    let number: u32 = value
        .parse()
        .map_err(|_| format!("invalid value '{}' in {} field", value, field.name))?;
    if number < field.min || number > field.max {
        return Err(format!(
            "value {} out of range {}-{} in {} field",
            number, field.min, field.max, field.name
        ));
    }
    Ok(number)
}
