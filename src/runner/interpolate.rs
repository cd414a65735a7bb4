//! Variable interpolation for command templates
//!
//! Replaces `${var}` references in tool commands with values from the
//! context (environment snapshot plus per-invocation bindings).

use crate::error::{InterpolationError, InterpolationResult};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Deepest chain of values referring to other values
const MAX_DEPTH: usize = 32;

fn var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern"))
}

/// Interpolate variables in a string, leaving unknown references untouched.
///
/// A variable may appear any number of times. Values that contain references
/// are expanded in turn; a value that leads back to itself is an error.
pub fn interpolate(s: &str, vars: &HashMap<String, String>) -> InterpolationResult<String> {
    let mut chain = Vec::new();
    expand(s, vars, &mut chain)
}

fn expand<'a>(
    s: &str,
    vars: &'a HashMap<String, String>,
    chain: &mut Vec<&'a str>,
) -> InterpolationResult<String> {
    let mut result = String::with_capacity(s.len());
    let mut last = 0;

    for caps in var_pattern().captures_iter(s) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        result.push_str(&s[last..whole.start()]);
        last = whole.end();

        match vars.get_key_value(name.as_str()) {
            Some((key, value)) => {
                if chain.contains(&key.as_str()) || chain.len() >= MAX_DEPTH {
                    return Err(InterpolationError::RecursiveInterpolation);
                }
                chain.push(key.as_str());
                let expanded = expand(value, vars, chain)?;
                chain.pop();
                result.push_str(&expanded);
            }
            None => result.push_str(whole.as_str()),
        }
    }

    result.push_str(&s[last..]);
    Ok(result)
}

/// Interpolate with strict mode - errors on undefined variables
pub fn interpolate_strict(s: &str, vars: &HashMap<String, String>) -> InterpolationResult<String> {
    let result = interpolate(s, vars)?;

    if let Some(caps) = var_pattern().captures(&result) {
        return Err(InterpolationError::UndefinedVariable(caps[1].to_string()));
    }

    Ok(result)
}
