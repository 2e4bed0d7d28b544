//! Acceptable-value enforcement.
//!
//! # Responsibilities
//! - Clamp values into their declared range or list
//! - Describe the restriction for the file comments
//!
//! # Design Decisions
//! - Out-of-list values fall back to the first listed value
//! - Integers stay integers when clamped into a float range

use crate::config::loader::inline_value;
use crate::config::schema::AcceptableValues;

/// Bring `value` inside the restriction.
pub fn clamp(acceptable: &AcceptableValues, value: toml::Value) -> toml::Value {
    match acceptable {
        AcceptableValues::List(allowed) => {
            if allowed.is_empty() || allowed.contains(&value) {
                value
            } else {
                allowed[0].clone()
            }
        }
        AcceptableValues::Range { min, max } if min.is_nan() || max.is_nan() => value,
        AcceptableValues::Range { min, max } => match value {
            toml::Value::Integer(i) => {
                let lo = min.ceil() as i64;
                let hi = max.floor() as i64;
                toml::Value::Integer(i.clamp(lo, hi.max(lo)))
            }
            toml::Value::Float(f) => toml::Value::Float(f.clamp(*min, max.max(*min))),
            other => other,
        },
    }
}

/// Whether `value` already satisfies the restriction.
pub fn is_acceptable(acceptable: &AcceptableValues, value: &toml::Value) -> bool {
    clamp(acceptable, value.clone()) == *value
}

pub fn describe_acceptable(acceptable: &AcceptableValues) -> String {
    match acceptable {
        AcceptableValues::List(values) => {
            let listed: Vec<String> = values.iter().map(inline_value).collect();
            format!("Acceptable values: {}", listed.join(", "))
        }
        AcceptableValues::Range { min, max } => {
            format!("Acceptable value range: From {min} to {max}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_falls_back_to_first() {
        let list = AcceptableValues::list(&["Off", "On"]);
        let bad = toml::Value::String("Maybe".into());

        assert_eq!(clamp(&list, bad.clone()), toml::Value::String("Off".into()));
        assert!(!is_acceptable(&list, &bad));
        assert!(is_acceptable(&list, &toml::Value::String("On".into())));
    }

    #[test]
    fn test_range_clamps_integers_and_floats() {
        let range = AcceptableValues::range(1.0, 10.0).unwrap();

        assert_eq!(clamp(&range, toml::Value::Integer(42)), toml::Value::Integer(10));
        assert_eq!(clamp(&range, toml::Value::Integer(-3)), toml::Value::Integer(1));
        assert_eq!(clamp(&range, toml::Value::Float(0.5)), toml::Value::Float(1.0));
        assert_eq!(clamp(&range, toml::Value::Float(2.5)), toml::Value::Float(2.5));
        // Non-numeric values pass through untouched.
        assert_eq!(
            clamp(&range, toml::Value::Boolean(true)),
            toml::Value::Boolean(true)
        );
    }

    #[test]
    fn test_nan_bound_leaves_value_alone() {
        let broken = AcceptableValues::Range {
            min: f64::NAN,
            max: 10.0,
        };
        assert_eq!(clamp(&broken, toml::Value::Float(42.0)), toml::Value::Float(42.0));
        assert_eq!(clamp(&broken, toml::Value::Integer(42)), toml::Value::Integer(42));
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            describe_acceptable(&AcceptableValues::range(0.0, 5.5).unwrap()),
            "Acceptable value range: From 0 to 5.5"
        );
        assert_eq!(
            describe_acceptable(&AcceptableValues::list(&[1, 2])),
            "Acceptable values: 1, 2"
        );
    }
}
