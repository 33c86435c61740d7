use std::fmt;

use crate::config::MonkFishConfig;
use crate::errors::{MonkFishError, Result};

pub const HASH: &str = "Hash";
pub const THREADS: &str = "Threads";
pub const PONDER: &str = "Ponder";
pub const SKILL: &str = "MonkFish_Skill";
pub const DRAWING_THRESHOLD: &str = "Drawing_Threshold";
pub const SEARCH_DEPTH: &str = "Search_Depth";
pub const MULTIPV: &str = "MultiPV";
pub const USE_NNUE: &str = "Use_NNUE";

/// UCI option types
#[derive(Debug, Clone, PartialEq)]
pub enum UCIOption {
    Check {
        default: bool,
        value: bool,
    },
    Spin {
        default: i32,
        min: i32,
        max: i32,
        value: i32,
    },
}

impl UCIOption {
    fn spin(default: i32, min: i32, max: i32) -> Self {
        let default = default.clamp(min, max);
        UCIOption::Spin {
            default,
            min,
            max,
            value: default,
        }
    }

    fn check(default: bool) -> Self {
        UCIOption::Check {
            default,
            value: default,
        }
    }

    pub fn value(&self) -> OptionValue {
        match self {
            UCIOption::Check { value, .. } => OptionValue::Bool(*value),
            UCIOption::Spin { value, .. } => OptionValue::Int(*value),
        }
    }
}

/// Current value of an option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionValue {
    Int(i32),
    Bool(bool),
}

impl OptionValue {
    pub fn as_int(self) -> Option<i32> {
        match self {
            OptionValue::Int(v) => Some(v),
            OptionValue::Bool(_) => None,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            OptionValue::Bool(v) => Some(v),
            OptionValue::Int(_) => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Int(v) => write!(f, "{v}"),
            OptionValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Fixed catalogue of UCI options advertised to the GUI.
///
/// Entries keep their declaration order so `option_strings` renders the same
/// sequence on every `uci` request.
#[derive(Debug, Clone)]
pub struct OptionRegistry {
    options: Vec<(String, UCIOption)>,
}

impl OptionRegistry {
    pub fn new(config: &MonkFishConfig) -> Self {
        let threshold_percent = (config.search.drawing_threshold * 100.0).round() as i32;
        let depth = i32::try_from(config.search.default_depth).unwrap_or(i32::MAX);

        let options = vec![
            // Standard UCI options
            (HASH.to_string(), UCIOption::spin(128, 1, 2048)),
            (THREADS.to_string(), UCIOption::spin(1, 1, 8)),
            (PONDER.to_string(), UCIOption::check(false)),
            // MonkFish specific options
            (SKILL.to_string(), UCIOption::spin(config.engine.skill_level, 0, 20)),
            (DRAWING_THRESHOLD.to_string(), UCIOption::spin(threshold_percent, 0, 50)),
            (SEARCH_DEPTH.to_string(), UCIOption::spin(depth, 1, 10)),
            (MULTIPV.to_string(), UCIOption::spin(config.engine.multipv, 1, 100)),
            (USE_NNUE.to_string(), UCIOption::check(config.engine.use_nnue)),
        ];

        Self { options }
    }

    /// One `option name ...` line per catalogue entry
    pub fn option_strings(&self) -> Vec<String> {
        self.options
            .iter()
            .map(|(name, option)| match option {
                UCIOption::Spin {
                    default, min, max, ..
                } => format!("option name {name} type spin default {default} min {min} max {max}"),
                UCIOption::Check { default, .. } => {
                    format!("option name {name} type check default {default}")
                }
            })
            .collect()
    }

    /// Validate and store a new value. A rejected value leaves the option untouched.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        let invalid = || MonkFishError::InvalidOptionValue {
            name: name.to_string(),
            value: value.to_string(),
        };

        let option = self.get_mut(name).ok_or_else(invalid)?;
        match option {
            UCIOption::Spin {
                value: val,
                min,
                max,
                ..
            } => {
                let new_val = value.trim().parse::<i32>().map_err(|_| invalid())?;
                if new_val < *min || new_val > *max {
                    return Err(invalid());
                }
                *val = new_val;
            }
            UCIOption::Check { value: val, .. } => {
                *val = match value.trim().to_ascii_lowercase().as_str() {
                    "true" => true,
                    "false" => false,
                    _ => return Err(invalid()),
                };
            }
        }
        Ok(())
    }

    /// `set_option` reduced to success or failure
    pub fn try_set(&mut self, name: &str, value: &str) -> bool {
        self.set_option(name, value).is_ok()
    }

    pub fn get_value(&self, name: &str) -> Option<OptionValue> {
        self.get(name).map(UCIOption::value)
    }

    pub fn get(&self, name: &str) -> Option<&UCIOption> {
        self.options
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, option)| option)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut UCIOption> {
        self.options
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, option)| option)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    fn int(&self, name: &str) -> i32 {
        self.get_value(name).and_then(OptionValue::as_int).unwrap_or_default()
    }

    fn flag(&self, name: &str) -> bool {
        self.get_value(name).and_then(OptionValue::as_bool).unwrap_or_default()
    }

    pub fn hash(&self) -> i32 {
        self.int(HASH)
    }

    pub fn threads(&self) -> i32 {
        self.int(THREADS)
    }

    pub fn skill_level(&self) -> i32 {
        self.int(SKILL)
    }

    /// Drawing threshold as a fraction of a pawn (stored percent / 100)
    pub fn drawing_threshold(&self) -> f64 {
        f64::from(self.int(DRAWING_THRESHOLD)) / 100.0
    }

    pub fn search_depth(&self) -> u32 {
        u32::try_from(self.int(SEARCH_DEPTH)).unwrap_or(1)
    }

    pub fn multipv(&self) -> i32 {
        self.int(MULTIPV)
    }

    pub fn use_nnue(&self) -> bool {
        self.flag(USE_NNUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> OptionRegistry {
        OptionRegistry::new(&MonkFishConfig::default())
    }

    #[test]
    fn test_option_strings_format() {
        let options = registry();
        let lines = options.option_strings();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines.len(), options.len());

        assert_eq!(lines[0], "option name Hash type spin default 128 min 1 max 2048");
        assert_eq!(lines[1], "option name Threads type spin default 1 min 1 max 8");
        assert_eq!(lines[2], "option name Ponder type check default false");
        assert_eq!(lines[3], "option name MonkFish_Skill type spin default 3 min 0 max 20");
        assert_eq!(lines[4], "option name Drawing_Threshold type spin default 1 min 0 max 50");
        assert_eq!(lines[5], "option name Search_Depth type spin default 2 min 1 max 10");
        assert_eq!(lines[6], "option name MultiPV type spin default 40 min 1 max 100");
        assert_eq!(lines[7], "option name Use_NNUE type check default false");

        // Stable across calls
        assert_eq!(lines, options.option_strings());
    }

    #[test]
    fn test_spin_bounds_are_enforced() {
        let bounds = [
            (HASH, 1, 2048),
            (THREADS, 1, 8),
            (SKILL, 0, 20),
            (DRAWING_THRESHOLD, 0, 50),
            (SEARCH_DEPTH, 1, 10),
            (MULTIPV, 1, 100),
        ];

        for (name, min, max) in bounds {
            let mut options = registry();
            for candidate in (min - 3)..=(max + 3) {
                let before = options.get_value(name);
                let accepted = options.try_set(name, &candidate.to_string());
                assert_eq!(accepted, (min..=max).contains(&candidate), "{name}={candidate}");
                if accepted {
                    assert_eq!(options.get_value(name), Some(OptionValue::Int(candidate)));
                } else {
                    assert_eq!(options.get_value(name), before);
                }
            }
        }
    }

    #[test]
    fn test_set_invalid_options() {
        let mut options = registry();
        assert!(!options.try_set(HASH, "5000"));
        assert!(!options.try_set(HASH, "not_a_number"));
        assert!(!options.try_set(HASH, "12.5"));
        assert!(!options.try_set("NonExistent", "value"));
        assert_eq!(options.hash(), 128);

        let err = options.set_option(HASH, "0").unwrap_err();
        assert!(matches!(err, MonkFishError::InvalidOptionValue { .. }));
    }

    #[test]
    fn test_check_options_store_booleans() {
        let mut options = registry();
        assert!(options.try_set(PONDER, "TRUE"));
        assert_eq!(options.get_value(PONDER), Some(OptionValue::Bool(true)));
        assert!(options.try_set(PONDER, "False"));
        assert_eq!(options.get_value(PONDER), Some(OptionValue::Bool(false)));

        for bad in ["yes", "1", "on", ""] {
            assert!(!options.try_set(USE_NNUE, bad), "{bad:?}");
        }
        assert!(!options.use_nnue());

        assert!(options.try_set(USE_NNUE, "true"));
        assert!(options.use_nnue());
    }

    #[test]
    fn test_drawing_threshold_conversion() {
        let mut options = registry();
        assert!(options.try_set(DRAWING_THRESHOLD, "5"));
        assert_eq!(options.drawing_threshold(), 0.05);
        assert!(options.try_set(DRAWING_THRESHOLD, "10"));
        assert_eq!(options.drawing_threshold(), 0.10);

        for percent in 0..=50 {
            assert!(options.try_set(DRAWING_THRESHOLD, &percent.to_string()));
            assert_eq!(options.drawing_threshold(), f64::from(percent) / 100.0);
        }
    }

    #[test]
    fn test_config_defaults_flow_into_catalogue() {
        let mut config = MonkFishConfig::default();
        config.engine.skill_level = 15;
        config.engine.use_nnue = true;
        config.search.drawing_threshold = 0.2;
        config.search.default_depth = 40;

        let options = OptionRegistry::new(&config);
        assert_eq!(options.skill_level(), 15);
        assert!(options.use_nnue());
        assert_eq!(options.drawing_threshold(), 0.2);
        // Out-of-range configuration is clamped into the declared bounds
        assert_eq!(options.search_depth(), 10);
    }

    #[test]
    fn test_unknown_option_value() {
        let options = registry();
        assert_eq!(options.get_value("Nope"), None);
        assert_eq!(options.get_value(MULTIPV), Some(OptionValue::Int(40)));
        assert_eq!(OptionValue::Bool(true).to_string(), "true");
    }
}
