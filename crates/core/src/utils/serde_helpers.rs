//! Serde helpers for enums that appear in hand-edited files

/// Implement `Deserialize` for a fieldless enum, matching variant names
/// case-insensitively against the given lowercase spellings.
///
/// ```ignore
/// impl_case_insensitive_deserialize!(
///     TerminalPlatform,
///     Linux => "linux",
///     Osx => "osx"
/// );
/// ```
#[macro_export]
macro_rules! impl_case_insensitive_deserialize {
    ($enum_type:ty, $($variant:ident => $str_val:expr),+ $(,)?) => {
        impl<'de> serde::Deserialize<'de> for $enum_type {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                match s.trim().to_lowercase().as_str() {
                    $(
                        $str_val => Ok(Self::$variant),
                    )+
                    _ => Err(serde::de::Error::custom(format!(
                        "unknown variant '{}', expected one of: {}",
                        s,
                        [$($str_val),+].join(", ")
                    ))),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::types::LifecycleOperation;

    #[test]
    fn test_mixed_case_and_padding_accepted() {
        let op: LifecycleOperation = serde_json::from_str(r#"" ReBuild ""#).unwrap();
        assert_eq!(op, LifecycleOperation::Rebuild);
    }

    #[test]
    fn test_unknown_variant_lists_choices() {
        let err = serde_json::from_str::<LifecycleOperation>(r#""poweroff""#)
            .unwrap_err()
            .to_string();
        assert!(err.contains("unknown variant 'poweroff'"));
        assert!(err.contains("expected one of: start, stop, restart, rebuild, destroy"));
    }
}
