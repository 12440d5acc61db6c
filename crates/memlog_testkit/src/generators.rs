//! Property-based test generators using proptest.
//!
//! Provides strategies for generating addresses and record content, both
//! valid and deliberately invalid.

use memlog_core::SUMMARY_MARKER;
use proptest::prelude::*;

/// Strategy for generating one valid address segment.
pub fn segment_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9_-]{1,12}")
        .expect("Invalid regex")
        .prop_filter("Segment must not be the summary marker", |s| s != SUMMARY_MARKER)
}

/// Strategy for generating valid unit addresses of one to five segments.
pub fn unit_address_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(segment_strategy(), 1..=5).prop_map(|segments| segments.join("/"))
}

/// Strategy for generating valid addresses, some selecting the summary
/// stream.
pub fn stream_address_strategy() -> impl Strategy<Value = String> {
    (unit_address_strategy(), any::<bool>()).prop_map(|(unit, summary)| {
        if summary {
            format!("{unit}/{SUMMARY_MARKER}")
        } else {
            unit
        }
    })
}

/// Strategy for generating addresses that must be rejected.
pub fn invalid_address_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        // Traversal
        (unit_address_strategy(), unit_address_strategy())
            .prop_map(|(a, b)| format!("{a}/../{b}")),
        unit_address_strategy().prop_map(|a| format!("../{a}")),
        // Current-directory segment
        unit_address_strategy().prop_map(|a| format!("{a}/./x")),
        // Empty segment
        (unit_address_strategy(), unit_address_strategy())
            .prop_map(|(a, b)| format!("{a}//{b}")),
        // Forbidden character
        (
            unit_address_strategy(),
            prop::sample::select(vec![' ', '.', '\\', ':', '*', '?', '%', '~', 'é'])
        )
            .prop_map(|(a, c)| format!("{a}{c}x")),
        // Bare or misplaced marker
        Just(SUMMARY_MARKER.to_string()),
        unit_address_strategy().prop_map(|a| format!("{a}/{SUMMARY_MARKER}/x")),
        // Blank
        prop::string::string_regex("[ /]{0,4}").expect("Invalid regex"),
    ]
}

/// Strategy for generating record content, including newlines, quotes and
/// non-ASCII text.
pub fn content_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => any::<String>(),
        1 => prop::string::string_regex("[a-z \\n\"\\\\]{0,64}").expect("Invalid regex"),
        1 => Just(String::new()),
    ]
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    ///
    /// Store properties touch the file system, so most suites use this.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
