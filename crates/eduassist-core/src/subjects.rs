use crate::types::DEFAULT_SUBJECT;

static SUBJECT_KEYS: &[(&str, &str)] = &[
    ("Python Programming", "python_programming"),
    ("Data Structures", "data_structures"),
    ("Database Management Systems", "dbms"),
    ("Operating Systems", "operating_systems"),
    ("Machine Learning", "machine_learning"),
    ("Computer Networks", "computer_networks"),
    ("C Programming", "c_programming"),
];

/// Knowledge-base subject key for a course display name. Unknown names map
/// to [`DEFAULT_SUBJECT`].
pub fn subject_key_for(display_name: &str) -> &'static str {
    SUBJECT_KEYS
        .iter()
        .find(|(name, _)| *name == display_name.trim())
        .map_or(DEFAULT_SUBJECT, |(_, key)| *key)
}
