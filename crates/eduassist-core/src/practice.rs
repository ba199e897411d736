//! Canned practice prompts keyed by subject and topic.

const COMING_SOON: &str = "Practice questions for this subject coming soon!";

/// Topic key that selects a subject's general list.
pub const DEFAULT_TOPIC: &str = "default";

type TopicTable = &'static [(&'static str, &'static [&'static str])];

static PRACTICE: &[(&str, TopicTable)] = &[
    (
        "python_programming",
        &[
            (
                "default",
                &[
                    "What is the difference between a list and a tuple in Python?",
                    "Explain the concept of list comprehension with an example.",
                    "What are decorators in Python and how do they work?",
                    "Write a program to check if a number is prime.",
                    "Explain the difference between shallow copy and deep copy.",
                ],
            ),
            (
                "loops",
                &[
                    "What is the difference between for and while loops?",
                    "How do you use break and continue statements?",
                    "Write a program to print Fibonacci series using loops.",
                    "Explain nested loops with an example.",
                    "What is an infinite loop and how to avoid it?",
                ],
            ),
            (
                "oop",
                &[
                    "What are the four pillars of OOP?",
                    "Explain inheritance with an example.",
                    "What is polymorphism in Python?",
                    "Difference between class variables and instance variables?",
                    "What is method overriding?",
                ],
            ),
        ],
    ),
    (
        "data_structures",
        &[(
            "default",
            &[
                "What is the difference between an array and a linked list?",
                "Explain the time complexity of different sorting algorithms.",
                "What is a binary search tree?",
                "How does a hash table work?",
                "Explain the difference between BFS and DFS.",
            ],
        )],
    ),
    (
        "dbms",
        &[(
            "default",
            &[
                "What is normalization and why is it important?",
                "Explain ACID properties in database transactions.",
                "What is the difference between SQL and NoSQL databases?",
                "What are indexes and how do they improve performance?",
                "Explain different types of joins in SQL.",
            ],
        )],
    ),
];

/// Practice prompts for `topic_key` of `subject_key`.
///
/// Unknown subjects get a single "coming soon" entry; unknown topics of a
/// known subject fall back to the subject's `default` list.
pub fn generate_practice_questions(subject_key: &str, topic_key: &str) -> Vec<String> {
    let Some((_, topics)) = PRACTICE.iter().find(|(s, _)| *s == subject_key) else {
        return vec![COMING_SOON.to_string()];
    };
    let lookup = |key: &str| topics.iter().find(|(t, _)| *t == key).map(|(_, qs)| *qs);
    lookup(topic_key)
        .or_else(|| lookup(DEFAULT_TOPIC))
        .unwrap_or_default()
        .iter()
        .map(|q| (*q).to_string())
        .collect()
}

/// Subjects that have a practice table.
pub fn practice_subjects() -> impl Iterator<Item = &'static str> {
    PRACTICE.iter().map(|(s, _)| *s)
}
