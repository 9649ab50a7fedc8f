// src/catalog.rs

//! The canonical personality question catalog used for seeding.

use crate::models::question::{NewQuestion, QuestionType};

const IMPORTANCE: &[&str] = &[
    "Very important",
    "Somewhat important",
    "Neutral",
    "Not very important",
    "Not important at all",
];

type Entry = (&'static str, &'static str, QuestionType, &'static [&'static str]);

use crate::models::question::QuestionType::{MultipleChoice as Choice, Scale, Text};

const CATALOG: &[Entry] = &[
    // Values and beliefs
    (
        "What do you value most in a relationship?",
        "Values and Beliefs",
        Choice,
        &["Trust", "Communication", "Passion", "Shared interests", "Emotional support"],
    ),
    (
        "How important is religion or spirituality in your life?",
        "Values and Beliefs",
        Choice,
        IMPORTANCE,
    ),
    (
        "How do you feel about traditional gender roles in relationships?",
        "Values and Beliefs",
        Choice,
        &[
            "Strongly support them",
            "Somewhat support them",
            "Neutral",
            "Somewhat oppose them",
            "Strongly oppose them",
        ],
    ),
    (
        "What's your approach to finances in a relationship?",
        "Values and Beliefs",
        Choice,
        &[
            "Completely shared finances",
            "Mostly shared with some separate accounts",
            "Equal split of expenses",
            "Proportional to income",
            "Completely separate finances",
        ],
    ),
    (
        "What are your core values that you wouldn't compromise on?",
        "Values and Beliefs",
        Text,
        &[],
    ),
    // Lifestyle preferences
    (
        "How would you describe your ideal weekend?",
        "Lifestyle Preferences",
        Choice,
        &[
            "Outdoor adventures",
            "Social gatherings",
            "Relaxing at home",
            "Cultural activities",
            "Mix of activities",
        ],
    ),
    (
        "What's your preferred living environment?",
        "Lifestyle Preferences",
        Choice,
        &["Big city", "Suburban area", "Small town", "Rural area", "Doesn't matter"],
    ),
    (
        "How often do you exercise?",
        "Lifestyle Preferences",
        Choice,
        &["Daily", "Several times a week", "Once a week", "Occasionally", "Rarely or never"],
    ),
    (
        "What are your dietary preferences?",
        "Lifestyle Preferences",
        Choice,
        &["No restrictions", "Vegetarian", "Vegan", "Pescatarian", "Other specific diet"],
    ),
    (
        "How would you describe your sleep schedule?",
        "Lifestyle Preferences",
        Choice,
        &["Early bird", "Night owl", "Regular 9-5 schedule", "Irregular/varies", "Flexible"],
    ),
    // Relationship goals
    (
        "What are you looking for in a relationship right now?",
        "Relationship Goals",
        Choice,
        &["Long-term commitment", "Marriage", "Casual dating", "Friendship first", "Not sure yet"],
    ),
    (
        "How do you feel about having children?",
        "Relationship Goals",
        Choice,
        &[
            "Definitely want children",
            "Open to children",
            "Undecided",
            "Prefer not to have children",
            "Don't want children",
        ],
    ),
    (
        "What's your timeline for settling down?",
        "Relationship Goals",
        Choice,
        &[
            "Already looking to settle down",
            "Within the next few years",
            "Eventually but not soon",
            "No specific timeline",
            "Not interested in settling down",
        ],
    ),
    (
        "How important is marriage to you?",
        "Relationship Goals",
        Choice,
        IMPORTANCE,
    ),
    (
        "What does your ideal future with a partner look like?",
        "Relationship Goals",
        Text,
        &[],
    ),
    // Hobbies and interests
    (
        "What are your favorite ways to spend free time?",
        "Hobbies and Interests",
        Choice,
        &[
            "Outdoor activities",
            "Reading/learning",
            "Creative pursuits",
            "Social activities",
            "Screen time (TV, games, etc.)",
        ],
    ),
    (
        "How important is it that your partner shares your hobbies?",
        "Hobbies and Interests",
        Choice,
        IMPORTANCE,
    ),
    (
        "How often do you like to travel?",
        "Hobbies and Interests",
        Choice,
        &[
            "As much as possible",
            "Several times a year",
            "Once or twice a year",
            "Rarely",
            "Not interested in travel",
        ],
    ),
    (
        "What type of music do you enjoy most?",
        "Hobbies and Interests",
        Choice,
        &[
            "Pop",
            "Rock",
            "Hip-hop/Rap",
            "Electronic",
            "Classical",
            "Country",
            "Jazz",
            "Eclectic/Various",
        ],
    ),
    (
        "Describe a hobby or passion that's important to you.",
        "Hobbies and Interests",
        Text,
        &[],
    ),
    // Communication style
    (
        "How do you prefer to resolve conflicts?",
        "Communication Style",
        Choice,
        &[
            "Address immediately",
            "Take time to cool off first",
            "Discuss calmly",
            "Seek compromise",
            "Avoid confrontation",
        ],
    ),
    (
        "How often do you need personal space?",
        "Communication Style",
        Choice,
        &["Daily", "Several times a week", "Occasionally", "Rarely", "Almost never"],
    ),
    (
        "How do you express affection?",
        "Communication Style",
        Choice,
        &["Physical touch", "Words of affirmation", "Acts of service", "Quality time", "Giving gifts"],
    ),
    (
        "How open are you about your feelings?",
        "Communication Style",
        Choice,
        &["Very open", "Somewhat open", "Depends on the situation", "Somewhat reserved", "Very private"],
    ),
    (
        "What's your communication style in a relationship?",
        "Communication Style",
        Text,
        &[],
    ),
    // Deal breakers
    (
        "Which of these would be a deal breaker for you?",
        "Deal Breakers",
        Choice,
        &[
            "Different political views",
            "Different religious beliefs",
            "Long distance",
            "Has children",
            "Doesn't want children",
        ],
    ),
    (
        "How do you feel about smoking?",
        "Deal Breakers",
        Choice,
        &["Deal breaker", "Prefer non-smoker", "Occasional is ok", "Regular is ok", "I smoke too"],
    ),
    (
        "How do you feel about drinking alcohol?",
        "Deal Breakers",
        Choice,
        &["Deal breaker", "Occasional is ok", "Regular is ok", "I drink too", "Don't care"],
    ),
    (
        "How important is physical attraction to you?",
        "Deal Breakers",
        Choice,
        &[
            "Extremely important",
            "Very important",
            "Somewhat important",
            "Not very important",
            "Not important at all",
        ],
    ),
    (
        "What are your absolute deal breakers in a relationship?",
        "Deal Breakers",
        Text,
        &[],
    ),
    // Ratings
    (
        "How important is physical attraction in a relationship to you?",
        "Relationship Preferences",
        Scale,
        &[],
    ),
    (
        "How much do you value alone time?",
        "Lifestyle Preferences",
        Scale,
        &[],
    ),
    (
        "How comfortable are you with conflict in relationships?",
        "Communication Style",
        Scale,
        &[],
    ),
];

/// The full catalog in presentation order.
pub fn personality_questions() -> Vec<NewQuestion> {
    CATALOG
        .iter()
        .map(|(text, category, question_type, options)| NewQuestion {
            question_text: text.to_string(),
            category: category.to_string(),
            options: match question_type {
                QuestionType::MultipleChoice => {
                    Some(options.iter().map(|o| o.to_string()).collect())
                }
                QuestionType::Text | QuestionType::Scale => None,
            },
            question_type: *question_type,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn catalog_has_thirty_three_unique_questions() {
        let questions = personality_questions();
        assert_eq!(questions.len(), 33);

        let texts: HashSet<&str> = questions.iter().map(|q| q.question_text.as_str()).collect();
        assert_eq!(texts.len(), questions.len());
    }

    #[test]
    fn only_choice_questions_carry_options() {
        for q in personality_questions() {
            match q.question_type {
                QuestionType::MultipleChoice => {
                    let options = q.options.as_ref().unwrap();
                    assert!(options.len() >= 5, "{}", q.question_text);
                }
                QuestionType::Text | QuestionType::Scale => assert!(q.options.is_none()),
            }
        }
    }

    #[test]
    fn mix_of_question_types() {
        let questions = personality_questions();
        let count = |t: QuestionType| questions.iter().filter(|q| q.question_type == t).count();
        assert_eq!(count(QuestionType::MultipleChoice), 24);
        assert_eq!(count(QuestionType::Text), 6);
        assert_eq!(count(QuestionType::Scale), 3);
    }
}
