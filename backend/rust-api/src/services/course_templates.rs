//! Canned course content for the fast path that skips the text generation API.

use crate::models::generation::{
    GeneratedCourse, GeneratedLesson, GeneratedPayload, GeneratedQuestion, GeneratedQuiz,
};
use crate::models::Difficulty;

struct LessonTemplate {
    title: fn(&str) -> String,
    content: fn(&str) -> String,
    duration: &'static str,
}

const LESSON_TEMPLATES: [LessonTemplate; 3] = [
    LessonTemplate {
        title: |topic| format!("Introduction to {}", topic),
        content: |topic| {
            format!(
                "<h2>Welcome to {topic}</h2>\
                 <p>This lesson introduces the core ideas behind {topic} and explains why it matters. \
                 You will learn the vocabulary used throughout the course and see how the pieces fit together.</p>\
                 <h3>What you will learn</h3>\
                 <ul><li>The fundamental concepts of {topic}</li>\
                 <li>Where {topic} is used in practice</li>\
                 <li>How to set up your learning environment</li></ul>\
                 <h3>Key takeaway</h3>\
                 <p>Understanding the fundamentals is the most important first step. \
                 Take your time with this lesson before moving on.</p>",
                topic = topic
            )
        },
        duration: "15 minutes",
    },
    LessonTemplate {
        title: |topic| format!("Core Concepts of {}", topic),
        content: |topic| {
            format!(
                "<h2>Core Concepts of {topic}</h2>\
                 <p>Now that you know the basics, this lesson digs into the concepts you will use every day \
                 when working with {topic}.</p>\
                 <h3>Building blocks</h3>\
                 <ul><li>The essential building blocks of {topic}</li>\
                 <li>Common patterns and how to recognise them</li>\
                 <li>Best practices that keep your work clean and maintainable</li></ul>\
                 <h3>Practice</h3>\
                 <p>Practice consistently: short daily sessions beat occasional marathons. \
                 Try to apply each concept right after reading about it.</p>",
                topic = topic
            )
        },
        duration: "20 minutes",
    },
    LessonTemplate {
        title: |topic| format!("Practical Applications of {}", topic),
        content: |topic| {
            format!(
                "<h2>Putting {topic} to Work</h2>\
                 <p>This lesson focuses on hands-on practice. You will combine everything covered so far \
                 into small, realistic exercises.</p>\
                 <h3>Exercises</h3>\
                 <ul><li>Build a small project that uses {topic}</li>\
                 <li>Review your work against the best practices from the previous lesson</li>\
                 <li>Identify one area you want to explore further</li></ul>\
                 <h3>Next steps</h3>\
                 <p>Stay curious and persistent. Mastery of {topic} comes from building things, \
                 making mistakes and learning from them.</p>",
                topic = topic
            )
        },
        duration: "25 minutes",
    },
];

/// Builds a complete course for `topic` without calling the generation API.
/// Lessons past the third reuse the first template.
pub fn template_course(topic: &str, difficulty: Difficulty, lesson_count: u8) -> GeneratedPayload {
    let lessons = (0..lesson_count as usize)
        .map(|index| {
            let template = LESSON_TEMPLATES
                .get(index)
                .unwrap_or(&LESSON_TEMPLATES[0]);
            let title = if index < LESSON_TEMPLATES.len() {
                (template.title)(topic)
            } else {
                format!("{} (Part {})", (template.title)(topic), index + 1)
            };

            GeneratedLesson {
                title: Some(title),
                content: Some((template.content)(topic)),
                order: Some(index as u32 + 1),
                points: None,
                duration: Some(template.duration.to_string()),
                video_search_term: Some(format!("{} tutorial for {}s", topic, difficulty)),
            }
        })
        .collect();

    GeneratedPayload {
        course: GeneratedCourse {
            title: Some(format!("Complete {} Course", topic)),
            description: Some(format!(
                "A {} course that takes you from the fundamentals of {} to practical, hands-on use.",
                difficulty, topic
            )),
            estimated_duration: Some(format!("{} hours", lesson_count)),
            learning_objectives: vec![
                format!("Understand the fundamentals of {}", topic),
                format!("Apply core {} concepts in practice", topic),
                format!("Follow best practices when working with {}", topic),
                format!("Build a small project using {}", topic),
            ],
        },
        lessons,
        quiz: template_quiz(topic),
    }
}

fn template_quiz(topic: &str) -> GeneratedQuiz {
    let question = |text: String, options: [&str; 4], answer: &str, explanation: &str| {
        GeneratedQuestion {
            question: text,
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: Some(answer.to_string()),
            answer: None,
            explanation: Some(explanation.to_string()),
        }
    };

    GeneratedQuiz {
        title: Some(format!("{} Knowledge Check", topic)),
        description: Some(format!("Test what you learned about {}", topic)),
        questions: vec![
            question(
                format!("What is the most important first step when learning {}?", topic),
                [
                    "Understanding fundamentals",
                    "Memorizing every detail",
                    "Skipping to advanced topics",
                    "Avoiding documentation",
                ],
                "Understanding fundamentals",
                "Everything else builds on a solid grasp of the fundamentals.",
            ),
            question(
                format!("How do you improve your {} skills most effectively?", topic),
                [
                    "Read once and move on",
                    "Practice consistently",
                    "Only watch videos",
                    "Wait until you feel ready",
                ],
                "Practice consistently",
                "Regular practice turns knowledge into skill.",
            ),
            question(
                format!("Which learning approach works best for {}?", topic),
                [
                    "Passive reading",
                    "Memorization only",
                    "Hands-on practice",
                    "Avoiding exercises",
                ],
                "Hands-on practice",
                "Applying concepts in real exercises reinforces understanding.",
            ),
            question(
                format!("Why do best practices matter in {}?", topic),
                [
                    "They are optional suggestions",
                    "They slow you down",
                    "They only matter for experts",
                    "They ensure quality and maintainability",
                ],
                "They ensure quality and maintainability",
                "Best practices keep work reliable and easy to change.",
            ),
            question(
                format!("Which mindset helps most when mastering {}?", topic),
                [
                    "Give up when stuck",
                    "Stay curious and persistent",
                    "Avoid asking questions",
                    "Focus only on speed",
                ],
                "Stay curious and persistent",
                "Curiosity and persistence carry you through the hard parts.",
            ),
        ],
        score: Some(50),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_three_lessons_are_distinct_and_rest_reuse_first() {
        let payload = template_course("Python", Difficulty::Beginner, 5);
        let contents: Vec<_> = payload
            .lessons
            .iter()
            .map(|l| l.content.clone().unwrap())
            .collect();

        assert_eq!(payload.lessons.len(), 5);
        assert_ne!(contents[0], contents[1]);
        assert_ne!(contents[1], contents[2]);
        assert_eq!(contents[3], contents[0]);
        assert_eq!(contents[4], contents[0]);
        assert_eq!(
            payload.lessons[3].title.as_deref(),
            Some("Introduction to Python (Part 4)")
        );
        assert_eq!(payload.lessons[4].order, Some(5));
    }

    #[test]
    fn quiz_has_five_questions_worth_fifty() {
        let quiz = template_quiz("Python");
        assert_eq!(quiz.questions.len(), 5);
        assert_eq!(quiz.score, Some(50));
        for q in &quiz.questions {
            let answer = q.resolved_answer();
            assert!(q.options.contains(&answer), "{} not in options", answer);
        }
    }

    #[test]
    fn template_is_deterministic() {
        let a = template_course("Go", Difficulty::Advanced, 3);
        let b = template_course("Go", Difficulty::Advanced, 3);
        assert_eq!(a.course.title, b.course.title);
        assert_eq!(a.lessons[2].content, b.lessons[2].content);
    }
}
