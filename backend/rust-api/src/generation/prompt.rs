use crate::models::Difficulty;

/// Builds the instruction sent to the text generation API for a new course.
pub fn build_course_prompt(topic: &str, difficulty: Difficulty, lesson_count: u8) -> String {
    format!(
        r#"You are an expert instructional designer. Create a complete {difficulty} level course about "{topic}" with exactly {lesson_count} lessons.

Respond with ONLY a single JSON object. Do not add any explanation, prose, or markdown code fences before or after it.

The JSON object must have exactly this shape:
{{
  "course": {{
    "title": "A clear, engaging course title",
    "description": "Two or three sentences describing what the learner will achieve",
    "difficulty": "{difficulty}",
    "estimatedDuration": "Total time to finish the course, for example \"4 hours\"",
    "learningObjectives": ["Objective 1", "Objective 2", "Objective 3", "Objective 4"]
  }},
  "lessons": [
    {{
      "title": "Lesson title",
      "content": "Full lesson body in HTML using <h2>, <h3>, <p>, <ul>, <li>, <code> and <pre> tags",
      "order": 1,
      "duration": "Estimated reading time, for example \"15 minutes\"",
      "videoSearchTerm": "A short search phrase for a video that complements this lesson",
      "points": 20
    }}
  ],
  "quiz": {{
    "title": "Quiz title",
    "description": "One sentence describing what the quiz checks",
    "questions": [
      {{
        "question": "Question text",
        "options": ["Option A", "Option B", "Option C", "Option D"],
        "correctAnswer": "The option text that is correct, copied exactly",
        "explanation": "Why this answer is correct"
      }}
    ]
  }}
}}

Requirements:
- "lessons" must contain exactly {lesson_count} items with "order" values 1 to {lesson_count}.
- Each lesson "content" must be between 500 and 800 words, tailored to a {difficulty} learner, with at least one practical example.
- Lessons must build on each other, starting from fundamentals and ending with applied topics.
- "quiz.questions" must contain exactly 5 questions covering the whole course, each with 4 options.
- "correctAnswer" must be identical to one of the strings in "options".
- Use double quotes for all keys and string values, escape line breaks inside strings as \n, and do not leave trailing commas.
- Output only the JSON object."#,
        topic = topic,
        difficulty = difficulty.as_str(),
        lesson_count = lesson_count,
    )
}
