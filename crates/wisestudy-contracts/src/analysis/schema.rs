use serde_json::{json, Value};

/// Response schema sent as `generationConfig.responseSchema`.
///
/// Uses the OpenAPI subset understood by `generateContent` (upper-case type
/// names). Every property is listed in `required` at every level.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "subject": {
                "type": "STRING",
                "description": "The subject of the exam (e.g., 数学, 英语, 物理)."
            },
            "estimatedScore": {
                "type": "NUMBER",
                "description": "The estimated score achieved by the student based on the visible marks."
            },
            "totalScore": {
                "type": "NUMBER",
                "description": "The total possible score of the exam."
            },
            "summary": {
                "type": "STRING",
                "description": "A brief, encouraging summary of the student's performance."
            },
            "weaknesses": {
                "type": "ARRAY",
                "description": "List of weak knowledge points identified from mistakes.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "topic": { "type": "STRING", "description": "Name of the knowledge point." },
                        "severity": {
                            "type": "INTEGER",
                            "description": "Severity of the weakness from 0 to 100.",
                            "minimum": 0,
                            "maximum": 100
                        },
                        "description": { "type": "STRING", "description": "Explanation of why this is a weakness." }
                    },
                    "required": ["topic", "severity", "description"]
                }
            },
            "plan": {
                "type": "ARRAY",
                "description": "A step-by-step study plan to improve.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "stage": { "type": "STRING", "description": "Timeframe or stage name (e.g., '第1-3天')." },
                        "task": { "type": "STRING", "description": "Specific action item." },
                        "focus": { "type": "STRING", "description": "Key focus area." }
                    },
                    "required": ["stage", "task", "focus"]
                }
            },
            "mistakes": {
                "type": "ARRAY",
                "description": "Detailed analysis of specific mistakes found in the image.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "questionId": { "type": "STRING", "description": "Question number (e.g., 'Q3', '填空题2')." },
                        "topic": { "type": "STRING", "description": "Related knowledge point." },
                        "cause": {
                            "type": "STRING",
                            "description": "Likely cause of error (e.g., Calculation error, Concept misunderstanding)."
                        },
                        "solution": { "type": "STRING", "description": "How to solve it correctly." }
                    },
                    "required": ["questionId", "topic", "cause", "solution"]
                }
            }
        },
        "required": [
            "subject",
            "estimatedScore",
            "totalScore",
            "summary",
            "weaknesses",
            "plan",
            "mistakes"
        ]
    })
}
