//! In-process joke tools.
//!
//! Catalog order matters: `list_joke_categories` exposes it to users, so the
//! categories live in a slice rather than a map.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde_json::{json, Value};

use crate::tool_source::{ToolCallContent, ToolSource, ToolSourceError, ToolSpec};

const JOKE_CATALOG: &[(&str, &[&str])] = &[
    (
        "math",
        &[
            "Why was the math book sad? Because it had too many problems.",
            "I asked my math teacher if I could use a calculator. She said, 'Of course — but can you figure out how to turn it on?'",
            "Why do mathematicians like parks? Because of all the natural logs.",
            "Parallel lines have so much in common. It's a shame they'll never meet.",
            "What do you call a number that can't keep still? A roamin' numeral.",
            "A statistician drowned crossing a river that was, on average, 6 inches deep.",
            "Why did the student get bad grades in geometry? Because he thought pi was something you ate.",
        ],
    ),
    (
        "programming",
        &[
            "Why do programmers prefer dark mode? Because light attracts bugs.",
            "A QA engineer walks into a bar. Orders 0 beers. Orders 999999 beers. Orders -1 beers. Orders a lizard. Orders null. Orders asfasdf.",
            "There are only 10 types of people: those who understand binary, and those who don't.",
            "Why do Java developers wear glasses? Because they don't C#.",
            "A programmer's partner says: 'Go to the store and buy a loaf of bread. If they have eggs, buy a dozen.' Programmer returns with 12 loaves of bread.",
            "How many programmers does it take to change a lightbulb? None — that's a hardware problem.",
            "I told my computer I needed a break. Now it won't stop sending me Kit-Kat ads.",
        ],
    ),
    (
        "pun",
        &[
            "I'm reading a book about anti-gravity. It's impossible to put down.",
            "I used to hate facial hair, but then it grew on me.",
            "I'm on a seafood diet. I see food, and I eat it.",
            "Time flies like an arrow. Fruit flies like a banana.",
            "I would tell you a chemistry joke, but I know I wouldn't get a reaction.",
            "Did you hear about the claustrophobic astronaut? He just needed a little space.",
            "I asked the librarian if they had books about paranoia. She whispered: 'They're right behind you.'",
        ],
    ),
    (
        "general",
        &[
            "Why don't scientists trust atoms? Because they make up everything.",
            "I told my wife she was drawing her eyebrows too high. She looked surprised.",
            "I asked my dog what 2 minus 2 is. He said nothing.",
            "What do you call a fake noodle? An impasta.",
            "I used to play piano by ear, but now I use my hands.",
            "Why can't you give Elsa a balloon? Because she'll let it go.",
            "What do sprinters eat before a race? Nothing — they fast.",
        ],
    ),
];

/// Joke lookup tools backed by the fixed catalog above.
#[derive(Debug, Clone, Copy, Default)]
pub struct JokeToolSource;

impl JokeToolSource {
    /// Tool names served here, used for answer source classification.
    pub const NAMES: &'static [&'static str] = &[
        "get_random_joke",
        "get_joke_by_category",
        "list_joke_categories",
    ];

    pub fn new() -> Self {
        Self
    }

    fn categories() -> Vec<&'static str> {
        JOKE_CATALOG.iter().map(|(name, _)| *name).collect()
    }

    fn pick(jokes: &[&str]) -> String {
        jokes
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or_default()
            .to_string()
    }
}

fn string_arg(arguments: &Value, key: &str) -> Result<String, ToolSourceError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ToolSourceError::InvalidInput(format!("missing string argument '{key}'")))
}

#[async_trait]
impl ToolSource for JokeToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        let categories = Self::categories().join(", ");
        Ok(vec![
            ToolSpec {
                name: "get_random_joke".to_string(),
                description: Some("Return a random joke from any category".to_string()),
                input_schema: json!({"type": "object", "properties": {}}),
            },
            ToolSpec {
                name: "get_joke_by_category".to_string(),
                description: Some(format!(
                    "Return a random joke for the specified category. Available categories: {categories}."
                )),
                input_schema: json!({
                    "type": "object",
                    "properties": {"category": {"type": "string"}},
                    "required": ["category"],
                }),
            },
            ToolSpec {
                name: "list_joke_categories".to_string(),
                description: Some("List all available joke categories".to_string()),
                input_schema: json!({"type": "object", "properties": {}}),
            },
        ])
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let text = match name {
            "get_random_joke" => {
                let all: Vec<&str> = JOKE_CATALOG
                    .iter()
                    .flat_map(|(_, jokes)| jokes.iter().copied())
                    .collect();
                Self::pick(&all)
            }
            "get_joke_by_category" => {
                let category = string_arg(&arguments, "category")?;
                let key = category.trim().to_lowercase();
                match JOKE_CATALOG.iter().find(|(name, _)| *name == key) {
                    Some((_, jokes)) => Self::pick(jokes),
                    // Not an error on purpose: the model relays this text to
                    // the user as the tool's answer.
                    None => format!(
                        "Category '{category}' not found. Available: {}",
                        Self::categories().join(", ")
                    ),
                }
            }
            "list_joke_categories" => serde_json::to_string(&Self::categories())
                .map_err(|e| ToolSourceError::InvalidInput(e.to_string()))?,
            other => return Err(ToolSourceError::NotFound(other.to_string())),
        };
        Ok(ToolCallContent { text })
    }
}
