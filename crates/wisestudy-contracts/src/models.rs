#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisionModel {
    pub name: &'static str,
    pub label: &'static str,
}

pub const KNOWN_MODELS: [VisionModel; 3] = [
    VisionModel {
        name: "gemini-2.5-flash",
        label: "Gemini 2.5 Flash (fast multimodal)",
    },
    VisionModel {
        name: "gemini-2.5-pro",
        label: "Gemini 2.5 Pro (slower, deeper reasoning)",
    },
    VisionModel {
        name: "gemini-2.0-flash",
        label: "Gemini 2.0 Flash",
    },
];

pub fn default_model() -> VisionModel {
    KNOWN_MODELS[0]
}

pub fn find_model(name: &str) -> Option<VisionModel> {
    let name = name.trim();
    let name = name.strip_prefix("models/").unwrap_or(name);
    KNOWN_MODELS.iter().copied().find(|model| model.name == name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelChoice {
    pub model: VisionModel,
    pub fallback_reason: Option<String>,
}

// A blank request picks the default without a fallback reason.
pub fn choose_model(requested: Option<&str>) -> ModelChoice {
    let Some(requested) = requested.map(str::trim).filter(|value| !value.is_empty()) else {
        return ModelChoice {
            model: default_model(),
            fallback_reason: None,
        };
    };
    match find_model(requested) {
        Some(model) => ModelChoice {
            model,
            fallback_reason: None,
        },
        None => {
            let model = default_model();
            ModelChoice {
                model,
                fallback_reason: Some(format!(
                    "unknown analysis model '{requested}', using {}",
                    model.name
                )),
            }
        }
    }
}
