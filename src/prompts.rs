use clap::ValueEnum;

pub const LOGIC_MODIFIER: &str = include_str!("../data/prompts/logic_modifier.txt");
pub const SPOKEN_MODIFIER: &str = include_str!("../data/prompts/spoken_modifier.txt");

/// Built-in modifiers prepended to every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ModifierPreset {
    #[default]
    Logic,
    Spoken,
    None,
}

impl ModifierPreset {
    pub fn text(self) -> &'static str {
        match self {
            Self::Logic => LOGIC_MODIFIER.trim(),
            Self::Spoken => SPOKEN_MODIFIER.trim(),
            Self::None => "",
        }
    }
}
