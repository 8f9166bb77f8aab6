//! Prompt text for the two provider dialects
//!
//! The GPT-4o endpoint sees every reference image we attach, so its prompt
//! points at them positionally. Kontext only receives the input photo, so
//! its prompt has to carry the full description.

/// Inputs for the GPT-4o prompt template
#[derive(Debug, Clone, Default)]
pub struct Gpt4oPromptArgs<'a> {
    pub hairstyle: &'a str,
    /// Hair color name, when a concrete color was chosen
    pub haircolor: Option<&'a str>,
    /// Hex value of the chosen color, e.g. "#8B4513"
    pub haircolor_hex: Option<&'a str>,
    pub with_style_reference: bool,
    pub with_color_reference: bool,
    pub detail: Option<&'a str>,
}

pub fn gpt4o_prompt(args: &Gpt4oPromptArgs) -> String {
    let mut prompt = format!(
        "Change the hairstyle of the person in the first image to a {} cut. \
         Keep the face, expression, skin tone and background unchanged; only the hair changes.",
        args.hairstyle
    );

    if args.with_style_reference {
        prompt.push_str(" The next reference image shows the target hairstyle.");
    }

    if let Some(color) = args.haircolor {
        match args.haircolor_hex {
            Some(hex) => prompt.push_str(&format!(" Dye the hair {} ({}).", color, hex)),
            None => prompt.push_str(&format!(" Dye the hair {}.", color)),
        }
        if args.with_color_reference {
            prompt.push_str(" The last reference image shows the target hair color.");
        }
    }

    if let Some(detail) = trimmed(args.detail) {
        prompt.push(' ');
        prompt.push_str(detail);
    }

    prompt
}

pub fn kontext_prompt(hairstyle: &str, haircolor: Option<&str>, detail: Option<&str>) -> String {
    let mut prompt = format!(
        "Give the person a {} hairstyle while keeping their facial features, \
         expression and background unchanged.",
        hairstyle
    );

    if let Some(color) = haircolor {
        prompt.push_str(&format!(" Change the hair color to {}.", color));
    }

    if let Some(detail) = trimmed(detail) {
        prompt.push(' ');
        prompt.push_str(detail);
    }

    prompt
}

fn trimmed(detail: Option<&str>) -> Option<&str> {
    detail.map(str::trim).filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpt4o_prompt_base() {
        let prompt = gpt4o_prompt(&Gpt4oPromptArgs {
            hairstyle: "Bob",
            ..Gpt4oPromptArgs::default()
        });
        assert!(prompt.contains("Bob cut"));
        assert!(!prompt.contains("reference image"));
        assert!(!prompt.contains("Dye"));
    }

    #[test]
    fn test_gpt4o_prompt_with_references_and_color() {
        let prompt = gpt4o_prompt(&Gpt4oPromptArgs {
            hairstyle: "Wolf Cut",
            haircolor: Some("Chestnut Brown"),
            haircolor_hex: Some("#8B4513"),
            with_style_reference: true,
            with_color_reference: true,
            detail: Some("  slightly wavy  "),
        });
        assert!(prompt.contains("target hairstyle"));
        assert!(prompt.contains("Dye the hair Chestnut Brown (#8B4513)."));
        assert!(prompt.contains("target hair color"));
        assert!(prompt.ends_with("slightly wavy"));
    }

    #[test]
    fn test_gpt4o_prompt_skips_blank_detail() {
        let prompt = gpt4o_prompt(&Gpt4oPromptArgs {
            hairstyle: "Pixie",
            detail: Some("   "),
            ..Gpt4oPromptArgs::default()
        });
        assert!(prompt.ends_with("only the hair changes."));
    }

    #[test]
    fn test_kontext_prompt() {
        let prompt = kontext_prompt("Buzz Cut", Some("Platinum Blonde"), None);
        assert!(prompt.contains("Buzz Cut hairstyle"));
        assert!(prompt.contains("Change the hair color to Platinum Blonde."));
    }

    #[test]
    fn test_kontext_prompt_without_color() {
        let prompt = kontext_prompt("Buzz Cut", None, Some("keep sideburns"));
        assert!(!prompt.contains("hair color"));
        assert!(prompt.ends_with("keep sideburns"));
    }
}
