//! Prompt construction and description markdown

use crate::capabilities::local::PROMPT_BODY_MARKER;
use crate::state::{DescriptionSection, DescriptionState, JobInput, WorkflowState};

/// Prompt for a fresh description, folding in reviewer feedback
pub fn description_prompt(input: &JobInput, feedback: Option<&str>) -> String {
    let mut lines = vec![
        "Task: write".to_string(),
        format!("Role: {}", input.role_title),
        format!("Department: {}", input.department),
        format!("Company: {}", input.company_name),
    ];
    if let Some(about) = &input.company_description {
        lines.push(format!("About: {}", single_line(about)));
    }
    if let Some(location) = &input.location {
        lines.push(format!("Location: {}", location));
    }
    lines.push(format!("Experience: {}", input.experience_years));
    if !input.key_requirements.is_empty() {
        lines.push(format!("Requirements: {}", input.key_requirements.join("; ")));
    }
    if !input.nice_to_have.is_empty() {
        lines.push(format!("Nice to have: {}", input.nice_to_have.join("; ")));
    }
    if let Some(feedback) = feedback.filter(|f| !f.trim().is_empty()) {
        lines.push(format!("Feedback: {}", single_line(feedback)));
    }
    lines.join("\n")
}

/// Prompt asking for a revision aimed at more applicants
pub fn optimization_prompt(state: &WorkflowState) -> String {
    let focus = format!(
        "Only {} of {} wanted applicants after {} monitoring rounds. Stress flexibility and growth.",
        state.applicants.candidates.len(),
        state.limits.min_applicants,
        state.applicants.monitoring_rounds
    );
    format!(
        "Task: optimize\nFocus: {}\n{}\n{}",
        focus,
        PROMPT_BODY_MARKER,
        render(&state.description)
    )
}

/// Markdown form of a generated description
pub fn render(description: &DescriptionState) -> String {
    let mut out = format!("# {}", description.title.as_deref().unwrap_or_default());
    for section in &description.sections {
        out.push_str(&format!("\n\n## {}\n{}", section.heading, section.body));
    }
    out
}

/// Split `# Title` / `## Heading` markdown into a title and sections
pub fn parse_description(text: &str) -> Result<(String, Vec<DescriptionSection>), String> {
    let mut title: Option<String> = None;
    let mut sections: Vec<DescriptionSection> = Vec::new();

    for line in text.lines() {
        if let Some(heading) = line.strip_prefix("## ") {
            sections.push(DescriptionSection {
                heading: heading.trim().to_string(),
                body: String::new(),
            });
        } else if let Some(heading) = line.strip_prefix("# ") {
            if title.is_none() {
                title = Some(heading.trim().to_string());
            }
        } else if let Some(section) = sections.last_mut() {
            if !section.body.is_empty() || !line.trim().is_empty() {
                if !section.body.is_empty() {
                    section.body.push('\n');
                }
                section.body.push_str(line);
            }
        }
    }

    for section in &mut sections {
        section.body = section.body.trim_end().to_string();
    }
    sections.retain(|s| !s.heading.is_empty());

    let title = title
        .filter(|t| !t.is_empty())
        .ok_or_else(|| "generated text has no title".to_string())?;
    if sections.is_empty() {
        return Err("generated text has no sections".to_string());
    }
    Ok((title, sections))
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_description() {
        let (title, sections) =
            parse_description("# Analyst\n\n## About Acme\nWe sell anvils.\n\nLots of them.\n\n## The Role\nNumbers\n")
                .unwrap();
        assert_eq!(title, "Analyst");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].heading, "About Acme");
        assert_eq!(sections[0].body, "We sell anvils.\n\nLots of them.");
        assert_eq!(sections[1].body, "Numbers");
    }

    #[test]
    fn test_parse_rejects_untitled_text() {
        assert!(parse_description("## Only a section\nbody").is_err());
        assert!(parse_description("# Title only").is_err());
    }

    #[test]
    fn test_render_parses_back() {
        let (title, sections) = parse_description("# Analyst\n\n## The Role\nNumbers\n\n## Perks\nSnacks").unwrap();
        let input = JobInput {
            role_title: "Analyst".to_string(),
            department: "Finance".to_string(),
            company_name: "Acme".to_string(),
            company_description: None,
            key_requirements: vec![],
            nice_to_have: vec![],
            experience_years: 0,
            location: None,
            prescreening_questions: vec![],
        };
        let mut description = DescriptionState::new(input);
        description.title = Some(title);
        description.sections = sections;

        assert_eq!(render(&description), "# Analyst\n\n## The Role\nNumbers\n\n## Perks\nSnacks");
    }

    #[test]
    fn test_feedback_flattened_into_prompt() {
        let input = JobInput {
            role_title: "Analyst".to_string(),
            department: "Finance".to_string(),
            company_name: "Acme".to_string(),
            company_description: Some("Anvils\nand more".to_string()),
            key_requirements: vec!["Excel".to_string(), "SQL".to_string()],
            nice_to_have: vec![],
            experience_years: 2,
            location: None,
            prescreening_questions: vec![],
        };
        let prompt = description_prompt(&input, Some("be\nshorter"));
        assert!(prompt.contains("About: Anvils and more"));
        assert!(prompt.contains("Requirements: Excel; SQL"));
        assert!(prompt.ends_with("Feedback: be shorter"));
        assert!(!prompt.contains("Nice to have"));
    }
}
