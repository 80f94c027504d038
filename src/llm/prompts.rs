//! Prompt rendering.
//!
//! Prompt templates use `{name}` placeholders. Known names are substituted;
//! anything else is left verbatim so stray braces in a prompt survive.
//! The email system instruction maps personalisation placeholders onto the
//! backend's `{{.X}}` template variables, which the backend fills per target
//! at send time.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::campaign::model::{PromptSet, Topic};

/// Hidden open-tracking pixel the generated email must carry.
pub const TRACKER_MARKUP: &str = r#"<img src="{{.TrackingURL}}" style="display:none"/>"#;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder regex"));

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*\n(.*?)\n?\s*```\s*$").expect("valid fence regex")
});

/// Backend template variables exposed to the email system instruction.
const BACKEND_VARIABLES: [(&str, &str); 6] = [
    ("FirstName", "{{.FirstName}}"),
    ("LastName", "{{.LastName}}"),
    ("Position", "{{.Position}}"),
    ("Email", "{{.Email}}"),
    ("From", "{{.From}}"),
    ("URL", "{{.URL}}"),
];

/// Substitute `{name}` placeholders from `vars`.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let key = &caps[1];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value).to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// System instruction for email generation.
pub fn email_system_instruction(prompts: &PromptSet) -> String {
    let mut vars: Vec<(&str, &str)> = vec![("tracker", TRACKER_MARKUP)];
    vars.extend(BACKEND_VARIABLES);
    render(&prompts.developer_message, &vars)
}

/// User prompt for email generation.
pub fn email_user_prompt(prompts: &PromptSet, department: &str, topic: &Topic) -> String {
    render(
        &prompts.user_prompt,
        &[
            ("department", department),
            ("sender", &topic.sender_display_name),
            ("subject", &topic.subject_line),
            ("tracker", TRACKER_MARKUP),
        ],
    )
}

/// System instruction for landing-page generation.
pub fn landing_system_instruction(prompts: &PromptSet) -> String {
    render(&prompts.developer_message_landing_page, &BACKEND_VARIABLES)
}

/// User prompt for landing-page generation, seeded with the email body.
pub fn landing_user_prompt(prompts: &PromptSet, email_body: &str) -> String {
    render(&prompts.user_prompt_landing_page, &[("email_body", email_body)])
}

/// Strip a Markdown code fence wrapped around the whole response.
pub fn strip_code_fence(text: &str) -> String {
    match CODE_FENCE.captures(text) {
        Some(caps) => caps[1].trim().to_string(),
        None => text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompts() -> PromptSet {
        PromptSet {
            developer_message: "Write HTML. Include {tracker}. Greet {FirstName} {LastName}, link {URL}.".into(),
            user_prompt: "Department {department}, from {sender}, about {subject}.".into(),
            developer_message_landing_page: "Build a login page for {Email}.".into(),
            user_prompt_landing_page: "Match this email: {email_body}".into(),
        }
    }

    #[test]
    fn render_leaves_unknown_placeholders() {
        assert_eq!(render("{a} and {b}", &[("a", "1")]), "1 and {b}");
        assert_eq!(render("no placeholders", &[]), "no placeholders");
    }

    #[test]
    fn render_does_not_rescan_values() {
        assert_eq!(render("{x}", &[("x", "{x}"), ("y", "2")]), "{x}");
    }

    #[test]
    fn email_instruction_maps_backend_variables() {
        let rendered = email_system_instruction(&prompts());
        assert!(rendered.contains(TRACKER_MARKUP));
        assert!(rendered.contains("Greet {{.FirstName}} {{.LastName}}"));
        assert!(rendered.contains("link {{.URL}}"));
    }

    #[test]
    fn email_user_prompt_uses_topic() {
        let topic = Topic {
            subject_line: "Benefits enrolment".into(),
            sender_display_name: "HR Team".into(),
            sender_email: "hr@x.com".into(),
        };
        let rendered = email_user_prompt(&prompts(), "HR", &topic);
        assert_eq!(rendered, "Department HR, from HR Team, about Benefits enrolment.");
    }

    #[test]
    fn landing_prompts() {
        let p = prompts();
        assert_eq!(landing_system_instruction(&p), "Build a login page for {{.Email}}.");
        assert_eq!(
            landing_user_prompt(&p, "<p>{braces}</p>"),
            "Match this email: <p>{braces}</p>"
        );
    }

    #[test]
    fn strip_fenced_html() {
        let fenced = "```html\n<html><body>hi</body></html>\n```";
        assert_eq!(strip_code_fence(fenced), "<html><body>hi</body></html>");
        assert_eq!(strip_code_fence("  <p>plain</p>\n"), "<p>plain</p>");
    }
}
