//! String template rendering utilities.

pub struct TemplateVars;

impl TemplateVars {
    pub const COMMIT: &'static str = "commit";
    pub const SHORT_COMMIT: &'static str = "short_commit";
    pub const BRANCH: &'static str = "branch";
    pub const CRATE: &'static str = "crate";
}

pub fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}
