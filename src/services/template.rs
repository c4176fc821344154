//! SQL script templating
//!
//! Scripts use Jinja syntax and see a single variable, `value`. Undefined
//! names fail the render instead of expanding to nothing.

use crate::errors::AppResult;
use minijinja::{context, Environment, UndefinedBehavior};
use serde_json::{Map, Value};

pub struct TemplateEngine {
    env: Environment<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        Self { env }
    }

    pub fn render(&self, template: &str, value: &Value) -> AppResult<String> {
        Ok(self.env.render_str(template, context! { value => value })?)
    }

    pub fn render_with(&self, template: &str, params: &Map<String, Value>) -> AppResult<String> {
        Ok(self.env.render_str(template, params)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use serde_json::json;

    #[test]
    fn test_render_substitutes_value() {
        let engine = TemplateEngine::new();
        let sql = engine
            .render("select * from t where name = '{{ value }}'", &json!("foo"))
            .unwrap();
        assert_eq!(sql, "select * from t where name = 'foo'");
    }

    #[test]
    fn test_unbound_variable_is_template_error() {
        let engine = TemplateEngine::new();
        let err = engine
            .render("select {{ schema }}.x", &json!("foo"))
            .unwrap_err();
        assert!(matches!(err, AppError::Template(_)));
    }

    #[test]
    fn test_syntax_error_is_template_error() {
        let engine = TemplateEngine::new();
        let err = engine.render("select {% if %}", &json!("x")).unwrap_err();
        assert!(matches!(err, AppError::Template(_)));
    }

    #[test]
    fn test_control_flow_and_params() {
        let engine = TemplateEngine::new();
        let sql = engine
            .render(
                "select 1{% if value %} where name = '{{ value }}'{% endif %}",
                &json!(""),
            )
            .unwrap();
        assert_eq!(sql, "select 1");

        let mut params = Map::new();
        params.insert("schema".to_string(), json!("dwh"));
        params.insert("limit".to_string(), json!(5));
        let sql = engine
            .render_with("select * from {{ schema }}.t limit {{ limit }}", &params)
            .unwrap();
        assert_eq!(sql, "select * from dwh.t limit 5");
    }
}
