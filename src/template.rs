/// Substitutes `{FIELD}` placeholders in a message template.
///
/// Fields with no placeholder in the template are ignored; placeholders
/// with no matching field stay verbatim. Pure, no side effects.
pub fn render(template: &str, fields: &[(String, String)]) -> String {
    let mut message = template.to_string();
    for (key, value) in fields {
        let placeholder = format!("{{{}}}", key);
        if message.contains(&placeholder) {
            message = message.replace(&placeholder, value);
        }
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_substitutes_placeholders() {
        let rendered = render(
            "Olá {NOME}, confirmamos seu cadastro em {CIDADE}/{UF}.",
            &fields(&[("NOME", "Ana"), ("CIDADE", "São Luís"), ("UF", "MA")]),
        );
        assert_eq!(rendered, "Olá Ana, confirmamos seu cadastro em São Luís/MA.");
    }

    #[test]
    fn test_render_ignores_fields_absent_from_template() {
        let rendered = render("Hello {NOME}", &fields(&[("NOME", "Ana"), ("CIDADE", "X")]));
        assert_eq!(rendered, "Hello Ana");
    }

    #[test]
    fn test_render_leaves_unmatched_placeholders_verbatim() {
        let rendered = render("Olá {NOME}, CEP {CEP}", &fields(&[("NOME", "Ana")]));
        assert_eq!(rendered, "Olá Ana, CEP {CEP}");
    }

    #[test]
    fn test_render_replaces_every_occurrence() {
        let rendered = render("{NOME} e {NOME}", &fields(&[("NOME", "Ana")]));
        assert_eq!(rendered, "Ana e Ana");
    }

    #[test]
    fn test_render_empty_template() {
        assert_eq!(render("", &fields(&[("NOME", "Ana")])), "");
    }
}
